use std::collections::BTreeMap;

use serde::Serialize;

use crate::sample::{SampleRecord, StepKind, millis};

/// Linearly interpolated percentile of an ascending-sorted slice, at rank `(p/100)·(n−1)`.
/// `p` is clamped to `[0, 100]`. Returns 0 for an empty slice.
pub fn percentile(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }

    let rank = (p.clamp(0.0, 100.0) / 100.0) * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    if lo == hi {
        return sorted[lo];
    }

    let w = rank - lo as f64;
    sorted[lo] * (1.0 - w) + sorted[hi] * w
}

/// Aggregate view of a set of samples. Latencies are in milliseconds, durations in seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ResultSummary {
    pub total_requests: u64,
    pub successful_requests: u64,
    pub failed_requests: u64,
    pub average_latency: f64,
    pub p50_latency: f64,
    pub p90_latency: f64,
    pub p99_latency: f64,
    pub min_latency: f64,
    pub max_latency: f64,
    pub requests_per_second: f64,
    /// Only codes that were observed.
    pub status_codes: BTreeMap<u16, u64>,
    /// Only error classifications that were observed.
    pub errors: BTreeMap<String, u64>,
    pub total_duration: f64,
    pub bytes_received: u64,
}

impl ResultSummary {
    /// Reduce `samples` into a summary. Order of the input does not matter.
    pub fn from_samples<'a, I>(samples: I) -> Self
    where
        I: IntoIterator<Item = &'a SampleRecord>,
    {
        let mut latencies: Vec<f64> = Vec::new();
        let mut out = Self::default();
        let mut span: Option<(std::time::Duration, std::time::Duration)> = None;

        for s in samples {
            out.total_requests += 1;
            if s.ok {
                out.successful_requests += 1;
            }
            if let Some(status) = s.status {
                *out.status_codes.entry(status).or_insert(0) += 1;
            }
            if let Some(error) = &s.error {
                *out.errors.entry(error.clone()).or_insert(0) += 1;
            }
            out.bytes_received = out
                .bytes_received
                .saturating_add(s.response_size.unwrap_or(0));

            latencies.push(s.latency_ms());

            span = Some(match span {
                None => (s.started, s.finished),
                Some((first, last)) => (first.min(s.started), last.max(s.finished)),
            });
        }

        out.failed_requests = out.total_requests - out.successful_requests;

        latencies.sort_by(f64::total_cmp);
        if !latencies.is_empty() {
            out.average_latency = latencies.iter().sum::<f64>() / latencies.len() as f64;
            out.min_latency = latencies[0];
            out.max_latency = latencies[latencies.len() - 1];
        }
        out.p50_latency = percentile(&latencies, 50.0);
        out.p90_latency = percentile(&latencies, 90.0);
        out.p99_latency = percentile(&latencies, 99.0);

        if let Some((first, last)) = span {
            out.total_duration = millis(last.saturating_sub(first)) / 1000.0;
        }
        if out.total_duration > 0.0 {
            out.requests_per_second = out.total_requests as f64 / out.total_duration;
        }

        out
    }

    /// Summary of the samples of one step kind.
    pub fn for_kind(samples: &[SampleRecord], kind: StepKind) -> Self {
        Self::from_samples(samples.iter().filter(|s| s.kind == kind))
    }

    /// Share of successful requests in percent; 0 when nothing ran.
    pub fn success_rate_pct(&self) -> f64 {
        if self.total_requests == 0 {
            return 0.0;
        }
        (self.successful_requests as f64 / self.total_requests as f64) * 100.0
    }
}

/// One summary per step kind present in `samples`, keyed by kind.
pub fn summarize_by_kind(samples: &[SampleRecord]) -> BTreeMap<StepKind, ResultSummary> {
    let mut groups: BTreeMap<StepKind, Vec<&SampleRecord>> = BTreeMap::new();
    for s in samples {
        groups.entry(s.kind).or_default().push(s);
    }

    groups
        .into_iter()
        .map(|(kind, group)| (kind, ResultSummary::from_samples(group)))
        .collect()
}

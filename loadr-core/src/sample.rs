use std::time::Duration;

use serde::ser::{Serialize, SerializeStruct as _, Serializer};

/// Which step of a unit of work produced a sample.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    serde::Serialize,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
    /// Single-request mode.
    Request,
    /// Conversation mode: the POST that creates the resource.
    Create,
    /// Conversation mode: a follow-up POST carrying the created id.
    Message,
}

/// One request attempt. Offsets are measured from the run's start instant.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleRecord {
    pub kind: StepKind,
    pub started: Duration,
    pub finished: Duration,
    pub ok: bool,
    /// Absent when no response was received.
    pub status: Option<u16>,
    /// Absent on success and on plain non-2xx/3xx responses.
    pub error: Option<String>,
    pub response_size: Option<u64>,
}

impl SampleRecord {
    /// `finished - started`; never negative.
    pub fn latency(&self) -> Duration {
        self.finished.saturating_sub(self.started)
    }

    pub fn latency_ms(&self) -> f64 {
        millis(self.latency())
    }
}

pub(crate) fn millis(d: Duration) -> f64 {
    d.as_nanos() as f64 / 1_000_000.0
}

impl Serialize for SampleRecord {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        let mut st = s.serialize_struct("SampleRecord", 8)?;
        st.serialize_field("type", &self.kind)?;
        st.serialize_field("start", &millis(self.started))?;
        st.serialize_field("end", &millis(self.finished))?;
        st.serialize_field("latency", &self.latency_ms())?;
        st.serialize_field("ok", &self.ok)?;
        match self.status {
            Some(status) => st.serialize_field("status", &status)?,
            None => st.skip_field("status")?,
        }
        match &self.error {
            Some(error) => st.serialize_field("error", error)?,
            None => st.skip_field("error")?,
        }
        match self.response_size {
            Some(size) => st.serialize_field("responseSize", &size)?,
            None => st.skip_field("responseSize")?,
        }
        st.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn latency_saturates_at_zero() {
        let s = SampleRecord {
            kind: StepKind::Request,
            started: Duration::from_millis(10),
            finished: Duration::from_millis(4),
            ok: true,
            status: Some(200),
            error: None,
            response_size: Some(2),
        };
        assert_eq!(s.latency(), Duration::ZERO);
    }

    #[test]
    fn serializes_offsets_in_millis_and_skips_absent_fields() {
        let s = SampleRecord {
            kind: StepKind::Create,
            started: Duration::from_millis(5),
            finished: Duration::from_millis(30),
            ok: false,
            status: None,
            error: Some("timeout".to_string()),
            response_size: None,
        };

        let v = match serde_json::to_value(&s) {
            Ok(v) => v,
            Err(err) => panic!("to_value failed: {err}"),
        };
        assert_eq!(v["type"], "create");
        assert_eq!(v["start"], 5.0);
        assert_eq!(v["end"], 30.0);
        assert_eq!(v["latency"], 25.0);
        assert_eq!(v["error"], "timeout");
        assert!(v.get("status").is_none());
        assert!(v.get("responseSize").is_none());
    }

    #[test]
    fn step_kind_round_trips_through_strings() {
        assert_eq!(StepKind::Message.to_string(), "message");
        assert_eq!("create".parse::<StepKind>().ok(), Some(StepKind::Create));
    }
}

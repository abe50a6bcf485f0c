use std::time::Duration;

pub(crate) fn format_bytes(b: u64) -> String {
    const KIB: u64 = 1024;
    const MIB: u64 = 1024 * 1024;
    const GIB: u64 = 1024 * 1024 * 1024;

    if b >= GIB {
        return format!("{:.2}GiB", (b as f64) / (GIB as f64));
    }
    if b >= MIB {
        return format!("{:.2}MiB", (b as f64) / (MIB as f64));
    }
    if b >= KIB {
        return format!("{:.2}KiB", (b as f64) / (KIB as f64));
    }

    format!("{b}B")
}

pub(crate) fn format_rate(v: f64) -> String {
    if v.is_finite() {
        format!("{v:.0}")
    } else {
        "0".to_string()
    }
}

pub(crate) fn format_pct(v: f64) -> String {
    if v.is_finite() {
        format!("{v:.1}%")
    } else {
        "0.0%".to_string()
    }
}

/// Latency in milliseconds with two decimals.
pub(crate) fn format_ms(v: f64) -> String {
    format!("{v:.2}ms")
}

/// A single rounded component in one of: us, ms, s.
pub(crate) fn format_duration_single(d: Duration) -> String {
    const NS_PER_US: u128 = 1_000;
    const NS_PER_MS: u128 = 1_000_000;
    const NS_PER_S: u128 = 1_000_000_000;

    fn round_div(value: u128, unit: u128) -> u128 {
        // Ties round up.
        (value + (unit / 2)) / unit
    }

    let total_ns = d.as_nanos();
    if total_ns >= NS_PER_S {
        return format!("{}s", round_div(total_ns, NS_PER_S));
    }
    if total_ns >= NS_PER_MS {
        return format!("{}ms", round_div(total_ns, NS_PER_MS));
    }
    format!("{}us", round_div(total_ns, NS_PER_US))
}

//! Formatting helpers for log and status lines.

/// Format a KB/s rate, rounded the way status lines show it.
///
/// `"0 KB/s"`, `"512 KB/s"`, `"1.5 MB/s"`, `"2.3 GB/s"`
pub fn format_kbps(kbps: f64) -> String {
    if !kbps.is_finite() || kbps < 0.5 {
        return "0 KB/s".to_string();
    }
    if kbps >= 1024.0 * 1024.0 {
        format!("{:.1} GB/s", kbps / (1024.0 * 1024.0))
    } else if kbps >= 1024.0 {
        format!("{:.1} MB/s", kbps / 1024.0)
    } else {
        format!("{:.0} KB/s", kbps)
    }
}

/// Format duration in seconds as human-readable: `"45s"`, `"2m 5s"`, `"1h 30m"`.
pub fn format_duration(secs: u64) -> String {
    if secs < 60 {
        format!("{}s", secs)
    } else if secs < 3600 {
        if secs % 60 == 0 {
            format!("{}m", secs / 60)
        } else {
            format!("{}m {}s", secs / 60, secs % 60)
        }
    } else {
        format!("{}h {}m", secs / 3600, (secs % 3600) / 60)
    }
}

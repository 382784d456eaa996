//! Pure formatting helpers used when rendering a record.

use chrono::{Local, TimeZone};

/// `abcdef...uvwxyz` style abbreviation keeping `n` characters at each end.
pub fn shorten(id: &str, n: usize) -> String {
    let chars: Vec<char> = id.chars().collect();
    if chars.len() <= 2 * n + 3 {
        return id.to_string();
    }
    let head: String = chars[..n].iter().collect();
    let tail: String = chars[chars.len() - n..].iter().collect();
    format!("{}...{}", head, tail)
}

pub fn mempool_tx_link(tx_id: &str) -> String {
    format!("https://mempool.space/tx/{}", tx_id)
}

/// Link to the inscription once it is mined (first inscription of the tx).
pub fn ordinals_inscription_link(tx_id: &str) -> String {
    format!("https://ordinals.com/inscription/{}i0", tx_id)
}

/// Public URL of the stored image on the feed host.
pub fn image_url(base_url: &str, image_path: &str) -> String {
    format!("{}/static/pictures/{}", base_url.trim_end_matches('/'), image_path)
}

pub fn format_fee_rate(fee_rate: f64) -> String {
    format!("{:.2} sat/vB", fee_rate)
}

/// `HH:MM:SS` in local time; empty for a missing or out-of-range timestamp.
pub fn format_local_time(timestamp: Option<i64>) -> String {
    timestamp
        .and_then(|ts| Local.timestamp_opt(ts, 0).single())
        .map(|dt| dt.format("%H:%M:%S").to_string())
        .unwrap_or_default()
}

//! Display formatting: pure functions of value + display preference.
//!
//! Nothing here is cached; the view layer recomputes formatted strings on
//! demand from the current snapshot and preference.

use crate::derived::Ratio;
use crate::issuance::SAT_PER_BTC;

/// Rendered form of an undefined ratio.
pub const UNDEFINED_DISPLAY: &str = "n/a";

/// Group an integer with comma thousands separators.
pub fn group_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    grouped
}

/// Fiat price per the display preference: millions notation (`0.11M`) or
/// full grouped notation (`110,000`).
pub fn format_fiat(value: f64, millions: bool) -> String {
    if millions {
        format!("{:.2}M", value / 1_000_000.0)
    } else {
        group_thousands(value.round() as u64)
    }
}

/// Hashrate with a scaled unit suffix.
pub fn format_hashrate(hashrate: f64) -> String {
    if hashrate >= 1e18 {
        format!("{:.2} EH/s", hashrate / 1e18)
    } else if hashrate >= 1e15 {
        format!("{:.2} PH/s", hashrate / 1e15)
    } else if hashrate >= 1e12 {
        format!("{:.2} TH/s", hashrate / 1e12)
    } else if hashrate >= 1e9 {
        format!("{:.2} GH/s", hashrate / 1e9)
    } else if hashrate >= 1e6 {
        format!("{:.2} MH/s", hashrate / 1e6)
    } else {
        format!("{:.2} H/s", hashrate)
    }
}

/// Difficulty in trillions.
pub fn format_difficulty(difficulty: f64) -> String {
    format!("{:.2}T", difficulty / 1e12)
}

/// Satoshi amount as whole coins, grouped.
pub fn sat_to_btc_display(sat: u64) -> String {
    let coins = (sat as f64 / SAT_PER_BTC as f64).round() as u64;
    group_thousands(coins)
}

/// Mempool virtual size in vMB.
pub fn format_vsize(vsize_vb: u64) -> String {
    format!("{:.2} vMB", vsize_vb as f64 / 1e6)
}

/// A ratio to fixed decimals, or [`UNDEFINED_DISPLAY`].
pub fn format_ratio(ratio: Ratio, decimals: usize) -> String {
    match ratio.value() {
        Some(v) => format!("{v:.decimals$}"),
        None => UNDEFINED_DISPLAY.to_string(),
    }
}

/// A ratio as a percentage with fixed decimals, or [`UNDEFINED_DISPLAY`].
pub fn format_ratio_pct(ratio: Ratio, decimals: usize) -> String {
    match ratio.value() {
        Some(v) => format!("{v:.decimals$}%"),
        None => UNDEFINED_DISPLAY.to_string(),
    }
}

/// A ratio rounded to a whole number and grouped, or [`UNDEFINED_DISPLAY`].
pub fn format_ratio_grouped(ratio: Ratio) -> String {
    match ratio.value() {
        Some(v) if v >= 0.0 => group_thousands(v.round() as u64),
        _ => UNDEFINED_DISPLAY.to_string(),
    }
}

//! Human-readable file sizes

const UNITS: [&str; 9] = ["B", "KB", "MB", "GB", "TB", "PB", "EB", "ZB", "YB"];

/// Format a byte count with binary (1024) steps, two decimals, trailing zeros dropped.
///
/// Used for both freshly selected files and server records so a size does not
/// change once the upload finishes.
pub fn readable_size(bytes: u64) -> String {
    if bytes == 0 {
        return "0 B".to_string();
    }

    let mut exponent = 0;
    let mut whole = bytes;
    while whole >= 1024 && exponent < UNITS.len() - 1 {
        whole /= 1024;
        exponent += 1;
    }
    let mut value = bytes as f64 / 1024f64.powi(exponent as i32);
    // 1023.999 KB would print as "1024 KB"
    if (value * 100.0).round() >= 1024.0 * 100.0 && exponent < UNITS.len() - 1 {
        value /= 1024.0;
        exponent += 1;
    }

    let formatted = format!("{:.2}", value);
    let trimmed = formatted.trim_end_matches('0').trim_end_matches('.');
    format!("{} {}", trimmed, UNITS[exponent])
}

use std::path::{Path, PathBuf};
use std::time::Duration;

pub const SECS_PER_DAY: u64 = 86_400;

pub fn home_dir() -> Option<PathBuf> {
    dirs::home_dir()
}

/// Parse human-readable size string ("100MB") into bytes.
pub fn parse_size(s: &str) -> Result<u64, String> {
    let s = s.trim();
    let upper = s.to_ascii_uppercase();
    let (num_str, multiplier) = if let Some(n) = upper.strip_suffix("GB") {
        (n, 1_073_741_824u64)
    } else if let Some(n) = upper.strip_suffix("MB") {
        (n, 1_048_576)
    } else if let Some(n) = upper.strip_suffix("KB") {
        (n, 1_024)
    } else if let Some(n) = upper.strip_suffix('B') {
        (n, 1)
    } else {
        // assume bytes if no suffix
        (upper.as_str(), 1)
    };

    let num: f64 = num_str
        .trim()
        .parse()
        .map_err(|_| format!("Invalid size: '{s}'"))?;

    if num < 0.0 {
        return Err("Size cannot be negative".to_string());
    }

    Ok((num * multiplier as f64) as u64)
}

/// Parse a duration such as "90s", "30m", "24h" or "30d".
/// A bare number is taken as days.
pub fn parse_duration(s: &str) -> Result<Duration, String> {
    let s = s.trim();
    let (num_str, unit_secs) = match s.char_indices().last() {
        Some((i, 's')) => (&s[..i], 1),
        Some((i, 'm')) => (&s[..i], 60),
        Some((i, 'h')) => (&s[..i], 3_600),
        Some((i, 'd')) => (&s[..i], SECS_PER_DAY),
        Some((i, 'w')) => (&s[..i], 7 * SECS_PER_DAY),
        _ => (s, SECS_PER_DAY),
    };

    let num: u64 = num_str
        .trim()
        .parse()
        .map_err(|_| format!("Invalid duration: '{s}'"))?;

    num.checked_mul(unit_secs)
        .map(Duration::from_secs)
        .ok_or_else(|| format!("Duration too large: '{s}'"))
}

/// Format byte count as human-readable string.
pub fn format_size(bytes: u64) -> String {
    if bytes >= 1_073_741_824 {
        format!("{:.2} GB", bytes as f64 / 1_073_741_824.0)
    } else if bytes >= 1_048_576 {
        format!("{:.2} MB", bytes as f64 / 1_048_576.0)
    } else if bytes >= 1_024 {
        format!("{:.2} KB", bytes as f64 / 1_024.0)
    } else {
        format!("{} B", bytes)
    }
}

/// Shorten a path for display by replacing home dir with ~.
pub fn display_path(path: &Path) -> String {
    match home_dir().and_then(|home| path.strip_prefix(home).ok().map(Path::to_path_buf)) {
        Some(relative) => format!("~/{}", relative.display()),
        None => path.display().to_string(),
    }
}

// Timestamp helpers for board and history output

use chrono::{Local, TimeZone};

/// Current unix timestamp (UTC seconds)
pub fn now_ts() -> i64 {
    chrono::Utc::now().timestamp()
}

/// Format a unix timestamp as local `YYYY-MM-DD HH:MM`
pub fn format_datetime(ts: i64) -> String {
    match Local.timestamp_opt(ts, 0).single() {
        Some(dt) => dt.format("%Y-%m-%d %H:%M").to_string(),
        None => ts.to_string(),
    }
}

/// Format an idle day count for a card, e.g. `today`, `1d`, `12d`
pub fn format_idle(days: i64) -> String {
    if days <= 0 {
        "today".to_string()
    } else {
        format!("{}d", days)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_idle() {
        assert_eq!(format_idle(0), "today");
        assert_eq!(format_idle(1), "1d");
        assert_eq!(format_idle(12), "12d");
    }

    #[test]
    fn test_format_datetime_shape() {
        let formatted = format_datetime(1_700_000_000);
        assert_eq!(formatted.len(), 16);
        assert_eq!(&formatted[4..5], "-");
    }
}

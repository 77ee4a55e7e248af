/// Database row types. These map directly to SQLite rows and stay
/// independent of the points-types API models.
use chrono::{DateTime, NaiveDateTime, Utc};

#[derive(Debug, Clone)]
pub struct AdminRow {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRow {
    pub userid: String,
    pub username: String,
    pub discord_name: String,
    pub points: i64,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerRow {
    pub pid: String,
    pub userid: String,
    pub pamount: i64,
    pub padded: bool,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriftRow {
    pub userid: String,
    pub points: i64,
    pub ledger_total: i64,
}

/// Parse a `created_at` column. SQLite's `datetime('now')` stores
/// "YYYY-MM-DD HH:MM:SS" in UTC without a zone suffix; RFC 3339 is accepted
/// too for rows written by other tools.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    raw.parse::<DateTime<Utc>>()
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
                .ok()
                .map(|ndt| ndt.and_utc())
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn parses_sqlite_datetime() {
        let ts = parse_timestamp("2025-03-09 14:05:59").unwrap();
        assert_eq!((ts.year(), ts.month(), ts.day()), (2025, 3, 9));
        assert_eq!((ts.hour(), ts.minute(), ts.second()), (14, 5, 59));
    }

    #[test]
    fn parses_rfc3339() {
        assert!(parse_timestamp("2025-03-09T14:05:59Z").is_some());
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse_timestamp("yesterday").is_none());
    }
}

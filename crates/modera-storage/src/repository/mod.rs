//! Database repositories for each table.

pub mod content;
pub mod records;
pub mod tags;

pub use content::ContentRepo;
pub use records::RecordsRepo;
pub use tags::TagsRepo;

use chrono::{DateTime, Utc};

/// Parse a datetime from SQLite format.
///
/// Accepts RFC-3339 (our inserts) and the bare `datetime('now')` format
/// (column defaults). Anything else is corrupt data; it is logged and
/// mapped to the Unix epoch so the damage is visible rather than replaced
/// with a plausible-looking current timestamp.
pub(crate) fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|_| {
            chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").map(|dt| dt.and_utc())
        })
        .unwrap_or_else(|_| {
            tracing::warn!(value = %s, "unparseable stored timestamp, substituting epoch");
            DateTime::<Utc>::UNIX_EPOCH
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_datetime_accepts_both_stored_formats() {
        let rfc = parse_datetime("2026-08-23T10:30:00+00:00");
        assert_eq!(rfc.to_rfc3339(), "2026-08-23T10:30:00+00:00");

        let bare = parse_datetime("2026-08-23 10:30:00");
        assert_eq!(bare, rfc);
    }

    #[test]
    fn parse_datetime_maps_garbage_to_epoch() {
        assert_eq!(parse_datetime("not a date"), DateTime::<Utc>::UNIX_EPOCH);
        assert_eq!(parse_datetime(""), DateTime::<Utc>::UNIX_EPOCH);
    }
}

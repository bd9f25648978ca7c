use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use time::{Date, OffsetDateTime, PrimitiveDateTime, Time};

pub const TS_FIELD: &str = "ts";
pub const MS_PLAYED_FIELD: &str = "ms_played";
pub const TRACK_FIELD: &str = "master_metadata_track_name";
pub const ARTIST_FIELD: &str = "master_metadata_album_artist_name";
pub const ALBUM_FIELD: &str = "master_metadata_album_album_name";
pub const PLATFORM_FIELD: &str = "platform";
pub const INCOGNITO_FIELD: &str = "incognito_mode";

const TIMESTAMP_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]Z");
const DATE_FORMAT: &[BorrowedFormatItem<'static>] = format_description!("[year]-[month]-[day]");

/// One row of the history: a single play that ended at `timestamp`.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayEvent {
    pub timestamp: OffsetDateTime,
    pub ms_played: u64,
    pub track_name: Option<String>,
    pub album_name: Option<String>,
    pub artist_name: Option<String>,
    pub platform: String,
    pub incognito_mode: bool,
    /// Every other flattened column of the source record, keyed by dotted path.
    pub columns: BTreeMap<String, Value>,
}

impl PlayEvent {
    pub fn column(&self, name: &str) -> Option<&Value> {
        self.columns.get(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SortColumn {
    #[default]
    Timestamp,
    MsPlayed,
    Track,
    Artist,
    Album,
    Platform,
}

impl SortColumn {
    pub fn label(self) -> &'static str {
        match self {
            Self::Timestamp => TS_FIELD,
            Self::MsPlayed => MS_PLAYED_FIELD,
            Self::Track => TRACK_FIELD,
            Self::Artist => ARTIST_FIELD,
            Self::Album => ALBUM_FIELD,
            Self::Platform => PLATFORM_FIELD,
        }
    }

    pub(crate) fn compare(self, a: &PlayEvent, b: &PlayEvent) -> Ordering {
        match self {
            Self::Timestamp => a.timestamp.cmp(&b.timestamp),
            Self::MsPlayed => a.ms_played.cmp(&b.ms_played),
            Self::Track => a.track_name.cmp(&b.track_name),
            Self::Artist => a.artist_name.cmp(&b.artist_name),
            Self::Album => a.album_name.cmp(&b.album_name),
            Self::Platform => a.platform.cmp(&b.platform),
        }
    }
}

pub fn parse_timestamp(text: &str) -> Result<OffsetDateTime, time::error::Parse> {
    PrimitiveDateTime::parse(text, TIMESTAMP_FORMAT).map(PrimitiveDateTime::assume_utc)
}

pub fn format_timestamp(value: OffsetDateTime) -> String {
    value
        .format(TIMESTAMP_FORMAT)
        .unwrap_or_else(|_| value.to_string())
}

pub fn format_date(value: OffsetDateTime) -> String {
    value
        .format(DATE_FORMAT)
        .unwrap_or_else(|_| value.date().to_string())
}

/// Parses a range bound given either as a full timestamp or as `YYYY-MM-DD`.
/// A bare date starts at midnight, or ends at 23:59:59 when `end_of_day` is set.
pub fn parse_date_bound(
    text: &str,
    end_of_day: bool,
) -> Result<OffsetDateTime, time::error::Parse> {
    let text = text.trim();
    if let Ok(timestamp) = parse_timestamp(text) {
        return Ok(timestamp);
    }

    let date = Date::parse(text, DATE_FORMAT)?;
    let clock = if end_of_day {
        time::macros::time!(23:59:59)
    } else {
        Time::MIDNIGHT
    };
    Ok(PrimitiveDateTime::new(date, clock).assume_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn parses_strict_utc_timestamps() {
        let parsed = parse_timestamp("2021-03-04T05:06:07Z").expect("parse");
        assert_eq!(parsed, datetime!(2021-03-04 05:06:07 UTC));
    }

    #[test]
    fn rejects_fractional_seconds_and_offsets() {
        assert!(parse_timestamp("2021-03-04T05:06:07.123Z").is_err());
        assert!(parse_timestamp("2021-03-04T05:06:07+01:00").is_err());
        assert!(parse_timestamp("2021-03-04 05:06:07").is_err());
    }

    #[test]
    fn bare_dates_cover_the_whole_day() {
        let start = parse_date_bound("2021-03-04", false).expect("start");
        let end = parse_date_bound("2021-03-04", true).expect("end");
        assert_eq!(start, datetime!(2021-03-04 00:00:00 UTC));
        assert_eq!(end, datetime!(2021-03-04 23:59:59 UTC));
    }

    #[test]
    fn formats_back_to_source_layout() {
        let value = datetime!(2020-12-31 23:00:01 UTC);
        assert_eq!(format_timestamp(value), "2020-12-31T23:00:01Z");
        assert_eq!(format_date(value), "2020-12-31");
    }
}

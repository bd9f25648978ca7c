use crate::error::{HistoryError, Result};
use crate::model::{self, PlayEvent};
use crate::table::HistoryTable;
use std::time::Duration;
use time::OffsetDateTime;

pub const DEFAULT_SKIP_THRESHOLD_SECONDS: u64 = 60;

/// Inclusive date bounds. An unset bound falls back to the earliest or latest
/// play in whatever table the range is applied to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateRange {
    pub from: Option<OffsetDateTime>,
    pub to: Option<OffsetDateTime>,
}

impl DateRange {
    pub const ALL: Self = Self {
        from: None,
        to: None,
    };

    pub fn new(from: Option<OffsetDateTime>, to: Option<OffsetDateTime>) -> Self {
        Self { from, to }
    }

    pub fn validate(&self) -> Result<()> {
        if let (Some(from), Some(to)) = (self.from, self.to)
            && from > to
        {
            return Err(HistoryError::InvalidRange {
                from: model::format_timestamp(from),
                to: model::format_timestamp(to),
            });
        }
        Ok(())
    }

    /// Concrete bounds against `table`. Only two explicit bounds can be
    /// reversed; `None` when the table is empty and a bound was left open, or
    /// when an open bound filled in from the data lands before the other one.
    pub fn resolve(
        &self,
        table: &HistoryTable,
    ) -> Result<Option<(OffsetDateTime, OffsetDateTime)>> {
        self.validate()?;
        let from = self.from.or_else(|| table.first_timestamp());
        let to = self.to.or_else(|| table.last_timestamp());
        match (from, to) {
            (Some(from), Some(to)) if from <= to => Ok(Some((from, to))),
            _ => Ok(None),
        }
    }

    pub fn contains(&self, timestamp: OffsetDateTime) -> bool {
        self.from.is_none_or(|from| timestamp >= from) && self.to.is_none_or(|to| timestamp <= to)
    }
}

pub fn in_date_range(table: &HistoryTable, range: DateRange) -> Result<HistoryTable> {
    range.validate()?;
    Ok(table.filtered(|event| range.contains(event.timestamp)))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SkipThreshold(Duration);

impl SkipThreshold {
    pub fn new(threshold: Duration) -> Self {
        Self(threshold)
    }

    pub fn from_seconds(seconds: u64) -> Self {
        Self(Duration::from_secs(seconds))
    }
}

impl Default for SkipThreshold {
    fn default() -> Self {
        Self::from_seconds(DEFAULT_SKIP_THRESHOLD_SECONDS)
    }
}

/// A play counts as skipped when it stopped before the threshold.
pub fn is_skipped(event: &PlayEvent, threshold: SkipThreshold) -> bool {
    u128::from(event.ms_played) < threshold.0.as_millis()
}

pub fn skipped(table: &HistoryTable, threshold: SkipThreshold) -> HistoryTable {
    table.filtered(|event| is_skipped(event, threshold))
}

pub fn not_skipped(table: &HistoryTable, threshold: SkipThreshold) -> HistoryTable {
    table.filtered(|event| !is_skipped(event, threshold))
}

/// Returns `(skipped, kept)`.
pub fn partition_skips(
    table: &HistoryTable,
    threshold: SkipThreshold,
) -> (HistoryTable, HistoryTable) {
    let (skipped, kept): (Vec<PlayEvent>, Vec<PlayEvent>) = table
        .iter()
        .cloned()
        .partition(|event| is_skipped(event, threshold));
    (
        HistoryTable::from_events(skipped),
        HistoryTable::from_events(kept),
    )
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdentityFilter {
    pub track: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
}

impl IdentityFilter {
    pub fn is_empty(&self) -> bool {
        self.track.is_none() && self.artist.is_none() && self.album.is_none()
    }

    pub fn matches(&self, event: &PlayEvent) -> bool {
        field_matches(self.track.as_deref(), event.track_name.as_deref())
            && field_matches(self.artist.as_deref(), event.artist_name.as_deref())
            && field_matches(self.album.as_deref(), event.album_name.as_deref())
    }
}

fn field_matches(wanted: Option<&str>, actual: Option<&str>) -> bool {
    match wanted {
        Some(wanted) => actual == Some(wanted),
        None => true,
    }
}

pub fn by_identity(table: &HistoryTable, identity: &IdentityFilter) -> HistoryTable {
    if identity.is_empty() {
        return table.clone();
    }
    table.filtered(|event| identity.matches(event))
}

pub fn incognito_only(table: &HistoryTable) -> HistoryTable {
    table.filtered(|event| event.incognito_mode)
}

/// Everything needed to pick a slice of the history: which plays, when, and
/// whether short listens count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackQuery {
    pub identity: IdentityFilter,
    pub range: DateRange,
    pub include_skipped: bool,
    pub threshold: SkipThreshold,
}

impl Default for TrackQuery {
    fn default() -> Self {
        Self {
            identity: IdentityFilter::default(),
            range: DateRange::ALL,
            include_skipped: true,
            threshold: SkipThreshold::default(),
        }
    }
}

pub fn select_tracks(table: &HistoryTable, query: &TrackQuery) -> Result<HistoryTable> {
    query.range.validate()?;
    Ok(table.filtered(|event| {
        query.range.contains(event.timestamp)
            && (query.include_skipped || !is_skipped(event, query.threshold))
            && query.identity.matches(event)
    }))
}

pub fn count_tracks(table: &HistoryTable, query: &TrackQuery) -> Result<usize> {
    Ok(select_tracks(table, query)?.len())
}

pub fn listening_time(table: &HistoryTable, query: &TrackQuery) -> Result<Duration> {
    Ok(select_tracks(table, query)?.total_listening_time())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::BTreeMap;
    use time::macros::datetime;

    fn event(timestamp: OffsetDateTime, ms_played: u64, artist: &str) -> PlayEvent {
        PlayEvent {
            timestamp,
            ms_played,
            track_name: Some(format!("{artist} song")),
            album_name: Some(format!("{artist} album")),
            artist_name: Some(artist.to_string()),
            platform: String::from("Linux"),
            incognito_mode: false,
            columns: BTreeMap::new(),
        }
    }

    #[test]
    fn skip_threshold_splits_short_plays() {
        let at = datetime!(2021-01-01 00:00:00 UTC);
        let table = HistoryTable::from_events(vec![
            event(at, 30_000, "A"),
            event(at, 90_000, "B"),
            event(at, 200_000, "C"),
        ]);

        let kept = not_skipped(&table, SkipThreshold::default());
        let dropped = skipped(&table, SkipThreshold::default());
        assert_eq!(kept.len(), 2);
        assert_eq!(
            kept.iter().map(|event| event.ms_played).collect::<Vec<_>>(),
            vec![90_000, 200_000]
        );
        assert_eq!(dropped.len(), 1);
        assert_eq!(dropped.events()[0].ms_played, 30_000);
    }

    #[test]
    fn exactly_at_threshold_is_not_skipped() {
        let at = datetime!(2021-01-01 00:00:00 UTC);
        assert!(!is_skipped(&event(at, 60_000, "A"), SkipThreshold::default()));
        assert!(is_skipped(&event(at, 59_999, "A"), SkipThreshold::default()));
    }

    #[test]
    fn date_range_is_inclusive_on_both_ends() {
        let table = HistoryTable::from_events(vec![
            event(datetime!(2021-01-01 00:00:00 UTC), 1, "A"),
            event(datetime!(2021-01-02 00:00:00 UTC), 1, "B"),
            event(datetime!(2021-01-03 00:00:00 UTC), 1, "C"),
        ]);
        let range = DateRange::new(
            Some(datetime!(2021-01-01 00:00:00 UTC)),
            Some(datetime!(2021-01-02 00:00:00 UTC)),
        );

        let picked = in_date_range(&table, range).expect("range");
        assert_eq!(picked.len(), 2);
        assert_eq!(in_date_range(&table, DateRange::ALL).expect("all").len(), 3);
    }

    #[test]
    fn reversed_range_is_rejected() {
        let table = HistoryTable::default();
        let range = DateRange::new(
            Some(datetime!(2021-02-01 00:00:00 UTC)),
            Some(datetime!(2021-01-01 00:00:00 UTC)),
        );
        assert!(matches!(
            in_date_range(&table, range),
            Err(HistoryError::InvalidRange { .. })
        ));
    }

    #[test]
    fn open_bound_past_the_data_resolves_to_nothing() {
        let table = HistoryTable::from_events(vec![event(
            datetime!(2021-01-01 00:00:00 UTC),
            1,
            "A",
        )]);
        let after = DateRange::new(Some(datetime!(2022-01-01 00:00:00 UTC)), None);
        assert_eq!(after.resolve(&table).expect("open to"), None);
        assert_eq!(after.resolve(&HistoryTable::default()).expect("empty"), None);
        assert!(in_date_range(&table, after).expect("filter").is_empty());

        let before = DateRange::new(None, Some(datetime!(2020-01-01 00:00:00 UTC)));
        assert_eq!(before.resolve(&table).expect("open from"), None);

        let reversed = DateRange::new(
            Some(datetime!(2022-01-01 00:00:00 UTC)),
            Some(datetime!(2021-01-01 00:00:00 UTC)),
        );
        assert!(matches!(
            reversed.resolve(&table),
            Err(HistoryError::InvalidRange { .. })
        ));
    }

    #[test]
    fn identity_filters_are_exact_and_combined() {
        let at = datetime!(2021-01-01 00:00:00 UTC);
        let mut other_album = event(at, 1, "A");
        other_album.album_name = Some(String::from("Live"));
        let table = HistoryTable::from_events(vec![
            event(at, 1, "A"),
            other_album,
            event(at, 1, "a"),
        ]);

        let artist_only = IdentityFilter {
            artist: Some(String::from("A")),
            ..IdentityFilter::default()
        };
        assert_eq!(by_identity(&table, &artist_only).len(), 2);

        let artist_and_album = IdentityFilter {
            artist: Some(String::from("A")),
            album: Some(String::from("Live")),
            ..IdentityFilter::default()
        };
        assert_eq!(by_identity(&table, &artist_and_album).len(), 1);
    }

    #[test]
    fn track_query_composes_filters() {
        let table = HistoryTable::from_events(vec![
            event(datetime!(2021-01-01 00:00:00 UTC), 10_000, "A"),
            event(datetime!(2021-01-02 00:00:00 UTC), 120_000, "A"),
            event(datetime!(2021-01-03 00:00:00 UTC), 180_000, "B"),
        ]);
        let query = TrackQuery {
            identity: IdentityFilter {
                artist: Some(String::from("A")),
                ..IdentityFilter::default()
            },
            include_skipped: false,
            ..TrackQuery::default()
        };

        assert_eq!(count_tracks(&table, &query).expect("count"), 1);
        assert_eq!(
            listening_time(&table, &query).expect("time"),
            Duration::from_secs(120)
        );

        let everything = TrackQuery::default();
        assert_eq!(count_tracks(&table, &everything).expect("count"), 3);
    }

    proptest! {
        #[test]
        fn skip_partition_covers_every_event(
            plays in proptest::collection::vec(0u64..400_000, 0..64),
            threshold in 0u64..300,
        ) {
            let at = datetime!(2021-01-01 00:00:00 UTC);
            let table = HistoryTable::from_events(
                plays.iter().map(|ms| event(at, *ms, "A")).collect(),
            );
            let threshold = SkipThreshold::from_seconds(threshold);
            let (dropped, kept) = partition_skips(&table, threshold);
            prop_assert_eq!(dropped.len() + kept.len(), table.len());
            prop_assert_eq!(dropped.len(), skipped(&table, threshold).len());
        }

        #[test]
        fn date_filter_is_idempotent(
            offsets in proptest::collection::vec(0i64..1_000_000, 0..64),
            from in 0i64..1_000_000,
            span in 0i64..1_000_000,
        ) {
            let base = datetime!(2020-01-01 00:00:00 UTC);
            let table = HistoryTable::from_events(
                offsets
                    .iter()
                    .map(|offset| event(base + time::Duration::seconds(*offset), 1, "A"))
                    .collect(),
            );
            let range = DateRange::new(
                Some(base + time::Duration::seconds(from)),
                Some(base + time::Duration::seconds(from + span)),
            );
            let once = in_date_range(&table, range).expect("once");
            let twice = in_date_range(&once, range).expect("twice");
            prop_assert_eq!(once, twice);
        }
    }
}

use crate::error::{HistoryError, Result};
use crate::filter::{self, DateRange, SkipThreshold, TrackQuery};
use crate::model::PlayEvent;
use crate::table::HistoryTable;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::time::Duration;
use time::OffsetDateTime;

pub const DEFAULT_TOP_N: usize = 10;
pub const DEFAULT_BUCKET_DAYS: i64 = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Granularity {
    #[default]
    Track,
    Album,
    Artist,
}

impl Granularity {
    pub fn label(self) -> &'static str {
        match self {
            Self::Track => "songs",
            Self::Album => "albums",
            Self::Artist => "artists",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    Plays,
    #[default]
    ListenTime,
}

impl Metric {
    pub fn label(self) -> &'static str {
        match self {
            Self::Plays => "plays",
            Self::ListenTime => "listen",
        }
    }
}

/// Derived grouping identity. Fields not used by the granularity stay `None`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct GroupKey {
    pub track: Option<String>,
    pub artist: String,
    pub album: Option<String>,
}

impl GroupKey {
    /// `None` when the play lacks any of the fields the granularity groups by,
    /// which keeps podcasts and local files without tags out of rankings.
    pub fn for_event(event: &PlayEvent, granularity: Granularity) -> Option<Self> {
        let artist = event.artist_name.clone()?;
        match granularity {
            Granularity::Track => Some(Self {
                track: Some(event.track_name.clone()?),
                artist,
                album: Some(event.album_name.clone()?),
            }),
            Granularity::Album => Some(Self {
                track: None,
                artist,
                album: Some(event.album_name.clone()?),
            }),
            Granularity::Artist => Some(Self {
                track: None,
                artist,
                album: None,
            }),
        }
    }

    pub fn display_name(&self) -> String {
        match (&self.track, &self.album) {
            (Some(track), _) => format!("{track} - {}", self.artist),
            (None, Some(album)) => format!("{album} - {}", self.artist),
            (None, None) => self.artist.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RankedRow {
    pub key: GroupKey,
    pub play_count: u64,
    pub listen_ms: u64,
}

impl RankedRow {
    pub fn metric_value(&self, metric: Metric) -> u64 {
        match metric {
            Metric::Plays => self.play_count,
            Metric::ListenTime => self.listen_ms,
        }
    }

    pub fn listen_time(&self) -> Duration {
        Duration::from_millis(self.listen_ms)
    }
}

/// Per-group totals in first-seen order.
pub fn group_totals(table: &HistoryTable, granularity: Granularity) -> Vec<RankedRow> {
    let mut index_by_key: HashMap<GroupKey, usize> = HashMap::new();
    let mut rows: Vec<RankedRow> = Vec::new();

    for event in table {
        let Some(key) = GroupKey::for_event(event, granularity) else {
            continue;
        };
        let index = *index_by_key.entry(key.clone()).or_insert_with(|| {
            rows.push(RankedRow {
                key,
                play_count: 0,
                listen_ms: 0,
            });
            rows.len() - 1
        });
        let row = &mut rows[index];
        row.play_count = row.play_count.saturating_add(1);
        row.listen_ms = row.listen_ms.saturating_add(event.ms_played);
    }
    rows
}

/// The `n` biggest groups by `metric`, descending. Ties keep the order in
/// which the groups first appear in `table`.
pub fn top_groups(
    table: &HistoryTable,
    granularity: Granularity,
    metric: Metric,
    n: usize,
) -> Vec<RankedRow> {
    let mut rows = group_totals(table, granularity);
    rows.sort_by(|a, b| b.metric_value(metric).cmp(&a.metric_value(metric)));
    rows.truncate(n);
    rows
}

pub fn most_played_by_time(
    table: &HistoryTable,
    granularity: Granularity,
    n: usize,
) -> Vec<RankedRow> {
    top_groups(table, granularity, Metric::ListenTime, n)
}

pub fn most_played_by_count(
    table: &HistoryTable,
    granularity: Granularity,
    n: usize,
) -> Vec<RankedRow> {
    top_groups(table, granularity, Metric::Plays, n)
}

/// Top groups among plays made in incognito mode.
pub fn guilty_pleasures(
    table: &HistoryTable,
    granularity: Granularity,
    metric: Metric,
    n: usize,
) -> Vec<RankedRow> {
    top_groups(&filter::incognito_only(table), granularity, metric, n)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeriesPoint {
    pub start: OffsetDateTime,
    pub plays: u64,
    pub listen_ms: u64,
}

impl SeriesPoint {
    pub fn metric_value(&self, metric: Metric) -> u64 {
        match metric {
            Metric::Plays => self.plays,
            Metric::ListenTime => self.listen_ms,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeSeries {
    pub interval: time::Duration,
    pub points: Vec<SeriesPoint>,
}

impl TimeSeries {
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Bucket width for a day count taken from flags or settings.
pub fn interval_from_days(days: i64) -> Result<time::Duration> {
    const SECONDS_PER_DAY: i64 = 86_400;
    SECONDS_PER_DAY
        .checked_mul(days)
        .map(time::Duration::seconds)
        .ok_or(HistoryError::IntervalOverflow(days))
}

/// Walks `range` in back-to-back `[start, start + interval)` buckets from its
/// lower bound. A trailing stretch shorter than `interval` gets no bucket.
pub fn bucket_series(
    table: &HistoryTable,
    interval: time::Duration,
    range: DateRange,
) -> Result<TimeSeries> {
    if !interval.is_positive() {
        return Err(HistoryError::InvalidInterval(interval));
    }
    let Some((from, to)) = range.resolve(table)? else {
        return Ok(TimeSeries {
            interval,
            points: Vec::new(),
        });
    };

    let step = interval.whole_nanoseconds();
    let bucket_count = usize::try_from((to - from).whole_nanoseconds() / step).unwrap_or(0);
    let mut points: Vec<SeriesPoint> = Vec::with_capacity(bucket_count);
    let mut start = from;
    for _ in 0..bucket_count {
        points.push(SeriesPoint {
            start,
            plays: 0,
            listen_ms: 0,
        });
        start += interval;
    }

    for event in table {
        if event.timestamp < from || event.timestamp > to {
            continue;
        }
        let offset = (event.timestamp - from).whole_nanoseconds() / step;
        let Some(point) = usize::try_from(offset)
            .ok()
            .and_then(|index| points.get_mut(index))
        else {
            continue;
        };
        point.plays = point.plays.saturating_add(1);
        point.listen_ms = point.listen_ms.saturating_add(event.ms_played);
    }

    tracing::debug!(buckets = points.len(), "built time series");
    Ok(TimeSeries { interval, points })
}

/// How one song, album or artist did over time.
pub fn popularity_series(
    table: &HistoryTable,
    query: &TrackQuery,
    interval: time::Duration,
) -> Result<TimeSeries> {
    let selected = filter::select_tracks(table, query)?;
    bucket_series(&selected, interval, query.range)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistorySummary {
    pub total_plays: u64,
    pub skipped_plays: u64,
    pub total_listen_ms: u64,
    pub distinct_tracks: usize,
    pub distinct_artists: usize,
    pub first_play: Option<OffsetDateTime>,
    pub last_play: Option<OffsetDateTime>,
}

pub fn summarize(table: &HistoryTable, threshold: SkipThreshold) -> HistorySummary {
    let tracks: HashSet<GroupKey> = table
        .iter()
        .filter_map(|event| GroupKey::for_event(event, Granularity::Track))
        .collect();
    let artists: HashSet<&str> = table
        .iter()
        .filter_map(|event| event.artist_name.as_deref())
        .collect();

    HistorySummary {
        total_plays: table.len() as u64,
        skipped_plays: table
            .iter()
            .filter(|event| filter::is_skipped(event, threshold))
            .count() as u64,
        total_listen_ms: table.total_ms_played(),
        distinct_tracks: tracks.len(),
        distinct_artists: artists.len(),
        first_play: table.first_timestamp(),
        last_play: table.last_timestamp(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::BTreeMap;
    use time::macros::datetime;

    fn play(artist: &str, track: &str, ms_played: u64, at: OffsetDateTime) -> PlayEvent {
        PlayEvent {
            timestamp: at,
            ms_played,
            track_name: Some(track.to_string()),
            album_name: Some(format!("{artist} LP")),
            artist_name: Some(artist.to_string()),
            platform: String::from("Windows 10"),
            incognito_mode: false,
            columns: BTreeMap::new(),
        }
    }

    fn repeated(artist: &str, times: usize) -> Vec<PlayEvent> {
        let at = datetime!(2021-01-01 00:00:00 UTC);
        (0..times).map(|_| play(artist, "x", 1_000, at)).collect()
    }

    #[test]
    fn top_by_count_breaks_ties_by_first_seen() {
        let mut events = Vec::new();
        events.extend(repeated("B", 3));
        events.extend(repeated("A", 5));
        events.extend(repeated("C", 3));
        let table = HistoryTable::from_events(events);

        let top = most_played_by_count(&table, Granularity::Artist, 2);
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].key.artist, "A");
        assert_eq!(top[0].play_count, 5);
        assert_eq!(top[1].key.artist, "B");
    }

    #[test]
    fn top_by_time_sums_durations_per_group() {
        let at = datetime!(2021-01-01 00:00:00 UTC);
        let table = HistoryTable::from_events(vec![
            play("A", "one", 100_000, at),
            play("B", "two", 150_000, at),
            play("A", "one", 100_000, at),
        ]);

        let top = most_played_by_time(&table, Granularity::Track, 10);
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].key.display_name(), "one - A");
        assert_eq!(top[0].listen_time(), Duration::from_secs(200));
        assert_eq!(top[1].listen_ms, 150_000);
    }

    #[test]
    fn album_groups_are_scoped_by_artist() {
        let at = datetime!(2021-01-01 00:00:00 UTC);
        let mut shared = play("B", "t", 1, at);
        shared.album_name = Some(String::from("A LP"));
        let table = HistoryTable::from_events(vec![play("A", "t", 1, at), shared]);

        let rows = group_totals(&table, Granularity::Album);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].key.display_name(), "A LP - A");
    }

    #[test]
    fn plays_without_metadata_are_not_ranked() {
        let at = datetime!(2021-01-01 00:00:00 UTC);
        let mut podcast = play("A", "t", 1, at);
        podcast.track_name = None;
        podcast.artist_name = None;
        let table = HistoryTable::from_events(vec![podcast]);

        assert!(top_groups(&table, Granularity::Track, Metric::Plays, 5).is_empty());
        assert!(top_groups(&table, Granularity::Artist, Metric::Plays, 5).is_empty());
    }

    #[test]
    fn guilty_pleasures_only_see_incognito_plays() {
        let at = datetime!(2021-01-01 00:00:00 UTC);
        let mut secret = play("Secret", "s", 10, at);
        secret.incognito_mode = true;
        let table = HistoryTable::from_events(vec![
            play("Loud", "l", 1_000_000, at),
            secret,
        ]);

        let rows = guilty_pleasures(&table, Granularity::Artist, Metric::ListenTime, 10);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].key.artist, "Secret");
    }

    #[test]
    fn empty_table_gives_empty_results() {
        let table = HistoryTable::default();
        assert!(top_groups(&table, Granularity::Track, Metric::ListenTime, 3).is_empty());
        let series = bucket_series(&table, time::Duration::weeks(1), DateRange::ALL)
            .expect("series");
        assert!(series.is_empty());
    }

    #[test]
    fn exact_intervals_give_exact_buckets() {
        let start = datetime!(2021-01-01 00:00:00 UTC);
        let table = HistoryTable::from_events(vec![
            play("A", "a", 1_000, start),
            play("A", "a", 2_000, start + time::Duration::days(8)),
            play("A", "a", 4_000, start + time::Duration::days(21)),
        ]);

        let series = bucket_series(&table, time::Duration::weeks(1), DateRange::ALL)
            .expect("series");
        assert_eq!(series.points.len(), 3);
        assert_eq!(series.points[0].start, start);
        assert_eq!(series.points[1].start, start + time::Duration::weeks(1));
        assert_eq!(series.points[0].plays, 1);
        assert_eq!(series.points[1].listen_ms, 2_000);
        // The last play sits exactly on the closing edge of the final bucket.
        assert_eq!(series.points[2].plays, 0);
    }

    #[test]
    fn trailing_partial_bucket_is_dropped() {
        let start = datetime!(2021-01-01 00:00:00 UTC);
        let table = HistoryTable::from_events(vec![
            play("A", "a", 1_000, start),
            play("A", "a", 1_000, start + time::Duration::days(17)),
        ]);

        let series = bucket_series(&table, time::Duration::weeks(1), DateRange::ALL)
            .expect("series");
        assert_eq!(series.points.len(), 2);
        assert_eq!(series.points.iter().map(|point| point.plays).sum::<u64>(), 1);
    }

    #[test]
    fn open_range_starting_after_the_data_is_empty() {
        let table = HistoryTable::from_events(vec![
            play("A", "a", 1_000, datetime!(2021-01-01 00:00:00 UTC)),
            play("A", "a", 1_000, datetime!(2021-01-11 00:00:00 UTC)),
        ]);
        let range = DateRange::new(Some(datetime!(2022-01-01 00:00:00 UTC)), None);

        let series = bucket_series(&table, time::Duration::days(1), range).expect("series");
        assert!(series.is_empty());
    }

    #[test]
    fn day_counts_convert_to_intervals() {
        assert_eq!(interval_from_days(7).expect("week"), time::Duration::weeks(1));
        assert_eq!(interval_from_days(0).expect("zero"), time::Duration::ZERO);
        assert!(matches!(
            interval_from_days(200_000_000_000_000),
            Err(HistoryError::IntervalOverflow(200_000_000_000_000))
        ));
        assert!(matches!(
            interval_from_days(i64::MIN),
            Err(HistoryError::IntervalOverflow(_))
        ));
    }

    #[test]
    fn rejects_non_positive_interval() {
        let table = HistoryTable::default();
        assert!(matches!(
            bucket_series(&table, time::Duration::ZERO, DateRange::ALL),
            Err(HistoryError::InvalidInterval(_))
        ));
    }

    #[test]
    fn popularity_follows_one_artist() {
        let start = datetime!(2021-01-01 00:00:00 UTC);
        let table = HistoryTable::from_events(vec![
            play("A", "a", 90_000, start),
            play("B", "b", 90_000, start + time::Duration::days(1)),
            play("A", "a", 90_000, start + time::Duration::days(2)),
            play("A", "a", 90_000, start + time::Duration::days(3)),
        ]);
        let query = TrackQuery {
            identity: filter::IdentityFilter {
                artist: Some(String::from("A")),
                ..filter::IdentityFilter::default()
            },
            ..TrackQuery::default()
        };

        let series = popularity_series(&table, &query, time::Duration::days(1)).expect("series");
        assert_eq!(
            series
                .points
                .iter()
                .map(|point| point.plays)
                .collect::<Vec<_>>(),
            vec![1, 0, 1]
        );
    }

    #[test]
    fn summary_counts_skips_and_distinct_items() {
        let at = datetime!(2021-01-01 00:00:00 UTC);
        let table = HistoryTable::from_events(vec![
            play("A", "one", 10_000, at),
            play("A", "one", 90_000, at),
            play("B", "two", 90_000, at),
        ]);

        let summary = summarize(&table, SkipThreshold::default());
        assert_eq!(summary.total_plays, 3);
        assert_eq!(summary.skipped_plays, 1);
        assert_eq!(summary.total_listen_ms, 190_000);
        assert_eq!(summary.distinct_tracks, 2);
        assert_eq!(summary.distinct_artists, 2);
    }

    proptest::proptest! {
        #[test]
        fn top_n_is_bounded_and_descending(
            picks in proptest::collection::vec((0usize..6, 0u64..300_000), 0..80),
            n in 0usize..10,
            by_plays in any::<bool>(),
        ) {
            let at = datetime!(2021-01-01 00:00:00 UTC);
            let events: Vec<PlayEvent> = picks
                .iter()
                .map(|(artist, ms)| play(&format!("artist{artist}"), "t", *ms, at))
                .collect();
            let table = HistoryTable::from_events(events);
            let metric = if by_plays { Metric::Plays } else { Metric::ListenTime };

            let distinct = group_totals(&table, Granularity::Artist).len();
            let top = top_groups(&table, Granularity::Artist, metric, n);
            prop_assert_eq!(top.len(), n.min(distinct));
            for pair in top.windows(2) {
                prop_assert!(pair[0].metric_value(metric) >= pair[1].metric_value(metric));
            }
        }

        #[test]
        fn bucket_count_matches_whole_intervals(weeks in 0i64..20, extra_hours in 0i64..167) {
            let start = datetime!(2021-01-01 00:00:00 UTC);
            let end = start + time::Duration::weeks(weeks) + time::Duration::hours(extra_hours);
            let table = HistoryTable::from_events(vec![
                play("A", "a", 1, start),
                play("A", "a", 1, end),
            ]);
            let series = bucket_series(&table, time::Duration::weeks(1), DateRange::ALL)
                .expect("series");
            prop_assert_eq!(series.points.len() as i64, weeks);
        }
    }
}

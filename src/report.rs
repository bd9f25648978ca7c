use crate::devices::DeviceShare;
use crate::model;
use crate::stats::{Granularity, HistorySummary, Metric, RankedRow, TimeSeries};
use serde_json::{Value, json};
use std::fmt;
use std::time::Duration;

/// A finished aggregate, ready to print or chart.
#[derive(Debug, Clone, PartialEq)]
pub enum Report {
    Summary(HistorySummary),
    Count {
        title: String,
        plays: usize,
    },
    ListenTime {
        title: String,
        total: Duration,
    },
    Ranking {
        title: String,
        granularity: Granularity,
        metric: Metric,
        rows: Vec<RankedRow>,
    },
    Series {
        title: String,
        metric: Metric,
        series: TimeSeries,
    },
    Devices(DeviceShare),
}

impl Report {
    pub fn title(&self) -> String {
        match self {
            Self::Summary(_) => String::from("Listening summary"),
            Self::Count { title, .. }
            | Self::ListenTime { title, .. }
            | Self::Ranking { title, .. }
            | Self::Series { title, .. } => title.clone(),
            Self::Devices(share) => format!("Devices by {}", share.metric.label()),
        }
    }

    /// Whether the terminal viewer has something to draw for this report.
    pub fn has_chart(&self) -> bool {
        matches!(
            self,
            Self::Ranking { .. } | Self::Series { .. } | Self::Devices(_)
        )
    }

    pub fn to_json(&self) -> Value {
        match self {
            Self::Summary(summary) => json!({
                "total_plays": summary.total_plays,
                "skipped_plays": summary.skipped_plays,
                "total_listen_ms": summary.total_listen_ms,
                "distinct_tracks": summary.distinct_tracks,
                "distinct_artists": summary.distinct_artists,
                "first_play": summary.first_play.map(model::format_timestamp),
                "last_play": summary.last_play.map(model::format_timestamp),
            }),
            Self::Count { title, plays } => json!({ "title": title, "plays": plays }),
            Self::ListenTime { title, total } => json!({
                "title": title,
                "listen_ms": u64::try_from(total.as_millis()).unwrap_or(u64::MAX),
            }),
            Self::Ranking {
                title,
                granularity,
                metric,
                rows,
            } => json!({
                "title": title,
                "granularity": granularity,
                "metric": metric,
                "rows": rows,
            }),
            Self::Series {
                title,
                metric,
                series,
            } => json!({
                "title": title,
                "metric": metric,
                "interval_seconds": series.interval.whole_seconds(),
                "points": series
                    .points
                    .iter()
                    .map(|point| json!({
                        "start": model::format_timestamp(point.start),
                        "plays": point.plays,
                        "listen_ms": point.listen_ms,
                    }))
                    .collect::<Vec<_>>(),
            }),
            Self::Devices(share) => json!(share),
        }
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.title())?;

        match self {
            Report::Summary(summary) => {
                writeln!(f, "  plays            {}", summary.total_plays)?;
                writeln!(f, "  skipped          {}", summary.skipped_plays)?;
                writeln!(
                    f,
                    "  listening time   {}",
                    format_listen_ms(summary.total_listen_ms)
                )?;
                writeln!(f, "  distinct songs   {}", summary.distinct_tracks)?;
                writeln!(f, "  distinct artists {}", summary.distinct_artists)?;
                if let (Some(first), Some(last)) = (summary.first_play, summary.last_play) {
                    writeln!(
                        f,
                        "  span             {} .. {}",
                        model::format_date(first),
                        model::format_date(last)
                    )?;
                }
            }
            Report::Count { plays, .. } => writeln!(f, "  {plays} plays")?,
            Report::ListenTime { total, .. } => {
                let millis = u64::try_from(total.as_millis()).unwrap_or(u64::MAX);
                writeln!(f, "  {}", format_listen_ms(millis))?;
            }
            Report::Ranking { metric, rows, .. } => {
                if rows.is_empty() {
                    writeln!(f, "  (no plays)")?;
                }
                for (rank, row) in rows.iter().enumerate() {
                    writeln!(
                        f,
                        "  {:>3}. {}  {}",
                        rank + 1,
                        row.key.display_name(),
                        format_metric(*metric, row.metric_value(*metric))
                    )?;
                }
            }
            Report::Series { metric, series, .. } => {
                if series.is_empty() {
                    writeln!(f, "  (no complete buckets)")?;
                }
                for point in &series.points {
                    writeln!(
                        f,
                        "  {}  {}",
                        model::format_date(point.start),
                        format_metric(*metric, point.metric_value(*metric))
                    )?;
                }
            }
            Report::Devices(share) => {
                writeln!(f, "  Smartphone {:>6.2}%", share.smartphone_percent)?;
                writeln!(f, "  PC         {:>6.2}%", share.pc_percent)?;
                if share.unclassified_plays > 0 {
                    writeln!(
                        f,
                        "  ({} plays on other devices not counted)",
                        share.unclassified_plays
                    )?;
                }
            }
        }
        Ok(())
    }
}

pub fn render_text(report: &Report) -> String {
    report.to_string()
}

pub fn format_metric(metric: Metric, value: u64) -> String {
    match metric {
        Metric::Plays => format!("{value} plays"),
        Metric::ListenTime => format_listen_ms(value),
    }
}

pub fn format_listen_ms(millis: u64) -> String {
    let total_minutes = millis / 60_000;
    let hours = total_minutes / 60;
    let minutes = total_minutes % 60;
    format!("{hours}h {minutes:02}m")
}

use crate::cli::{ByArg, Cli, Command};
use crate::config::{self, AnalysisSettings};
use crate::devices;
use crate::filter::{self, DateRange, IdentityFilter, SkipThreshold, TrackQuery};
use crate::loader;
use crate::model;
use crate::report::{self, Report};
use crate::stats::{self, Granularity, Metric};
use crate::table::HistoryTable;
use anyhow::{Context, Result};
use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use std::io::stdout;
use std::path::PathBuf;
use std::time::Duration;

/// Settings for one analysis after merging the config file with CLI flags.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisOptions {
    pub data_dir: PathBuf,
    pub file_prefix: String,
    pub range: DateRange,
    pub threshold: SkipThreshold,
    pub skip_override: Option<bool>,
    pub bucket_interval: time::Duration,
    pub top_n: usize,
}

impl AnalysisOptions {
    pub fn resolve(cli: &Cli, settings: &AnalysisSettings) -> Result<Self> {
        let from = cli
            .from
            .as_deref()
            .map(|text| model::parse_date_bound(text, false))
            .transpose()
            .context("invalid --from date")?;
        let to = cli
            .to
            .as_deref()
            .map(|text| model::parse_date_bound(text, true))
            .transpose()
            .context("invalid --to date")?;

        Ok(Self {
            data_dir: cli
                .dir
                .clone()
                .unwrap_or_else(|| settings.data_dir.clone()),
            file_prefix: cli
                .prefix
                .clone()
                .unwrap_or_else(|| settings.file_prefix.clone()),
            range: DateRange::new(from, to),
            threshold: cli
                .threshold_secs
                .map(SkipThreshold::from_seconds)
                .unwrap_or_else(|| settings.skip_threshold()),
            skip_override: cli.skip_override(),
            bucket_interval: settings
                .bucket_interval()
                .context("invalid bucket_days in settings")?,
            top_n: settings.top_n,
        })
    }

    fn track_query(&self, command: &Command, identity: IdentityFilter) -> TrackQuery {
        TrackQuery {
            identity,
            range: self.range,
            include_skipped: self
                .skip_override
                .unwrap_or_else(|| command.includes_skipped_by_default()),
            threshold: self.threshold,
        }
    }

    /// `--days` when given, otherwise the configured bucket width.
    fn interval(&self, days: Option<i64>) -> crate::Result<time::Duration> {
        match days {
            Some(days) => stats::interval_from_days(days),
            None => Ok(self.bucket_interval),
        }
    }
}

pub fn run(cli: Cli) -> Result<()> {
    let settings = config::load_settings()?;
    let options = AnalysisOptions::resolve(&cli, &settings)?;

    let table = loader::load_table(
        &options.data_dir,
        &options.file_prefix,
        cli.sort.map(Into::into),
    )
    .with_context(|| {
        format!(
            "failed to load listening history from {}",
            options.data_dir.display()
        )
    })?;

    let report = build_report(&table, &cli.command, &options)?;

    if cli.chart && report.has_chart() {
        return show_report(&report);
    }
    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report.to_json())?);
    } else {
        print!("{}", report::render_text(&report));
    }
    Ok(())
}

/// Runs one command against an already loaded table.
pub fn build_report(
    table: &HistoryTable,
    command: &Command,
    options: &AnalysisOptions,
) -> crate::Result<Report> {
    let report = match command {
        Command::Summary => {
            let selected = filter::in_date_range(table, options.range)?;
            Report::Summary(stats::summarize(&selected, options.threshold))
        }
        Command::Count { identity } => {
            let query = options.track_query(command, identity.clone().into());
            Report::Count {
                title: describe("Plays", &query.identity),
                plays: filter::count_tracks(table, &query)?,
            }
        }
        Command::Time { identity } => {
            let query = options.track_query(command, identity.clone().into());
            Report::ListenTime {
                title: describe("Listening time", &query.identity),
                total: filter::listening_time(table, &query)?,
            }
        }
        Command::Top { ranking, identity } => {
            let query = options.track_query(command, identity.clone().into());
            let selected = filter::select_tracks(table, &query)?;
            let granularity = Granularity::from(ranking.thing);
            let metric = Metric::from(ranking.by);
            Report::Ranking {
                title: format!("Top {} by {}", granularity.label(), metric.label()),
                granularity,
                metric,
                rows: stats::top_groups(
                    &selected,
                    granularity,
                    metric,
                    ranking.n.unwrap_or(options.top_n),
                ),
            }
        }
        Command::Series { days, by } => {
            let query = options.track_query(command, IdentityFilter::default());
            let selected = filter::select_tracks(table, &query)?;
            let interval = options.interval(*days)?;
            Report::Series {
                title: series_title(*by, interval),
                metric: Metric::from(*by),
                series: stats::bucket_series(&selected, interval, options.range)?,
            }
        }
        Command::Popularity { days, by, identity } => {
            let query = options.track_query(command, identity.clone().into());
            let interval = options.interval(*days)?;
            Report::Series {
                title: describe(&series_title(*by, interval), &query.identity),
                metric: Metric::from(*by),
                series: stats::popularity_series(table, &query, interval)?,
            }
        }
        Command::Devices { by } => {
            let query = options.track_query(command, IdentityFilter::default());
            let selected = filter::select_tracks(table, &query)?;
            Report::Devices(devices::device_share(&selected, Metric::from(*by))?)
        }
        Command::Guilty { ranking } => {
            let query = options.track_query(command, IdentityFilter::default());
            let selected = filter::select_tracks(table, &query)?;
            let granularity = Granularity::from(ranking.thing);
            let metric = Metric::from(ranking.by);
            Report::Ranking {
                title: format!(
                    "Guilty pleasures: {} by {}",
                    granularity.label(),
                    metric.label()
                ),
                granularity,
                metric,
                rows: stats::guilty_pleasures(
                    &selected,
                    granularity,
                    metric,
                    ranking.n.unwrap_or(options.top_n),
                ),
            }
        }
    };
    tracing::info!(report = %report.title(), "report ready");
    Ok(report)
}

fn series_title(by: ByArg, interval: time::Duration) -> String {
    let what = match by {
        ByArg::Time => "Listening time",
        ByArg::Count => "Plays",
    };
    format!("{what} per {} days", interval.whole_days())
}

fn describe(what: &str, identity: &IdentityFilter) -> String {
    let parts: Vec<&str> = [
        identity.track.as_deref(),
        identity.album.as_deref(),
        identity.artist.as_deref(),
    ]
    .into_iter()
    .flatten()
    .collect();
    if parts.is_empty() {
        String::from(what)
    } else {
        format!("{what}: {}", parts.join(" / "))
    }
}

/// Shows `report` full screen until the user closes it.
pub fn show_report(report: &Report) -> Result<()> {
    enable_raw_mode()?;
    let mut out = stdout();
    execute!(out, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(out);
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;

    let result: Result<()> = loop {
        if let Err(err) = terminal.draw(|frame| crate::ui::draw_report(frame, report)) {
            break Err(err.into());
        }

        match event::poll(Duration::from_millis(250)) {
            Ok(false) => continue,
            Ok(true) => {}
            Err(err) => break Err(err.into()),
        }
        let event = match event::read() {
            Ok(event) => event,
            Err(err) => break Err(err.into()),
        };
        let Event::Key(key) = event else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }
        match key.code {
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => break Ok(()),
            KeyCode::Char('q') | KeyCode::Esc => break Ok(()),
            _ => {}
        }
    };

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    result
}

use crate::filter::IdentityFilter;
use crate::model::SortColumn;
use crate::stats::{Granularity, Metric};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(author, version, about = "Summaries of exported streaming history", long_about = None)]
pub struct Cli {
    /// Directory holding the endsong_<N>.json export files
    #[arg(short, long, global = true)]
    pub dir: Option<PathBuf>,

    /// File name prefix of the export files
    #[arg(long, global = true)]
    pub prefix: Option<String>,

    /// Start of the date range (YYYY-MM-DD or YYYY-MM-DDTHH:MM:SSZ), inclusive
    #[arg(long, global = true)]
    pub from: Option<String>,

    /// End of the date range (YYYY-MM-DD or YYYY-MM-DDTHH:MM:SSZ), inclusive
    #[arg(long, global = true)]
    pub to: Option<String>,

    /// Plays shorter than this many seconds count as skipped
    #[arg(long, global = true)]
    pub threshold_secs: Option<u64>,

    /// Count skipped plays even where the command leaves them out by default
    #[arg(long, global = true, conflicts_with = "exclude_skipped")]
    pub include_skipped: bool,

    /// Leave skipped plays out even where the command counts them by default
    #[arg(long, global = true)]
    pub exclude_skipped: bool,

    /// Sort the loaded history before analysis
    #[arg(long, global = true, value_enum)]
    pub sort: Option<SortArg>,

    /// Print the result as JSON
    #[arg(long, global = true, conflicts_with = "chart")]
    pub json: bool,

    /// Show the result as a terminal chart
    #[arg(long, global = true)]
    pub chart: bool,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// `None` when neither skip flag was given.
    pub fn skip_override(&self) -> Option<bool> {
        if self.include_skipped {
            Some(true)
        } else if self.exclude_skipped {
            Some(false)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Totals over the whole range
    Summary,
    /// Number of plays matching the filters
    Count {
        #[command(flatten)]
        identity: IdentityArgs,
    },
    /// Listening time of plays matching the filters
    Time {
        #[command(flatten)]
        identity: IdentityArgs,
    },
    /// Most played songs, albums or artists
    Top {
        #[command(flatten)]
        ranking: RankingArgs,
        #[command(flatten)]
        identity: IdentityArgs,
    },
    /// Plays or listening time per fixed interval
    Series {
        /// Bucket width in days
        #[arg(long)]
        days: Option<i64>,
        #[arg(long, value_enum, default_value_t = ByArg::Time)]
        by: ByArg,
    },
    /// How one song, album or artist did over time
    Popularity {
        /// Bucket width in days
        #[arg(long)]
        days: Option<i64>,
        #[arg(long, value_enum, default_value_t = ByArg::Time)]
        by: ByArg,
        #[command(flatten)]
        identity: IdentityArgs,
    },
    /// Smartphone vs PC share
    Devices {
        #[arg(long, value_enum, default_value_t = ByArg::Time)]
        by: ByArg,
    },
    /// Most played items in incognito sessions
    Guilty {
        #[command(flatten)]
        ranking: RankingArgs,
    },
}

impl Command {
    /// Whether skipped plays count when no skip flag is given.
    pub fn includes_skipped_by_default(&self) -> bool {
        match self {
            Self::Summary | Self::Count { .. } | Self::Time { .. } => true,
            Self::Top { ranking, .. } => ranking.by == ByArg::Time,
            Self::Series { by, .. } => *by == ByArg::Count,
            Self::Popularity { .. } | Self::Devices { .. } | Self::Guilty { .. } => false,
        }
    }
}

#[derive(Debug, Clone, Default, Args)]
pub struct IdentityArgs {
    /// Exact song title
    #[arg(long)]
    pub track: Option<String>,
    /// Exact artist name
    #[arg(long)]
    pub artist: Option<String>,
    /// Exact album name
    #[arg(long)]
    pub album: Option<String>,
}

impl From<IdentityArgs> for IdentityFilter {
    fn from(args: IdentityArgs) -> Self {
        Self {
            track: args.track,
            artist: args.artist,
            album: args.album,
        }
    }
}

#[derive(Debug, Clone, Args)]
pub struct RankingArgs {
    /// How many rows to show
    #[arg(short = 'n', long = "limit")]
    pub n: Option<usize>,
    #[arg(long, value_enum, default_value_t = ThingArg::Song)]
    pub thing: ThingArg,
    #[arg(long, value_enum, default_value_t = ByArg::Time)]
    pub by: ByArg,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ThingArg {
    Song,
    Album,
    Artist,
}

impl From<ThingArg> for Granularity {
    fn from(arg: ThingArg) -> Self {
        match arg {
            ThingArg::Song => Self::Track,
            ThingArg::Album => Self::Album,
            ThingArg::Artist => Self::Artist,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ByArg {
    /// Summed listening time
    Time,
    /// Number of plays
    Count,
}

impl From<ByArg> for Metric {
    fn from(arg: ByArg) -> Self {
        match arg {
            ByArg::Time => Self::ListenTime,
            ByArg::Count => Self::Plays,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SortArg {
    Ts,
    MsPlayed,
    Track,
    Artist,
    Album,
    Platform,
}

impl From<SortArg> for SortColumn {
    fn from(arg: SortArg) -> Self {
        match arg {
            SortArg::Ts => Self::Timestamp,
            SortArg::MsPlayed => Self::MsPlayed,
            SortArg::Track => Self::Track,
            SortArg::Artist => Self::Artist,
            SortArg::Album => Self::Album,
            SortArg::Platform => Self::Platform,
        }
    }
}

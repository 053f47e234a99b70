use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::pipeline::Series;

/// Scrape critic and audience ratings for TV series.
///
/// Series come from repeated `--series "Title=Year"` arguments and/or a JSON
/// file of `{"title": ..., "year": ...}` objects. Results are printed to stdout
/// as JSON.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// A series to look up, as `Title=Year` (repeatable)
    #[arg(short, long = "series", value_name = "TITLE=YEAR")]
    pub series: Vec<Series>,

    /// JSON file containing an array of `{ "title", "year" }` objects
    #[arg(short, long, value_name = "FILE")]
    pub input: Option<PathBuf>,

    /// Which rating sites to scrape
    #[arg(long, value_enum, default_value_t = SourceSelection::All)]
    pub source: SourceSelection,

    /// Log output format
    #[arg(long, value_enum, default_value_t = default_tracing_format())]
    pub tracing: TracingFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SourceSelection {
    Metacritic,
    RottenTomatoes,
    All,
}

impl SourceSelection {
    pub fn metacritic(self) -> bool {
        matches!(self, Self::Metacritic | Self::All)
    }

    pub fn rotten_tomatoes(self) -> bool {
        matches!(self, Self::RottenTomatoes | Self::All)
    }
}

/// Output format for tracing logs
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TracingFormat {
    /// Human-readable compact format
    Pretty,
    /// Structured JSON, one event per line
    Json,
}

/// Pretty in debug builds, JSON in release builds.
fn default_tracing_format() -> TracingFormat {
    if cfg!(debug_assertions) {
        TracingFormat::Pretty
    } else {
        TracingFormat::Json
    }
}

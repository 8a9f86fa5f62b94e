// CLI configuration
use audiotag::ParseOptions;
use clap::{Parser, Subcommand, ValueEnum};

/// audiotag - Audio metadata CLI tool
#[derive(Parser, Debug)]
#[command(name = "audiotag")]
#[command(about = "Read metadata from ID3, OGG, FLAC and MPEG audio files", long_about = None)]
#[command(version)]
pub struct Config {
    /// Output format
    #[arg(short, long, value_enum, default_value = "pretty")]
    pub format: OutputFormat,

    /// Quiet mode (suppress progress messages)
    #[arg(short, long)]
    pub quiet: bool,

    /// Verbose mode (debug logging)
    #[arg(short, long)]
    pub verbose: bool,

    /// Leave embedded pictures out of the result
    #[arg(long)]
    pub skip_covers: bool,

    /// Subcommand
    #[command(subcommand)]
    pub command: Commands,
}

/// Output format for metadata
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Pretty-printed JSON
    #[default]
    Pretty,
    /// Compact JSON
    Json,
    /// Key-value pairs
    KeyValue,
    /// Table format
    Table,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Read metadata from audio file(s)
    Read {
        /// Audio file path(s); glob patterns are expanded
        #[arg(value_name = "FILE", required = true)]
        files: Vec<String>,

        /// Metadata fields to display (comma-separated)
        #[arg(long)]
        fields: Option<String>,

        /// Output to file instead of stdout
        #[arg(short, long)]
        output: Option<String>,
    },

    /// Detect file format
    Detect {
        /// Audio file path(s); glob patterns are expanded
        #[arg(value_name = "FILE", required = true)]
        files: Vec<String>,
    },
}

impl Config {
    /// Parse options for one file
    pub fn parse_options(&self) -> ParseOptions {
        ParseOptions {
            skip_covers: self.skip_covers,
            ..Default::default()
        }
    }
}

/// Split a comma-separated field list
pub fn parse_fields(fields: Option<&str>) -> Option<Vec<String>> {
    let fields: Vec<String> = fields?
        .split(',')
        .map(|field| field.trim().to_string())
        .filter(|field| !field.is_empty())
        .collect();
    (!fields.is_empty()).then_some(fields)
}

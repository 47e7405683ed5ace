//! CLI commands and argument parsing

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// ZeroEventHub feed server and client
#[derive(Parser, Debug)]
#[command(name = "zeroeventhub")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Configuration file (YAML or JSON)
    #[arg(short = 'C', long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Serve an NDJSON file of events as a feed
    Serve {
        /// Events file, one `{"partition", "headers", "data"}` object per line
        #[arg(short, long)]
        file: PathBuf,

        /// Port to listen on
        #[arg(short, long)]
        port: Option<u16>,

        /// Route of the feed endpoint
        #[arg(long)]
        path: Option<String>,

        /// Number of partitions the feed has
        #[arg(short = 'n', long)]
        partitions: Option<usize>,

        /// Events per partition when the client sends no hint
        #[arg(long)]
        page_size: Option<usize>,

        /// Report the end of each partition as final
        #[arg(long)]
        seal: bool,

        /// Pull partitions concurrently
        #[arg(long)]
        concurrent: bool,
    },

    /// Follow a feed and print its events as NDJSON
    Fetch {
        /// Feed endpoint URL
        #[arg(short, long)]
        url: Option<String>,

        /// Number of partitions the feed has
        #[arg(short = 'n', long)]
        partition_count: Option<usize>,

        /// Partitions to follow (comma-separated, empty = all)
        #[arg(long, value_delimiter = ',')]
        partitions: Vec<u32>,

        /// Cursor table file
        #[arg(short, long)]
        state: Option<PathBuf>,

        /// Headers to request (comma-separated, `_all` for every header)
        #[arg(long)]
        headers: Option<String>,

        /// Page size hint
        #[arg(long)]
        page_size_hint: Option<usize>,

        /// Keep polling with backoff instead of stopping at the first empty page
        #[arg(long)]
        follow: bool,
    },

    /// Print the persisted cursor table
    Cursors {
        /// Cursor table file
        #[arg(short, long)]
        state: Option<PathBuf>,
    },
}

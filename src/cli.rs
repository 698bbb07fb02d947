//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Download, store and manage videos for the TV media player.
///
/// Videos are kept under `<root>/videos`; the library listing is always read
/// back from that directory.
#[derive(Parser, Debug)]
#[command(name = "mediadock")]
#[command(author, version, about)]
pub struct Args {
    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Storage root holding the videos directory (overrides config file)
    #[arg(long, global = true, value_name = "DIR")]
    pub root: Option<PathBuf>,

    /// Transfer deadline in seconds (1-3600, overrides config file)
    #[arg(short = 't', long, global = true, value_parser = clap::value_parser!(u64).range(1..=3600))]
    pub timeout: Option<u64>,

    #[command(subcommand)]
    pub command: Command,
}

/// Library operations.
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Download a video into the library (mp4, avi, mkv, webm, mov)
    Download {
        /// http(s) URL of the video
        url: String,
    },
    /// List library entries
    List {
        /// Print entries as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete one entry by file name or storage path
    Delete {
        /// File name (`clip_1700000000000.mp4`) or path (`videos/clip_1700000000000.mp4`)
        name: String,
    },
    /// Delete every entry, skipping any that fail
    Clear,
}

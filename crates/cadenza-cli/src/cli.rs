//! Command-line argument parsing for Cadenza.

use std::path::PathBuf;

use clap::Parser;


/// Cadenza - a terminal playlist player.
#[derive( Parser, Debug )]
#[command( name = "cadenza" )]
#[command( version, about, long_about = None )]
pub struct Args {
    /// JSON player manifest (sources, loop flag, title flag, volume).
    #[arg( short, long )]
    pub manifest: Option<PathBuf>,

    /// Replay the current track when it ends.
    #[arg( short, long = "loop" )]
    pub loop_track: bool,

    /// Leave the terminal title alone.
    #[arg( long )]
    pub no_title: bool,

    /// Initial volume, 0.0 to 1.0.
    #[arg( short, long )]
    pub volume: Option<f64>,

    /// Audio files, directories or M3U playlists to queue.
    #[arg( trailing_var_arg = true )]
    pub files: Vec<PathBuf>,
}

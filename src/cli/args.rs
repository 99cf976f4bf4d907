use clap::{Parser, ValueEnum};
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Naming {
    /// sequence-YYYYMMDD-HHMMSS-mmm.gif
    Timestamp,
    /// sequence-<sha256 prefix>.gif
    Hash,
}

#[derive(Debug, Parser)]
#[command(name = "sprite-pixelizer", version, about = "Pixelize images and animate sprite sheets")]
pub struct CliArgs {
    /// Input image(s)
    #[arg(required = true)]
    pub inputs: Vec<PathBuf>,

    /// Output file (single input) or directory (several inputs)
    #[arg(short, long)]
    pub output: PathBuf,

    /// JSON settings file; flags below override its values
    #[arg(long)]
    pub settings: Option<PathBuf>,

    /// Pixel size (1-16)
    #[arg(long)]
    pub pixel_size: Option<u32>,

    /// Background keying tolerance per channel (0-128, 0 disables keying)
    #[arg(long)]
    pub tolerance: Option<u32>,

    /// Scale back up to the original resolution
    #[arg(long, default_value_t = false)]
    pub keep_resolution: bool,

    /// Split the result into sprites and write an animated sequence
    #[arg(long, default_value_t = false)]
    pub sequence: bool,

    /// Animation framerate (1-300)
    #[arg(long)]
    pub framerate: Option<u32>,

    /// Max top difference between consecutive sprites in one row
    #[arg(long)]
    pub row_threshold: Option<u32>,

    /// Directory for animated sequences (defaults to the output's directory)
    #[arg(long)]
    pub artifact_dir: Option<PathBuf>,

    /// How sequence files are named
    #[arg(long, value_enum, default_value_t = Naming::Timestamp)]
    pub naming: Naming,

    /// Write a JSON frame description next to each sequence
    #[arg(long, default_value_t = false)]
    pub sidecar: bool,

    /// Save the first frame of the sequence as the output image
    #[arg(long, default_value_t = false)]
    pub reload: bool,

    /// Print one JSON report per input on stdout
    #[arg(long, default_value_t = false)]
    pub json: bool,

    /// Debug logging
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

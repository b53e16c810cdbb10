use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use ivgal::settings::CarouselOptions;

pub const HELP_KEYS: &str = "\
Gallery:
  Click         : Open image in viewer
  Wheel         : Scroll

Viewer:
  Esc           : Close viewer
  Left / Right  : Previous / next image (wraps)
  + / = / -     : Zoom in / out
  Wheel         : Zoom at cursor
  Double-click  : Toggle jump zoom
  Drag          : Pan (when zoomed) or swipe (when not)
  r / R         : Rotate 90 deg CW / CCW
  0             : Reset zoom and rotation

Carousel:
  Left / Right  : Previous / next image
  Drag / swipe  : Change image
  Click         : Open image in viewer

  ?             : Toggle this help
";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StartMode {
    Gallery,
    Viewer,
    Carousel,
}

#[derive(Parser)]
#[command(name = "ivgal", about = "Image gallery, viewer and carousel", after_help = HELP_KEYS)]
pub struct Cli {
    /// Files or directories to show
    #[arg(required_unless_present_any = ["file_list", "manifest"])]
    pub paths: Vec<PathBuf>,

    /// Load file list from a text file (one path per line)
    #[arg(short = 'L', long, value_name = "FILE")]
    pub file_list: Option<PathBuf>,

    /// TOML manifest with [[image]] entries (titles, alt text, overlays)
    #[arg(long, value_name = "FILE")]
    pub manifest: Option<PathBuf>,

    /// Recurse into subdirectories
    #[arg(short, long)]
    pub recursive: bool,

    /// Follow symbolic links (default: false)
    #[arg(long)]
    pub follow_links: bool,

    /// Viewer settings file (TOML)
    #[arg(short = 'c', long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Which surface to start in
    #[arg(long, value_enum, default_value = "gallery")]
    pub mode: StartMode,

    /// Image shown first in viewer and carousel mode
    #[arg(long, default_value = "0")]
    pub initial_index: usize,

    /// Carousel track height in pixels
    #[arg(long, default_value = "300")]
    pub carousel_height: u32,

    /// Hide the carousel dot indicators
    #[arg(long)]
    pub no_indicators: bool,

    /// Hide the carousel arrows
    #[arg(long)]
    pub no_arrows: bool,

    /// Carousel images decoded on each side of the current one
    #[arg(long, default_value = "1")]
    pub preload: usize,

    /// Memory budget for image cache (e.g. 512MB, 2GB). Default: 10% of RAM.
    #[arg(short, long)]
    pub memory: Option<String>,

    /// Where downloads are saved (default: current directory)
    #[arg(long, value_name = "DIR")]
    pub download_dir: Option<PathBuf>,
}

impl Cli {
    pub fn carousel_options(&self) -> CarouselOptions {
        CarouselOptions {
            initial_index: self.initial_index,
            track_height: self.carousel_height.max(1),
            show_indicators: !self.no_indicators,
            show_arrows: !self.no_arrows,
            preload_radius: self.preload,
        }
    }
}

pub fn parse_memory_budget(s: &str) -> u64 {
    let s = s.trim().to_uppercase();
    if let Some(num) = s.strip_suffix("GB") {
        (num.trim().parse::<f64>().unwrap_or(1.0) * 1024.0 * 1024.0 * 1024.0) as u64
    } else if let Some(num) = s.strip_suffix("MB") {
        (num.trim().parse::<f64>().unwrap_or(512.0) * 1024.0 * 1024.0) as u64
    } else {
        (s.parse::<f64>().unwrap_or(512.0) * 1024.0 * 1024.0) as u64
    }
}

pub fn default_memory_budget() -> u64 {
    let mut sys = sysinfo::System::new();
    sys.refresh_memory();
    sys.total_memory() / 10
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_budget_units() {
        assert_eq!(parse_memory_budget("2GB"), 2 * 1024 * 1024 * 1024);
        assert_eq!(parse_memory_budget(" 1.5gb "), 3 * 512 * 1024 * 1024);
        assert_eq!(parse_memory_budget("256MB"), 256 * 1024 * 1024);
        assert_eq!(parse_memory_budget("64"), 64 * 1024 * 1024);
    }

    #[test]
    fn carousel_flags_map_to_options() {
        let cli = Cli::parse_from([
            "ivgal", "--mode", "carousel", "--initial-index", "3", "--no-arrows", "--preload", "2", "a.png",
        ]);
        assert_eq!(cli.mode, StartMode::Carousel);
        let o = cli.carousel_options();
        assert_eq!(o.initial_index, 3);
        assert!(!o.show_arrows && o.show_indicators);
        assert_eq!((o.track_height, o.preload_radius), (300, 2));
    }

    #[test]
    fn manifest_alone_is_enough() {
        let cli = Cli::parse_from(["ivgal", "--manifest", "album.toml"]);
        assert!(cli.paths.is_empty());
        assert_eq!(cli.mode, StartMode::Gallery);
    }
}

//! burnsub CLI: karaoke captions from word timestamps.
//!
//! Usage:
//!   burnsub segment <TRANSCRIPT>     Group word timestamps into caption segments
//!   burnsub subtitles <SEGMENTS>     Write SRT/VTT subtitles
//!   burnsub preview <SEGMENTS>       Show the caption overlay at a playback time
//!   burnsub burn <VIDEO>             Burn captions into a video
//!   burnsub edit <SEGMENTS> <INDEX>  Adjust one segment's timing or text
//!   burnsub check                    Check system capabilities

use std::path::PathBuf;

use burnsub_common::config::AppConfig;
use clap::{Args, Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "burnsub",
    about = "Word-synchronized karaoke captions, previewed live or burned into video",
    version,
    author
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Group a word-timestamp transcript into caption segments
    Segment {
        /// Transcript file (word JSON, or plain text with --duration)
        transcript: PathBuf,

        /// Write the segment track here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Maximum words per segment
        #[arg(long)]
        max_words: Option<usize>,

        /// Pause (seconds) between words that forces a new segment
        #[arg(long)]
        pause: Option<f64>,

        /// Known audio duration in seconds
        #[arg(long)]
        duration: Option<f64>,
    },

    /// Write SRT or WebVTT subtitles from a segment track
    Subtitles {
        /// Segment track JSON
        segments: PathBuf,

        /// Output file; `.vtt` selects WebVTT, anything else SRT
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Show the caption overlay at a playback time
    Preview {
        /// Segment track JSON
        segments: PathBuf,

        /// Playback time in seconds
        #[arg(long)]
        at: f64,

        /// Canvas width
        #[arg(long, default_value = "1280")]
        width: u32,

        /// Canvas height
        #[arg(long, default_value = "720")]
        height: u32,

        #[command(flatten)]
        style: StyleArgs,

        /// Print an HTML fragment instead of JSON
        #[arg(long)]
        html: bool,
    },

    /// Burn captions into a video file
    Burn {
        /// Source video
        video: PathBuf,

        /// Word-timestamp transcript to segment
        #[arg(long, conflicts_with = "segments", required_unless_present = "segments")]
        transcript: Option<PathBuf>,

        /// Pre-built segment track
        #[arg(long)]
        segments: Option<PathBuf>,

        /// Output directory
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        style: StyleArgs,

        /// Write a per-frame caption timing report next to the output
        #[arg(long)]
        report: bool,
    },

    /// Adjust one segment's timing or text
    Edit {
        /// Segment track JSON (rewritten in place)
        segments: PathBuf,

        /// Zero-based segment index
        index: usize,

        /// New start time in seconds
        #[arg(long)]
        start: Option<f64>,

        /// New end time in seconds
        #[arg(long)]
        end: Option<f64>,

        /// Replacement caption text (drops word timing)
        #[arg(long)]
        text: Option<String>,
    },

    /// Check system capabilities
    Check,
}

#[derive(Args, Clone)]
pub struct StyleArgs {
    /// Caption font size at the 360px reference width (16-60)
    #[arg(long)]
    font_size: Option<f32>,

    /// Font file to use instead of the system sans-serif face
    #[arg(long)]
    font: Option<PathBuf>,
}

impl StyleArgs {
    fn render_style(&self, config: &AppConfig) -> burnsub_render_engine::RenderStyle {
        burnsub_render_engine::RenderStyle::new(
            self.font_size.unwrap_or(config.style.font_size_px),
        )
    }

    fn font_source(&self, config: &AppConfig) -> burnsub_render_engine::FontSource {
        burnsub_render_engine::FontSource::from_option(
            self.font.clone().or_else(|| config.style.font_path.clone()),
        )
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::load();

    let mut logging = config.logging.clone();
    if cli.verbose {
        logging.level = "debug".to_string();
    }
    burnsub_common::logging::init_logging(&logging);

    match cli.command {
        Commands::Segment {
            transcript,
            output,
            max_words,
            pause,
            duration,
        } => commands::segment::run(&config, transcript, output, max_words, pause, duration),
        Commands::Subtitles { segments, output } => commands::subtitles::run(segments, output),
        Commands::Preview {
            segments,
            at,
            width,
            height,
            style,
            html,
        } => commands::preview::run(&config, segments, at, width, height, style, html).await,
        Commands::Burn {
            video,
            transcript,
            segments,
            output,
            style,
            report,
        } => {
            commands::burn::run(&config, video, transcript, segments, output, style, report).await
        }
        Commands::Edit {
            segments,
            index,
            start,
            end,
            text,
        } => commands::edit::run(segments, index, start, end, text),
        Commands::Check => commands::check::run(&config).await,
    }
}

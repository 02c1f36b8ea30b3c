use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::info;

use gesture_sentinel::{
    detect_events, validate_frame_rate, Config, Gesture, GestureDetector, JsonSequenceSource,
    SequenceMatcher, SequenceSource,
};

#[derive(Parser, Debug)]
#[command(
    name = "gesture-sentinel",
    about = "Movement events and template matching over body keypoints"
)]
struct Cli {
    /// TOML config; defaults apply when omitted
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the gesture detector over a recording and write the event log
    Events {
        /// Keypoint recording (JSON)
        #[arg(long)]
        input: PathBuf,
        /// Override the recording's frame rate
        #[arg(long)]
        fps: Option<f32>,
        /// Output file; stdout when omitted
        #[arg(long)]
        out: Option<PathBuf>,
        #[arg(long, value_enum, default_value_t = LogFormat::Csv)]
        format: LogFormat,
    },
    /// DTW distance between two recordings
    Distance {
        #[arg(long)]
        a: PathBuf,
        #[arg(long)]
        b: PathBuf,
    },
    /// Find where a template occurs inside a longer recording
    Match {
        #[arg(long)]
        sequence: PathBuf,
        #[arg(long)]
        template: PathBuf,
        /// Spread window offsets over worker threads
        #[arg(long)]
        parallel: bool,
    },
    /// Write the default configuration
    InitConfig {
        #[arg(long, default_value = "gesture-sentinel.toml")]
        out: PathBuf,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum LogFormat {
    Csv,
    Json,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "gesture_sentinel=info".into()),
        )
        .init();

    let config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };

    match cli.command {
        Command::Events {
            input,
            fps,
            out,
            format,
        } => run_events(&config, &input, fps, out.as_deref(), format),
        Command::Distance { a, b } => {
            let source = JsonSequenceSource;
            let a = source.load(&a)?;
            let b = source.load(&b)?;
            let distance = SequenceMatcher::new(config.matcher).distance(&a.frames, &b.frames)?;
            println!("{}", distance);
            Ok(())
        }
        Command::Match { sequence, template, parallel } => {
            let source = JsonSequenceSource;
            let sequence = source.load(&sequence)?;
            let template = source.load(&template)?;
            let matcher = SequenceMatcher::new(config.matcher);
            let found = if parallel {
                matcher.best_window_match_parallel(&sequence.frames, &template.frames)?
            } else {
                matcher.best_window_match(&sequence.frames, &template.frames)?
            };
            info!(
                offset = found.offset,
                start_secs = found.offset as f32 / sequence.frame_rate,
                distance = found.distance,
                "best window"
            );
            println!("{}", serde_json::to_string(&found)?);
            Ok(())
        }
        Command::InitConfig { out } => {
            Config::default().save(&out)?;
            info!("wrote default config to {}", out.display());
            Ok(())
        }
    }
}

fn run_events(
    config: &Config,
    input: &Path,
    fps: Option<f32>,
    out: Option<&Path>,
    format: LogFormat,
) -> Result<()> {
    let recording = JsonSequenceSource.load(input)?;
    let frame_rate = match fps {
        Some(rate) => validate_frame_rate(rate).context("--fps")?,
        None => recording.frame_rate,
    };

    let mut detector = GestureDetector::new(config.detector.clone());
    let log = detect_events(&mut detector, &recording.frames, frame_rate);

    for gesture in Gesture::ALL {
        info!(event = gesture.as_str(), count = log.count(gesture), "events detected");
    }

    let writer: Box<dyn Write> = match out {
        Some(path) => Box::new(BufWriter::new(
            File::create(path).with_context(|| format!("creating {}", path.display()))?,
        )),
        None => Box::new(io::stdout().lock()),
    };
    match format {
        LogFormat::Csv => log.write_csv(writer),
        LogFormat::Json => log.write_json(writer),
    }
}

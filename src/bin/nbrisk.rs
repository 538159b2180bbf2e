//! nbrisk - Command-line interface for NeuroBridge Risk
//!
//! Commands:
//! - heatmap: Analyze a gaze heatmap image
//! - collect: Summarize a frame stream into session metrics
//! - fuse: Fuse session metrics into an overall score
//! - screen: Score a full session and append it to a patient history
//! - trend / progress / therapy: Longitudinal views over a history file

use clap::{Parser, Subcommand, ValueEnum};
use log::LevelFilter;
use serde::Serialize;
use std::fs;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use neurobridge_risk::collector::DEFAULT_SESSION_DURATION_SECS;
use neurobridge_risk::types::FrameRecord;
use neurobridge_risk::{
    EngineConfig, EngineError, FusionInputs, HeatmapGazeAnalyzer, PatientHistory,
    RealtimeMetricCollector, RiskFusionEngine, ScreeningProcessor, SessionInput,
    SessionMetrics, VisionInput, ENGINE_VERSION,
};

/// nbrisk - Behavioral risk scoring and trend analysis
#[derive(Parser)]
#[command(name = "nbrisk")]
#[command(version = ENGINE_VERSION)]
#[command(about = "Score screening sessions and track attention trends", long_about = None)]
struct Cli {
    /// Engine configuration file (JSON, partial overrides allowed)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging on stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Pretty-print JSON output
    #[arg(long, global = true)]
    pretty: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze a gaze heatmap image (PNG or JPEG)
    Heatmap {
        /// Image file path
        image: PathBuf,
    },

    /// Summarize a frame stream (NDJSON of frame records) into session metrics
    Collect {
        /// Input file path (use - for stdin)
        #[arg(short, long, default_value = "-")]
        input: PathBuf,

        /// Drop frames captured after this many seconds
        #[arg(long, default_value_t = DEFAULT_SESSION_DURATION_SECS)]
        max_duration_secs: u64,
    },

    /// Fuse session metrics into an overall score and risk level
    Fuse {
        /// Fusion mode
        #[arg(long, value_enum, default_value = "ensemble")]
        mode: FuseMode,

        /// Heatmap vision probability (0-1, ensemble mode)
        #[arg(long)]
        vision_probability: Option<f64>,

        /// Attention metric (0-100, ensemble mode)
        #[arg(long, default_value_t = 50.0)]
        attention: f64,

        /// Motor metric (>= 0, ensemble mode)
        #[arg(long, default_value_t = 0.0)]
        motor: f64,

        /// Vision score (0-100, legacy mode)
        #[arg(long, default_value_t = 0.0)]
        vision_score: f64,

        /// EEG score (0-100, legacy mode)
        #[arg(long, default_value_t = 0.0)]
        eeg_score: f64,
    },

    /// Score a session and append it to the patient's history
    Screen {
        /// Patient identifier
        #[arg(long)]
        patient: String,

        /// Gaze heatmap image (omit to use --vision-score legacy fusion)
        #[arg(long)]
        heatmap: Option<PathBuf>,

        /// Raw vision score (0-100) for sessions without a heatmap
        #[arg(long, conflicts_with = "heatmap")]
        vision_score: Option<f64>,

        /// Frame stream (NDJSON of frame records)
        #[arg(long)]
        frames: PathBuf,

        /// Drop frames captured after this many seconds
        #[arg(long, default_value_t = DEFAULT_SESSION_DURATION_SECS)]
        max_duration_secs: u64,

        /// Secondary EEG score (0-100)
        #[arg(long, default_value_t = 0.0)]
        eeg_score: f64,

        /// Free-text clinician notes
        #[arg(long, default_value = "")]
        notes: String,

        /// Load history from file
        #[arg(long)]
        history: Option<PathBuf>,

        /// Save history to file after recording
        #[arg(long)]
        save_history: Option<PathBuf>,
    },

    /// Attention trend over a history file
    Trend {
        #[arg(long)]
        history: PathBuf,
    },

    /// Progress series over a history file
    Progress {
        #[arg(long)]
        history: PathBuf,
    },

    /// Therapy plan for the latest screening in a history file
    Therapy {
        #[arg(long)]
        history: PathBuf,
    },
}

#[derive(Clone, ValueEnum)]
enum FuseMode {
    /// Vision probability, attention and motor metrics
    Ensemble,
    /// Vision and EEG scores
    Legacy,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    env_logger::Builder::from_default_env()
        .filter_level(if cli.verbose {
            LevelFilter::Debug
        } else {
            LevelFilter::Info
        })
        .init();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!(
                "{}",
                serde_json::to_string(&CliError::from(e)).unwrap_or_else(|_| "Unknown error".to_string())
            );
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), NbCliError> {
    let config = load_config(cli.config.as_deref())?;
    let pretty = cli.pretty;

    match cli.command {
        Commands::Heatmap { image } => cmd_heatmap(&image, &config, pretty),

        Commands::Collect {
            input,
            max_duration_secs,
        } => cmd_collect(&input, max_duration_secs, &config, pretty),

        Commands::Fuse {
            mode,
            vision_probability,
            attention,
            motor,
            vision_score,
            eeg_score,
        } => {
            let inputs = match mode {
                FuseMode::Ensemble => FusionInputs::Ensemble {
                    vision_probability,
                    attention_metric: attention,
                    motor_metric: motor,
                },
                FuseMode::Legacy => FusionInputs::Legacy {
                    vision_score,
                    eeg_score,
                },
            };
            let result = RiskFusionEngine::with_config(config.fusion).fuse_checked(&inputs)?;
            emit(&result, pretty)
        }

        Commands::Screen {
            patient,
            heatmap,
            vision_score,
            frames,
            max_duration_secs,
            eeg_score,
            notes,
            history,
            save_history,
        } => cmd_screen(
            ScreenArgs {
                patient,
                heatmap,
                vision_score,
                frames,
                max_duration_secs,
                eeg_score,
                notes,
                history,
                save_history,
            },
            config,
            pretty,
        ),

        Commands::Trend { history } => {
            let processor = processor_from_file(&history, config)?;
            emit(&processor.trend(), pretty)
        }

        Commands::Progress { history } => {
            let processor = processor_from_file(&history, config)?;
            emit(&processor.progress(), pretty)
        }

        Commands::Therapy { history } => {
            let processor = processor_from_file(&history, config)?;
            if processor.history().is_empty() {
                return Err(NbCliError::EmptyHistory);
            }
            emit(&processor.therapy_plan(), pretty)
        }
    }
}

fn cmd_heatmap(image: &Path, config: &EngineConfig, pretty: bool) -> Result<(), NbCliError> {
    let bytes = fs::read(image)?;
    let assessment = HeatmapGazeAnalyzer::with_config(config.heatmap.clone()).analyze_encoded(&bytes);
    emit(&assessment, pretty)
}

fn cmd_collect(
    input: &Path,
    max_duration_secs: u64,
    config: &EngineConfig,
    pretty: bool,
) -> Result<(), NbCliError> {
    let collector = RealtimeMetricCollector::with_config(config.collector.clone());
    let metrics = collect_frames(input, max_duration_secs, collector)?;
    emit(&metrics, pretty)
}

struct ScreenArgs {
    patient: String,
    heatmap: Option<PathBuf>,
    vision_score: Option<f64>,
    frames: PathBuf,
    max_duration_secs: u64,
    eeg_score: f64,
    notes: String,
    history: Option<PathBuf>,
    save_history: Option<PathBuf>,
}

fn cmd_screen(args: ScreenArgs, config: EngineConfig, pretty: bool) -> Result<(), NbCliError> {
    let mut processor = ScreeningProcessor::with_config(args.patient.clone(), config)?;

    // Load existing history if provided
    if let Some(history_path) = &args.history {
        let history_json = fs::read_to_string(history_path)?;
        processor.load_history(&history_json)?;
    }

    let vision = match (&args.heatmap, args.vision_score) {
        (Some(path), _) => {
            let bytes = fs::read(path)?;
            VisionInput::Heatmap {
                assessment: processor.heatmap_analyzer().analyze_encoded(&bytes),
            }
        }
        (None, Some(vision_score)) => VisionInput::Legacy { vision_score },
        (None, None) => return Err(NbCliError::MissingVision),
    };

    let metrics = collect_frames(&args.frames, args.max_duration_secs, processor.new_collector())?;

    let input = SessionInput {
        patient_id: args.patient,
        timestamp: None,
        vision,
        metrics,
        eeg_score: args.eeg_score,
        notes: args.notes,
    };
    let report = processor.record(&input)?;

    // Save history if requested
    if let Some(history_path) = &args.save_history {
        fs::write(history_path, processor.save_history()?)?;
    }

    emit(&report, pretty)
}

// Helper functions

fn load_config(path: Option<&Path>) -> Result<EngineConfig, NbCliError> {
    match path {
        Some(path) => Ok(EngineConfig::from_json(&fs::read_to_string(path)?)?),
        None => Ok(EngineConfig::default()),
    }
}

fn processor_from_file(path: &Path, config: EngineConfig) -> Result<ScreeningProcessor, NbCliError> {
    let history = PatientHistory::from_json(&fs::read_to_string(path)?)?;
    ScreeningProcessor::from_history(history, config).map_err(NbCliError::from)
}

/// Feed frame records into the collector, dropping those past the session cap
fn collect_frames(
    input: &Path,
    max_duration_secs: u64,
    mut collector: RealtimeMetricCollector,
) -> Result<SessionMetrics, NbCliError> {
    let reader: Box<dyn BufRead> = if input.to_string_lossy() == "-" {
        if atty::is(atty::Stream::Stdin) {
            return Err(NbCliError::NoInput);
        }
        Box::new(BufReader::new(io::stdin()))
    } else {
        Box::new(BufReader::new(fs::File::open(input)?))
    };

    let cutoff_ms = max_duration_secs.saturating_mul(1000);
    let mut dropped = 0usize;

    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();

        if trimmed.is_empty() {
            continue;
        }

        let frame: FrameRecord = serde_json::from_str(trimmed).map_err(|e| {
            NbCliError::ParseError(format!("Failed to parse frame on line {}: {}", index + 1, e))
        })?;

        if frame.t_ms.is_some_and(|t| t > cutoff_ms) {
            dropped += 1;
            continue;
        }

        collector.push(frame.landmark);
    }

    if dropped > 0 {
        log::info!("dropped {dropped} frames past the {max_duration_secs}s session cap");
    }

    Ok(collector.finish())
}

fn emit<T: Serialize>(value: &T, pretty: bool) -> Result<(), NbCliError> {
    let json = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{json}");
    Ok(())
}

// Error types

#[derive(Debug)]
enum NbCliError {
    Io(io::Error),
    Engine(EngineError),
    Json(serde_json::Error),
    NoInput,
    MissingVision,
    EmptyHistory,
    ParseError(String),
}

impl From<io::Error> for NbCliError {
    fn from(e: io::Error) -> Self {
        NbCliError::Io(e)
    }
}

impl From<EngineError> for NbCliError {
    fn from(e: EngineError) -> Self {
        NbCliError::Engine(e)
    }
}

impl From<serde_json::Error> for NbCliError {
    fn from(e: serde_json::Error) -> Self {
        NbCliError::Json(e)
    }
}

#[derive(Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<NbCliError> for CliError {
    fn from(e: NbCliError) -> Self {
        match e {
            NbCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            NbCliError::Engine(e) => {
                let (code, hint) = match &e {
                    EngineError::InvalidMetric { .. } => {
                        ("INVALID_METRIC", "Metrics must be finite and within range")
                    }
                    EngineError::PatientMismatch { .. } => {
                        ("PATIENT_MISMATCH", "Use the history file that belongs to this patient")
                    }
                    EngineError::OutOfOrder { .. } => {
                        ("OUT_OF_ORDER", "Screenings must be recorded in chronological order")
                    }
                    EngineError::ConfigError(_) => ("CONFIG_ERROR", "Check the --config file"),
                    EngineError::ImageDecode(_) => ("IMAGE_ERROR", "Use a PNG or JPEG heatmap"),
                    EngineError::JsonError(_) | EngineError::ParseError(_) => {
                        ("PARSE_ERROR", "Check input format")
                    }
                };
                CliError {
                    code: code.to_string(),
                    message: e.to_string(),
                    hint: Some(hint.to_string()),
                }
            }
            NbCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check JSON syntax".to_string()),
            },
            NbCliError::NoInput => CliError {
                code: "NO_INPUT".to_string(),
                message: "No frame stream on stdin".to_string(),
                hint: Some("Pipe frame NDJSON into nbrisk or pass --input".to_string()),
            },
            NbCliError::MissingVision => CliError {
                code: "MISSING_VISION".to_string(),
                message: "Neither --heatmap nor --vision-score was given".to_string(),
                hint: Some("Pass a heatmap image, or a vision score for legacy fusion".to_string()),
            },
            NbCliError::EmptyHistory => CliError {
                code: "EMPTY_HISTORY".to_string(),
                message: "History contains no screenings".to_string(),
                hint: Some("Record a session with 'nbrisk screen' first".to_string()),
            },
            NbCliError::ParseError(msg) => CliError {
                code: "PARSE_ERROR".to_string(),
                message: msg,
                hint: Some("Each line must be {\"tMs\": ..., \"landmark\": {\"x\": ..., \"y\": ...} | null}".to_string()),
            },
        }
    }
}

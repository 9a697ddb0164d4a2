// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use anyhow::{Result, Context};
use log::{error, warn, info, LevelFilter, Log, Metadata, Record, Level, SetLoggerError};
use std::path::{Path, PathBuf};
use std::io::Write;
use std::fs::File;
use std::io::BufReader;
use clap::{Parser, ValueEnum, CommandFactory, Subcommand};
use clap_complete::{generate, Shell};
use tokio_util::sync::CancellationToken;

use dubsync::app_config::{self, Config, SpeechProvider};
use dubsync::app_controller::Controller;
use dubsync::file_utils::FileManager;
use dubsync::voices::VoiceCatalog;

/// CLI Wrapper for SpeechProvider to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliSpeechProvider {
    Gemini,
    #[value(name = "elevenlabs")]
    ElevenLabs,
}

impl From<CliSpeechProvider> for SpeechProvider {
    fn from(cli_provider: CliSpeechProvider) -> Self {
        match cli_provider {
            CliSpeechProvider::Gemini => SpeechProvider::Gemini,
            CliSpeechProvider::ElevenLabs => SpeechProvider::ElevenLabs,
        }
    }
}

/// CLI Wrapper for LogLevel to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliLogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<CliLogLevel> for app_config::LogLevel {
    fn from(cli_level: CliLogLevel) -> Self {
        match cli_level {
            CliLogLevel::Error => app_config::LogLevel::Error,
            CliLogLevel::Warn => app_config::LogLevel::Warn,
            CliLogLevel::Info => app_config::LogLevel::Info,
            CliLogLevel::Debug => app_config::LogLevel::Debug,
            CliLogLevel::Trace => app_config::LogLevel::Trace,
        }
    }
}

fn level_filter(level: &app_config::LogLevel) -> LevelFilter {
    match level {
        app_config::LogLevel::Error => LevelFilter::Error,
        app_config::LogLevel::Warn => LevelFilter::Warn,
        app_config::LogLevel::Info => LevelFilter::Info,
        app_config::LogLevel::Debug => LevelFilter::Debug,
        app_config::LogLevel::Trace => LevelFilter::Trace,
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Synthesize a narration track aligned to a subtitle file
    Narrate(NarrateArgs),

    /// Parse a subtitle file and report timing defects (no network calls)
    Check {
        /// Subtitle file to check
        #[arg(value_name = "TRANSCRIPT")]
        input_path: PathBuf,

        /// Print the parsed cues as canonical SRT
        #[arg(long)]
        emit: bool,
    },

    /// List the voices offered by a provider
    Voices {
        /// Provider whose catalog to list
        #[arg(short, long, value_enum, default_value = "gemini")]
        provider: CliSpeechProvider,
    },

    /// Generate shell completions for dubsync
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Parser, Debug)]
struct NarrateArgs {
    /// Subtitle file with the (translated) cues to speak
    #[arg(value_name = "TRANSCRIPT")]
    input_path: PathBuf,

    /// Output WAV file (defaults to <TRANSCRIPT>.narration.wav)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Force overwrite of an existing output file
    #[arg(short, long)]
    force_overwrite: bool,

    /// Speech provider to use
    #[arg(short, long, value_enum)]
    provider: Option<CliSpeechProvider>,

    /// Voice: catalog index, name or description
    #[arg(short, long)]
    voice: Option<String>,

    /// Configuration file path
    #[arg(short, long, default_value = "conf.json")]
    config_path: String,

    /// Set logging level
    #[arg(short, long, value_enum)]
    log_level: Option<CliLogLevel>,

    /// Directory for per-job scratch files
    #[arg(long)]
    workdir: Option<PathBuf>,
}

/// dubsync - caption-synchronized narration
///
/// Synthesizes speech for every subtitle cue and lays it on one audio track
/// so that each line starts at its cue and never runs into the next one.
#[derive(Parser, Debug)]
#[command(name = "dubsync")]
#[command(version)]
#[command(about = "Caption-synchronized narration synthesis")]
#[command(long_about = "dubsync turns a subtitle file into a narration track aligned to the cue timings.

EXAMPLES:
    dubsync narrate talk.fr.srt                      # Narrate using default config
    dubsync narrate talk.fr.srt -o talk.fr.wav -f    # Choose the output, overwrite it
    dubsync narrate -p elevenlabs -v Brian talk.srt  # Use a specific provider and voice
    dubsync narrate -v 'calm, lower pitch' talk.srt  # Pick a voice by description
    dubsync check talk.fr.srt                        # Validate cue timings offline
    dubsync check --emit talk.fr.srt > clean.srt     # Rewrite timestamps as HH:MM:SS,mmm
    dubsync voices -p elevenlabs                     # List available voices
    dubsync completions bash > dubsync.bash          # Generate bash completions

CONFIGURATION:
    Configuration is stored in conf.json by default. You can specify a different
    config file with --config-path. If the config file doesn't exist, a default one
    will be created automatically. API keys may also be given through
    GEMINI_API_KEY and ELEVENLABS_API_KEY.

SUPPORTED PROVIDERS:
    gemini     - Gemini TTS (default voice: Kore)
    elevenlabs - ElevenLabs TTS (requires API key)")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Commands,
}

// @struct: Custom logger implementation, filtered by the global max level
struct CustomLogger;

impl CustomLogger {
    // @initializes: Global logger
    fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
        log::set_boxed_logger(Box::new(CustomLogger))?;
        log::set_max_level(level);
        Ok(())
    }

    // @returns: ANSI color for log level
    fn color_for_level(level: Level) -> &'static str {
        match level {
            Level::Error => "1;31",
            Level::Warn => "1;33",
            Level::Info => "1;32",
            Level::Debug => "1;36",
            Level::Trace => "1;35",
        }
    }
}

impl Log for CustomLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let now = chrono::Local::now().format("%H:%M:%S.%3f");
            let mut stderr = std::io::stderr();
            let _ = writeln!(
                stderr,
                "\x1B[{}m{} {:<5} {}\x1B[0m",
                Self::color_for_level(record.level()),
                now,
                record.level(),
                record.args()
            );
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Info until the configuration says otherwise
    CustomLogger::init(LevelFilter::Info)?;

    let cli = CommandLineOptions::parse();

    match cli.command {
        Commands::Completions { shell } => {
            let mut cmd = CommandLineOptions::command();
            generate(shell, &mut cmd, "dubsync", &mut std::io::stdout());
            Ok(())
        }
        Commands::Voices { provider } => {
            let catalog = VoiceCatalog::for_provider(provider.into());
            for (index, voice) in catalog.voices().iter().enumerate() {
                println!("{:>3}  {:<14} {}", index, voice.name, voice.description);
            }
            Ok(())
        }
        Commands::Check { input_path, emit } => run_check(&input_path, emit),
        Commands::Narrate(args) => run_narrate(args).await,
    }
}

fn run_check(input_path: &Path, emit: bool) -> Result<()> {
    let report = Controller::with_config(Config::default())?.check(input_path)?;

    if emit {
        let raw = FileManager::read_to_string(input_path)?;
        print!("{}", Controller::canonical_srt(&raw));
    }

    println!("{} cues, {} rejected blocks, ends at {:.3}s", report.cues, report.rejected_blocks, report.end_time);
    for defect in &report.defects {
        println!("  {}", defect);
    }
    if report.cues == 0 {
        warn!("No cue parsed; narration would need the repair service");
    }
    Ok(())
}

/// Load the config file, or write a default one when it is missing
fn load_config(config_path: &str) -> Result<Config> {
    if Path::new(config_path).exists() {
        let file = File::open(config_path)
            .context(format!("Failed to open config file: {}", config_path))?;
        let reader = BufReader::new(file);
        let config: Config = serde_json::from_reader(reader)
            .context(format!("Failed to parse config file: {}", config_path))?;
        Ok(config)
    } else {
        warn!("Config file not found at '{}', creating default config.", config_path);
        let config = Config::default();
        let config_json = serde_json::to_string_pretty(&config)
            .context("Failed to serialize default config to JSON")?;
        FileManager::write_to_file(config_path, &config_json)
            .context(format!("Failed to write default config to file: {}", config_path))?;
        Ok(config)
    }
}

async fn run_narrate(options: NarrateArgs) -> Result<()> {
    if let Some(cmd_log_level) = &options.log_level {
        log::set_max_level(level_filter(&cmd_log_level.clone().into()));
    }

    let mut config = load_config(&options.config_path)?;

    // Override config with CLI options if provided
    if let Some(provider) = &options.provider {
        config.synthesis.provider = provider.clone().into();
    }
    if let Some(voice) = &options.voice {
        config.synthesis.voice = voice.clone();
    }
    if let Some(workdir) = &options.workdir {
        config.work_dir = Some(workdir.to_string_lossy().to_string());
    }
    if let Some(log_level) = &options.log_level {
        config.log_level = log_level.clone().into();
    } else {
        log::set_max_level(level_filter(&config.log_level));
    }

    config.validate()
        .context("Configuration validation failed")?;

    let output = options.output.clone()
        .unwrap_or_else(|| FileManager::default_output_path(&options.input_path));

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, cancelling job");
            on_signal.cancel();
        }
    });

    let controller = Controller::with_config(config)?;
    match controller.run(options.input_path.clone(), output, options.force_overwrite, cancel).await {
        Ok(path) => {
            info!("Narration written to {:?}", path);
            Ok(())
        }
        Err(e) => {
            error!("Narration failed: {:#}", e);
            Err(e)
        }
    }
}

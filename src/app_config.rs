use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::default::Default;
use url::Url;

/// Application configuration module
/// This module handles the application configuration including loading,
/// validating and saving configuration settings.
/// Represents the application configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    /// Speech synthesis settings
    #[serde(default)]
    pub synthesis: SynthesisConfig,

    /// Transcript repair settings
    #[serde(default)]
    pub repair: RepairConfig,

    /// Duration reconciliation thresholds
    #[serde(default)]
    pub reconciler: ReconcilerConfig,

    /// Audio format and external tool settings
    #[serde(default)]
    pub audio: AudioConfig,

    /// Root directory for per-job scratch directories (system temp dir if empty)
    #[serde(default)]
    pub work_dir: Option<String>,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,
}

/// Sample rate of the PCM audio Gemini returns
pub const GEMINI_SAMPLE_RATE: u32 = 24_000;

/// PCM output formats ElevenLabs offers
pub const ELEVENLABS_SAMPLE_RATES: [u32; 4] = [16_000, 22_050, 24_000, 44_100];

/// Speech synthesis provider type
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SpeechProvider {
    // @provider: Gemini TTS
    #[default]
    Gemini,
    // @provider: ElevenLabs TTS
    ElevenLabs,
}

impl SpeechProvider {
    // @returns: Capitalized provider name
    pub fn display_name(&self) -> &str {
        match self {
            Self::Gemini => "Gemini",
            Self::ElevenLabs => "ElevenLabs",
        }
    }

    // @returns: Lowercase provider identifier
    pub fn to_lowercase_string(&self) -> String {
        match self {
            Self::Gemini => "gemini".to_string(),
            Self::ElevenLabs => "elevenlabs".to_string(),
        }
    }

    // @returns: Sample rates the provider can return; every provider returns mono
    pub fn supported_sample_rates(&self) -> &'static [u32] {
        match self {
            Self::Gemini => &[GEMINI_SAMPLE_RATE],
            Self::ElevenLabs => &ELEVENLABS_SAMPLE_RATES,
        }
    }

    // @returns: Environment variable consulted when no API key is configured
    pub fn api_key_env_var(&self) -> &'static str {
        match self {
            Self::Gemini => "GEMINI_API_KEY",
            Self::ElevenLabs => "ELEVENLABS_API_KEY",
        }
    }
}

impl std::fmt::Display for SpeechProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_lowercase_string())
    }
}

impl std::str::FromStr for SpeechProvider {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "gemini" => Ok(Self::Gemini),
            "elevenlabs" => Ok(Self::ElevenLabs),
            _ => Err(anyhow!("Invalid speech provider: {}", s)),
        }
    }
}

/// Provider configuration wrapper
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ProviderConfig {
    // @field: Provider type identifier
    #[serde(rename = "type")]
    pub provider_type: String,

    // @field: Model name
    #[serde(default = "String::new")]
    pub model: String,

    // @field: API key
    #[serde(default = "String::new")]
    pub api_key: String,

    // @field: Service URL
    #[serde(default = "String::new")]
    pub endpoint: String,

    // @field: Timeout seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl ProviderConfig {
    // @param provider: Provider enum
    // @returns: Provider config with defaults
    pub fn new(provider: SpeechProvider) -> Self {
        match provider {
            SpeechProvider::Gemini => Self {
                provider_type: "gemini".to_string(),
                model: default_gemini_tts_model(),
                api_key: String::new(),
                endpoint: default_gemini_endpoint(),
                timeout_secs: default_timeout_secs(),
            },
            SpeechProvider::ElevenLabs => Self {
                provider_type: "elevenlabs".to_string(),
                model: default_elevenlabs_model(),
                api_key: String::new(),
                endpoint: default_elevenlabs_endpoint(),
                timeout_secs: default_timeout_secs(),
            },
        }
    }
}

/// How the delay between attempts grows
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum BackoffKind {
    /// Same delay before every attempt
    #[default]
    Fixed,
    /// Delay doubles after every failed attempt
    Exponential,
}

/// Bounded retry settings
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct RetryConfig {
    /// Total attempts, including the first one
    pub max_attempts: u32,

    /// Base delay between attempts in milliseconds
    pub delay_ms: u64,

    /// Delay growth
    #[serde(default)]
    pub backoff: BackoffKind,
}

impl RetryConfig {
    pub fn fixed(max_attempts: u32, delay_ms: u64) -> Self {
        Self {
            max_attempts,
            delay_ms,
            backoff: BackoffKind::Fixed,
        }
    }
}

/// Speech synthesis configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SynthesisConfig {
    /// Speech provider to use
    #[serde(default)]
    pub provider: SpeechProvider,

    /// Available speech providers
    #[serde(default = "default_available_providers")]
    pub available_providers: Vec<ProviderConfig>,

    /// Voice name (or ElevenLabs voice name), resolved through the voice catalog
    #[serde(default = "default_voice")]
    pub voice: String,

    /// Retry settings for a single cue
    #[serde(default = "default_synthesis_retry")]
    pub retry: RetryConfig,

    /// Seconds subtracted from the cue window to form the pacing hint
    #[serde(default = "default_hint_margin_secs")]
    pub hint_margin_secs: f64,

    /// Lower bound for the pacing hint in seconds
    #[serde(default = "default_min_hint_secs")]
    pub min_hint_secs: f64,

    /// Number of cues synthesized at the same time
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            provider: SpeechProvider::default(),
            available_providers: default_available_providers(),
            voice: default_voice(),
            retry: default_synthesis_retry(),
            hint_margin_secs: default_hint_margin_secs(),
            min_hint_secs: default_min_hint_secs(),
            max_concurrent: default_max_concurrent(),
        }
    }
}

/// Transcript repair configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RepairConfig {
    /// Text model used to reformat timestamps
    #[serde(default = "default_repair_model")]
    pub model: String,

    /// API key (falls back to GEMINI_API_KEY)
    #[serde(default = "String::new")]
    pub api_key: String,

    /// Service endpoint URL
    #[serde(default = "default_gemini_endpoint")]
    pub endpoint: String,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Retry budget for the repair loop
    #[serde(default = "default_repair_retry")]
    pub retry: RetryConfig,
}

impl Default for RepairConfig {
    fn default() -> Self {
        Self {
            model: default_repair_model(),
            api_key: String::new(),
            endpoint: default_gemini_endpoint(),
            timeout_secs: default_timeout_secs(),
            retry: default_repair_retry(),
        }
    }
}

impl RepairConfig {
    /// Get the API key, falling back to the environment
    pub fn get_api_key(&self) -> String {
        if !self.api_key.is_empty() {
            return self.api_key.clone();
        }
        std::env::var(SpeechProvider::Gemini.api_key_env_var()).unwrap_or_default()
    }
}

/// Duration reconciliation thresholds
///
/// A fragment is only stretched when it misses its target by more than
/// `min_abs_deviation_secs` AND by more than `max_pct_deviation` of the target.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ReconcilerConfig {
    /// Absolute deviation floor in seconds
    #[serde(default = "default_min_abs_deviation_secs")]
    pub min_abs_deviation_secs: f64,

    /// Relative deviation threshold (0.06 = 6%)
    #[serde(default = "default_max_pct_deviation")]
    pub max_pct_deviation: f64,

    /// Smallest tempo ratio a single stretch stage accepts
    #[serde(default = "default_min_stretch")]
    pub min_stretch: f64,

    /// Largest tempo ratio a single stretch stage accepts
    #[serde(default = "default_max_stretch")]
    pub max_stretch: f64,

    /// Lower edge of the band where a residual factor is skipped
    #[serde(default = "default_unity_low")]
    pub unity_low: f64,

    /// Upper edge of the band where a residual factor is skipped
    #[serde(default = "default_unity_high")]
    pub unity_high: f64,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            min_abs_deviation_secs: default_min_abs_deviation_secs(),
            max_pct_deviation: default_max_pct_deviation(),
            min_stretch: default_min_stretch(),
            max_stretch: default_max_stretch(),
            unity_low: default_unity_low(),
            unity_high: default_unity_high(),
        }
    }
}

/// Audio format and external tool settings
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AudioConfig {
    /// PCM sample rate in Hz
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,

    /// Number of interleaved channels
    #[serde(default = "default_channels")]
    pub channels: u16,

    /// ffmpeg executable
    #[serde(default = "default_ffmpeg_path")]
    pub ffmpeg_path: String,

    /// ffprobe executable
    #[serde(default = "default_ffprobe_path")]
    pub ffprobe_path: String,

    /// Timeout for one external tool invocation
    #[serde(default = "default_tool_timeout_secs")]
    pub tool_timeout_secs: u64,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: default_sample_rate(),
            channels: default_channels(),
            ffmpeg_path: default_ffmpeg_path(),
            ffprobe_path: default_ffprobe_path(),
            tool_timeout_secs: default_tool_timeout_secs(),
        }
    }
}

/// Log verbosity level
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

fn default_timeout_secs() -> u64 {
    120
}

fn default_available_providers() -> Vec<ProviderConfig> {
    vec![
        ProviderConfig::new(SpeechProvider::Gemini),
        ProviderConfig::new(SpeechProvider::ElevenLabs),
    ]
}

fn default_voice() -> String {
    "Kore".to_string()
}

fn default_synthesis_retry() -> RetryConfig {
    // Provider rate limits reset on the order of tens of seconds
    RetryConfig::fixed(10, 30_000)
}

fn default_repair_retry() -> RetryConfig {
    RetryConfig::fixed(5, 0)
}

fn default_hint_margin_secs() -> f64 {
    0.08
}

fn default_min_hint_secs() -> f64 {
    0.15
}

fn default_max_concurrent() -> usize {
    1
}

fn default_repair_model() -> String {
    "gemini-2.5-flash".to_string()
}

fn default_gemini_tts_model() -> String {
    "gemini-2.5-flash-preview-tts".to_string()
}

fn default_elevenlabs_model() -> String {
    "eleven_turbo_v2_5".to_string()
}

fn default_gemini_endpoint() -> String {
    "https://generativelanguage.googleapis.com".to_string()
}

fn default_elevenlabs_endpoint() -> String {
    "https://api.elevenlabs.io".to_string()
}

fn default_min_abs_deviation_secs() -> f64 {
    0.06
}

fn default_max_pct_deviation() -> f64 {
    0.06
}

fn default_min_stretch() -> f64 {
    0.5
}

fn default_max_stretch() -> f64 {
    2.0
}

fn default_unity_low() -> f64 {
    0.98
}

fn default_unity_high() -> f64 {
    1.02
}

fn default_sample_rate() -> u32 {
    24_000
}

fn default_channels() -> u16 {
    1
}

fn default_ffmpeg_path() -> String {
    "ffmpeg".to_string()
}

fn default_ffprobe_path() -> String {
    "ffprobe".to_string()
}

fn default_tool_timeout_secs() -> u64 {
    120
}

impl Config {
    /// Validate the configuration for consistency and required values
    pub fn validate(&self) -> Result<()> {
        let synthesis = &self.synthesis;

        if synthesis.get_api_key().is_empty() {
            return Err(anyhow!(
                "API key is required for {} provider (set it in the config or {})",
                synthesis.provider.display_name(),
                synthesis.provider.api_key_env_var()
            ));
        }

        let endpoint = synthesis.get_endpoint();
        Url::parse(&endpoint).map_err(|e| anyhow!("Invalid endpoint '{}': {}", endpoint, e))?;
        Url::parse(&self.repair.endpoint)
            .map_err(|e| anyhow!("Invalid repair endpoint '{}': {}", self.repair.endpoint, e))?;

        if synthesis.voice.trim().is_empty() {
            return Err(anyhow!("Voice name cannot be empty"));
        }
        if synthesis.retry.max_attempts == 0 || self.repair.retry.max_attempts == 0 {
            return Err(anyhow!("Retry budgets must allow at least one attempt"));
        }
        if synthesis.max_concurrent == 0 {
            return Err(anyhow!("max_concurrent must be at least 1"));
        }
        if synthesis.hint_margin_secs < 0.0 || synthesis.min_hint_secs <= 0.0 {
            return Err(anyhow!("Pacing hint margin must be >= 0 and minimum hint > 0"));
        }

        self.reconciler.validate()?;

        // Provider audio is decoded with this layout, so it must be what the provider sends
        if self.audio.channels != 1 {
            return Err(anyhow!(
                "Speech providers return mono audio, but {} channels are configured",
                self.audio.channels
            ));
        }
        let rates = synthesis.provider.supported_sample_rates();
        if !rates.contains(&self.audio.sample_rate) {
            return Err(anyhow!(
                "{} cannot return {} Hz audio (supported: {:?})",
                synthesis.provider.display_name(),
                self.audio.sample_rate,
                rates
            ));
        }

        Ok(())
    }
}

impl ReconcilerConfig {
    /// Check that thresholds and the stretch range are usable
    pub fn validate(&self) -> Result<()> {
        if self.min_abs_deviation_secs < 0.0 || self.max_pct_deviation < 0.0 {
            return Err(anyhow!("Deviation thresholds cannot be negative"));
        }
        if !(self.min_stretch > 0.0 && self.min_stretch < 1.0 && self.max_stretch > 1.0) {
            return Err(anyhow!(
                "Stretch range must satisfy 0 < min < 1 < max (got {}..{})",
                self.min_stretch,
                self.max_stretch
            ));
        }
        if !(self.unity_low <= 1.0 && self.unity_high >= 1.0) {
            return Err(anyhow!(
                "Unity band must contain 1.0 (got {}..{})",
                self.unity_low,
                self.unity_high
            ));
        }
        Ok(())
    }
}

/// Default implementation for Config
impl Default for Config {
    fn default() -> Self {
        Config {
            synthesis: SynthesisConfig::default(),
            repair: RepairConfig::default(),
            reconciler: ReconcilerConfig::default(),
            audio: AudioConfig::default(),
            work_dir: None,
            log_level: LogLevel::default(),
        }
    }
}

impl SynthesisConfig {
    /// Get the active provider configuration from the available_providers array
    pub fn get_active_provider_config(&self) -> Option<&ProviderConfig> {
        self.get_provider_config(&self.provider)
    }

    /// Get a specific provider configuration by type
    pub fn get_provider_config(&self, provider: &SpeechProvider) -> Option<&ProviderConfig> {
        let provider_str = provider.to_lowercase_string();
        self.available_providers.iter()
            .find(|p| p.provider_type == provider_str)
    }

    /// Get the model for the active provider
    pub fn get_model(&self) -> String {
        if let Some(provider_config) = self.get_active_provider_config() {
            if !provider_config.model.is_empty() {
                return provider_config.model.clone();
            }
        }

        match self.provider {
            SpeechProvider::Gemini => default_gemini_tts_model(),
            SpeechProvider::ElevenLabs => default_elevenlabs_model(),
        }
    }

    /// Get the API key for the active provider, falling back to the environment
    pub fn get_api_key(&self) -> String {
        if let Some(provider_config) = self.get_active_provider_config() {
            if !provider_config.api_key.is_empty() {
                return provider_config.api_key.clone();
            }
        }

        std::env::var(self.provider.api_key_env_var()).unwrap_or_default()
    }

    /// Get the endpoint for the active provider
    pub fn get_endpoint(&self) -> String {
        if let Some(provider_config) = self.get_active_provider_config() {
            if !provider_config.endpoint.is_empty() {
                return provider_config.endpoint.clone();
            }
        }

        match self.provider {
            SpeechProvider::Gemini => default_gemini_endpoint(),
            SpeechProvider::ElevenLabs => default_elevenlabs_endpoint(),
        }
    }

    /// Get the request timeout for the active provider
    pub fn get_timeout_secs(&self) -> u64 {
        self.get_active_provider_config()
            .map(|p| p.timeout_secs)
            .filter(|t| *t > 0)
            .unwrap_or_else(default_timeout_secs)
    }
}

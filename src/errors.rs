/*!
 * Error types for the dubsync engine.
 *
 * Each stage of the narration pipeline surfaces its own error type so that
 * callers can tell which stage failed without inspecting message text.
 * The types are defined with the thiserror crate.
 */

use thiserror::Error;

/// Errors that can occur when talking to a speech or text provider
#[derive(Error, Debug)]
pub enum ProviderError {
    /// Error when making an API request fails
    #[error("API request failed: {0}")]
    RequestFailed(String),

    /// Error when parsing an API response fails
    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    /// Error returned by the API itself
    #[error("API responded with error: {status_code} - {message}")]
    ApiError {
        /// HTTP status code
        status_code: u16,
        /// Error message from the API
        message: String,
    },

    /// Error establishing or maintaining a connection
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// Error related to rate limiting
    #[error("Rate limit exceeded: {0}")]
    RateLimitExceeded(String),

    /// Error with authentication
    #[error("Authentication error: {0}")]
    AuthenticationError(String),

    /// The provider answered successfully but returned nothing usable
    #[error("Provider returned an empty payload: {0}")]
    EmptyResponse(String),
}

impl ProviderError {
    /// Map an HTTP status and body to the closest error variant
    pub fn from_status(status_code: u16, message: String) -> Self {
        match status_code {
            401 | 403 => Self::AuthenticationError(message),
            429 => Self::RateLimitExceeded(message),
            _ => Self::ApiError { status_code, message },
        }
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_connect() || error.is_timeout() {
            Self::ConnectionError(error.to_string())
        } else if error.is_decode() {
            Self::ParseError(error.to_string())
        } else {
            Self::RequestFailed(error.to_string())
        }
    }
}

/// Data-quality defects found in a single cue
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CueError {
    /// End offset lies before the start offset
    #[error("Cue {index}: end {end:.3}s is before start {start:.3}s")]
    EndBeforeStart {
        index: u32,
        start: f64,
        end: f64,
    },

    /// Text is empty once whitespace is collapsed
    #[error("Cue {index}: empty text")]
    EmptyText { index: u32 },

    /// Start offset is negative or not finite
    #[error("Cue {index}: invalid start offset {start}")]
    InvalidStart { index: u32, start: f64 },
}

/// Errors raised by audio decoding, WAV I/O and external audio tools
#[derive(Error, Debug)]
pub enum AudioError {
    /// WAV encoding or decoding failed
    #[error("WAV error: {0}")]
    Wav(#[from] hound::Error),

    /// An external tool (ffmpeg, ffprobe) failed or could not be spawned
    #[error("{tool} failed: {message}")]
    Tool { tool: String, message: String },

    /// An external tool did not finish in time
    #[error("{tool} timed out after {secs}s")]
    Timeout { tool: String, secs: u64 },

    /// Audio data does not have the expected layout
    #[error("Unsupported audio format: {0}")]
    Format(String),

    /// File system error while handling scratch audio files
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Why a single transcript repair attempt did not yield cues
#[derive(Error, Debug)]
pub enum RepairAttemptError {
    /// The repair service call failed
    #[error("repair call failed: {0}")]
    Provider(ProviderError),

    /// The service answered with nothing but whitespace
    #[error("repair returned blank text")]
    Blank,

    /// The answer still contained no parseable cue
    #[error("repaired text still unparseable ({rejected_blocks} blocks rejected)")]
    Unparseable { rejected_blocks: usize },
}

/// Fatal conditions for one narration job
#[derive(Error, Debug)]
pub enum NarrationError {
    /// The transcript never parsed into at least one cue
    #[error("Transcript could not be repaired after {attempts} attempts: {last_error}")]
    RepairExhausted {
        attempts: u32,
        last_error: RepairAttemptError,
    },

    /// A cue kept failing synthesis until the retry budget ran out
    #[error("Synthesis of cue {cue_index} failed after {attempts} attempts: {last_error}")]
    SynthesisExhausted {
        cue_index: u32,
        attempts: u32,
        last_error: ProviderError,
    },

    /// Tempo factor is non-positive, infinite or NaN
    #[error("Invalid tempo factor: {0}")]
    InvalidTempoFactor(f64),

    /// A cue ends before it starts
    #[error("Invalid cue timing for cue {index}: start {start:.3}s, end {end:.3}s")]
    InvalidCueTiming { index: u32, start: f64, end: f64 },

    /// Nothing was placed on the timeline
    #[error("No narration fragments were placed on the timeline")]
    NoFragmentsPlaced,

    /// The job was cancelled before it finished
    #[error("Narration job was cancelled")]
    Cancelled,

    /// Audio handling failed in a way that cannot be degraded
    #[error("Audio error: {0}")]
    Audio(#[from] AudioError),

    /// File system error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Main application error type that wraps all other errors
#[derive(Error, Debug)]
pub enum AppError {
    /// Error from a file operation
    #[error("File error: {0}")]
    File(String),

    /// Error from a provider
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// Error from the narration pipeline
    #[error("Narration error: {0}")]
    Narration(#[from] NarrationError),

    /// Error from audio handling
    #[error("Audio error: {0}")]
    Audio(#[from] AudioError),

    /// Configuration is inconsistent
    #[error("Configuration error: {0}")]
    Config(String),

    /// Any other error
    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        Self::Unknown(error.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(error: std::io::Error) -> Self {
        Self::File(error.to_string())
    }
}

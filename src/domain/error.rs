use thiserror::Error;

/// ESPBridge unified error type
#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("Serial port error: {0}")]
    Serial(#[from] serialport::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Module bring-up failed: {0}")]
    BringUp(#[from] ConfigError),

    #[error("Notification error: {0}")]
    Parse(#[from] ParseError),

    #[error("Channel '{channel}' closed")]
    ChannelClosed { channel: String },

    #[error("Communication error: {message}")]
    Communication { message: String },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Output error: {0}")]
    Output(String),
}

pub type BridgeResult<T> = Result<T, BridgeError>;

/// Failures of the one-shot module bring-up exchange
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Liveness probe was not acknowledged with `OK`
    #[error("module did not acknowledge liveness probe (received {received:?})")]
    NoResponse { received: String },

    #[error("channel failure during bring-up: {message}")]
    Channel { message: String },
}

impl From<BridgeError> for ConfigError {
    fn from(err: BridgeError) -> Self {
        ConfigError::Channel {
            message: err.to_string(),
        }
    }
}

/// Failures while extracting one `+IPD` notification from the module stream
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("invalid client id byte 0x{byte:02X}")]
    InvalidClientId { byte: u8 },

    #[error("unexpected byte 0x{found:02X} in {stage} (expected {expected:?})")]
    UnexpectedByte {
        stage: &'static str,
        expected: char,
        found: u8,
    },

    #[error("invalid length field: {reason}")]
    InvalidLength { reason: String },

    #[error("payload reached capacity of {capacity} bytes without terminator")]
    Truncated { capacity: usize },

    #[error("stream stalled in {stage} after {waited_ms}ms")]
    Stalled { stage: &'static str, waited_ms: u64 },

    #[error("channel failure: {message}")]
    Channel { message: String },
}

impl ParseError {
    /// Channel failures end the relay loop; everything else drops one notification.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ParseError::Channel { .. })
    }

    /// The already consumed byte that caused the rejection, if one did
    pub fn offending_byte(&self) -> Option<u8> {
        match self {
            ParseError::InvalidClientId { byte } => Some(*byte),
            ParseError::UnexpectedByte { found, .. } => Some(*found),
            _ => None,
        }
    }
}

impl From<BridgeError> for ParseError {
    fn from(err: BridgeError) -> Self {
        ParseError::Channel {
            message: err.to_string(),
        }
    }
}

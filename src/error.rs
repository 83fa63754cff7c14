use thiserror::Error;

/// Errors arising from wire protocol parsing and encoding.
#[derive(Debug, Error)]
pub enum WireError {
    #[error("frame too short ({len} bytes, minimum {min})")]
    FrameTooShort { len: usize, min: usize },

    #[error("missing magic marker (expected 0xFD, got 0x{got:02X})")]
    MissingMagic { got: u8 },

    #[error("unsupported incompatibility flags 0x{flags:02X}")]
    UnsupportedIncompatFlags { flags: u8 },

    #[error("checksum mismatch (expected 0x{expected:04X}, computed 0x{computed:04X})")]
    ChecksumMismatch { expected: u16, computed: u16 },

    #[error("payload too short for {msg_type}: need {need} bytes, got {got}")]
    PayloadTooShort {
        msg_type: &'static str,
        need: usize,
        got: usize,
    },
}

impl WireError {
    pub(crate) fn payload_too_short(msg_type: &'static str, need: usize, got: usize) -> Self {
        Self::PayloadTooShort { msg_type, need, got }
    }
}

pub type Result<T> = std::result::Result<T, WireError>;

/// Errors surfaced by camera server operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CameraError {
    /// A supplied argument was malformed (e.g. the firmware version string,
    /// or an over-long vendor/model/URI).
    #[error("wrong argument")]
    WrongArgument,

    /// A precondition is not yet satisfied.
    #[error("temporarily rejected")]
    TemporarilyRejected,

    /// No subscriber is registered for the commanded capability.
    #[error("unsupported")]
    Unsupported,

    #[error("unknown error")]
    Unknown,
}

/// Errors surfaced by parameter server operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ParamError {
    #[error("parameter not found")]
    NotFound,

    /// The parameter already exists with a different type.
    #[error("wrong parameter type")]
    WrongType,

    /// Parameter names are at most 16 bytes.
    #[error("parameter name too long")]
    ParamNameTooLong,

    /// Custom parameter values are at most 128 bytes.
    #[error("parameter value too long")]
    ParamValueTooLong,

    /// The supplied value string did not parse as the requested type.
    #[error("wrong argument")]
    WrongArgument,
}

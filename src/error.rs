use snafu::Snafu;
use std::fmt;

use crate::util::InfoHash;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("Malformed bencode at byte {}: {}", position, reason))]
    MalformedBencode { position: usize, reason: Malformed },
    #[snafu(display("Unexpected end of input at byte {}", position))]
    UnexpectedEndOfInput { position: usize },
    #[snafu(display("Missing field `{}`", name))]
    MissingField { name: String },
    #[snafu(display("Field `{}` has wrong type, expected {} but got {}", name, expected, got))]
    WrongFieldType {
        name: String,
        expected: &'static str,
        got: &'static str,
    },
    #[snafu(display("Field `{}` is invalid: {}", name, reason))]
    InvalidField { name: String, reason: String },
    #[snafu(display("Pieces blob of {} bytes is not a multiple of 20", length))]
    PieceBlobLengthMismatch { length: usize },
    #[snafu(display("Tracker answered with HTTP {} ({})", status, message))]
    TrackerHttp { status: u16, message: String },
    #[snafu(display("Tracker failure: {}", message))]
    TrackerFailure { message: String },
    #[snafu(display("Malformed peer list: {}", reason))]
    TrackerMalformedPeerList { reason: String },
    #[snafu(display("Invalid peer: {}", reason))]
    InvalidPeer { reason: String },
    #[snafu(display("Completed was already sent to the tracker for {}", info_hash))]
    AlreadyCompleted { info_hash: InfoHash },
    #[snafu(display("Piece index {} out of range, only {} pieces", index, bound))]
    IndexOutOfRange { index: u64, bound: u64 },
    #[snafu(display("HTTP transport error: {}", err))]
    Http { err: reqwest::Error },
}

impl Error {
    pub(crate) fn missing<T: Into<String>>(name: T) -> Self {
        Error::MissingField { name: name.into() }
    }

    pub(crate) fn invalid<T: Into<String>, R: Into<String>>(name: T, reason: R) -> Self {
        Error::InvalidField {
            name: name.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn malformed_peers<T: Into<String>>(reason: T) -> Self {
        Error::TrackerMalformedPeerList {
            reason: reason.into(),
        }
    }

    /// whether the failed operation may be retried without touching any state
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::TrackerHttp { .. }
            | Error::TrackerFailure { .. }
            | Error::TrackerMalformedPeerList { .. }
            | Error::Http { .. } => true,
            _ => false,
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Error {
        Error::Http { err }
    }
}

/// Why a bencoded buffer was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Malformed {
    /// leading zeros, `-0`, no digits or out of `i64` range
    InvalidInteger,
    /// non digit characters, leading zeros or out of range byte string length
    InvalidLength,
    /// a dictionary key that is not a byte string
    NonStringKey,
    /// the byte does not start any bencode value
    UnknownTag(u8),
    TrailingData,
    NestingTooDeep,
}

impl fmt::Display for Malformed {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Malformed::InvalidInteger => write!(f, "invalid integer"),
            Malformed::InvalidLength => write!(f, "invalid byte string length"),
            Malformed::NonStringKey => write!(f, "dictionary key is not a byte string"),
            Malformed::UnknownTag(tag) => write!(f, "unknown tag byte 0x{:02x}", tag),
            Malformed::TrailingData => write!(f, "trailing data after value"),
            Malformed::NestingTooDeep => write!(f, "nesting too deep"),
        }
    }
}

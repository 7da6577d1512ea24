use std::{fmt::Display, result};

pub type Result<T, E = Error> = result::Result<T, E>;

#[derive(Debug)]
pub enum Error {
    Unspecified(String),
    Unimplemented(String),
    Unhandled(Box<dyn std::error::Error + Send + Sync>),
    IoError(std::io::Error),
    /// Device returned a response that we could not properly handle
    BadResponse(String),
    /// Device or driver does not support configuration/functionality
    NotSupported(String),
    /// Timed out during an operation
    Timeout(String),
    /// Malformed XDR/RPC on the wire
    Decode(String),
    /// Well-formed but unexpected RPC call (unknown program/procedure)
    Protocol(String),
    /// SCPI payload did not match any recognized command
    ScpiParse(String),
    /// AWG transport failed; not fatal to the RPC stack
    Driver(String),
    /// Could not acquire a listening port
    Bind(String),
}
impl std::error::Error for Error {}
impl Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Unspecified(desc) => write!(f, "Unspecified error: {desc}"),
            Error::Unimplemented(desc) => write!(f, "Unimplemented: {desc}"),
            Error::Unhandled(e) => write!(f, "Unhandled error: {e}"),
            Error::IoError(e) => write!(f, "IO error: {e}"),
            Error::BadResponse(e) => write!(f, "Bad response: {e}"),
            Error::NotSupported(e) => write!(f, "Not supported: {e}"),
            Error::Timeout(e) => write!(f, "Timed out: {e}"),
            Error::Decode(e) => write!(f, "Decode error: {e}"),
            Error::Protocol(e) => write!(f, "Protocol error: {e}"),
            Error::ScpiParse(e) => write!(f, "SCPI parse error: {e}"),
            Error::Driver(e) => write!(f, "Driver error: {e}"),
            Error::Bind(e) => write!(f, "Bind error: {e}"),
        }
    }
}
impl From<std::io::Error> for Error {
    fn from(value: std::io::Error) -> Self {
        Self::IoError(value)
    }
}

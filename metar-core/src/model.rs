use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Length of an ICAO airport identifier.
pub const ICAO_LEN: usize = 4;

/// A normalized 4-character ICAO airport code.
///
/// Construction goes through [`AirportCode::parse`], so holding one means the
/// code is fetchable.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AirportCode(String);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AirportCodeError {
    #[error("'{0}' is not a 4-letter ICAO code yet")]
    Incomplete(String),

    #[error("'{0}' contains characters that are not valid in an ICAO code")]
    InvalidCharacters(String),
}

impl AirportCodeError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::InvalidInput
    }
}

impl AirportCode {
    /// Normalize raw search input (trim, uppercase) and check its shape.
    pub fn parse(raw: &str) -> Result<Self, AirportCodeError> {
        let normalized = raw.trim().to_uppercase();

        if normalized.chars().count() != ICAO_LEN {
            return Err(AirportCodeError::Incomplete(normalized));
        }
        if !normalized.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(AirportCodeError::InvalidCharacters(normalized));
        }

        Ok(Self(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AirportCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for AirportCode {
    type Error = AirportCodeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<AirportCode> for String {
    fn from(code: AirportCode) -> Self {
        code.0
    }
}

/// Which upstream report a fetch or cache slot refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResourceKind {
    Metar,
    Taf,
}

impl ResourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Metar => "METAR",
            ResourceKind::Taf => "TAF",
        }
    }

    /// Path segment used by the upstream API.
    pub fn path_segment(&self) -> &'static str {
        match self {
            ResourceKind::Metar => "metar",
            ResourceKind::Taf => "taf",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identifies one cache slot: resource kind plus airport.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub kind: ResourceKind,
    pub code: AirportCode,
}

impl CacheKey {
    pub fn new(kind: ResourceKind, code: &AirportCode) -> Self {
        Self {
            kind,
            code: code.clone(),
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.kind, self.code)
    }
}

/// Error taxonomy shown to the rendering layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    NotFound,
    NetworkError,
    InvalidInput,
}

impl ErrorKind {
    pub fn title(&self) -> &'static str {
        match self {
            ErrorKind::NotFound => "No Airport Found",
            ErrorKind::NetworkError => "Error",
            ErrorKind::InvalidInput => "Invalid Airport Code",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.title())
    }
}

/// Per-resource retrieval state.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchState<R> {
    Loading,
    Ready(R),
    Failed { kind: ErrorKind, message: String },
}

impl<R> FetchState<R> {
    pub fn is_failed(&self) -> bool {
        matches!(self, FetchState::Failed { .. })
    }

    pub fn ready(&self) -> Option<&R> {
        match self {
            FetchState::Ready(record) => Some(record),
            _ => None,
        }
    }
}

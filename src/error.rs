use std::fmt::{self, Display};

use serde::Serialize;

/// Error shape surfaced to the HTTP edge. Every fallible action in this crate
/// resolves into one of these before it leaves the library.
#[derive(Debug, Clone, Serialize)]
pub struct Error {
    pub code: u16,
    pub info: Option<String>,
}

impl Error {
    pub fn new(code: u16, info: Option<String>) -> Self {
        Self { code, info }
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.info {
            Some(info) => write!(f, "{} ({})", self.code, info),
            None => write!(f, "{}", self.code),
        }
    }
}

impl std::error::Error for Error {}

impl warp::reject::Reject for Error {}

/// Error taxonomy. Validation failures map to `InvalidRequest`, permission
/// failures to `Unauthorized`, duplicate toggle entries to `Conflict`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiError {
    InvalidRequest,
    InvalidSession,
    Unauthorized,
    NotFound,
    Conflict,
    InternalServerError,
}

impl ApiError {
    pub fn code(&self) -> u16 {
        match self {
            ApiError::InvalidRequest => 400,
            ApiError::InvalidSession => 401,
            ApiError::Unauthorized => 403,
            ApiError::NotFound => 404,
            ApiError::Conflict => 409,
            ApiError::InternalServerError => 500,
        }
    }

    pub fn new(self, info: &str) -> Error {
        Error::new(self.code(), Some(info.to_string()))
    }

    pub fn default(self) -> Error {
        Error::new(self.code(), None)
    }
}

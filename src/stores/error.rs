use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Duration;

use crate::firestore::FirestoreError;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StoreErrorCode {
    /// No snapshot arrived within the configured wait.
    Timeout,
    /// The realtime listener reported a failure.
    Listener,
    InvalidArgument,
}

impl StoreErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            StoreErrorCode::Timeout => "stores/timeout",
            StoreErrorCode::Listener => "stores/listener",
            StoreErrorCode::InvalidArgument => "stores/invalid-argument",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoreError {
    pub code: StoreErrorCode,
    message: String,
    cause: Option<FirestoreError>,
}

impl StoreError {
    pub fn new(code: StoreErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            cause: None,
        }
    }

    pub fn code_str(&self) -> &'static str {
        self.code.as_str()
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// The database error behind a [`StoreErrorCode::Listener`] failure.
    pub fn cause(&self) -> Option<&FirestoreError> {
        self.cause.as_ref()
    }

    pub fn is_timeout(&self) -> bool {
        self.code == StoreErrorCode::Timeout
    }
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message, self.code_str())
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.cause.as_ref().map(|cause| cause as &(dyn Error + 'static))
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

pub fn timeout(max_wait: Duration) -> StoreError {
    StoreError::new(
        StoreErrorCode::Timeout,
        format!(
            "Timeout at {} ms. Using fallback value.",
            max_wait.as_millis()
        ),
    )
}

pub fn listener_failed(cause: FirestoreError) -> StoreError {
    StoreError {
        code: StoreErrorCode::Listener,
        message: format!("Realtime listener failed: {}", cause.message()),
        cause: Some(cause),
    }
}

pub fn invalid_argument(message: impl Into<String>) -> StoreError {
    StoreError::new(StoreErrorCode::InvalidArgument, message)
}

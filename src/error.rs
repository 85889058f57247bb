//! Application-level error type.
//!
//! Every failure that reaches `main` carries a process exit code:
//!
//! - `2`: bad input, configuration or I/O
//! - `3`: no usable data (empty toy list, histogram too small to fit)
//! - `4`: numerical or rendering failure

use crate::root::RootError;

#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}

impl From<RootError> for AppError {
    fn from(err: RootError) -> Self {
        AppError::new(2, format!("ROOT read failed: {err}"))
    }
}

use crate::inversion::InversionError;

/// Application-level error: a message for the user plus the process exit code.
///
/// Exit codes:
/// - `2`: bad input (files, observations, arguments)
/// - `3`: nothing usable to solve / invalid solve configuration
/// - `4`: numerical failure
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
}

impl From<InversionError> for AppError {
    fn from(err: InversionError) -> Self {
        let exit_code = match &err {
            InversionError::InvalidObservation { .. } => 2,
            InversionError::InvalidConfiguration(_) => 3,
            InversionError::SingularDesignMatrix(_) => 4,
        };
        AppError::new(exit_code, format!("Inversion failed: {err}"))
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

/// Process-level error: a user-facing message plus the exit code `sales` returns.
///
/// Exit codes:
/// - `2`: input/output files (missing raw directory, unreadable or unwritable files)
/// - `3`: schema/data problems that stop a run (required column absent)
/// - `4`: terminal/TUI failures
///
/// Row-level data quality issues are never errors; those rows are filtered and counted.
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

    /// File discovery, read, or write failure.
    pub fn io(message: impl Into<String>) -> Self {
        Self::new(2, message)
    }

    /// Input data that cannot be processed at all.
    pub fn schema(message: impl Into<String>) -> Self {
        Self::new(3, message)
    }

    /// Terminal setup, draw, or event failure.
    pub fn terminal(message: impl Into<String>) -> Self {
        Self::new(4, message)
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

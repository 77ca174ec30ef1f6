use thiserror::Error;

/// Structured error context for configuration and runtime failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorContext {
    /// Configuration key or environment variable that caused the error (e.g., "SAFECIRCUIT_TIMEOUT_MS")
    pub field_path: Option<String>,
    /// Additional context about the error (e.g., the rejected raw value)
    pub details: Option<String>,
    /// Source of the error (e.g., "config::from_env")
    pub source: Option<String>,
}

impl ErrorContext {
    pub fn new() -> Self {
        Self {
            field_path: None,
            details: None,
            source: None,
        }
    }

    pub fn with_field_path(mut self, path: impl Into<String>) -> Self {
        self.field_path = Some(path.into());
        self
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }
}

impl Default for ErrorContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Crate error type for everything that is not the outcome of a guarded call.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Configuration error: {message}{}", format_context(.context))]
    Configuration {
        message: String,
        context: ErrorContext,
    },
}

// Helper function to format error context for display
fn format_context(ctx: &ErrorContext) -> String {
    let mut parts = Vec::new();
    if let Some(ref field) = ctx.field_path {
        parts.push(format!("field: {}", field));
    }
    if let Some(ref details) = ctx.details {
        parts.push(format!("details: {}", details));
    }
    if let Some(ref source) = ctx.source {
        parts.push(format!("source: {}", source));
    }
    if parts.is_empty() {
        String::new()
    } else {
        format!(" ({})", parts.join(", "))
    }
}

impl Error {
    /// Create a new configuration error with structured context
    pub fn configuration_with_context(msg: impl Into<String>, context: ErrorContext) -> Self {
        Error::Configuration {
            message: msg.into(),
            context,
        }
    }

    /// Extract error context if available
    pub fn context(&self) -> Option<&ErrorContext> {
        match self {
            Error::Configuration { context, .. } => Some(context),
        }
    }
}

/// Outcome of a call guarded by a circuit breaker.
///
/// `Open` means the operation was **not** executed. `Operation` means it ran and
/// failed; the wrapped value is exactly what the operation returned.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BreakerError<E> {
    #[error("circuit breaker is open")]
    Open,

    #[error("{0}")]
    Operation(E),
}

impl<E> BreakerError<E> {
    /// True when the call was short-circuited without running the operation.
    pub fn is_open(&self) -> bool {
        matches!(self, BreakerError::Open)
    }

    /// Borrow the operation's error, if the operation ran.
    pub fn operation(&self) -> Option<&E> {
        match self {
            BreakerError::Operation(e) => Some(e),
            BreakerError::Open => None,
        }
    }

    /// Take back the operation's error, if the operation ran.
    pub fn into_operation(self) -> Option<E> {
        match self {
            BreakerError::Operation(e) => Some(e),
            BreakerError::Open => None,
        }
    }

    pub fn map_operation<U, F>(self, f: F) -> BreakerError<U>
    where
        F: FnOnce(E) -> U,
    {
        match self {
            BreakerError::Operation(e) => BreakerError::Operation(f(e)),
            BreakerError::Open => BreakerError::Open,
        }
    }
}

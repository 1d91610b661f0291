//! Observability: structured logging and health reporting

pub mod health;
pub mod logging;

pub use health::{HealthReporter, HealthStatus};
pub use logging::{init_default_logging, init_logging, init_logging_with_level, LogFormat};

// Span macros for structured logging
pub use logging::{api_span, request_span};

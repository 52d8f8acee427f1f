// Shared kernel: configuration, errors, events and logging used by every module

pub mod config; // Environment-driven client configuration
pub mod errors; // Shared error types
pub mod events; // Cross-module publish/subscribe channels
pub mod utils; // Logging helpers

// Re-exports for convenience
pub use config::{AppConfig, ImportEndpoints};
pub use errors::{ApiError, AppError, AppResult};
pub use events::{SessionEvent, SessionEventBus};

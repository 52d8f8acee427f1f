pub mod session_bus;

pub use session_bus::{SessionEvent, SessionEventBus};

pub mod tracker;

pub use tracker::{ImportTracker, StartOutcome, TrackerSettings};

/// Value objects for the import jobs domain
use serde::{Deserialize, Serialize};

/// Opaque server-assigned identifier of one import attempt.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProcessId(String);

impl ProcessId {
    /// Returns `None` for blank identifiers; the backend never assigns one.
    pub fn parse(raw: impl AsRef<str>) -> Option<Self> {
        let trimmed = raw.as_ref().trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ProcessId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ProcessId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Convert a wire progress value into a 0..=100 percentage.
pub fn clamp_progress(raw: f64) -> u8 {
    if raw.is_nan() {
        return 0;
    }
    raw.round().clamp(0.0, 100.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn process_id_rejects_blank() {
        assert!(ProcessId::parse("").is_none());
        assert!(ProcessId::parse("   ").is_none());
        assert_eq!(ProcessId::parse(" abc123 ").unwrap().as_str(), "abc123");
    }

    #[test]
    fn progress_is_clamped_and_rounded() {
        assert_eq!(clamp_progress(-5.0), 0);
        assert_eq!(clamp_progress(42.6), 43);
        assert_eq!(clamp_progress(180.0), 100);
        assert_eq!(clamp_progress(f64::NAN), 0);
    }
}

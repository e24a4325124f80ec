use std::fmt;

/// Result of a pipeline stage that has a defined fallback.
///
/// `Degraded` carries the reason the stage could not produce its value; the
/// caller picks the fallback explicitly instead of catching an error.
#[derive(Debug, Clone, PartialEq)]
pub enum StageOutcome<T> {
    Ok(T),
    Degraded(String),
}

impl<T> StageOutcome<T> {
    pub fn degraded(reason: impl fmt::Display) -> Self {
        StageOutcome::Degraded(reason.to_string())
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, StageOutcome::Degraded(_))
    }

    pub fn ok(self) -> Option<T> {
        match self {
            StageOutcome::Ok(value) => Some(value),
            StageOutcome::Degraded(_) => None,
        }
    }

    /// Returns the value, or the fallback built from the degradation reason.
    pub fn unwrap_or_else<F>(self, fallback: F) -> T
    where
        F: FnOnce(&str) -> T,
    {
        match self {
            StageOutcome::Ok(value) => value,
            StageOutcome::Degraded(reason) => fallback(&reason),
        }
    }
}

impl<T> From<anyhow::Result<T>> for StageOutcome<T> {
    fn from(result: anyhow::Result<T>) -> Self {
        match result {
            Ok(value) => StageOutcome::Ok(value),
            Err(e) => StageOutcome::Degraded(format!("{:#}", e)),
        }
    }
}

//! Error types for configuration and conversion validation.
//!
//! Configuration problems are caught when parameters are built, never
//! clamped. Validation problems reject a whole conversion batch before any
//! result is produced.

use thiserror::Error;

/// Invalid engine or detector parameters.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigurationError {
    #[error("decay window must be a positive number of minutes, got {0}")]
    DecayWindow(f64),

    #[error("half-life must be a positive number of minutes, got {0}")]
    HalfLife(f64),

    #[error("spike window must hold at least one observation, got {0}")]
    SpikeWindow(usize),

    #[error("z-score threshold must be finite, got {0}")]
    ZThreshold(f64),

    #[error("invalid value for {key}: {raw:?}")]
    Override { key: &'static str, raw: String },
}

/// A conversion that cannot be attributed.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("conversion #{index} has negative value {value}")]
    NegativeValue { index: usize, value: f64 },

    #[error("conversion #{index} has non-finite value {value}")]
    NonFiniteValue { index: usize, value: f64 },
}

impl ValidationError {
    /// Position of the offending conversion in its batch.
    pub fn index(&self) -> usize {
        match self {
            Self::NegativeValue { index, .. } | Self::NonFiniteValue { index, .. } => *index,
        }
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error(transparent)]
    Validation(#[from] ValidationError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_offending_input() {
        let e = ValidationError::NegativeValue {
            index: 4,
            value: -2.5,
        };
        assert_eq!(e.to_string(), "conversion #4 has negative value -2.5");
        assert_eq!(e.index(), 4);

        let c = ConfigurationError::HalfLife(0.0);
        assert!(c.to_string().contains("half-life"));
    }

    #[test]
    fn umbrella_error_wraps_both_kinds() {
        let e: Error = ConfigurationError::SpikeWindow(0).into();
        assert!(matches!(e, Error::Configuration(_)));
        let e: Error = ValidationError::NonFiniteValue {
            index: 0,
            value: f64::NAN,
        }
        .into();
        assert!(matches!(e, Error::Validation(_)));
    }
}

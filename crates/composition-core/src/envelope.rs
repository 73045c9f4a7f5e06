//! Ducking envelopes for clip audio under narration.

use splicer_common::approx_le;
use splicer_timeline_model::Envelope;

use crate::config::EnvelopeConfig;
use crate::error::{CompositionError, CompositionResult};

/// Builds [`Envelope`]s from configured fade and volume settings.
///
/// The generator never shrinks a fade to make it fit; a window shorter
/// than two fades is reported so the caller can change the settings.
pub struct EnvelopeGenerator {
    config: EnvelopeConfig,
}

impl EnvelopeGenerator {
    pub fn new(config: EnvelopeConfig) -> Self {
        Self { config }
    }

    pub fn with_defaults() -> Self {
        Self::new(EnvelopeConfig::default())
    }

    pub fn config(&self) -> &EnvelopeConfig {
        &self.config
    }

    /// Envelope ducking `[duck_start, duck_end)`.
    pub fn generate(&self, duck_start: f64, duck_end: f64) -> CompositionResult<Envelope> {
        let EnvelopeConfig {
            fade_duration,
            duck_volume,
            base_volume,
        } = self.config;

        if !duck_start.is_finite() || !duck_end.is_finite() || duck_end < duck_start {
            return Err(CompositionError::InvalidEnvelope {
                reason: format!("window [{duck_start}, {duck_end}) is not a forward time range"),
            });
        }
        if !fade_duration.is_finite() || fade_duration < 0.0 {
            return Err(CompositionError::InvalidEnvelope {
                reason: format!("fade duration {fade_duration} must be >= 0"),
            });
        }
        for (name, volume) in [("duck_volume", duck_volume), ("base_volume", base_volume)] {
            if !(0.0..=1.0).contains(&volume) {
                return Err(CompositionError::InvalidEnvelope {
                    reason: format!("{name} {volume} outside [0, 1]"),
                });
            }
        }
        if !approx_le(2.0 * fade_duration, duck_end - duck_start) {
            return Err(CompositionError::EnvelopeTooShort {
                duck_start,
                duck_end,
                fade_duration,
            });
        }

        Ok(Envelope {
            duck_start,
            duck_end,
            fade_duration,
            base_volume,
            duck_volume,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_default() {
        let env = EnvelopeGenerator::with_defaults().generate(27.5, 35.0).unwrap();
        assert_eq!(env.duck_start, 27.5);
        assert_eq!(env.duck_end, 35.0);
        assert_eq!(env.fade_duration, 0.5);
        assert_eq!(env.duck_volume, 0.3);
        assert_eq!(env.base_volume, 1.0);
        assert!((env.volume_at(28.0) - 0.3).abs() < 1e-9);
    }

    #[test]
    fn test_window_exactly_two_fades() {
        let env = EnvelopeGenerator::with_defaults().generate(10.0, 11.0).unwrap();
        assert_eq!(env.volume_at(10.0), 1.0);
        assert!((env.volume_at(10.5) - 0.3).abs() < 1e-9);
        assert_eq!(env.volume_at(11.0), 1.0);
    }

    #[test]
    fn test_too_short() {
        let err = EnvelopeGenerator::with_defaults().generate(10.0, 10.8).unwrap_err();
        assert_eq!(
            err,
            CompositionError::EnvelopeTooShort {
                duck_start: 10.0,
                duck_end: 10.8,
                fade_duration: 0.5
            }
        );
    }

    #[test]
    fn test_rejects_bad_volumes_and_windows() {
        let loud = EnvelopeGenerator::new(EnvelopeConfig {
            duck_volume: 1.2,
            ..EnvelopeConfig::default()
        });
        assert!(matches!(
            loud.generate(0.0, 5.0),
            Err(CompositionError::InvalidEnvelope { .. })
        ));

        assert!(matches!(
            EnvelopeGenerator::with_defaults().generate(5.0, 4.0),
            Err(CompositionError::InvalidEnvelope { .. })
        ));
    }
}

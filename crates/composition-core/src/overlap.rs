//! Overlap scheduling between breaks and the narration that follows.
//!
//! Narration may resume while a break's clip is still finishing. The
//! scheduler decides, for every break directly followed by narration, how
//! many seconds the two share. Narration never starts over the head of a
//! clip, so only break-to-narration boundaries get an overlap.
//!
//! # Truncation
//!
//! After the policy and the global cap, an overlap that would swallow
//! either neighbour is cut back to leave it `epsilon_secs` of its own. A
//! neighbour shorter than that cannot be fitted and the run fails.

use serde::{Deserialize, Serialize};
use splicer_timeline_model::{Segment, SegmentKind};

use crate::config::{DynamicTiers, OverlapPolicy, SchedulerConfig};
use crate::error::{CompositionError, CompositionResult};

/// Overlap chosen for one break and the narration after it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverlapDecision {
    pub break_order: u32,
    pub narration_order: u32,
    /// Seconds the narration is pulled under the clip.
    pub overlap_duration: f64,
    /// Whether the overlap had to be cut back to fit a neighbour.
    pub truncated: bool,
}

/// Applies an [`OverlapPolicy`] to a segment run.
pub struct OverlapScheduler {
    config: SchedulerConfig,
}

impl OverlapScheduler {
    pub fn new(config: SchedulerConfig) -> Self {
        Self { config }
    }

    pub fn with_defaults() -> Self {
        Self::new(SchedulerConfig::default())
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// One decision per break that is immediately followed by narration.
    ///
    /// `durations[i]` is the timeline length of `segments[i]`.
    pub fn schedule(
        &self,
        segments: &[Segment],
        durations: &[f64],
    ) -> CompositionResult<Vec<OverlapDecision>> {
        let mut decisions = Vec::new();

        for (index, pair) in segments.windows(2).enumerate() {
            let (brk, next) = (&pair[0], &pair[1]);
            if !brk.is_break() || !matches!(next.kind, SegmentKind::Narration { .. }) {
                continue;
            }

            let break_secs = duration_of(segments, durations, index)?;
            let narration_secs = duration_of(segments, durations, index + 1)?;
            let decision = self.decide(brk.order, next.order, break_secs, narration_secs)?;

            tracing::debug!(
                break_order = decision.break_order,
                narration_order = decision.narration_order,
                overlap = decision.overlap_duration,
                truncated = decision.truncated,
                "Overlap decided"
            );
            decisions.push(decision);
        }

        Ok(decisions)
    }

    /// Overlap for a single break/narration pair.
    pub fn decide(
        &self,
        break_order: u32,
        narration_order: u32,
        break_secs: f64,
        narration_secs: f64,
    ) -> CompositionResult<OverlapDecision> {
        let raw = match &self.config.policy {
            OverlapPolicy::Fixed { secs } => secs.min(break_secs).min(narration_secs),
            OverlapPolicy::Percentage { ratio } => (break_secs * ratio).min(narration_secs),
            OverlapPolicy::Dynamic(tiers) => tiered_overlap(tiers, break_secs).min(narration_secs),
        };
        let mut overlap = raw.min(self.config.max_overlap_secs).max(0.0);
        let mut truncated = false;

        if overlap > 0.0 {
            let epsilon = self.config.epsilon_secs;
            for (order, secs) in [(narration_order, narration_secs), (break_order, break_secs)] {
                if overlap < secs {
                    continue;
                }
                if secs <= epsilon {
                    return Err(CompositionError::OverlapExceedsSegment {
                        break_order,
                        segment_order: order,
                        overlap_secs: overlap,
                        segment_secs: secs,
                    });
                }
                overlap = secs - epsilon;
                truncated = true;
            }
        }

        Ok(OverlapDecision {
            break_order,
            narration_order,
            overlap_duration: overlap,
            truncated,
        })
    }
}

/// Dynamic tiering by break length.
fn tiered_overlap(tiers: &DynamicTiers, break_secs: f64) -> f64 {
    if break_secs < tiers.short_threshold_secs {
        break_secs * tiers.short_ratio
    } else if break_secs < tiers.long_threshold_secs {
        break_secs * tiers.medium_ratio
    } else {
        (break_secs * tiers.long_ratio).min(tiers.long_cap_secs)
    }
}

fn duration_of(segments: &[Segment], durations: &[f64], index: usize) -> CompositionResult<f64> {
    match durations.get(index) {
        Some(secs) if secs.is_finite() && *secs >= 0.0 => Ok(*secs),
        _ => Err(CompositionError::MissingDuration {
            order: segments[index].order,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use splicer_timeline_model::{BreakKind, BreakSpec, ClipSource, DurationRequest};

    fn break_segment(order: u32, secs: f64) -> Segment {
        Segment::break_segment(
            order,
            BreakSpec {
                kind: BreakKind::Action,
                requested: DurationRequest::Exact { secs },
                resolved_duration: secs,
                clip: ClipSource::new("clips/action.mp4", secs),
            },
        )
    }

    fn scheduler(policy: OverlapPolicy) -> OverlapScheduler {
        OverlapScheduler::new(SchedulerConfig {
            policy,
            ..SchedulerConfig::default()
        })
    }

    fn nbn() -> Vec<Segment> {
        vec![
            Segment::narration(0, "Before."),
            break_segment(1, 15.0),
            Segment::narration(2, "After."),
        ]
    }

    #[test]
    fn test_dynamic_medium_tier() {
        let decisions = OverlapScheduler::with_defaults()
            .schedule(&nbn(), &[20.0, 15.0, 17.5])
            .unwrap();
        assert_eq!(decisions.len(), 1);
        assert_eq!(decisions[0].break_order, 1);
        assert_eq!(decisions[0].narration_order, 2);
        assert!((decisions[0].overlap_duration - 7.5).abs() < 1e-9);
        assert!(!decisions[0].truncated);
    }

    #[test]
    fn test_dynamic_tiers() {
        let s = OverlapScheduler::with_defaults();
        let overlap = |b: f64| s.decide(1, 2, b, 100.0).unwrap().overlap_duration;
        assert!((overlap(8.0) - 2.4).abs() < 1e-9);
        assert!((overlap(10.0) - 5.0).abs() < 1e-9);
        // exactly at the long threshold uses the long tier
        assert!((overlap(20.0) - 8.0).abs() < 1e-9);
        assert!((overlap(30.0) - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_fixed_and_percentage() {
        let fixed = scheduler(OverlapPolicy::Fixed { secs: 3.0 });
        assert_eq!(fixed.decide(1, 2, 15.0, 17.5).unwrap().overlap_duration, 3.0);

        let pct = scheduler(OverlapPolicy::Percentage { ratio: 0.4 });
        assert!((pct.decide(1, 2, 15.0, 17.5).unwrap().overlap_duration - 6.0).abs() < 1e-9);
    }

    #[test]
    fn test_global_cap() {
        let pct = scheduler(OverlapPolicy::Percentage { ratio: 0.9 });
        let d = pct.decide(1, 2, 40.0, 60.0).unwrap();
        assert_eq!(d.overlap_duration, 10.0);
    }

    #[test]
    fn test_truncates_against_short_narration() {
        let fixed = scheduler(OverlapPolicy::Fixed { secs: 5.0 });
        let d = fixed.decide(1, 2, 15.0, 2.0).unwrap();
        assert!((d.overlap_duration - 1.95).abs() < 1e-9);
        assert!(d.truncated);
    }

    #[test]
    fn test_truncates_against_break() {
        let fixed = scheduler(OverlapPolicy::Fixed { secs: 8.0 });
        let d = fixed.decide(1, 2, 6.0, 30.0).unwrap();
        assert!((d.overlap_duration - 5.95).abs() < 1e-9);
        assert!(d.truncated);
    }

    #[test]
    fn test_narration_shorter_than_epsilon_fails() {
        let fixed = scheduler(OverlapPolicy::Fixed { secs: 5.0 });
        let err = fixed.decide(1, 2, 15.0, 0.03).unwrap_err();
        assert!(matches!(
            err,
            CompositionError::OverlapExceedsSegment {
                segment_order: 2,
                ..
            }
        ));
    }

    #[test]
    fn test_zero_overlap_never_fails() {
        let fixed = scheduler(OverlapPolicy::Fixed { secs: 0.0 });
        let d = fixed.decide(1, 2, 15.0, 0.01).unwrap();
        assert_eq!(d.overlap_duration, 0.0);
        assert!(!d.truncated);
    }

    #[test]
    fn test_no_overlap_before_break_or_between_breaks() {
        let segments = vec![
            Segment::narration(0, "Before."),
            break_segment(1, 10.0),
            break_segment(2, 10.0),
            Segment::narration(3, "After."),
        ];
        let decisions = OverlapScheduler::with_defaults()
            .schedule(&segments, &[5.0, 10.0, 10.0, 5.0])
            .unwrap();
        assert_eq!(decisions.len(), 1);
        assert_eq!(decisions[0].break_order, 2);
    }

    #[test]
    fn test_missing_duration() {
        let err = OverlapScheduler::with_defaults()
            .schedule(&nbn(), &[20.0, 15.0])
            .unwrap_err();
        assert_eq!(err, CompositionError::MissingDuration { order: 2 });
    }
}

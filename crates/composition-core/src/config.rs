//! Engine configuration.
//!
//! Every knob the engine reads lives in [`EngineConfig`], passed in
//! explicitly. Nothing is read from the environment, so two engines with
//! different settings can run side by side in one process.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{CompositionError, CompositionResult};

/// Full engine configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub parser: ParserConfig,
    pub scheduler: SchedulerConfig,
    pub envelope: EnvelopeConfig,
    pub layout: LayoutConfig,
}

/// Script parsing settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserConfig {
    /// Shortest break worth cutting to (seconds). A break that resolves
    /// below this after clamping to its clip is rejected.
    pub min_break_secs: f64,

    /// Split a trailing `!`/`?` sentence before a break into an attention
    /// cue even without an explicit `[CUE]` marker.
    pub infer_attention_cues: bool,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            min_break_secs: 4.0,
            infer_attention_cues: false,
        }
    }
}

/// How much a narration following a break is pulled under the clip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "policy", rename_all = "snake_case")]
pub enum OverlapPolicy {
    /// A constant overlap, bounded by both neighbours.
    Fixed { secs: f64 },
    /// A share of the break duration.
    Percentage { ratio: f64 },
    /// A share that depends on how long the break is.
    Dynamic(DynamicTiers),
}

impl Default for OverlapPolicy {
    fn default() -> Self {
        OverlapPolicy::Dynamic(DynamicTiers::default())
    }
}

/// Break-length tiers for [`OverlapPolicy::Dynamic`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DynamicTiers {
    /// Breaks shorter than this use `short_ratio`.
    pub short_threshold_secs: f64,
    /// Breaks shorter than this (and not short) use `medium_ratio`.
    pub long_threshold_secs: f64,
    pub short_ratio: f64,
    pub medium_ratio: f64,
    /// Ratio for long breaks, capped at `long_cap_secs`.
    pub long_ratio: f64,
    pub long_cap_secs: f64,
}

impl Default for DynamicTiers {
    fn default() -> Self {
        Self {
            short_threshold_secs: 10.0,
            long_threshold_secs: 20.0,
            short_ratio: 0.3,
            medium_ratio: 0.5,
            long_ratio: 0.4,
            long_cap_secs: 10.0,
        }
    }
}

/// Overlap scheduling settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    pub policy: OverlapPolicy,

    /// Upper bound on any single overlap (seconds).
    pub max_overlap_secs: f64,

    /// Standalone time a segment keeps when an overlap has to be
    /// truncated against it (seconds).
    pub epsilon_secs: f64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            policy: OverlapPolicy::default(),
            max_overlap_secs: 10.0,
            epsilon_secs: 0.05,
        }
    }
}

/// Clip-audio ducking settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvelopeConfig {
    /// Length of each ramp (seconds).
    pub fade_duration: f64,
    /// Clip volume while narration plays over it.
    pub duck_volume: f64,
    /// Clip volume outside the duck window.
    pub base_volume: f64,
}

impl Default for EnvelopeConfig {
    fn default() -> Self {
        Self {
            fade_duration: 0.5,
            duck_volume: 0.3,
            base_volume: 1.0,
        }
    }
}

/// Track layout settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// Playback rate applied to narration (1.0 = as recorded).
    pub narration_speed: f64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            narration_speed: 1.0,
        }
    }
}

/// Named composition styles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompositionPreset {
    /// Short overlaps and deep ducking for fast-cut content.
    ActionPacked,
    /// Half-break overlaps with gentle ducking.
    Storytelling,
    Educational,
    /// Tiered overlaps with the deepest duck.
    Dramatic,
}

impl CompositionPreset {
    pub const ALL: [CompositionPreset; 4] = [
        CompositionPreset::ActionPacked,
        CompositionPreset::Storytelling,
        CompositionPreset::Educational,
        CompositionPreset::Dramatic,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CompositionPreset::ActionPacked => "action_packed",
            CompositionPreset::Storytelling => "storytelling",
            CompositionPreset::Educational => "educational",
            CompositionPreset::Dramatic => "dramatic",
        }
    }

    /// Engine configuration for this preset, defaults elsewhere.
    pub fn config(self) -> EngineConfig {
        let (policy, duck_volume, narration_speed) = match self {
            CompositionPreset::ActionPacked => {
                (OverlapPolicy::Percentage { ratio: 0.3 }, 0.2, 1.3)
            }
            CompositionPreset::Storytelling => {
                (OverlapPolicy::Percentage { ratio: 0.5 }, 0.3, 1.1)
            }
            CompositionPreset::Educational => {
                (OverlapPolicy::Percentage { ratio: 0.4 }, 0.25, 1.0)
            }
            CompositionPreset::Dramatic => {
                (OverlapPolicy::Dynamic(DynamicTiers::default()), 0.15, 0.9)
            }
        };

        EngineConfig {
            scheduler: SchedulerConfig {
                policy,
                ..SchedulerConfig::default()
            },
            envelope: EnvelopeConfig {
                duck_volume,
                ..EnvelopeConfig::default()
            },
            layout: LayoutConfig { narration_speed },
            ..EngineConfig::default()
        }
    }
}

impl fmt::Display for CompositionPreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CompositionPreset {
    type Err = CompositionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase().replace('-', "_");
        Self::ALL
            .into_iter()
            .find(|p| p.as_str() == wanted)
            .ok_or_else(|| CompositionError::invalid_config("preset", format!("unknown preset '{s}'")))
    }
}

impl EngineConfig {
    /// Reject settings the engine cannot work with.
    pub fn validate(&self) -> CompositionResult<()> {
        let p = &self.parser;
        non_negative("parser.min_break_secs", p.min_break_secs)?;

        let s = &self.scheduler;
        match &s.policy {
            OverlapPolicy::Fixed { secs } => non_negative("scheduler.policy.secs", *secs)?,
            OverlapPolicy::Percentage { ratio } => unit_interval("scheduler.policy.ratio", *ratio)?,
            OverlapPolicy::Dynamic(tiers) => tiers.validate()?,
        }
        non_negative("scheduler.max_overlap_secs", s.max_overlap_secs)?;
        positive("scheduler.epsilon_secs", s.epsilon_secs)?;

        let e = &self.envelope;
        non_negative("envelope.fade_duration", e.fade_duration)?;
        unit_interval("envelope.duck_volume", e.duck_volume)?;
        unit_interval("envelope.base_volume", e.base_volume)?;

        positive("layout.narration_speed", self.layout.narration_speed)?;
        Ok(())
    }
}

impl DynamicTiers {
    fn validate(&self) -> CompositionResult<()> {
        positive("scheduler.policy.short_threshold_secs", self.short_threshold_secs)?;
        positive("scheduler.policy.long_threshold_secs", self.long_threshold_secs)?;
        if self.long_threshold_secs < self.short_threshold_secs {
            return Err(CompositionError::invalid_config(
                "scheduler.policy.long_threshold_secs",
                "must not be below short_threshold_secs",
            ));
        }
        unit_interval("scheduler.policy.short_ratio", self.short_ratio)?;
        unit_interval("scheduler.policy.medium_ratio", self.medium_ratio)?;
        unit_interval("scheduler.policy.long_ratio", self.long_ratio)?;
        non_negative("scheduler.policy.long_cap_secs", self.long_cap_secs)
    }
}

fn non_negative(field: &str, value: f64) -> CompositionResult<()> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(CompositionError::invalid_config(
            field,
            format!("expected a finite value >= 0, got {value}"),
        ))
    }
}

fn positive(field: &str, value: f64) -> CompositionResult<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(CompositionError::invalid_config(
            field,
            format!("expected a finite value > 0, got {value}"),
        ))
    }
}

fn unit_interval(field: &str, value: f64) -> CompositionResult<()> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(CompositionError::invalid_config(
            field,
            format!("expected a value in [0, 1], got {value}"),
        ))
    }
}

//! Script segment types.
//!
//! A script is parsed once into an ordered run of segments. Segments
//! are never mutated afterwards; everything downstream (overlap
//! decisions, envelopes, timeline entries) is derived from them.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::sources::ClipSource;

/// One ordered unit of the script.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    /// Position in the script. Starts at 0 and increases by one per segment.
    pub order: u32,

    /// What this segment is, with its kind-specific payload.
    #[serde(flatten)]
    pub kind: SegmentKind,
}

/// Discriminated union of segment kinds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SegmentKind {
    /// Narrated text, spoken by the synthesized voice.
    Narration { text: String },

    /// Short clause right before a break, rendered with distinct
    /// treatment (bright background, no overlays).
    AttentionCue { text: String },

    /// The original source clip plays with its own audio.
    Break(BreakSpec),
}

/// Field-less tag of a [`SegmentKind`], carried on timeline entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SegmentTag {
    Narration,
    AttentionCue,
    Break,
}

/// Payload of a break segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BreakSpec {
    /// Stylistic tag from the marker. Not interpreted by the engine.
    pub kind: BreakKind,

    /// Duration as written in the marker.
    pub requested: DurationRequest,

    /// Requested duration after clamping to the clip's available length.
    pub resolved_duration: f64,

    /// The clip this break plays.
    pub clip: ClipSource,
}

/// Duration requested by a break marker.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum DurationRequest {
    /// A single value, e.g. `duration=15s`.
    Exact { secs: f64 },
    /// An inclusive range, e.g. `duration=10-15s`.
    Range { min_secs: f64, max_secs: f64 },
}

impl DurationRequest {
    /// The value the range stands for: the value itself or the midpoint.
    pub fn nominal_secs(&self) -> f64 {
        match self {
            DurationRequest::Exact { secs } => *secs,
            DurationRequest::Range { min_secs, max_secs } => (min_secs + max_secs) / 2.0,
        }
    }
}

/// Break-kind tag, e.g. `action` or `punchline`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum BreakKind {
    Intro,
    Action,
    Punchline,
    Full,
    /// Any other tag, kept verbatim (lowercased).
    Custom(String),
}

impl BreakKind {
    pub fn as_str(&self) -> &str {
        match self {
            BreakKind::Intro => "intro",
            BreakKind::Action => "action",
            BreakKind::Punchline => "punchline",
            BreakKind::Full => "full",
            BreakKind::Custom(tag) => tag,
        }
    }
}

impl From<String> for BreakKind {
    fn from(tag: String) -> Self {
        match tag.to_ascii_lowercase().as_str() {
            "intro" => BreakKind::Intro,
            "action" => BreakKind::Action,
            "punchline" => BreakKind::Punchline,
            "full" => BreakKind::Full,
            other => BreakKind::Custom(other.to_string()),
        }
    }
}

impl From<&str> for BreakKind {
    fn from(tag: &str) -> Self {
        BreakKind::from(tag.to_string())
    }
}

impl From<BreakKind> for String {
    fn from(kind: BreakKind) -> Self {
        kind.as_str().to_string()
    }
}

impl FromStr for BreakKind {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(BreakKind::from(s))
    }
}

impl fmt::Display for BreakKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Segment {
    /// Create a narration segment.
    pub fn narration(order: u32, text: impl Into<String>) -> Self {
        Self {
            order,
            kind: SegmentKind::Narration { text: text.into() },
        }
    }

    /// Create an attention cue segment.
    pub fn attention_cue(order: u32, text: impl Into<String>) -> Self {
        Self {
            order,
            kind: SegmentKind::AttentionCue { text: text.into() },
        }
    }

    /// Create a break segment.
    pub fn break_segment(order: u32, spec: BreakSpec) -> Self {
        Self {
            order,
            kind: SegmentKind::Break(spec),
        }
    }

    pub fn tag(&self) -> SegmentTag {
        match &self.kind {
            SegmentKind::Narration { .. } => SegmentTag::Narration,
            SegmentKind::AttentionCue { .. } => SegmentTag::AttentionCue,
            SegmentKind::Break(_) => SegmentTag::Break,
        }
    }

    /// Narration or cue text; `None` for breaks.
    pub fn text(&self) -> Option<&str> {
        match &self.kind {
            SegmentKind::Narration { text } | SegmentKind::AttentionCue { text } => Some(text),
            SegmentKind::Break(_) => None,
        }
    }

    /// Whether this segment is voiced by the narration recording.
    pub fn is_speech(&self) -> bool {
        !self.is_break()
    }

    pub fn is_break(&self) -> bool {
        matches!(self.kind, SegmentKind::Break(_))
    }

    pub fn as_break(&self) -> Option<&BreakSpec> {
        match &self.kind {
            SegmentKind::Break(spec) => Some(spec),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn action_break(order: u32) -> Segment {
        Segment::break_segment(
            order,
            BreakSpec {
                kind: BreakKind::Action,
                requested: DurationRequest::Range {
                    min_secs: 10.0,
                    max_secs: 15.0,
                },
                resolved_duration: 12.5,
                clip: ClipSource::new("clips/action.mp4", 30.0),
            },
        )
    }

    #[test]
    fn test_range_nominal_is_midpoint() {
        let req = DurationRequest::Range {
            min_secs: 10.0,
            max_secs: 15.0,
        };
        assert!((req.nominal_secs() - 12.5).abs() < 1e-9);
        assert_eq!(DurationRequest::Exact { secs: 20.0 }.nominal_secs(), 20.0);
    }

    #[test]
    fn test_break_kind_parsing() {
        assert_eq!(BreakKind::from("ACTION"), BreakKind::Action);
        assert_eq!(BreakKind::from("punchline"), BreakKind::Punchline);
        assert_eq!(
            BreakKind::from("Reaction"),
            BreakKind::Custom("reaction".to_string())
        );
        assert_eq!(BreakKind::Custom("reaction".into()).to_string(), "reaction");
    }

    #[test]
    fn test_segment_accessors() {
        let n = Segment::narration(0, "Hello there.");
        assert_eq!(n.tag(), SegmentTag::Narration);
        assert_eq!(n.text(), Some("Hello there."));
        assert!(n.is_speech());

        let b = action_break(1);
        assert!(b.is_break());
        assert_eq!(b.text(), None);
        assert_eq!(b.as_break().unwrap().resolved_duration, 12.5);
    }

    #[test]
    fn test_segment_json_shape() {
        let json = serde_json::to_value(action_break(2)).unwrap();
        assert_eq!(json["order"], 2);
        assert_eq!(json["type"], "break");
        assert_eq!(json["kind"], "action");
        assert_eq!(json["requested"]["mode"], "range");

        let cue = serde_json::to_value(Segment::attention_cue(1, "Watch this!")).unwrap();
        assert_eq!(cue["type"], "attention_cue");
        assert_eq!(cue["text"], "Watch this!");
    }

    #[test]
    fn test_segment_roundtrip() {
        let original = action_break(3);
        let json = serde_json::to_string(&original).unwrap();
        let parsed: Segment = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, original);
    }
}

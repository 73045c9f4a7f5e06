//! Payloads produced by upstream collaborators.
//!
//! These are the finished results of clip resolution, speech synthesis,
//! transcription, and overlay placement. The engine only ever sees them
//! after every producer has completed.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::segment::BreakKind;

/// A source clip a break can play.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClipSource {
    /// Reference to the clip media (path or URI), opaque to the engine.
    pub source: String,

    /// Playable length of the clip in seconds.
    pub available_duration: f64,
}

impl ClipSource {
    pub fn new(source: impl Into<String>, available_duration: f64) -> Self {
        Self {
            source: source.into(),
            available_duration,
        }
    }
}

/// Lookup of the clip that backs a break kind.
pub trait ClipLookup {
    /// The clip for `kind`, or `None` if no clip was cut for it.
    fn clip_for(&self, kind: &BreakKind) -> Option<&ClipSource>;
}

/// Resolved clips keyed by break kind.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClipCatalog {
    clips: BTreeMap<BreakKind, ClipSource>,
}

impl ClipCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) the clip for a break kind.
    pub fn insert(&mut self, kind: BreakKind, clip: ClipSource) {
        self.clips.insert(kind, clip);
    }

    /// Builder-style [`ClipCatalog::insert`].
    pub fn with_clip(mut self, kind: impl Into<BreakKind>, clip: ClipSource) -> Self {
        self.insert(kind.into(), clip);
        self
    }

    pub fn len(&self) -> usize {
        self.clips.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clips.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&BreakKind, &ClipSource)> {
        self.clips.iter()
    }
}

impl ClipLookup for ClipCatalog {
    fn clip_for(&self, kind: &BreakKind) -> Option<&ClipSource> {
        self.clips.get(kind)
    }
}

impl FromIterator<(BreakKind, ClipSource)> for ClipCatalog {
    fn from_iter<I: IntoIterator<Item = (BreakKind, ClipSource)>>(iter: I) -> Self {
        Self {
            clips: iter.into_iter().collect(),
        }
    }
}

/// The single synthesized narration recording.
///
/// One recording covers every narration and cue segment back-to-back in
/// source order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NarrationAudio {
    /// Reference to the audio artifact.
    pub source: String,

    /// Total length of the recording in seconds.
    pub total_duration: f64,

    /// Interior boundaries between consecutive speech segments, if the
    /// synthesizer reported them. `n` speech segments need `n - 1` cut
    /// points. When absent, boundaries are derived from the transcript.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cut_points: Option<Vec<f64>>,
}

impl NarrationAudio {
    pub fn new(source: impl Into<String>, total_duration: f64) -> Self {
        Self {
            source: source.into(),
            total_duration,
            cut_points: None,
        }
    }

    /// Attach explicit cut points.
    pub fn with_cut_points(mut self, cut_points: Vec<f64>) -> Self {
        self.cut_points = Some(cut_points);
        self
    }
}

/// One transcribed word, timed against the narration recording.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptWord {
    /// The word as transcribed.
    #[serde(alias = "word")]
    pub text: String,
    /// Start time in the recording (seconds).
    pub start: f64,
    /// End time in the recording (seconds).
    pub end: f64,
}

impl TranscriptWord {
    pub fn new(text: impl Into<String>, start: f64, end: f64) -> Self {
        Self {
            text: text.into(),
            start,
            end,
        }
    }
}

/// Still image or screenshot shown over a speech segment.
///
/// Passed through untouched onto the segment's narration video entry;
/// the engine never looks at the image content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverlayPlacement {
    /// The speech segment this overlay belongs to.
    pub segment_order: u32,

    /// Reference to the image asset.
    pub source: String,

    /// Start time relative to the segment's source window (seconds).
    pub start: f64,

    /// End time relative to the segment's source window (seconds).
    pub end: f64,

    /// Stacking order within the narration video composite.
    #[serde(default = "default_overlay_z_index")]
    pub z_index: i32,
}

fn default_overlay_z_index() -> i32 {
    5
}

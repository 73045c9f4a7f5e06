//! The finished multi-track schedule handed to a renderer.
//!
//! A [`Timeline`] is built once per run by the composition engine and is
//! read-only afterwards. Fields are private so the only ways to obtain one
//! are [`Timeline::from_tracks`], which the assembler calls after
//! validating the layout, and deserialization, which runs
//! [`Timeline::check`] before handing the value out.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use splicer_common::{approx_eq, TimeSpan, TIME_EPSILON};

use crate::envelope::Envelope;
use crate::segment::{BreakKind, SegmentTag};
use crate::sources::OverlayPlacement;

/// Current timeline schema version.
pub const TIMELINE_VERSION: u32 = 1;

/// Stacking order of clip entries.
pub const CLIP_Z_INDEX: i32 = 10;
/// Stacking order of narration entries.
pub const NARRATION_Z_INDEX: i32 = 0;
/// Stacking order of caption words.
pub const CAPTION_Z_INDEX: i32 = 100;

/// Named media tracks of a timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TrackKind {
    NarrationAudio,
    ClipAudio,
    NarrationVideo,
    ClipVideo,
}

impl TrackKind {
    pub const ALL: [TrackKind; 4] = [
        TrackKind::NarrationAudio,
        TrackKind::ClipAudio,
        TrackKind::NarrationVideo,
        TrackKind::ClipVideo,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TrackKind::NarrationAudio => "narrationAudio",
            TrackKind::ClipAudio => "clipAudio",
            TrackKind::NarrationVideo => "narrationVideo",
            TrackKind::ClipVideo => "clipVideo",
        }
    }

    pub fn is_clip(&self) -> bool {
        matches!(self, TrackKind::ClipAudio | TrackKind::ClipVideo)
    }

    pub fn is_audio(&self) -> bool {
        matches!(self, TrackKind::NarrationAudio | TrackKind::ClipAudio)
    }
}

impl std::fmt::Display for TrackKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Name of the captions track in serialized form and diagnostics.
pub const CAPTIONS_TRACK: &str = "captions";

/// One placed piece of media.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineEntry {
    pub track: TrackKind,

    /// Reference to the underlying media (clip or narration recording).
    pub source: String,

    /// Window read from the source, in source seconds.
    pub source_start: f64,
    pub source_end: f64,

    /// Window occupied on the timeline.
    pub timeline_start: f64,
    pub timeline_end: f64,

    /// Ducking curve; only ever present on clip audio.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub envelope: Option<Envelope>,

    pub z_index: i32,

    /// Playback rate. When set, the timeline length is the source length
    /// divided by `speed`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speed: Option<f64>,

    /// Order of the segment this entry realises.
    pub segment_order: u32,

    pub segment_kind: SegmentTag,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub break_kind: Option<BreakKind>,

    /// Image overlays, narration video only. Windows are relative to the
    /// entry's source window.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub overlays: Vec<OverlayPlacement>,
}

impl TimelineEntry {
    pub fn timeline_span(&self) -> TimeSpan {
        TimeSpan::new(self.timeline_start, self.timeline_end)
    }

    pub fn source_span(&self) -> TimeSpan {
        TimeSpan::new(self.source_start, self.source_end)
    }

    pub fn timeline_duration(&self) -> f64 {
        self.timeline_end - self.timeline_start
    }

    pub fn source_duration(&self) -> f64 {
        self.source_end - self.source_start
    }

    /// Playback rate, 1.0 when unset.
    pub fn effective_speed(&self) -> f64 {
        self.speed.unwrap_or(1.0)
    }
}

/// Visual treatment of a caption word.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaptionStyle {
    /// Narration words.
    #[default]
    Normal,
    /// Attention-cue words.
    Emphasis,
}

/// Which piece of a source word a caption carries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WordPart {
    /// The word lies inside one segment.
    #[default]
    Whole,
    /// First piece of a word that crossed a segment boundary.
    Leading,
    /// Any later piece of a split word.
    Continuation,
}

/// A word on the captions track, in timeline coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptionWord {
    pub text: String,
    pub timeline_start: f64,
    pub timeline_end: f64,
    #[serde(default)]
    pub style: CaptionStyle,
    #[serde(default)]
    pub part: WordPart,
    pub segment_order: u32,
}

impl CaptionWord {
    pub fn timeline_span(&self) -> TimeSpan {
        TimeSpan::new(self.timeline_start, self.timeline_end)
    }

    pub fn duration(&self) -> f64 {
        self.timeline_end - self.timeline_start
    }

    pub fn z_index(&self) -> i32 {
        CAPTION_Z_INDEX
    }
}

/// A timeline that breaks one of its structural rules.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{track}: {detail} ({first} / {second})")]
pub struct TimelineError {
    pub track: String,
    pub first: String,
    pub second: String,
    pub detail: String,
}

impl TimelineError {
    fn new(
        track: impl Into<String>,
        first: String,
        second: String,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            track: track.into(),
            first,
            second,
            detail: detail.into(),
        }
    }
}

/// Validated multi-track schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "TimelineDocument")]
pub struct Timeline {
    version: u32,
    total_duration: f64,
    tracks: BTreeMap<TrackKind, Vec<TimelineEntry>>,
    captions: Vec<CaptionWord>,
}

/// Serialized form, checked before it becomes a [`Timeline`].
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TimelineDocument {
    version: u32,
    total_duration: f64,
    #[serde(default)]
    tracks: BTreeMap<TrackKind, Vec<TimelineEntry>>,
    #[serde(default)]
    captions: Vec<CaptionWord>,
}

impl TryFrom<TimelineDocument> for Timeline {
    type Error = TimelineError;

    fn try_from(doc: TimelineDocument) -> Result<Self, Self::Error> {
        let rebuilt = Timeline::from_tracks(doc.tracks, doc.captions);
        let timeline = Timeline {
            version: doc.version,
            total_duration: doc.total_duration,
            ..rebuilt
        };
        timeline.check()?;
        Ok(timeline)
    }
}

impl Timeline {
    /// Wrap already-validated tracks.
    ///
    /// Entries are sorted by `timeline_start` per track and
    /// `total_duration` is derived from the latest end across every
    /// track, captions included. All four media tracks are present in the
    /// result, possibly empty.
    pub fn from_tracks(
        mut tracks: BTreeMap<TrackKind, Vec<TimelineEntry>>,
        mut captions: Vec<CaptionWord>,
    ) -> Self {
        for kind in TrackKind::ALL {
            tracks.entry(kind).or_default();
        }
        for entries in tracks.values_mut() {
            entries.sort_by(|a, b| a.timeline_start.total_cmp(&b.timeline_start));
        }
        captions.sort_by(|a, b| a.timeline_start.total_cmp(&b.timeline_start));

        let media_end = tracks
            .values()
            .flatten()
            .map(|e| e.timeline_end)
            .fold(0.0_f64, f64::max);
        let caption_end = captions
            .iter()
            .map(|c| c.timeline_end)
            .fold(0.0_f64, f64::max);

        Self {
            version: TIMELINE_VERSION,
            total_duration: media_end.max(caption_end),
            tracks,
            captions,
        }
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn total_duration(&self) -> f64 {
        self.total_duration
    }

    /// Entries of one media track, ordered by `timeline_start`.
    pub fn entries(&self, kind: TrackKind) -> &[TimelineEntry] {
        self.tracks.get(&kind).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Caption words, ordered by `timeline_start`.
    pub fn captions(&self) -> &[CaptionWord] {
        &self.captions
    }

    /// All media tracks with their entries.
    pub fn media_tracks(&self) -> impl Iterator<Item = (TrackKind, &[TimelineEntry])> {
        self.tracks.iter().map(|(k, v)| (*k, v.as_slice()))
    }

    /// Every media entry across all tracks.
    pub fn all_entries(&self) -> impl Iterator<Item = &TimelineEntry> {
        self.tracks.values().flatten()
    }

    /// Structural checks that need nothing but the timeline itself.
    ///
    /// - the schema version is one this build understands
    /// - entries end after they start and fill their source at their speed
    /// - entries on one track never overlap
    /// - `total_duration` is the latest end on any track
    /// - every caption sits inside some narration audio entry
    pub fn check(&self) -> Result<(), TimelineError> {
        if self.version == 0 || self.version > TIMELINE_VERSION {
            return Err(TimelineError::new(
                "timeline",
                format!("version {}", self.version),
                format!("supported {TIMELINE_VERSION}"),
                "unsupported timeline version",
            ));
        }

        let mut latest_end: f64 = 0.0;
        for (kind, entries) in self.media_tracks() {
            for entry in entries {
                latest_end = latest_end.max(entry.timeline_end);
                if entry.timeline_end < entry.timeline_start {
                    return Err(TimelineError::new(
                        kind.as_str(),
                        describe_entry(entry),
                        describe_entry(entry),
                        "entry ends before it starts",
                    ));
                }
                let expected = entry.source_duration() / entry.effective_speed();
                if (expected - entry.timeline_duration()).abs() > TIME_EPSILON {
                    return Err(TimelineError::new(
                        kind.as_str(),
                        describe_entry(entry),
                        describe_entry(entry),
                        format!(
                            "source length {:.6}s at speed {} does not fill {:.6}s",
                            entry.source_duration(),
                            entry.effective_speed(),
                            entry.timeline_duration()
                        ),
                    ));
                }
            }

            for pair in entries.windows(2) {
                if pair[0].timeline_span().overlaps(&pair[1].timeline_span()) {
                    return Err(TimelineError::new(
                        kind.as_str(),
                        describe_entry(&pair[0]),
                        describe_entry(&pair[1]),
                        "entries overlap",
                    ));
                }
            }
        }

        for word in &self.captions {
            latest_end = latest_end.max(word.timeline_end);
        }
        if !approx_eq(latest_end, self.total_duration) {
            return Err(TimelineError::new(
                "timeline",
                format!("total {:.6}", self.total_duration),
                format!("latest end {latest_end:.6}"),
                "total duration does not match the latest entry",
            ));
        }

        let narration = self.entries(TrackKind::NarrationAudio);
        for word in &self.captions {
            let span = word.timeline_span();
            if !narration.iter().any(|e| e.timeline_span().encloses(&span)) {
                let nearest = narration
                    .iter()
                    .min_by(|a, b| {
                        let da = (a.timeline_start - span.start).abs();
                        let db = (b.timeline_start - span.start).abs();
                        da.total_cmp(&db)
                    })
                    .map(describe_entry)
                    .unwrap_or_else(|| "no narration".to_string());
                return Err(TimelineError::new(
                    CAPTIONS_TRACK,
                    format!(
                        "caption {:?} [{:.3}, {:.3})",
                        word.text, word.timeline_start, word.timeline_end
                    ),
                    nearest,
                    "caption lies outside narration audio",
                ));
            }
        }

        Ok(())
    }
}

/// Short description of an entry for diagnostics.
pub fn describe_entry(entry: &TimelineEntry) -> String {
    format!(
        "segment {} [{:.3}, {:.3})",
        entry.segment_order, entry.timeline_start, entry.timeline_end
    )
}

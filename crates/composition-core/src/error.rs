//! Composition failures.

use splicer_common::SplicerError;
use thiserror::Error;

/// Every way a composition run can fail.
///
/// Nothing is retried inside the engine; callers decide whether to adjust
/// configuration or re-run an upstream producer.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CompositionError {
    #[error("Malformed marker {marker:?} at byte {offset}: {reason}")]
    MalformedMarker {
        marker: String,
        offset: usize,
        reason: String,
    },

    #[error("Script contains no narration text")]
    EmptyScript,

    #[error("Break segment {order} has no narration on either side")]
    OrphanBreak { order: u32 },

    #[error(
        "Break segment {order} resolves to {resolved_secs:.3}s \
         (requested {requested_secs:.3}s, clip has {available_secs:.3}s, minimum {min_secs:.3}s)"
    )]
    InvalidBreakDuration {
        order: u32,
        requested_secs: f64,
        available_secs: f64,
        resolved_secs: f64,
        min_secs: f64,
    },

    #[error("No clip available for break kind '{kind}'")]
    ClipNotFound { kind: String },

    #[error(
        "Overlap of {overlap_secs:.3}s after break {break_order} leaves no room in segment \
         {segment_order} ({segment_secs:.3}s)"
    )]
    OverlapExceedsSegment {
        break_order: u32,
        segment_order: u32,
        overlap_secs: f64,
        segment_secs: f64,
    },

    #[error(
        "Duck window [{duck_start:.3}, {duck_end:.3}) is too short for two {fade_duration:.3}s fades"
    )]
    EnvelopeTooShort {
        duck_start: f64,
        duck_end: f64,
        fade_duration: f64,
    },

    #[error("Invalid envelope: {reason}")]
    InvalidEnvelope { reason: String },

    #[error(
        "Caption word {word:?} at source time {source_time:.3}s is outside every segment \
         (nearest: {nearest_segment:?})"
    )]
    CaptionOutOfRange {
        word: String,
        source_time: f64,
        nearest_segment: Option<u32>,
    },

    #[error("Invalid narration source map: {reason}")]
    InvalidSourceMap { reason: String },

    #[error("Timeline inconsistent on track {track}: {detail} ({first} vs {second})")]
    TimelineInconsistent {
        track: String,
        first: String,
        second: String,
        detail: String,
    },

    #[error("Invalid configuration for {field}: {reason}")]
    InvalidConfig { field: String, reason: String },

    #[error("No usable duration for segment {order}")]
    MissingDuration { order: u32 },

    #[error("Overlay {overlay:?} cannot be placed on segment {segment_order}: {reason}")]
    InvalidOverlay {
        segment_order: u32,
        overlay: String,
        reason: String,
    },
}

/// Broad class of a [`CompositionError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// The script text or its markers are unusable.
    Parse,
    /// Overlap could not be fitted.
    Scheduling,
    /// Ducking parameters do not fit the window.
    Envelope,
    /// Transcript and narration segmentation disagree.
    Mapping,
    /// The engine produced an inconsistent layout. Always a bug.
    Invariant,
    /// Configuration or collaborator payloads are unusable.
    Input,
}

impl CompositionError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            CompositionError::MalformedMarker { .. }
            | CompositionError::EmptyScript
            | CompositionError::OrphanBreak { .. }
            | CompositionError::InvalidBreakDuration { .. }
            | CompositionError::ClipNotFound { .. } => ErrorCategory::Parse,
            CompositionError::OverlapExceedsSegment { .. } => ErrorCategory::Scheduling,
            CompositionError::EnvelopeTooShort { .. } | CompositionError::InvalidEnvelope { .. } => {
                ErrorCategory::Envelope
            }
            CompositionError::CaptionOutOfRange { .. }
            | CompositionError::InvalidSourceMap { .. } => ErrorCategory::Mapping,
            CompositionError::TimelineInconsistent { .. } => ErrorCategory::Invariant,
            CompositionError::InvalidConfig { .. }
            | CompositionError::MissingDuration { .. }
            | CompositionError::InvalidOverlay { .. } => ErrorCategory::Input,
        }
    }

    pub(crate) fn malformed(
        marker: impl Into<String>,
        offset: usize,
        reason: impl Into<String>,
    ) -> Self {
        Self::MalformedMarker {
            marker: marker.into(),
            offset,
            reason: reason.into(),
        }
    }

    pub(crate) fn invalid_config(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn source_map(reason: impl Into<String>) -> Self {
        Self::InvalidSourceMap {
            reason: reason.into(),
        }
    }
}

/// Result alias for composition operations.
pub type CompositionResult<T> = Result<T, CompositionError>;

impl From<CompositionError> for SplicerError {
    fn from(err: CompositionError) -> Self {
        SplicerError::composition(err)
    }
}

//! Interfaces to the upstream producers and the downstream renderer.
//!
//! The engine never talks to these directly. [`crate::TimelineBuilder`]
//! awaits every producer, then hands the finished payloads to the engine.

use std::path::PathBuf;

use splicer_common::error::SplicerResult;
use splicer_composition_core::ParsedScript;
use splicer_timeline_model::{
    BreakKind, ClipSource, NarrationAudio, OverlayPlacement, Timeline, TranscriptWord,
};

/// Finds the source clip cut for a break kind and reports its length.
#[async_trait::async_trait]
pub trait ClipDurationResolver: Send + Sync {
    async fn resolve(&self, kind: &BreakKind) -> SplicerResult<ClipSource>;
}

/// Produces the single narration recording.
#[async_trait::async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Synthesize all speech parts back-to-back into one recording.
    ///
    /// Implementations that know where each part ends should report
    /// those boundaries as cut points.
    async fn synthesize(&self, parts: &[String]) -> SplicerResult<NarrationAudio>;
}

/// Produces word timestamps against the narration recording.
#[async_trait::async_trait]
pub trait Transcriber: Send + Sync {
    async fn transcribe(&self, audio: &NarrationAudio) -> SplicerResult<Vec<TranscriptWord>>;
}

/// Places still images over speech segments.
#[async_trait::async_trait]
pub trait OverlayPlanner: Send + Sync {
    async fn plan(&self, script: &ParsedScript) -> SplicerResult<Vec<OverlayPlacement>>;
}

/// Turns a finished timeline into media.
#[async_trait::async_trait]
pub trait Renderer: Send + Sync {
    /// Render the timeline, returning the output location.
    async fn render(&self, timeline: Timeline) -> SplicerResult<PathBuf>;

    /// Renderer name, for logs.
    fn name(&self) -> &str;
}

/// Planner for scripts without overlays.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOverlays;

#[async_trait::async_trait]
impl OverlayPlanner for NoOverlays {
    async fn plan(&self, _script: &ParsedScript) -> SplicerResult<Vec<OverlayPlacement>> {
        Ok(Vec::new())
    }
}

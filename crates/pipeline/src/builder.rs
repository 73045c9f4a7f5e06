//! Builds a timeline from a script by driving the upstream collaborators.
//!
//! Clip durations are resolved concurrently, then speech synthesis and
//! transcription run alongside overlay planning. The engine only runs once
//! every producer has succeeded; any upstream failure aborts the build.

use std::path::PathBuf;
use std::sync::Arc;

use futures_util::future::try_join_all;
use splicer_common::error::{SplicerError, SplicerResult};
use splicer_composition_core::{
    scan_break_kinds, Composition, CompositionEngine, CompositionInputs, ParsedScript,
};
use splicer_timeline_model::{
    ClipCatalog, NarrationAudio, OverlayPlacement, Timeline, TranscriptWord,
};

use crate::collaborators::{
    ClipDurationResolver, NoOverlays, OverlayPlanner, Renderer, SpeechSynthesizer, Transcriber,
};

/// Progress callback for timeline builds.
pub type ProgressCallback = Box<dyn Fn(BuildProgress) + Send + Sync>;

/// Build progress report.
#[derive(Debug, Clone)]
pub struct BuildProgress {
    /// Current progress [0.0, 1.0].
    pub progress: f64,

    /// Current stage.
    pub stage: BuildStage,
}

/// Stages of a timeline build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildStage {
    ResolvingClips,
    Parsing,
    Synthesizing,
    Composing,
    Rendering,
    Complete,
    Failed,
}

impl BuildStage {
    /// Fraction of the build done when this stage starts.
    pub fn progress(&self) -> f64 {
        match self {
            BuildStage::ResolvingClips => 0.0,
            BuildStage::Parsing => 0.15,
            BuildStage::Synthesizing => 0.25,
            BuildStage::Composing => 0.7,
            BuildStage::Rendering => 0.8,
            BuildStage::Complete | BuildStage::Failed => 1.0,
        }
    }
}

/// Everything a build produced, upstream payloads included.
#[derive(Debug, Clone)]
pub struct BuildOutput {
    pub script: ParsedScript,
    pub clips: ClipCatalog,
    pub narration: NarrationAudio,
    pub transcript: Vec<TranscriptWord>,
    pub overlays: Vec<OverlayPlacement>,
    pub composition: Composition,
}

impl BuildOutput {
    pub fn timeline(&self) -> &Timeline {
        &self.composition.timeline
    }

    pub fn into_timeline(self) -> Timeline {
        self.composition.timeline
    }
}

/// Drives collaborators and the composition engine for one script.
pub struct TimelineBuilder {
    engine: CompositionEngine,
    clips: Arc<dyn ClipDurationResolver>,
    speech: Arc<dyn SpeechSynthesizer>,
    transcriber: Arc<dyn Transcriber>,
    overlays: Arc<dyn OverlayPlanner>,
    progress: Option<ProgressCallback>,
}

impl TimelineBuilder {
    pub fn new(
        engine: CompositionEngine,
        clips: Arc<dyn ClipDurationResolver>,
        speech: Arc<dyn SpeechSynthesizer>,
        transcriber: Arc<dyn Transcriber>,
    ) -> Self {
        Self {
            engine,
            clips,
            speech,
            transcriber,
            overlays: Arc::new(NoOverlays),
            progress: None,
        }
    }

    pub fn with_overlay_planner(mut self, planner: Arc<dyn OverlayPlanner>) -> Self {
        self.overlays = planner;
        self
    }

    pub fn with_progress(mut self, callback: ProgressCallback) -> Self {
        self.progress = Some(callback);
        self
    }

    pub fn engine(&self) -> &CompositionEngine {
        &self.engine
    }

    /// Build a timeline for `script`.
    pub async fn build(&self, script: &str) -> SplicerResult<BuildOutput> {
        match self.run(script).await {
            Ok(output) => {
                self.report(BuildStage::Complete);
                Ok(output)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Timeline build failed");
                self.report(BuildStage::Failed);
                Err(e)
            }
        }
    }

    /// Build a timeline and hand it to `renderer`.
    pub async fn build_and_render(
        &self,
        script: &str,
        renderer: &dyn Renderer,
    ) -> SplicerResult<PathBuf> {
        let output = match self.run(script).await {
            Ok(output) => output,
            Err(e) => {
                tracing::warn!(error = %e, "Timeline build failed");
                self.report(BuildStage::Failed);
                return Err(e);
            }
        };

        self.report(BuildStage::Rendering);
        tracing::info!(renderer = renderer.name(), "Rendering timeline");
        match renderer.render(output.into_timeline()).await {
            Ok(path) => {
                self.report(BuildStage::Complete);
                Ok(path)
            }
            Err(e) => {
                tracing::warn!(renderer = renderer.name(), error = %e, "Render failed");
                self.report(BuildStage::Failed);
                Err(e)
            }
        }
    }

    async fn run(&self, script: &str) -> SplicerResult<BuildOutput> {
        self.report(BuildStage::ResolvingClips);
        let clips = self.resolve_clips(script).await?;

        self.report(BuildStage::Parsing);
        let parsed = self.engine.parse(script, &clips)?;
        tracing::info!(
            segments = parsed.len(),
            breaks = parsed.breaks().count(),
            "Parsed script"
        );

        self.report(BuildStage::Synthesizing);
        let parts: Vec<String> = parsed
            .speech_parts()
            .into_iter()
            .map(str::to_string)
            .collect();
        let speech = async {
            let audio = self.speech.synthesize(&parts).await?;
            tracing::debug!(
                duration = audio.total_duration,
                cut_points = audio.cut_points.as_ref().map_or(0, Vec::len),
                "Narration synthesized"
            );
            let words = self.transcriber.transcribe(&audio).await?;
            Ok::<_, SplicerError>((audio, words))
        };
        let ((narration, transcript), overlays) =
            tokio::try_join!(speech, self.overlays.plan(&parsed))?;

        self.report(BuildStage::Composing);
        let composition = self.engine.compose_detailed(
            &parsed,
            CompositionInputs::new(&narration, &transcript).with_overlays(&overlays),
        )?;
        tracing::info!(
            total_duration = composition.timeline.total_duration(),
            captions = composition.timeline.captions().len(),
            "Timeline composed"
        );

        Ok(BuildOutput {
            script: parsed,
            clips,
            narration,
            transcript,
            overlays,
            composition,
        })
    }

    async fn resolve_clips(&self, script: &str) -> SplicerResult<ClipCatalog> {
        let kinds = scan_break_kinds(script)?;
        let resolved = try_join_all(kinds.into_iter().map(|kind| async move {
            let clip = self.clips.resolve(&kind).await?;
            tracing::debug!(
                kind = kind.as_str(),
                source = %clip.source,
                available = clip.available_duration,
                "Resolved clip"
            );
            Ok::<_, SplicerError>((kind, clip))
        }))
        .await?;

        Ok(resolved.into_iter().collect())
    }

    fn report(&self, stage: BuildStage) {
        if let Some(cb) = &self.progress {
            cb(BuildProgress {
                progress: stage.progress(),
                stage,
            });
        }
    }
}

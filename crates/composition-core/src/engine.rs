//! The composition engine: script plus collaborator payloads to timeline.
//!
//! # Pipeline
//!
//! 1. **Parse** the script into segments, resolving breaks against clips.
//! 2. **Map** the narration recording onto speech segments.
//! 3. **Schedule** overlaps at every break-to-narration boundary.
//! 4. **Lay out** segment windows and remap caption words.
//! 5. **Assemble** tracks, attach envelopes, and validate.
//!
//! Every step is synchronous and deterministic. Identical inputs always
//! give an identical [`Timeline`].

use splicer_timeline_model::{
    ClipLookup, NarrationAudio, OverlayPlacement, Timeline, TranscriptWord,
};

use crate::assembler::{Assembly, TrackAssembler};
use crate::captions::CaptionMapper;
use crate::config::{CompositionPreset, EngineConfig};
use crate::envelope::EnvelopeGenerator;
use crate::error::CompositionResult;
use crate::overlap::{OverlapDecision, OverlapScheduler};
use crate::parser::{ParsedScript, SegmentParser};
use crate::source_map::SourceMap;

/// Upstream results a composition needs besides the script.
#[derive(Debug, Clone, Copy)]
pub struct CompositionInputs<'a> {
    pub narration: &'a NarrationAudio,
    pub transcript: &'a [TranscriptWord],
    pub overlays: &'a [OverlayPlacement],
}

impl<'a> CompositionInputs<'a> {
    pub fn new(narration: &'a NarrationAudio, transcript: &'a [TranscriptWord]) -> Self {
        Self {
            narration,
            transcript,
            overlays: &[],
        }
    }

    pub fn with_overlays(mut self, overlays: &'a [OverlayPlacement]) -> Self {
        self.overlays = overlays;
        self
    }
}

/// A finished composition with the decisions that shaped it.
#[derive(Debug, Clone, PartialEq)]
pub struct Composition {
    pub timeline: Timeline,
    pub decisions: Vec<OverlapDecision>,
    pub source_map: SourceMap,
}

/// Runs parse, schedule, envelope, caption mapping, and assembly with one
/// explicit configuration.
pub struct CompositionEngine {
    config: EngineConfig,
    parser: SegmentParser,
    scheduler: OverlapScheduler,
    mapper: CaptionMapper,
    assembler: TrackAssembler,
}

impl CompositionEngine {
    /// Create an engine, rejecting invalid configuration up front.
    pub fn new(config: EngineConfig) -> CompositionResult<Self> {
        config.validate()?;
        Ok(Self {
            parser: SegmentParser::new(config.parser.clone())?,
            scheduler: OverlapScheduler::new(config.scheduler.clone()),
            mapper: CaptionMapper::new(),
            assembler: TrackAssembler::new(
                config.layout.clone(),
                EnvelopeGenerator::new(config.envelope.clone()),
            ),
            config,
        })
    }

    /// Create an engine with default configuration.
    pub fn with_defaults() -> CompositionResult<Self> {
        Self::new(EngineConfig::default())
    }

    pub fn from_preset(preset: CompositionPreset) -> CompositionResult<Self> {
        Self::new(preset.config())
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Parse a script against resolved clips.
    pub fn parse<L>(&self, script: &str, clips: &L) -> CompositionResult<ParsedScript>
    where
        L: ClipLookup + ?Sized,
    {
        self.parser.parse(script, clips)
    }

    /// Compose a parsed script into a timeline.
    pub fn compose(
        &self,
        script: &ParsedScript,
        inputs: CompositionInputs<'_>,
    ) -> CompositionResult<Timeline> {
        Ok(self.compose_detailed(script, inputs)?.timeline)
    }

    /// Compose and keep the intermediate decisions.
    pub fn compose_detailed(
        &self,
        script: &ParsedScript,
        inputs: CompositionInputs<'_>,
    ) -> CompositionResult<Composition> {
        let segments = script.segments();
        tracing::info!(
            segments = segments.len(),
            words = inputs.transcript.len(),
            overlays = inputs.overlays.len(),
            "Composing timeline"
        );

        let source_map = SourceMap::build(segments, inputs.narration, inputs.transcript)?;
        let durations = self.assembler.segment_durations(segments, &source_map)?;
        let decisions = self.scheduler.schedule(segments, &durations)?;
        let windows = self.assembler.layout(segments, &durations, &decisions)?;
        let speech = self.assembler.speech_windows(&windows, &source_map)?;
        let captions = self.mapper.map(inputs.transcript, &speech)?;

        let timeline = self.assembler.assemble(Assembly {
            segments,
            windows: &windows,
            speech: &speech,
            decisions: &decisions,
            narration: inputs.narration,
            overlays: inputs.overlays,
            captions,
        })?;

        Ok(Composition {
            timeline,
            decisions,
            source_map,
        })
    }

    /// Parse and compose in one call.
    pub fn compose_script<L>(
        &self,
        script: &str,
        clips: &L,
        inputs: CompositionInputs<'_>,
    ) -> CompositionResult<Timeline>
    where
        L: ClipLookup + ?Sized,
    {
        let parsed = self.parse(script, clips)?;
        self.compose(&parsed, inputs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OverlapPolicy;
    use crate::error::CompositionError;
    use splicer_timeline_model::{ClipCatalog, ClipSource, TrackKind};

    const SCRIPT: &str = "The keeper left the gate open. \
                          [VIDEO_BREAK: duration=15s, clip=action] \
                          Everyone ran.";

    fn clips() -> ClipCatalog {
        ClipCatalog::new().with_clip("action", ClipSource::new("clips/action.mp4", 40.0))
    }

    fn transcript() -> Vec<TranscriptWord> {
        vec![
            TranscriptWord::new("The", 0.0, 0.4),
            TranscriptWord::new("keeper", 0.4, 1.0),
            TranscriptWord::new("left", 1.0, 1.3),
            TranscriptWord::new("the", 1.3, 1.5),
            TranscriptWord::new("gate", 1.5, 1.9),
            TranscriptWord::new("open.", 1.9, 2.6),
            TranscriptWord::new("Everyone", 3.0, 3.6),
            TranscriptWord::new("ran.", 3.6, 4.2),
        ]
    }

    #[test]
    fn test_compose_from_transcript_alignment() {
        let engine = CompositionEngine::with_defaults().unwrap();
        let narration = NarrationAudio::new("voiceover.mp3", 4.5);
        let words = transcript();

        let composition = engine
            .compose_detailed(
                &engine.parse(SCRIPT, &clips()).unwrap(),
                CompositionInputs::new(&narration, &words),
            )
            .unwrap();

        let cut = composition.source_map.span_of(0).unwrap().end;
        assert!((cut - 2.8).abs() < 1e-9);
        assert_eq!(composition.decisions.len(), 1);

        let timeline = composition.timeline;
        assert_eq!(timeline.captions().len(), 8);
        let second = &timeline.entries(TrackKind::NarrationAudio)[1];
        let pulled = composition.decisions[0].overlap_duration;
        assert!((second.timeline_start - (2.8 + 15.0 - pulled)).abs() < 1e-9);
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let mut config = EngineConfig::default();
        config.scheduler.policy = OverlapPolicy::Percentage { ratio: 2.0 };
        assert!(matches!(
            CompositionEngine::new(config),
            Err(CompositionError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn test_compose_script_propagates_parse_errors() {
        let engine = CompositionEngine::from_preset(CompositionPreset::Storytelling).unwrap();
        let narration = NarrationAudio::new("voiceover.mp3", 4.5);
        let err = engine
            .compose_script("", &clips(), CompositionInputs::new(&narration, &[]))
            .unwrap_err();
        assert_eq!(err, CompositionError::EmptyScript);
    }
}

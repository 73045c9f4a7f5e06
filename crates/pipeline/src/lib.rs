//! Splicer Pipeline
//!
//! The async step around the composition engine:
//! - **Collaborators:** Traits for clip resolution, speech synthesis, transcription, overlay planning, and rendering
//! - **Builder:** Awaits every upstream producer, then runs the engine once
//! - **Subtitles:** SRT/WebVTT export of the captions track
//! - **Offline:** Replays a prepared script bundle from disk and writes timeline documents

pub mod builder;
pub mod collaborators;
pub mod config;
pub mod offline;
pub mod subtitles;
pub mod transcript;

pub use builder::{BuildOutput, BuildProgress, BuildStage, ProgressCallback, TimelineBuilder};
pub use collaborators::{
    ClipDurationResolver, NoOverlays, OverlayPlanner, Renderer, SpeechSynthesizer, Transcriber,
};
pub use config::PipelineConfig;
pub use offline::{
    read_timeline, write_timeline, DocumentRenderer, FileCollaborators, TimelineDocument,
};
pub use subtitles::{generate_srt, generate_vtt, save_subtitles, SubtitleConfig, SubtitleCue};
pub use transcript::{words_from_phrases, TranscriptPhrase};

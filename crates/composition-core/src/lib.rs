//! Splicer Composition Core: the Timeline Composition Engine
//!
//! Turns a narrated script with break markers into a conflict-free
//! multi-track schedule:
//! - **Parsing:** Split marker text into narration, attention cue, and break segments
//! - **Overlap Scheduling:** Decide how far narration is pulled under each break's clip
//! - **Ducking:** Build volume envelopes for clip audio during those overlaps
//! - **Caption Mapping:** Move word timestamps from the single narration recording onto the timeline
//! - **Assembly:** Place every track and validate the result
//!
//! This crate is pure computation: no I/O, no clocks, no shared state.
//! All inputs are data; all outputs are data.

pub mod assembler;
pub mod captions;
pub mod config;
pub mod engine;
pub mod envelope;
pub mod error;
pub mod overlap;
pub mod parser;
pub mod source_map;

pub use config::{
    CompositionPreset, DynamicTiers, EngineConfig, EnvelopeConfig, LayoutConfig, OverlapPolicy,
    ParserConfig, SchedulerConfig,
};
pub use engine::{Composition, CompositionEngine, CompositionInputs};
pub use error::{CompositionError, CompositionResult, ErrorCategory};
pub use overlap::{OverlapDecision, OverlapScheduler};
pub use parser::{scan_break_kinds, ParsedScript, SegmentParser};
pub use source_map::SourceMap;

//! Splicer Timeline Model
//!
//! Defines the data contracts shared by the composition engine, the
//! pipeline around it, and the external renderer:
//! - **Segments:** Ordered narration, attention cue, and break units parsed from a script
//! - **Sources:** Payloads produced by upstream collaborators (clips, narration audio, transcript words, overlays)
//! - **Envelope:** Piecewise-linear ducking volume curves
//! - **Timeline:** The validated multi-track schedule handed to rendering
//!
//! All times are `f64` seconds. Source times are relative to the asset
//! they come from; timeline times are relative to the start of the video.

pub mod envelope;
pub mod segment;
pub mod sources;
pub mod timeline;

pub use envelope::*;
pub use segment::*;
pub use sources::*;
pub use timeline::*;

//! File-backed collaborators for replaying a prepared script bundle.
//!
//! A bundle directory holds the script and every upstream result:
//!
//! ```text
//! bundle/
//! ├── script.txt        # narrated script with break markers
//! ├── clips.json        # break kind -> { source, available_duration }
//! ├── narration.json    # { source, total_duration, cut_points? }
//! ├── transcript.json   # [{ text, start, end }]  (or transcript.srt)
//! └── overlays.json     # optional [{ segment_order, source, start, end }]
//! ```

use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use splicer_common::error::{SplicerError, SplicerResult};
use splicer_composition_core::ParsedScript;
use splicer_timeline_model::{
    BreakKind, ClipCatalog, ClipLookup, ClipSource, NarrationAudio, OverlayPlacement, Timeline,
    TranscriptWord,
};
use tokio::sync::OnceCell;

use crate::collaborators::{
    ClipDurationResolver, OverlayPlanner, Renderer, SpeechSynthesizer, Transcriber,
};
use crate::subtitles::{save_subtitles, SubtitleConfig};
use crate::transcript::{parse_srt, words_from_phrases};

pub const SCRIPT_FILE: &str = "script.txt";
pub const CLIPS_FILE: &str = "clips.json";
pub const NARRATION_FILE: &str = "narration.json";
pub const TRANSCRIPT_FILE: &str = "transcript.json";
pub const TRANSCRIPT_SRT_FILE: &str = "transcript.srt";
pub const OVERLAYS_FILE: &str = "overlays.json";
pub const TIMELINE_FILE: &str = "timeline.json";
pub const CAPTIONS_FILE: &str = "captions.srt";

/// Current timeline document schema version.
pub const DOCUMENT_SCHEMA_VERSION: u32 = 1;

/// Serves every upstream collaborator from a bundle directory.
#[derive(Debug)]
pub struct FileCollaborators {
    dir: PathBuf,
    clips: OnceCell<ClipCatalog>,
}

impl FileCollaborators {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            clips: OnceCell::new(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Read the bundle's script.
    pub async fn script(&self) -> SplicerResult<String> {
        let path = self.dir.join(SCRIPT_FILE);
        ensure_exists(&path).await?;
        let script = tokio::fs::read_to_string(&path)
            .await
            .with_context(|| format!("reading {}", path.display()))?;
        Ok(script)
    }

    async fn catalog(&self) -> SplicerResult<&ClipCatalog> {
        self.clips
            .get_or_try_init(|| read_json(self.dir.join(CLIPS_FILE)))
            .await
    }
}

#[async_trait::async_trait]
impl ClipDurationResolver for FileCollaborators {
    async fn resolve(&self, kind: &BreakKind) -> SplicerResult<ClipSource> {
        self.catalog()
            .await?
            .clip_for(kind)
            .cloned()
            .ok_or_else(|| SplicerError::ClipNotFound {
                kind: kind.as_str().to_string(),
            })
    }
}

#[async_trait::async_trait]
impl SpeechSynthesizer for FileCollaborators {
    async fn synthesize(&self, parts: &[String]) -> SplicerResult<NarrationAudio> {
        let audio: NarrationAudio = read_json(self.dir.join(NARRATION_FILE)).await?;
        if let Some(cuts) = &audio.cut_points {
            if cuts.len() + 1 != parts.len() {
                tracing::warn!(
                    cut_points = cuts.len(),
                    speech_parts = parts.len(),
                    "Recorded cut points do not match the script"
                );
            }
        }
        Ok(audio)
    }
}

#[async_trait::async_trait]
impl Transcriber for FileCollaborators {
    async fn transcribe(&self, _audio: &NarrationAudio) -> SplicerResult<Vec<TranscriptWord>> {
        let json = self.dir.join(TRANSCRIPT_FILE);
        if tokio::fs::try_exists(&json).await? {
            return read_json(json).await;
        }

        let srt = self.dir.join(TRANSCRIPT_SRT_FILE);
        ensure_exists(&srt).await?;
        let content = tokio::fs::read_to_string(&srt)
            .await
            .with_context(|| format!("reading {}", srt.display()))?;
        let words = words_from_phrases(&parse_srt(&content)?);
        tracing::debug!(words = words.len(), "Split SRT phrases into words");
        Ok(words)
    }
}

#[async_trait::async_trait]
impl OverlayPlanner for FileCollaborators {
    async fn plan(&self, _script: &ParsedScript) -> SplicerResult<Vec<OverlayPlacement>> {
        let path = self.dir.join(OVERLAYS_FILE);
        if !tokio::fs::try_exists(&path).await? {
            return Ok(Vec::new());
        }
        read_json(path).await
    }
}

/// On-disk wrapper around a timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineDocument {
    pub schema_version: u32,
    pub generated_at: DateTime<Utc>,
    pub timeline: Timeline,
}

impl TimelineDocument {
    pub fn new(timeline: Timeline) -> Self {
        Self {
            schema_version: DOCUMENT_SCHEMA_VERSION,
            generated_at: Utc::now(),
            timeline,
        }
    }
}

/// Write `timeline.json` into `dir`, returning its path.
pub async fn write_timeline(dir: &Path, timeline: Timeline) -> SplicerResult<PathBuf> {
    tokio::fs::create_dir_all(dir).await?;
    let path = dir.join(TIMELINE_FILE);
    let json = serde_json::to_string_pretty(&TimelineDocument::new(timeline))?;
    tokio::fs::write(&path, json).await?;
    tracing::info!(path = %path.display(), "Wrote timeline document");
    Ok(path)
}

/// Read a timeline document written by [`write_timeline`].
pub async fn read_timeline(path: &Path) -> SplicerResult<TimelineDocument> {
    let doc: TimelineDocument = read_json(path.to_path_buf()).await?;
    if doc.schema_version > DOCUMENT_SCHEMA_VERSION {
        return Err(SplicerError::unsupported(format!(
            "timeline schema version {} is newer than {}",
            doc.schema_version, DOCUMENT_SCHEMA_VERSION
        )));
    }
    Ok(doc)
}

/// Renderer that stores the timeline document and caption subtitles for
/// an external media renderer to pick up.
#[derive(Debug, Clone)]
pub struct DocumentRenderer {
    output_dir: PathBuf,
    subtitles: Option<SubtitleConfig>,
}

impl DocumentRenderer {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            subtitles: None,
        }
    }

    /// Also write `captions.srt` next to the timeline.
    pub fn with_subtitles(mut self, config: SubtitleConfig) -> Self {
        self.subtitles = Some(config);
        self
    }
}

#[async_trait::async_trait]
impl Renderer for DocumentRenderer {
    async fn render(&self, timeline: Timeline) -> SplicerResult<PathBuf> {
        if let Some(config) = &self.subtitles {
            save_subtitles(
                timeline.captions(),
                config,
                &self.output_dir.join(CAPTIONS_FILE),
            )
            .await?;
        }
        write_timeline(&self.output_dir, timeline).await
    }

    fn name(&self) -> &str {
        "document"
    }
}

async fn ensure_exists(path: &Path) -> SplicerResult<()> {
    if tokio::fs::try_exists(path).await? {
        Ok(())
    } else {
        Err(SplicerError::FileNotFound {
            path: path.to_path_buf(),
        })
    }
}

async fn read_json<T: DeserializeOwned>(path: PathBuf) -> SplicerResult<T> {
    ensure_exists(&path).await?;
    let raw = tokio::fs::read_to_string(&path)
        .await
        .with_context(|| format!("reading {}", path.display()))?;
    let value =
        serde_json::from_str(&raw).with_context(|| format!("parsing {}", path.display()))?;
    Ok(value)
}

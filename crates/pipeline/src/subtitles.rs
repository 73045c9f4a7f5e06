//! Subtitle generation in SRT and VTT formats from the captions track.

use serde::{Deserialize, Serialize};
use splicer_common::error::SplicerResult;
use splicer_common::split_millis;
use splicer_timeline_model::{CaptionStyle, CaptionWord};

/// How caption words are grouped into subtitle cues.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SubtitleConfig {
    /// Maximum words shown in one cue.
    pub max_words_per_cue: usize,

    /// A silence longer than this starts a new cue (seconds).
    pub max_gap_secs: f64,
}

impl Default for SubtitleConfig {
    fn default() -> Self {
        Self {
            max_words_per_cue: 7,
            max_gap_secs: 0.75,
        }
    }
}

/// One subtitle cue.
#[derive(Debug, Clone, PartialEq)]
pub struct SubtitleCue {
    pub start_secs: f64,
    pub end_secs: f64,
    pub text: String,
}

/// Group caption words into cues.
///
/// A cue never spans two segments, so nothing is shown while a break's
/// clip plays on its own.
pub fn group_captions(captions: &[CaptionWord], config: &SubtitleConfig) -> Vec<SubtitleCue> {
    let max_words = config.max_words_per_cue.max(1);
    let mut cues = Vec::new();
    let mut current: Vec<&CaptionWord> = Vec::new();

    for word in captions {
        let starts_new = current.last().is_some_and(|last| {
            last.segment_order != word.segment_order
                || word.timeline_start - last.timeline_end > config.max_gap_secs
                || current.len() >= max_words
        });
        if starts_new {
            cues.push(to_cue(&current));
            current.clear();
        }
        current.push(word);
    }
    if !current.is_empty() {
        cues.push(to_cue(&current));
    }

    cues
}

fn to_cue(words: &[&CaptionWord]) -> SubtitleCue {
    let text = words
        .iter()
        .map(|w| match w.style {
            CaptionStyle::Normal => w.text.clone(),
            CaptionStyle::Emphasis => w.text.to_uppercase(),
        })
        .collect::<Vec<_>>()
        .join(" ");
    SubtitleCue {
        start_secs: words.first().map_or(0.0, |w| w.timeline_start),
        end_secs: words.last().map_or(0.0, |w| w.timeline_end),
        text,
    }
}

/// Generate SRT subtitle content from cues.
pub fn generate_srt(cues: &[SubtitleCue]) -> String {
    let mut output = String::new();

    for (i, cue) in cues.iter().enumerate() {
        output.push_str(&format!("{}\n", i + 1));
        output.push_str(&format!(
            "{} --> {}\n",
            format_srt_time(cue.start_secs),
            format_srt_time(cue.end_secs),
        ));
        output.push_str(&cue.text);
        output.push_str("\n\n");
    }

    output
}

/// Generate WebVTT subtitle content from cues.
pub fn generate_vtt(cues: &[SubtitleCue]) -> String {
    let mut output = String::from("WEBVTT\n\n");

    for cue in cues {
        output.push_str(&format!(
            "{} --> {}\n",
            format_vtt_time(cue.start_secs),
            format_vtt_time(cue.end_secs),
        ));
        output.push_str(&cue.text);
        output.push_str("\n\n");
    }

    output
}

/// Format seconds as SRT timestamp: HH:MM:SS,mmm
fn format_srt_time(secs: f64) -> String {
    let (hours, minutes, seconds, millis) = split_millis(secs);
    format!("{hours:02}:{minutes:02}:{seconds:02},{millis:03}")
}

/// Format seconds as VTT timestamp: HH:MM:SS.mmm
fn format_vtt_time(secs: f64) -> String {
    let (hours, minutes, seconds, millis) = split_millis(secs);
    format!("{hours:02}:{minutes:02}:{seconds:02}.{millis:03}")
}

/// Save the captions track as subtitles; `.vtt` selects WebVTT.
pub async fn save_subtitles(
    captions: &[CaptionWord],
    config: &SubtitleConfig,
    path: &std::path::Path,
) -> SplicerResult<()> {
    let cues = group_captions(captions, config);
    let content = match path.extension().and_then(|e| e.to_str()) {
        Some("vtt") => generate_vtt(&cues),
        _ => generate_srt(&cues),
    };
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, content).await?;
    tracing::info!(path = %path.display(), cues = cues.len(), "Saved subtitles");
    Ok(())
}

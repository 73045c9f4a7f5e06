//! Word timing from phrase-level transcription.
//!
//! Many transcribers only time whole phrases (SRT cues). The engine needs
//! words, so each phrase is split evenly across its own window.

use serde::{Deserialize, Serialize};
use splicer_common::error::{SplicerError, SplicerResult};
use splicer_timeline_model::TranscriptWord;

/// A transcribed phrase with its timing in the narration recording.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptPhrase {
    /// Start time in seconds.
    pub start_secs: f64,

    /// End time in seconds.
    pub end_secs: f64,

    /// Phrase text.
    pub text: String,

    /// Confidence score [0.0, 1.0] if available.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f32>,
}

/// Split phrases into evenly timed words.
///
/// Empty phrases and phrases whose end precedes their start are skipped
/// with a warning.
pub fn words_from_phrases(phrases: &[TranscriptPhrase]) -> Vec<TranscriptWord> {
    let mut words = Vec::new();

    for phrase in phrases {
        let tokens: Vec<&str> = phrase.text.split_whitespace().collect();
        if tokens.is_empty() {
            continue;
        }
        if phrase.end_secs < phrase.start_secs {
            tracing::warn!(
                start = phrase.start_secs,
                end = phrase.end_secs,
                text = %phrase.text,
                "Skipping phrase that ends before it starts"
            );
            continue;
        }

        let step = (phrase.end_secs - phrase.start_secs) / tokens.len() as f64;
        for (i, token) in tokens.iter().enumerate() {
            let start = phrase.start_secs + step * i as f64;
            let end = if i + 1 == tokens.len() {
                phrase.end_secs
            } else {
                start + step
            };
            words.push(TranscriptWord::new(*token, start, end));
        }
    }

    words
}

/// Parse SRT content into phrases.
pub fn parse_srt(content: &str) -> SplicerResult<Vec<TranscriptPhrase>> {
    let mut phrases = Vec::new();
    let normalized = content.replace("\r\n", "\n");

    for block in normalized.split("\n\n") {
        let mut lines = block.lines().map(str::trim).filter(|l| !l.is_empty());
        let Some(first) = lines.next() else {
            continue;
        };
        // the numeric index line is optional
        let timing = if first.contains("-->") {
            first
        } else {
            match lines.next() {
                Some(line) => line,
                None => continue,
            }
        };

        let (start, end) = timing.split_once("-->").ok_or_else(|| {
            SplicerError::collaborator("transcription", format!("bad SRT timing line '{timing}'"))
        })?;
        let text = lines.collect::<Vec<_>>().join(" ");

        phrases.push(TranscriptPhrase {
            start_secs: parse_srt_time(start.trim())?,
            end_secs: parse_srt_time(end.trim())?,
            text,
            confidence: None,
        });
    }

    Ok(phrases)
}

/// Parse `HH:MM:SS,mmm` (a `.` separator is accepted too).
fn parse_srt_time(value: &str) -> SplicerResult<f64> {
    let bad =
        || SplicerError::collaborator("transcription", format!("bad SRT timestamp '{value}'"));

    let (clock, fraction) = value.split_once([',', '.']).ok_or_else(bad)?;
    let mut fields = clock.split(':');
    let hours: u64 = fields.next().and_then(|f| f.parse().ok()).ok_or_else(bad)?;
    let minutes: u64 = fields.next().and_then(|f| f.parse().ok()).ok_or_else(bad)?;
    let seconds: u64 = fields.next().and_then(|f| f.parse().ok()).ok_or_else(bad)?;
    if fields.next().is_some()
        || fraction.is_empty()
        || fraction.len() > 9
        || !fraction.bytes().all(|b| b.is_ascii_digit())
    {
        return Err(bad());
    }
    // "1,5" is half a second, not five milliseconds
    let digits: u64 = fraction.parse().map_err(|_| bad())?;
    let fraction = digits as f64 / 10f64.powi(fraction.len() as i32);

    Ok((hours * 3600 + minutes * 60 + seconds) as f64 + fraction)
}

//! Caption remapping from recording time to timeline time.
//!
//! Transcript words are timed against the single narration recording.
//! Each speech segment plays a slice of that recording at its own place
//! on the timeline, so a word is moved by its segment's offset and scaled
//! by the segment's playback speed. A word that straddles a cut is split
//! and each piece follows its own segment.

use splicer_common::{definitely_lt, TimeSpan, TIME_EPSILON};
use splicer_timeline_model::{CaptionStyle, CaptionWord, SegmentTag, TranscriptWord, WordPart};

use crate::error::{CompositionError, CompositionResult};

/// A speech segment as placed on the timeline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpeechWindow {
    pub segment_order: u32,
    pub tag: SegmentTag,
    /// Slice of the recording this segment plays.
    pub source: TimeSpan,
    pub timeline_start: f64,
    pub speed: f64,
}

impl SpeechWindow {
    /// Timeline time of recording time `t`.
    pub fn to_timeline(&self, t: f64) -> f64 {
        self.timeline_start + (t - self.source.start) / self.speed
    }

    pub fn timeline_end(&self) -> f64 {
        self.to_timeline(self.source.end)
    }

    fn style(&self) -> CaptionStyle {
        match self.tag {
            SegmentTag::AttentionCue => CaptionStyle::Emphasis,
            SegmentTag::Narration | SegmentTag::Break => CaptionStyle::Normal,
        }
    }
}

/// Maps transcript words onto the timeline.
#[derive(Debug, Default)]
pub struct CaptionMapper;

impl CaptionMapper {
    pub fn new() -> Self {
        Self
    }

    /// Remap every word. Fails on the first word that falls outside all
    /// windows; nothing is dropped silently.
    pub fn map(
        &self,
        words: &[TranscriptWord],
        windows: &[SpeechWindow],
    ) -> CompositionResult<Vec<CaptionWord>> {
        let mut captions = Vec::with_capacity(words.len());
        for word in words {
            self.map_word(word, windows, &mut captions)?;
        }
        captions.sort_by(|a, b| a.timeline_start.total_cmp(&b.timeline_start));

        tracing::debug!(
            words = words.len(),
            captions = captions.len(),
            "Mapped captions"
        );
        Ok(captions)
    }

    fn map_word(
        &self,
        word: &TranscriptWord,
        windows: &[SpeechWindow],
        out: &mut Vec<CaptionWord>,
    ) -> CompositionResult<()> {
        let out_of_range = |source_time: f64| CompositionError::CaptionOutOfRange {
            word: word.text.clone(),
            source_time,
            nearest_segment: nearest(windows, source_time),
        };

        if !word.start.is_finite() || !word.end.is_finite() {
            return Err(out_of_range(word.start));
        }
        if word.end < word.start {
            return Err(out_of_range(word.end));
        }

        // Instantaneous words map as a point inside their window.
        if word.end - word.start <= TIME_EPSILON {
            let window = windows
                .iter()
                .find(|w| contains_tolerant(&w.source, word.start))
                .ok_or_else(|| out_of_range(word.start))?;
            let t = window.to_timeline(clamp_to(&window.source, word.start));
            out.push(caption(word, window, t, t, WordPart::Whole));
            return Ok(());
        }

        let span = TimeSpan::new(word.start, word.end);
        let mut pieces: Vec<(&SpeechWindow, TimeSpan)> = windows
            .iter()
            .filter_map(|w| w.source.intersection(&span).map(|piece| (w, piece)))
            .filter(|(_, piece)| piece.duration() > TIME_EPSILON)
            .collect();
        pieces.sort_by(|a, b| a.1.start.total_cmp(&b.1.start));

        // Every part of the word must be covered, up to the tolerance.
        let mut covered_to = word.start;
        for (_, piece) in &pieces {
            if definitely_lt(covered_to, piece.start) {
                return Err(out_of_range(covered_to));
            }
            covered_to = covered_to.max(piece.end);
        }
        if pieces.is_empty() {
            return Err(out_of_range(word.start));
        }
        if definitely_lt(covered_to, word.end) {
            return Err(out_of_range(word.end));
        }

        let split = pieces.len() > 1;
        if split {
            tracing::debug!(word = %word.text, pieces = pieces.len(), "Split word at segment cut");
        }
        for (index, (window, piece)) in pieces.into_iter().enumerate() {
            let part = match (split, index) {
                (false, _) => WordPart::Whole,
                (true, 0) => WordPart::Leading,
                (true, _) => WordPart::Continuation,
            };
            let start = window.to_timeline(piece.start);
            let end = window.to_timeline(piece.end);
            out.push(caption(word, window, start, end, part));
        }
        Ok(())
    }
}

fn caption(word: &TranscriptWord, window: &SpeechWindow, start: f64, end: f64, part: WordPart) -> CaptionWord {
    CaptionWord {
        text: word.text.clone(),
        timeline_start: start,
        timeline_end: end,
        style: window.style(),
        part,
        segment_order: window.segment_order,
    }
}

fn contains_tolerant(span: &TimeSpan, t: f64) -> bool {
    t >= span.start - TIME_EPSILON && t <= span.end + TIME_EPSILON
}

fn clamp_to(span: &TimeSpan, t: f64) -> f64 {
    t.clamp(span.start, span.end)
}

fn nearest(windows: &[SpeechWindow], t: f64) -> Option<u32> {
    windows
        .iter()
        .map(|w| {
            let distance = (w.source.start - t).max(t - w.source.end).max(0.0);
            (distance, w.segment_order)
        })
        .min_by(|a, b| a.0.total_cmp(&b.0))
        .map(|(_, order)| order)
}

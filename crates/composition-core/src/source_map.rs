//! Where each speech segment lives inside the single narration recording.
//!
//! The whole script is synthesized as one recording. A [`SourceMap`] cuts
//! that recording into contiguous per-segment ranges, either from cut
//! points reported by the synthesizer or, failing that, by aligning the
//! transcript to the segment texts.

use serde::{Deserialize, Serialize};
use splicer_common::TimeSpan;
use splicer_timeline_model::{NarrationAudio, Segment, TranscriptWord};

use crate::error::{CompositionError, CompositionResult};

/// One speech segment's slice of the recording.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SourceRange {
    pub segment_order: u32,
    pub span: TimeSpan,
}

/// Contiguous ranges covering `[0, total_duration)` in segment order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceMap {
    ranges: Vec<SourceRange>,
    total_duration: f64,
}

impl SourceMap {
    /// Derive ranges for the speech segments of `segments`.
    ///
    /// Uses `audio.cut_points` when present, otherwise aligns `words`.
    pub fn build(
        segments: &[Segment],
        audio: &NarrationAudio,
        words: &[TranscriptWord],
    ) -> CompositionResult<Self> {
        let speech: Vec<(u32, &str)> = segments
            .iter()
            .filter_map(|s| s.text().map(|text| (s.order, text)))
            .collect();
        let orders: Vec<u32> = speech.iter().map(|(order, _)| *order).collect();

        match &audio.cut_points {
            Some(cuts) => Self::from_cut_points(&orders, audio.total_duration, cuts),
            None => Self::from_transcript(&speech, audio.total_duration, words),
        }
    }

    /// Ranges from explicit interior boundaries.
    pub fn from_cut_points(
        orders: &[u32],
        total_duration: f64,
        cuts: &[f64],
    ) -> CompositionResult<Self> {
        if orders.is_empty() {
            return Err(CompositionError::source_map("no speech segments"));
        }
        if !(total_duration.is_finite() && total_duration > 0.0) {
            return Err(CompositionError::source_map(format!(
                "narration duration {total_duration} must be > 0"
            )));
        }
        if cuts.len() + 1 != orders.len() {
            return Err(CompositionError::source_map(format!(
                "{} speech segments need {} cut points, got {}",
                orders.len(),
                orders.len() - 1,
                cuts.len()
            )));
        }

        let mut bounds = Vec::with_capacity(orders.len() + 1);
        bounds.push(0.0);
        bounds.extend_from_slice(cuts);
        bounds.push(total_duration);

        for pair in bounds.windows(2) {
            if !(pair[1] > pair[0]) {
                return Err(CompositionError::source_map(format!(
                    "cut points must be strictly increasing inside (0, {total_duration}), got {cuts:?}"
                )));
            }
        }

        let ranges = orders
            .iter()
            .zip(bounds.windows(2))
            .map(|(order, pair)| SourceRange {
                segment_order: *order,
                span: TimeSpan::new(pair[0], pair[1]),
            })
            .collect();

        Ok(Self {
            ranges,
            total_duration,
        })
    }

    /// Ranges from transcript alignment.
    ///
    /// Transcript words are assigned to segments in proportion to each
    /// segment's word count, then each boundary moves to the longest pause
    /// within [`SNAP_RADIUS_WORDS`] words. The cut falls in the middle of
    /// that pause.
    pub fn from_transcript(
        speech: &[(u32, &str)],
        total_duration: f64,
        words: &[TranscriptWord],
    ) -> CompositionResult<Self> {
        let orders: Vec<u32> = speech.iter().map(|(order, _)| *order).collect();
        if speech.len() <= 1 {
            return Self::from_cut_points(&orders, total_duration, &[]);
        }

        let heard = words.len();
        if heard < speech.len() {
            return Err(CompositionError::source_map(format!(
                "transcript has {heard} words for {} speech segments",
                speech.len()
            )));
        }
        for pair in words.windows(2) {
            if pair[1].start < pair[0].start {
                return Err(CompositionError::source_map(format!(
                    "transcript words out of order at {:?}",
                    pair[1].text
                )));
            }
        }

        let counts: Vec<usize> = speech
            .iter()
            .map(|(_, text)| text.split_whitespace().count().max(1))
            .collect();
        let written: usize = counts.iter().sum();

        let mut cuts = Vec::with_capacity(speech.len() - 1);
        let mut cumulative = 0;
        let mut previous_boundary = 0;
        for (index, count) in counts.iter().take(speech.len() - 1).enumerate() {
            cumulative += count;
            let remaining_segments = speech.len() - 1 - index;
            let proportional = (cumulative as f64 * heard as f64 / written as f64).round() as usize;
            // every segment keeps at least one transcript word
            let lowest = previous_boundary + 1;
            let highest = heard - remaining_segments;
            let boundary = snap_to_silence(words, proportional.clamp(lowest, highest), lowest, highest);
            previous_boundary = boundary;

            let last = &words[boundary - 1];
            let first = &words[boundary];
            cuts.push((last.end + first.start) / 2.0);
        }

        tracing::debug!(
            segments = speech.len(),
            words = heard,
            ?cuts,
            "Aligned transcript to speech segments"
        );
        Self::from_cut_points(&orders, total_duration, &cuts)
    }

    pub fn ranges(&self) -> &[SourceRange] {
        &self.ranges
    }

    pub fn total_duration(&self) -> f64 {
        self.total_duration
    }

    /// Source span of a segment, if it is a speech segment.
    pub fn span_of(&self, order: u32) -> Option<TimeSpan> {
        self.ranges
            .iter()
            .find(|r| r.segment_order == order)
            .map(|r| r.span)
    }

    /// Segment whose range is closest to source time `t`.
    pub fn nearest_segment(&self, t: f64) -> Option<u32> {
        self.ranges
            .iter()
            .map(|r| {
                let distance = if t < r.span.start {
                    r.span.start - t
                } else if t > r.span.end {
                    t - r.span.end
                } else {
                    0.0
                };
                (distance, r.segment_order)
            })
            .min_by(|a, b| a.0.total_cmp(&b.0))
            .map(|(_, order)| order)
    }
}

/// How far (in transcript words) a proportional boundary may move to
/// land on a pause. Absorbs numbers and contractions that transcribe to a
/// different word count than the script.
pub const SNAP_RADIUS_WORDS: usize = 3;

/// Boundary index in `[lowest, highest]` near `estimate` with the longest
/// gap before it. Ties go to the index closest to `estimate`.
fn snap_to_silence(words: &[TranscriptWord], estimate: usize, lowest: usize, highest: usize) -> usize {
    let from = estimate.saturating_sub(SNAP_RADIUS_WORDS).max(lowest);
    let to = (estimate + SNAP_RADIUS_WORDS).min(highest);

    let mut best = estimate;
    let mut best_gap = f64::NEG_INFINITY;
    for index in from..=to {
        let gap = words[index].start - words[index - 1].end;
        let closer = index.abs_diff(estimate) < best.abs_diff(estimate);
        if gap > best_gap + 1e-9 || ((gap - best_gap).abs() <= 1e-9 && closer) {
            best = index;
            best_gap = gap;
        }
    }
    best
}

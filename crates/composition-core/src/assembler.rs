//! Track assembly: segment windows to a validated [`Timeline`].
//!
//! # Layout
//!
//! Segments are laid end to end in script order. A narration that follows
//! a break starts early by that break's overlap, and everything after it
//! follows the pulled narration. With zero overlap everywhere the layout
//! is the plain cumulative sum of segment durations.

use std::collections::BTreeMap;

use splicer_common::{approx_eq, TimeSpan, TIME_EPSILON};
use splicer_timeline_model::{
    describe_entry, CaptionWord, NarrationAudio, OverlayPlacement, Segment, SegmentKind,
    SegmentTag, Timeline, TimelineEntry, TrackKind, CLIP_Z_INDEX, NARRATION_Z_INDEX,
};

use crate::captions::SpeechWindow;
use crate::config::LayoutConfig;
use crate::envelope::EnvelopeGenerator;
use crate::error::{CompositionError, CompositionResult};
use crate::overlap::OverlapDecision;
use crate::source_map::SourceMap;

/// Where a segment landed on the timeline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SegmentWindow {
    pub segment_order: u32,
    pub tag: SegmentTag,
    pub span: TimeSpan,
}

/// Everything the assembler places.
pub struct Assembly<'a> {
    pub segments: &'a [Segment],
    pub windows: &'a [SegmentWindow],
    pub speech: &'a [SpeechWindow],
    pub decisions: &'a [OverlapDecision],
    pub narration: &'a NarrationAudio,
    pub overlays: &'a [OverlayPlacement],
    pub captions: Vec<CaptionWord>,
}

/// Lays segments out and builds the final tracks.
pub struct TrackAssembler {
    layout: LayoutConfig,
    envelopes: EnvelopeGenerator,
}

impl TrackAssembler {
    pub fn new(layout: LayoutConfig, envelopes: EnvelopeGenerator) -> Self {
        Self { layout, envelopes }
    }

    pub fn narration_speed(&self) -> f64 {
        self.layout.narration_speed
    }

    /// Timeline length of every segment: resolved length for breaks,
    /// source slice over playback speed for speech.
    pub fn segment_durations(
        &self,
        segments: &[Segment],
        source_map: &SourceMap,
    ) -> CompositionResult<Vec<f64>> {
        segments
            .iter()
            .map(|segment| match &segment.kind {
                SegmentKind::Break(spec) => Ok(spec.resolved_duration),
                SegmentKind::Narration { .. } | SegmentKind::AttentionCue { .. } => source_map
                    .span_of(segment.order)
                    .map(|span| span.duration() / self.layout.narration_speed)
                    .ok_or(CompositionError::MissingDuration {
                        order: segment.order,
                    }),
            })
            .collect()
    }

    /// Place every segment, pulling narration under preceding breaks.
    pub fn layout(
        &self,
        segments: &[Segment],
        durations: &[f64],
        decisions: &[OverlapDecision],
    ) -> CompositionResult<Vec<SegmentWindow>> {
        let mut cursor = 0.0;
        let mut windows = Vec::with_capacity(segments.len());

        for (index, segment) in segments.iter().enumerate() {
            let duration = durations
                .get(index)
                .copied()
                .ok_or(CompositionError::MissingDuration {
                    order: segment.order,
                })?;
            let pull = decisions
                .iter()
                .find(|d| d.narration_order == segment.order)
                .map_or(0.0, |d| d.overlap_duration);

            let start = cursor - pull;
            let end = start + duration;
            windows.push(SegmentWindow {
                segment_order: segment.order,
                tag: segment.tag(),
                span: TimeSpan::new(start, end),
            });
            cursor = end;
        }

        Ok(windows)
    }

    /// Speech windows for the caption mapper.
    pub fn speech_windows(
        &self,
        windows: &[SegmentWindow],
        source_map: &SourceMap,
    ) -> CompositionResult<Vec<SpeechWindow>> {
        windows
            .iter()
            .filter(|w| w.tag != SegmentTag::Break)
            .map(|w| {
                let source = source_map
                    .span_of(w.segment_order)
                    .ok_or(CompositionError::MissingDuration {
                        order: w.segment_order,
                    })?;
                Ok(SpeechWindow {
                    segment_order: w.segment_order,
                    tag: w.tag,
                    source,
                    timeline_start: w.span.start,
                    speed: self.layout.narration_speed,
                })
            })
            .collect()
    }

    /// Build the tracks and validate them.
    pub fn assemble(&self, input: Assembly<'_>) -> CompositionResult<Timeline> {
        let Assembly {
            segments,
            windows,
            speech,
            decisions,
            narration,
            overlays,
            captions,
        } = input;

        let mut overlays_by_segment = group_overlays(segments, speech, overlays)?;
        let speed = self.layout.narration_speed;
        let recorded_speed = (!approx_eq(speed, 1.0)).then_some(speed);

        let mut tracks: BTreeMap<TrackKind, Vec<TimelineEntry>> = BTreeMap::new();
        let mut push = |entry: TimelineEntry| tracks.entry(entry.track).or_default().push(entry);

        for (segment, window) in segments.iter().zip(windows) {
            match &segment.kind {
                SegmentKind::Break(spec) => {
                    let envelope = match decisions
                        .iter()
                        .find(|d| d.break_order == segment.order && d.overlap_duration > 0.0)
                    {
                        Some(decision) => Some(self.envelopes.generate(
                            window.span.end - decision.overlap_duration,
                            window.span.end,
                        )?),
                        None => None,
                    };

                    let clip_entry = |track: TrackKind| TimelineEntry {
                        track,
                        source: spec.clip.source.clone(),
                        source_start: 0.0,
                        source_end: spec.resolved_duration,
                        timeline_start: window.span.start,
                        timeline_end: window.span.end,
                        envelope: None,
                        z_index: CLIP_Z_INDEX,
                        speed: None,
                        segment_order: segment.order,
                        segment_kind: SegmentTag::Break,
                        break_kind: Some(spec.kind.clone()),
                        overlays: Vec::new(),
                    };

                    push(TimelineEntry {
                        envelope,
                        ..clip_entry(TrackKind::ClipAudio)
                    });
                    push(clip_entry(TrackKind::ClipVideo));
                }
                SegmentKind::Narration { .. } | SegmentKind::AttentionCue { .. } => {
                    let source = speech
                        .iter()
                        .find(|s| s.segment_order == segment.order)
                        .map(|s| s.source)
                        .ok_or(CompositionError::MissingDuration {
                            order: segment.order,
                        })?;

                    let narration_entry = |track: TrackKind| TimelineEntry {
                        track,
                        source: narration.source.clone(),
                        source_start: source.start,
                        source_end: source.end,
                        timeline_start: window.span.start,
                        timeline_end: window.span.end,
                        envelope: None,
                        z_index: NARRATION_Z_INDEX,
                        speed: recorded_speed,
                        segment_order: segment.order,
                        segment_kind: segment.tag(),
                        break_kind: None,
                        overlays: Vec::new(),
                    };

                    push(narration_entry(TrackKind::NarrationAudio));
                    push(TimelineEntry {
                        overlays: overlays_by_segment.remove(&segment.order).unwrap_or_default(),
                        ..narration_entry(TrackKind::NarrationVideo)
                    });
                }
            }
        }

        let timeline = Timeline::from_tracks(tracks, captions);
        validate_timeline(&timeline, windows)?;

        tracing::info!(
            total_duration = timeline.total_duration(),
            clips = timeline.entries(TrackKind::ClipVideo).len(),
            narration = timeline.entries(TrackKind::NarrationAudio).len(),
            captions = timeline.captions().len(),
            "Timeline assembled"
        );
        Ok(timeline)
    }
}

/// Overlays per speech segment, windows clipped to the segment's slice.
fn group_overlays(
    segments: &[Segment],
    speech: &[SpeechWindow],
    overlays: &[OverlayPlacement],
) -> CompositionResult<BTreeMap<u32, Vec<OverlayPlacement>>> {
    let mut grouped: BTreeMap<u32, Vec<OverlayPlacement>> = BTreeMap::new();

    for overlay in overlays {
        let invalid = |reason: &str| CompositionError::InvalidOverlay {
            segment_order: overlay.segment_order,
            overlay: overlay.source.clone(),
            reason: reason.to_string(),
        };

        let target = segments
            .iter()
            .find(|s| s.order == overlay.segment_order)
            .ok_or_else(|| invalid("no such segment"))?;
        match target.kind {
            SegmentKind::Narration { .. } => {}
            SegmentKind::AttentionCue { .. } => {
                return Err(invalid("attention cues carry no overlays"));
            }
            SegmentKind::Break(_) => return Err(invalid("breaks show their own clip")),
        }
        if !overlay.start.is_finite() || !overlay.end.is_finite() || overlay.end <= overlay.start {
            return Err(invalid("window is empty or not finite"));
        }

        let length = speech
            .iter()
            .find(|s| s.segment_order == overlay.segment_order)
            .map_or(0.0, |s| s.source.duration());
        let start = overlay.start.max(0.0);
        let end = overlay.end.min(length);
        if end - start <= TIME_EPSILON {
            tracing::warn!(
                segment = overlay.segment_order,
                overlay = %overlay.source,
                start = overlay.start,
                end = overlay.end,
                "Overlay lies outside its segment, skipping"
            );
            continue;
        }

        grouped
            .entry(overlay.segment_order)
            .or_default()
            .push(OverlayPlacement {
                start,
                end,
                ..overlay.clone()
            });
    }

    Ok(grouped)
}

fn inconsistent(
    track: impl Into<String>,
    first: String,
    second: String,
    detail: impl Into<String>,
) -> CompositionError {
    let err = CompositionError::TimelineInconsistent {
        track: track.into(),
        first,
        second,
        detail: detail.into(),
    };
    tracing::error!(error = %err, "Assembled timeline violates its invariants");
    err
}

/// Checks on an assembled timeline.
///
/// Everything [`Timeline::check`] covers, plus: every clip entry sits
/// inside exactly one break window.
pub fn validate_timeline(timeline: &Timeline, windows: &[SegmentWindow]) -> CompositionResult<()> {
    timeline
        .check()
        .map_err(|e| inconsistent(e.track, e.first, e.second, e.detail))?;

    let break_windows: Vec<TimeSpan> = windows
        .iter()
        .filter(|w| w.tag == SegmentTag::Break)
        .map(|w| w.span)
        .collect();
    for kind in [TrackKind::ClipAudio, TrackKind::ClipVideo] {
        for entry in timeline.entries(kind) {
            let span = entry.timeline_span();
            let hosts = break_windows.iter().filter(|w| w.encloses(&span)).count();
            if hosts != 1 {
                return Err(inconsistent(
                    kind.as_str(),
                    describe_entry(entry),
                    format!("{hosts} break windows"),
                    "clip entry must sit inside exactly one break",
                ));
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EnvelopeConfig;
    use splicer_timeline_model::{BreakKind, BreakSpec, ClipSource, DurationRequest};

    fn segments() -> Vec<Segment> {
        vec![
            Segment::narration(0, "Before the break."),
            Segment::break_segment(
                1,
                BreakSpec {
                    kind: BreakKind::Action,
                    requested: DurationRequest::Exact { secs: 15.0 },
                    resolved_duration: 15.0,
                    clip: ClipSource::new("clips/action.mp4", 30.0),
                },
            ),
            Segment::narration(2, "After the break."),
        ]
    }

    fn assembler(speed: f64) -> TrackAssembler {
        TrackAssembler::new(
            LayoutConfig {
                narration_speed: speed,
            },
            EnvelopeGenerator::new(EnvelopeConfig::default()),
        )
    }

    fn decision(overlap: f64) -> OverlapDecision {
        OverlapDecision {
            break_order: 1,
            narration_order: 2,
            overlap_duration: overlap,
            truncated: false,
        }
    }

    fn build(speed: f64, overlap: f64, overlays: &[OverlayPlacement]) -> CompositionResult<Timeline> {
        let assembler = assembler(speed);
        let segs = segments();
        let map = SourceMap::from_cut_points(&[0, 2], 37.5, &[20.0])?;
        let durations = assembler.segment_durations(&segs, &map)?;
        let decisions = vec![decision(overlap)];
        let windows = assembler.layout(&segs, &durations, &decisions)?;
        let speech = assembler.speech_windows(&windows, &map)?;
        let narration = NarrationAudio::new("voiceover.mp3", 37.5);
        assembler.assemble(Assembly {
            segments: &segs,
            windows: &windows,
            speech: &speech,
            decisions: &decisions,
            narration: &narration,
            overlays,
            captions: Vec::new(),
        })
    }

    #[test]
    fn test_layout_pulls_narration() {
        let timeline = build(1.0, 7.5, &[]).unwrap();
        let narration = timeline.entries(TrackKind::NarrationAudio);
        assert_eq!(narration[1].timeline_start, 27.5);
        assert_eq!(narration[1].timeline_end, 45.0);
        assert_eq!(narration[1].source_start, 20.0);
        assert_eq!(timeline.total_duration(), 45.0);

        let clip_audio = &timeline.entries(TrackKind::ClipAudio)[0];
        let env = clip_audio.envelope.unwrap();
        assert_eq!(env.duck_start, 27.5);
        assert_eq!(env.duck_end, 35.0);
        assert!(timeline.entries(TrackKind::ClipVideo)[0].envelope.is_none());
        assert_eq!(clip_audio.z_index, CLIP_Z_INDEX);
        assert_eq!(clip_audio.break_kind, Some(BreakKind::Action));
    }

    #[test]
    fn test_no_envelope_without_overlap() {
        let timeline = build(1.0, 0.0, &[]).unwrap();
        assert!(timeline.entries(TrackKind::ClipAudio)[0].envelope.is_none());
        assert_eq!(timeline.total_duration(), 52.5);
    }

    #[test]
    fn test_speed_recorded_on_narration() {
        let timeline = build(1.25, 0.0, &[]).unwrap();
        let first = &timeline.entries(TrackKind::NarrationAudio)[0];
        assert_eq!(first.speed, Some(1.25));
        assert!((first.timeline_end - 16.0).abs() < 1e-9);
        assert!(timeline.entries(TrackKind::ClipAudio)[0].speed.is_none());
    }

    #[test]
    fn test_overlays_attach_to_narration_video() {
        let overlays = vec![
            OverlayPlacement {
                segment_order: 2,
                source: "img/post.png".to_string(),
                start: 1.0,
                end: 30.0,
                z_index: 5,
            },
            OverlayPlacement {
                segment_order: 0,
                source: "img/late.png".to_string(),
                start: 25.0,
                end: 26.0,
                z_index: 5,
            },
        ];
        let timeline = build(1.0, 7.5, &overlays).unwrap();
        let video = timeline.entries(TrackKind::NarrationVideo);
        assert!(video[0].overlays.is_empty());
        assert_eq!(video[1].overlays.len(), 1);
        assert_eq!(video[1].overlays[0].end, 17.5);
        assert!(timeline.entries(TrackKind::NarrationAudio)[1].overlays.is_empty());
    }

    #[test]
    fn test_overlay_on_break_is_rejected() {
        let overlays = vec![OverlayPlacement {
            segment_order: 1,
            source: "img/post.png".to_string(),
            start: 0.0,
            end: 3.0,
            z_index: 5,
        }];
        let err = build(1.0, 7.5, &overlays).unwrap_err();
        assert!(matches!(err, CompositionError::InvalidOverlay { segment_order: 1, .. }));
    }

    #[test]
    fn test_short_overlap_window_fails_envelope() {
        let err = build(1.0, 0.6, &[]).unwrap_err();
        assert!(matches!(err, CompositionError::EnvelopeTooShort { .. }));
    }

    fn placed(track: TrackKind, order: u32, start: f64, end: f64) -> TimelineEntry {
        let tag = if track.is_clip() {
            SegmentTag::Break
        } else {
            SegmentTag::Narration
        };
        TimelineEntry {
            track,
            source: "media.mp4".to_string(),
            source_start: 0.0,
            source_end: end - start,
            timeline_start: start,
            timeline_end: end,
            envelope: None,
            z_index: CLIP_Z_INDEX,
            speed: None,
            segment_order: order,
            segment_kind: tag,
            break_kind: track.is_clip().then_some(BreakKind::Action),
            overlays: Vec::new(),
        }
    }

    fn window(order: u32, tag: SegmentTag, start: f64, end: f64) -> SegmentWindow {
        SegmentWindow {
            segment_order: order,
            tag,
            span: TimeSpan::new(start, end),
        }
    }

    fn inconsistency(err: CompositionError) -> (String, String) {
        match err {
            CompositionError::TimelineInconsistent { track, detail, .. } => (track, detail),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_overlay_on_attention_cue_is_rejected() {
        let segs = vec![
            Segment::narration(0, "The goose stared."),
            Segment::attention_cue(1, "Then it honked!"),
        ];
        let overlays = vec![OverlayPlacement {
            segment_order: 1,
            source: "img/post.png".to_string(),
            start: 0.0,
            end: 1.0,
            z_index: 5,
        }];
        let err = group_overlays(&segs, &[], &overlays).unwrap_err();
        match err {
            CompositionError::InvalidOverlay {
                segment_order,
                reason,
                ..
            } => {
                assert_eq!(segment_order, 1);
                assert!(reason.contains("attention cue"));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_validation_catches_overlapping_clips() {
        let windows = vec![
            window(0, SegmentTag::Break, 0.0, 10.0),
            window(1, SegmentTag::Break, 5.0, 15.0),
        ];
        let mut tracks = BTreeMap::new();
        tracks.insert(
            TrackKind::ClipVideo,
            vec![
                placed(TrackKind::ClipVideo, 0, 0.0, 10.0),
                placed(TrackKind::ClipVideo, 1, 5.0, 15.0),
            ],
        );
        let timeline = Timeline::from_tracks(tracks, Vec::new());

        let (track, detail) = inconsistency(validate_timeline(&timeline, &windows).unwrap_err());
        assert_eq!(track, "clipVideo");
        assert_eq!(detail, "entries overlap");
    }

    #[test]
    fn test_validation_catches_clip_outside_its_break() {
        let windows = vec![window(1, SegmentTag::Break, 20.0, 35.0)];
        let mut tracks = BTreeMap::new();
        tracks.insert(
            TrackKind::ClipAudio,
            vec![placed(TrackKind::ClipAudio, 1, 20.0, 36.0)],
        );
        let timeline = Timeline::from_tracks(tracks, Vec::new());

        let (track, detail) = inconsistency(validate_timeline(&timeline, &windows).unwrap_err());
        assert_eq!(track, "clipAudio");
        assert_eq!(detail, "clip entry must sit inside exactly one break");
    }

    #[test]
    fn test_validation_catches_caption_outside_narration() {
        let windows = vec![window(0, SegmentTag::Narration, 0.0, 20.0)];
        let mut tracks = BTreeMap::new();
        tracks.insert(
            TrackKind::NarrationAudio,
            vec![placed(TrackKind::NarrationAudio, 0, 0.0, 20.0)],
        );
        let captions = vec![CaptionWord {
            text: "late".to_string(),
            timeline_start: 19.8,
            timeline_end: 20.4,
            style: Default::default(),
            part: Default::default(),
            segment_order: 0,
        }];
        let timeline = Timeline::from_tracks(tracks, captions);

        let (track, detail) = inconsistency(validate_timeline(&timeline, &windows).unwrap_err());
        assert_eq!(track, "captions");
        assert_eq!(detail, "caption lies outside narration audio");
    }

    #[test]
    fn test_validation_catches_speed_mismatch() {
        let windows = vec![window(0, SegmentTag::Narration, 0.0, 20.0)];
        let mut fast = placed(TrackKind::NarrationAudio, 0, 0.0, 20.0);
        fast.speed = Some(1.25);
        let mut tracks = BTreeMap::new();
        tracks.insert(TrackKind::NarrationAudio, vec![fast]);
        let timeline = Timeline::from_tracks(tracks, Vec::new());

        let (track, detail) = inconsistency(validate_timeline(&timeline, &windows).unwrap_err());
        assert_eq!(track, "narrationAudio");
        assert!(detail.contains("does not fill"));
    }

    #[test]
    fn test_assembled_timeline_passes_validation() {
        let timeline = build(1.25, 7.5, &[]).unwrap();
        timeline.check().unwrap();
    }
}

//! Script parsing: marker text to ordered segments.
//!
//! # Marker grammar
//!
//! ```text
//! [VIDEO_BREAK: duration=15s, clip=action]
//! [VIDEO_BREAK: duration=10-15s, type=punchline]
//! [CUE] Watch what happens next! [VIDEO_BREAK: duration=8, clip=action]
//! ```
//!
//! Keys are case-insensitive and `type=` is an alias of `clip=`. A
//! duration is `N`, `Ns`, `N.Ms`, or an inclusive range `A-B` / `A-Bs`.
//! Text between `[CUE]` and the following break marker becomes an
//! attention cue. Any other bracketed text is narration.

use regex::Regex;
use serde::{Deserialize, Serialize};
use splicer_timeline_model::{
    BreakKind, BreakSpec, ClipLookup, DurationRequest, Segment, SegmentKind,
};

use crate::config::ParserConfig;
use crate::error::{CompositionError, CompositionResult};

/// Compiled marker patterns.
struct MarkerPatterns {
    /// Any `[...]` token without nested brackets.
    bracket: Regex,
    /// Bracket contents that claim to be a marker.
    directive: Regex,
    video_break: Regex,
    cue: Regex,
    /// A marker opening that never closes.
    unterminated: Regex,
    /// Narration ending in a separate `!`/`?` sentence.
    trailing_cue: Regex,
}

impl MarkerPatterns {
    fn compile() -> CompositionResult<Self> {
        Ok(Self {
            bracket: compile(r"\[([^\[\]]*)\]")?,
            directive: compile(r"(?i)^\s*(?:VIDEO_BREAK|CUE)\b")?,
            video_break: compile(
                r"(?i)^\s*VIDEO_BREAK\s*:\s*duration\s*=\s*(\d+(?:\.\d+)?)\s*(?:-\s*(\d+(?:\.\d+)?)\s*)?s?\s*,\s*(?:clip|type)\s*=\s*([a-z0-9_-]+)\s*$",
            )?,
            cue: compile(r"(?i)^\s*CUE\s*$")?,
            unterminated: compile(r"(?i)\[\s*(?:VIDEO_BREAK|CUE)\b")?,
            trailing_cue: compile(r"^(.*[.!?])\s+([^.!?]+[!?]+)$")?,
        })
    }
}

fn compile(pattern: &str) -> CompositionResult<Regex> {
    Regex::new(pattern).map_err(|e| CompositionError::invalid_config("parser.pattern", e.to_string()))
}

/// A break marker as written, before its clip is looked up.
#[derive(Debug, Clone, PartialEq)]
struct BreakMarker {
    kind: BreakKind,
    requested: DurationRequest,
    offset: usize,
}

#[derive(Debug, Clone, PartialEq)]
enum Token<'a> {
    Text(&'a str),
    Cue { offset: usize },
    Break(BreakMarker),
}

/// An ordered, validated run of segments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedScript {
    segments: Vec<Segment>,
}

impl ParsedScript {
    /// Wrap hand-built segments, checking the same structural rules the
    /// parser enforces: contiguous orders from 0, some narration, no
    /// orphan breaks, and break durations within their clips.
    pub fn from_segments(segments: Vec<Segment>) -> CompositionResult<Self> {
        for (index, segment) in segments.iter().enumerate() {
            if segment.order as usize != index {
                return Err(CompositionError::InvalidConfig {
                    field: "segments".to_string(),
                    reason: format!(
                        "segment at position {index} has order {}, expected {index}",
                        segment.order
                    ),
                });
            }
            if let Some(spec) = segment.as_break() {
                let resolved = spec.resolved_duration;
                if !(resolved > 0.0 && resolved <= spec.clip.available_duration) {
                    return Err(CompositionError::InvalidBreakDuration {
                        order: segment.order,
                        requested_secs: spec.requested.nominal_secs(),
                        available_secs: spec.clip.available_duration,
                        resolved_secs: resolved,
                        min_secs: 0.0,
                    });
                }
            }
        }
        validate_structure(&segments)?;
        Ok(Self { segments })
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn into_segments(self) -> Vec<Segment> {
        self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Narration and cue segments, in order.
    pub fn speech_segments(&self) -> impl Iterator<Item = &Segment> {
        self.segments.iter().filter(|s| s.is_speech())
    }

    /// Break segments with their payloads, in order.
    pub fn breaks(&self) -> impl Iterator<Item = (u32, &BreakSpec)> {
        self.segments
            .iter()
            .filter_map(|s| s.as_break().map(|spec| (s.order, spec)))
    }

    /// Texts of every speech segment, in order.
    pub fn speech_parts(&self) -> Vec<&str> {
        self.speech_segments().filter_map(Segment::text).collect()
    }

    /// The single text handed to speech synthesis.
    pub fn speech_text(&self) -> String {
        self.speech_parts().join(" ")
    }
}

/// Turns marker-annotated script text into a [`ParsedScript`].
pub struct SegmentParser {
    config: ParserConfig,
    patterns: MarkerPatterns,
}

impl SegmentParser {
    pub fn new(config: ParserConfig) -> CompositionResult<Self> {
        Ok(Self {
            config,
            patterns: MarkerPatterns::compile()?,
        })
    }

    pub fn config(&self) -> &ParserConfig {
        &self.config
    }

    /// Parse `script`, resolving every break against `clips`.
    pub fn parse<L>(&self, script: &str, clips: &L) -> CompositionResult<ParsedScript>
    where
        L: ClipLookup + ?Sized,
    {
        let tokens = tokenize(&self.patterns, script)?;

        let has_text = tokens
            .iter()
            .any(|t| matches!(t, Token::Text(text) if !text.trim().is_empty()));
        if !has_text {
            return Err(CompositionError::EmptyScript);
        }

        let mut segments: Vec<Segment> = Vec::new();
        let mut narration = String::new();
        let mut open_cue: Option<(usize, String)> = None;

        for token in tokens {
            match token {
                Token::Text(text) => {
                    let buffer = match open_cue.as_mut() {
                        Some((_, clause)) => clause,
                        None => &mut narration,
                    };
                    buffer.push(' ');
                    buffer.push_str(text);
                }
                Token::Cue { offset } => {
                    if open_cue.is_some() {
                        return Err(CompositionError::malformed(
                            "[CUE]",
                            offset,
                            "previous cue was not followed by a break marker",
                        ));
                    }
                    let text = normalize(&narration);
                    if text.is_empty() {
                        return Err(CompositionError::malformed(
                            "[CUE]",
                            offset,
                            "cue must follow narration text",
                        ));
                    }
                    push_segment(&mut segments, |order| Segment::narration(order, text));
                    narration.clear();
                    open_cue = Some((offset, String::new()));
                }
                Token::Break(marker) => {
                    if let Some((offset, clause)) = open_cue.take() {
                        let clause = normalize(&clause);
                        if clause.is_empty() {
                            return Err(CompositionError::malformed(
                                "[CUE]",
                                offset,
                                "cue clause is empty",
                            ));
                        }
                        push_segment(&mut segments, |order| Segment::attention_cue(order, clause));
                    } else {
                        self.flush_narration(&mut segments, &narration, true);
                        narration.clear();
                    }

                    let spec = self.resolve_break(&marker, segments.len() as u32, clips)?;
                    push_segment(&mut segments, |order| Segment::break_segment(order, spec));
                }
            }
        }

        if let Some((offset, _)) = open_cue {
            return Err(CompositionError::malformed(
                "[CUE]",
                offset,
                "cue is not followed by a break marker",
            ));
        }
        self.flush_narration(&mut segments, &narration, false);

        validate_structure(&segments)?;

        let breaks = segments.iter().filter(|s| s.is_break()).count();
        let cues = segments
            .iter()
            .filter(|s| matches!(s.kind, SegmentKind::AttentionCue { .. }))
            .count();
        tracing::info!(
            segments = segments.len(),
            breaks,
            cues,
            "Parsed script"
        );

        Ok(ParsedScript { segments })
    }

    fn flush_narration(&self, segments: &mut Vec<Segment>, raw: &str, before_break: bool) {
        let text = normalize(raw);
        if text.is_empty() {
            return;
        }

        if before_break && self.config.infer_attention_cues {
            if let Some(caps) = self.patterns.trailing_cue.captures(&text) {
                let body = caps[1].to_string();
                let cue = caps[2].to_string();
                tracing::debug!(cue = %cue, "Inferred attention cue");
                push_segment(segments, |order| Segment::narration(order, body));
                push_segment(segments, |order| Segment::attention_cue(order, cue));
                return;
            }
        }

        push_segment(segments, |order| Segment::narration(order, text));
    }

    fn resolve_break<L>(&self, marker: &BreakMarker, order: u32, clips: &L) -> CompositionResult<BreakSpec>
    where
        L: ClipLookup + ?Sized,
    {
        let clip = clips
            .clip_for(&marker.kind)
            .ok_or_else(|| CompositionError::ClipNotFound {
                kind: marker.kind.to_string(),
            })?
            .clone();

        let requested_secs = marker.requested.nominal_secs();
        let available_secs = clip.available_duration;
        let resolved_secs = requested_secs.min(available_secs.max(0.0)).max(0.0);
        let min_secs = self.config.min_break_secs;

        if resolved_secs <= 0.0 || resolved_secs < min_secs {
            return Err(CompositionError::InvalidBreakDuration {
                order,
                requested_secs,
                available_secs,
                resolved_secs,
                min_secs,
            });
        }

        if resolved_secs < requested_secs {
            tracing::debug!(
                order,
                kind = %marker.kind,
                requested_secs,
                resolved_secs,
                "Break clamped to clip length"
            );
        }

        Ok(BreakSpec {
            kind: marker.kind.clone(),
            requested: marker.requested,
            resolved_duration: resolved_secs,
            clip,
        })
    }
}

/// Distinct break kinds referenced by `script`, in first-use order.
///
/// Lets a caller resolve clips before the full parse, which needs them.
pub fn scan_break_kinds(script: &str) -> CompositionResult<Vec<BreakKind>> {
    let patterns = MarkerPatterns::compile()?;
    let mut kinds: Vec<BreakKind> = Vec::new();
    for token in tokenize(&patterns, script)? {
        if let Token::Break(marker) = token {
            if !kinds.contains(&marker.kind) {
                kinds.push(marker.kind);
            }
        }
    }
    Ok(kinds)
}

fn push_segment(segments: &mut Vec<Segment>, make: impl FnOnce(u32) -> Segment) {
    let order = segments.len() as u32;
    segments.push(make(order));
}

fn normalize(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn tokenize<'a>(patterns: &MarkerPatterns, script: &'a str) -> CompositionResult<Vec<Token<'a>>> {
    let mut tokens = Vec::new();
    let mut cursor = 0;

    for caps in patterns.bracket.captures_iter(script) {
        let Some(whole) = caps.get(0) else {
            continue;
        };
        let inner = caps.get(1).map_or("", |m| m.as_str());
        if !patterns.directive.is_match(inner) {
            // ordinary bracketed prose stays in the narration
            continue;
        }

        push_text(patterns, &mut tokens, &script[cursor..whole.start()], cursor)?;
        cursor = whole.end();

        let offset = whole.start();
        if patterns.cue.is_match(inner) {
            tokens.push(Token::Cue { offset });
        } else {
            tokens.push(Token::Break(parse_break_marker(
                patterns,
                whole.as_str(),
                inner,
                offset,
            )?));
        }
    }
    push_text(patterns, &mut tokens, &script[cursor..], cursor)?;

    Ok(tokens)
}

fn push_text<'a>(
    patterns: &MarkerPatterns,
    tokens: &mut Vec<Token<'a>>,
    text: &'a str,
    base: usize,
) -> CompositionResult<()> {
    if let Some(m) = patterns.unterminated.find(text) {
        let marker: String = text[m.start()..].chars().take(40).collect();
        return Err(CompositionError::malformed(
            marker,
            base + m.start(),
            "marker is not closed",
        ));
    }
    if !text.is_empty() {
        tokens.push(Token::Text(text));
    }
    Ok(())
}

fn parse_break_marker(
    patterns: &MarkerPatterns,
    raw: &str,
    inner: &str,
    offset: usize,
) -> CompositionResult<BreakMarker> {
    let caps = patterns.video_break.captures(inner).ok_or_else(|| {
        CompositionError::malformed(raw, offset, "expected duration=<secs|min-max>, clip=<kind>")
    })?;

    let number = |index: usize| -> CompositionResult<Option<f64>> {
        match caps.get(index) {
            Some(m) => m
                .as_str()
                .parse::<f64>()
                .map(Some)
                .map_err(|e| CompositionError::malformed(raw, offset, e.to_string())),
            None => Ok(None),
        }
    };

    let first = number(1)?.unwrap_or_default();
    let requested = match number(2)? {
        Some(max) if first > max => {
            return Err(CompositionError::malformed(
                raw,
                offset,
                "range minimum exceeds maximum",
            ));
        }
        Some(max) => DurationRequest::Range {
            min_secs: first,
            max_secs: max,
        },
        None => DurationRequest::Exact { secs: first },
    };

    let kind = caps
        .get(3)
        .map(|m| BreakKind::from(m.as_str()))
        .ok_or_else(|| CompositionError::malformed(raw, offset, "missing clip kind"))?;

    tracing::debug!(offset, kind = %kind, ?requested, "Break marker");
    Ok(BreakMarker {
        kind,
        requested,
        offset,
    })
}

/// Orphan-break check shared by parsing and [`ParsedScript::from_segments`].
fn validate_structure(segments: &[Segment]) -> CompositionResult<()> {
    if !segments
        .iter()
        .any(|s| matches!(s.kind, SegmentKind::Narration { .. }))
    {
        return Err(CompositionError::EmptyScript);
    }

    for (index, segment) in segments.iter().enumerate() {
        if !segment.is_break() {
            continue;
        }
        let before = index
            .checked_sub(1)
            .and_then(|i| segments.get(i))
            .is_some_and(Segment::is_speech);
        let after = segments.get(index + 1).is_some_and(Segment::is_speech);
        if !before && !after {
            return Err(CompositionError::OrphanBreak {
                order: segment.order,
            });
        }
    }
    Ok(())
}

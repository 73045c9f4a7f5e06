use splicer_composition_core::{
    CompositionEngine, CompositionError, CompositionInputs, EngineConfig, ErrorCategory,
    OverlapPolicy, ParserConfig, SegmentParser,
};
use splicer_timeline_model::{
    CaptionStyle, ClipCatalog, ClipSource, NarrationAudio, SegmentTag, TrackKind, TranscriptWord,
    WordPart,
};

const SCRIPT: &str = "Last spring a goose walked into a bank in Ohio. \
                      [VIDEO_BREAK: duration=15s, clip=action] \
                      The teller did not even look up.";

fn clips() -> ClipCatalog {
    ClipCatalog::new()
        .with_clip("action", ClipSource::new("clips/goose-bank.mp4", 24.0))
        .with_clip("punchline", ClipSource::new("clips/teller.mp4", 12.0))
}

/// One recording: segment 0 is [0, 20), segment 2 is [20, 37.5).
fn narration() -> NarrationAudio {
    NarrationAudio::new("voiceover.mp3", 37.5).with_cut_points(vec![20.0])
}

fn transcript() -> Vec<TranscriptWord> {
    vec![
        TranscriptWord::new("Last", 0.2, 0.6),
        TranscriptWord::new("spring", 0.6, 1.1),
        TranscriptWord::new("Ohio.", 18.9, 19.6),
        TranscriptWord::new("The", 20.4, 20.7),
        TranscriptWord::new("teller", 20.7, 21.2),
        TranscriptWord::new("up.", 36.8, 37.3),
    ]
}

fn engine_with(policy: OverlapPolicy) -> CompositionEngine {
    let mut config = EngineConfig::default();
    config.scheduler.policy = policy;
    CompositionEngine::new(config).unwrap()
}

#[test]
fn scenario_a_dynamic_overlap_pulls_narration_under_clip() {
    splicer_common::logging::init_test_logging();

    let engine = CompositionEngine::with_defaults().unwrap();
    let parsed = engine.parse(SCRIPT, &clips()).unwrap();
    let audio = narration();
    let words = transcript();

    let composition = engine
        .compose_detailed(&parsed, CompositionInputs::new(&audio, &words))
        .unwrap();
    assert_eq!(composition.decisions.len(), 1);
    assert!((composition.decisions[0].overlap_duration - 7.5).abs() < 1e-9);

    let timeline = composition.timeline;
    let clip_audio = &timeline.entries(TrackKind::ClipAudio)[0];
    assert_eq!(clip_audio.timeline_start, 20.0);
    assert_eq!(clip_audio.timeline_end, 35.0);

    let narration = timeline.entries(TrackKind::NarrationAudio);
    assert_eq!(narration.len(), 2);
    assert_eq!(narration[0].timeline_start, 0.0);
    assert_eq!(narration[0].timeline_end, 20.0);
    assert!((narration[1].timeline_start - 27.5).abs() < 1e-9);
    assert!((narration[1].timeline_end - 45.0).abs() < 1e-9);

    let envelope = clip_audio.envelope.expect("clip audio is ducked");
    assert!((envelope.duck_start - 27.5).abs() < 1e-9);
    assert_eq!(envelope.duck_end, 35.0);
    assert_eq!(envelope.fade_duration, 0.5);
    assert_eq!(envelope.duck_volume, 0.3);

    assert!((timeline.total_duration() - 45.0).abs() < 1e-9);

    // "The" at 20.4s in the recording plays 0.4s into the pulled narration
    let the = timeline
        .captions()
        .iter()
        .find(|c| c.text == "The")
        .unwrap();
    assert!((the.timeline_start - 27.9).abs() < 1e-9);
    assert_eq!(the.segment_order, 2);
}

#[test]
fn scenario_b_zero_overlap_concatenates() {
    let engine = engine_with(OverlapPolicy::Fixed { secs: 0.0 });
    let parsed = engine.parse(SCRIPT, &clips()).unwrap();
    let audio = narration();
    let words = transcript();
    let timeline = engine
        .compose(&parsed, CompositionInputs::new(&audio, &words))
        .unwrap();

    let narration = timeline.entries(TrackKind::NarrationAudio);
    assert_eq!(narration[1].timeline_start, 35.0);
    assert_eq!(narration[1].timeline_end, 52.5);
    assert_eq!(timeline.total_duration(), 52.5);
    assert!(timeline.entries(TrackKind::ClipAudio)[0].envelope.is_none());
}

#[test]
fn scenario_c_clamped_break_below_minimum() {
    let script = "Then the manager arrived. \
                  [VIDEO_BREAK: duration=20s, clip=punchline] \
                  Nobody has explained it since.";

    // clamping alone is fine with the default minimum
    let lenient = SegmentParser::new(ParserConfig::default()).unwrap();
    let parsed = lenient.parse(script, &clips()).unwrap();
    let (_, spec) = parsed.breaks().next().unwrap();
    assert_eq!(spec.resolved_duration, 12.0);

    let strict = SegmentParser::new(ParserConfig {
        min_break_secs: 15.0,
        ..ParserConfig::default()
    })
    .unwrap();
    let err = strict.parse(script, &clips()).unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Parse);
    match err {
        CompositionError::InvalidBreakDuration {
            resolved_secs,
            available_secs,
            min_secs,
            ..
        } => {
            assert_eq!(resolved_secs, 12.0);
            assert_eq!(available_secs, 12.0);
            assert_eq!(min_secs, 15.0);
        }
        other => panic!("expected InvalidBreakDuration, got {other:?}"),
    }
}

#[test]
fn scenario_d_word_past_the_recording_is_reported() {
    let engine = CompositionEngine::with_defaults().unwrap();
    let parsed = engine.parse(SCRIPT, &clips()).unwrap();
    let audio = narration();
    let mut words = transcript();
    words.push(TranscriptWord::new("encore", 41.0, 41.5));

    let err = engine
        .compose(&parsed, CompositionInputs::new(&audio, &words))
        .unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Mapping);
    assert_eq!(
        err,
        CompositionError::CaptionOutOfRange {
            word: "encore".to_string(),
            source_time: 41.0,
            nearest_segment: Some(2),
        }
    );
}

#[test]
fn attention_cue_gets_its_own_window_and_emphasis() {
    let script = "The goose stared at the teller. [CUE] Then it honked! \
                  [VIDEO_BREAK: duration=10s, clip=action] \
                  The bank closed early.";
    let engine = CompositionEngine::with_defaults().unwrap();
    let parsed = engine.parse(script, &clips()).unwrap();
    assert_eq!(parsed.speech_parts().len(), 3);

    let audio = NarrationAudio::new("voiceover.mp3", 9.0).with_cut_points(vec![3.0, 4.5]);
    let words = vec![
        TranscriptWord::new("stared", 0.5, 1.0),
        TranscriptWord::new("honked!", 3.6, 4.3),
        TranscriptWord::new("closed", 6.0, 6.5),
    ];
    let timeline = engine
        .compose(&parsed, CompositionInputs::new(&audio, &words))
        .unwrap();

    let narration = timeline.entries(TrackKind::NarrationAudio);
    assert_eq!(narration[1].segment_kind, SegmentTag::AttentionCue);
    assert_eq!(narration[1].timeline_start, 3.0);
    assert_eq!(narration[1].timeline_end, 4.5);

    let honk = timeline
        .captions()
        .iter()
        .find(|c| c.text == "honked!")
        .unwrap();
    assert_eq!(honk.style, CaptionStyle::Emphasis);
    assert_eq!(honk.part, WordPart::Whole);

    // the break starts right after the cue; no overlap before a clip
    let clip = &timeline.entries(TrackKind::ClipVideo)[0];
    assert_eq!(clip.timeline_start, 4.5);
}

#[test]
fn word_spanning_a_cut_is_split_across_windows() {
    let engine = CompositionEngine::with_defaults().unwrap();
    let parsed = engine.parse(SCRIPT, &clips()).unwrap();
    let audio = narration();
    let words = vec![TranscriptWord::new("Ohio-ish", 19.7, 20.2)];

    let timeline = engine
        .compose(&parsed, CompositionInputs::new(&audio, &words))
        .unwrap();
    let captions = timeline.captions();
    assert_eq!(captions.len(), 2);
    assert_eq!(captions[0].part, WordPart::Leading);
    assert!((captions[0].timeline_end - 20.0).abs() < 1e-9);
    assert_eq!(captions[1].part, WordPart::Continuation);
    assert!((captions[1].timeline_start - 27.5).abs() < 1e-9);
    assert!((captions[1].timeline_end - 27.7).abs() < 1e-9);
}

#[test]
fn composing_twice_gives_identical_timelines() {
    let engine = CompositionEngine::with_defaults().unwrap();
    let parsed = engine.parse(SCRIPT, &clips()).unwrap();
    let audio = narration();
    let words = transcript();

    let first = engine
        .compose(&parsed, CompositionInputs::new(&audio, &words))
        .unwrap();
    let second = engine
        .compose(&parsed, CompositionInputs::new(&audio, &words))
        .unwrap();
    assert_eq!(first, second);
    assert_eq!(
        serde_json::to_string(&first).unwrap(),
        serde_json::to_string(&second).unwrap()
    );
}

#[test]
fn timeline_document_shape() {
    let engine = CompositionEngine::with_defaults().unwrap();
    let parsed = engine.parse(SCRIPT, &clips()).unwrap();
    let audio = narration();
    let words = transcript();
    let timeline = engine
        .compose(&parsed, CompositionInputs::new(&audio, &words))
        .unwrap();

    let json = serde_json::to_value(&timeline).unwrap();
    assert_eq!(json["version"], 1);
    let clip_audio = &json["tracks"]["clipAudio"][0];
    assert_eq!(clip_audio["break_kind"], "action");
    assert_eq!(clip_audio["z_index"], 10);
    assert_eq!(clip_audio["envelope"]["duck_volume"], 0.3);
    assert_eq!(json["captions"][0]["style"], "normal");
}

//! End-to-end tests: JSON request in, validated events through the core,
//! MIDI bytes or evaluation out.

use chorale::{
    evaluate, harmonize_to_midi, EvaluateRequest, HarmonizeRequest, MidiParams,
    ReferenceLibrary, ReturnMode,
};
use midly::{MidiMessage, Smf, TrackEventKind};
use pretty_assertions::assert_eq;

const SCALE_REQUEST: &str = r#"{
    "version": "1.0",
    "mode": "harmonize",
    "duration_sec": 8,
    "quantize": "1s",
    "octave_base": "C4",
    "key": "C major",
    "events": [
        {"t_sec": 6, "note": 71},
        {"t_sec": 0, "note": 60, "vel": 110},
        {"t_sec": 1, "note": 62},
        {"t_sec": 2, "note": 64},
        {"t_sec": 3, "note": 65},
        {"t_sec": 4, "note": 67},
        {"t_sec": 5, "note": 69}
    ]
}"#;

/// Absolute-tick note-ons for one track: (tick, channel, key, velocity).
fn note_ons(track: &[midly::TrackEvent]) -> Vec<(u32, u8, u8, u8)> {
    let mut tick = 0u32;
    let mut out = Vec::new();
    for event in track {
        tick += event.delta.as_int();
        if let TrackEventKind::Midi {
            channel,
            message: MidiMessage::NoteOn { key, vel },
        } = event.kind
        {
            if vel.as_int() > 0 {
                out.push((tick, channel.as_int(), key.as_int(), vel.as_int()));
            }
        }
    }
    out
}

#[test]
fn test_harmonize_request_to_midi() {
    let valid = HarmonizeRequest::from_json(SCALE_REQUEST.as_bytes())
        .and_then(|r| r.validate())
        .expect("request should validate");
    assert_eq!(valid.return_mode, ReturnMode::Bytes);

    let output = harmonize_to_midi(&valid.events, valid.duration_sec, &MidiParams::default())
        .expect("harmonization should succeed");

    let smf = Smf::parse(&output.midi).expect("output should be valid SMF");
    assert_eq!(smf.tracks.len(), 2);

    let melody = note_ons(&smf.tracks[0][..]);
    assert_eq!(melody.len(), 7);
    assert_eq!(melody[0], (0, 0, 60, 110));
    assert_eq!(melody[6], (6 * 480, 0, 71, 96));

    let harmony = note_ons(&smf.tracks[1][..]);
    assert_eq!(harmony.len(), 21);
    let at_four: Vec<u8> = harmony
        .iter()
        .filter(|(tick, ..)| *tick == 4 * 480)
        .map(|(_, _, key, _)| *key)
        .collect();
    assert_eq!(at_four, vec![67, 71, 74]);
    assert!(harmony.iter().all(|(_, ch, _, vel)| *ch == 1 && *vel == 60));

    let names: Vec<_> = output.chords.iter().map(|c| c.chord_name.as_str()).collect();
    assert_eq!(
        names,
        vec!["C Major", "D Major", "E Major", "F Major", "G Major", "A Major", "B Major"]
    );
    assert_eq!(output.chords[6].duration_sec, 2);
}

#[test]
fn test_custom_programs_reach_the_file() {
    let params = MidiParams {
        melody_program: 40,
        harmony_program: 19,
        ..MidiParams::default()
    };
    let events = vec![chorale::MusicEvent::new(0, 62)];
    let output = harmonize_to_midi(&events, 1, &params).unwrap();
    let smf = Smf::parse(&output.midi).unwrap();

    let programs: Vec<u8> = smf
        .tracks
        .iter()
        .flat_map(|track| track.iter())
        .filter_map(|e| match e.kind {
            TrackEventKind::Midi {
                message: MidiMessage::ProgramChange { program },
                ..
            } => Some(program.as_int()),
            _ => None,
        })
        .collect();
    assert_eq!(programs, vec![40, 19]);
}

#[test]
fn test_evaluate_request_against_builtin() {
    let body = r#"{
        "version": "1.0",
        "mode": "evaluate",
        "duration_sec": 10,
        "quantize": "1s",
        "octave_base": "C4",
        "key": "C major",
        "reference_id": "exercise_c_major_01",
        "events": [
            {"t_sec": 0, "note": 60},
            {"t_sec": 1, "note": 62},
            {"t_sec": 2, "note": 65},
            {"t_sec": 3, "note": 65},
            {"t_sec": 4, "note": 67},
            {"t_sec": 5, "note": 69},
            {"t_sec": 6, "note": 71},
            {"t_sec": 7, "note": 60},
            {"t_sec": 8, "note": 62}
        ]
    }"#;
    let valid = EvaluateRequest::from_json(body.as_bytes())
        .and_then(|r| r.validate())
        .unwrap();

    let library = ReferenceLibrary::builtin();
    let result = evaluate(
        &valid.events,
        &valid.reference_id,
        valid.duration_sec,
        &library,
    )
    .unwrap();

    // one wrong (t=2), one missing (t=9)
    assert_eq!(result.subscores.accuracy, 80.0);
    assert_eq!(result.subscores.timing, 90.0);
    assert_eq!(result.score, 83.0);
    assert_eq!(result.mistakes.len(), 2);
    assert_eq!(
        result.advice,
        "Focus on accuracy - you played 1 wrong notes. Don't miss notes - you missed 1 notes. \
         You're doing well overall, just need minor adjustments."
    );
}

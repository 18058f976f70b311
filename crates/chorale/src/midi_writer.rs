use serde::{Deserialize, Serialize};

use crate::timeline::{EventKind, TimelineEvent};

/// Options for the two-track SMF export.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportOptions {
    /// MIDI division. Default: 480.
    pub ticks_per_beat: u16,
    /// Tempo written at the start of the melody track. Default: 500000 (120 BPM).
    pub tempo_us_per_beat: u32,
    /// Program for the melody track. Default: 0 (piano).
    pub melody_program: u8,
    /// Program for the harmony track. Default: 48 (strings).
    pub harmony_program: u8,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            ticks_per_beat: 480,
            tempo_us_per_beat: 500_000,
            melody_program: 0,
            harmony_program: 48,
        }
    }
}

/// SMF format 1: tracks play in parallel.
const SMF_FORMAT_PARALLEL: u16 = 1;

/// Write melody and harmony streams to Standard MIDI File format 1 bytes.
///
/// Track 0: tempo, melody program change, melody note events.
/// Track 1: harmony program change, harmony note events.
///
/// Streams are already delta-timed, so events are written in order.
pub fn harmonized_to_midi(
    melody: &[TimelineEvent],
    harmony: &[TimelineEvent],
    options: &ExportOptions,
) -> Vec<u8> {
    let melody_channel = melody.first().map(|e| e.channel).unwrap_or(0);
    let harmony_channel = harmony.first().map(|e| e.channel).unwrap_or(1);

    let mut melody_track = Vec::new();
    write_tempo(&mut melody_track, options.tempo_us_per_beat);
    write_program(&mut melody_track, melody_channel, options.melody_program);
    write_events(&mut melody_track, melody);
    write_end_of_track(&mut melody_track);

    let mut harmony_track = Vec::new();
    write_program(&mut harmony_track, harmony_channel, options.harmony_program);
    write_events(&mut harmony_track, harmony);
    write_end_of_track(&mut harmony_track);

    let mut header = Vec::with_capacity(6);
    header.extend_from_slice(&SMF_FORMAT_PARALLEL.to_be_bytes());
    header.extend_from_slice(&2u16.to_be_bytes());
    header.extend_from_slice(&options.ticks_per_beat.to_be_bytes());

    let mut smf = Vec::with_capacity(14 + 8 * 2 + melody_track.len() + harmony_track.len());
    write_chunk(&mut smf, b"MThd", &header);
    write_chunk(&mut smf, b"MTrk", &melody_track);
    write_chunk(&mut smf, b"MTrk", &harmony_track);
    smf
}

/// Tag, big-endian length, body.
fn write_chunk(out: &mut Vec<u8>, tag: &[u8; 4], body: &[u8]) {
    out.extend_from_slice(tag);
    out.extend_from_slice(&(body.len() as u32).to_be_bytes());
    out.extend_from_slice(body);
}

fn write_tempo(track: &mut Vec<u8>, us_per_beat: u32) {
    let [_, hi, mid, lo] = us_per_beat.to_be_bytes();
    write_delta(track, 0);
    track.extend_from_slice(&[0xFF, 0x51, 0x03, hi, mid, lo]);
}

fn write_program(track: &mut Vec<u8>, channel: u8, program: u8) {
    write_delta(track, 0);
    track.extend_from_slice(&[0xC0 | (channel & 0x0F), program & 0x7F]);
}

fn write_events(track: &mut Vec<u8>, events: &[TimelineEvent]) {
    for event in events {
        write_delta(track, event.delta_ticks);
        let status = match event.kind {
            EventKind::NoteOn => 0x90,
            EventKind::NoteOff => 0x80,
        };
        track.extend_from_slice(&[
            status | (event.channel & 0x0F),
            event.note & 0x7F,
            event.velocity & 0x7F,
        ]);
    }
}

fn write_end_of_track(track: &mut Vec<u8>) {
    write_delta(track, 0);
    track.extend_from_slice(&[0xFF, 0x2F, 0x00]);
}

/// Delta time as a variable-length quantity: 7 bits per byte, most
/// significant group first, continuation bit on all but the last byte.
fn write_delta(track: &mut Vec<u8>, ticks: u32) {
    let mut groups = [0u8; 5];
    let mut len = 0;
    let mut rest = ticks;
    loop {
        groups[len] = (rest & 0x7F) as u8;
        len += 1;
        rest >>= 7;
        if rest == 0 {
            break;
        }
    }
    for (i, group) in groups[..len].iter().enumerate().rev() {
        let continuation = if i > 0 { 0x80 } else { 0 };
        track.push(group | continuation);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::MusicEvent;
    use crate::harmony::harmonize;
    use crate::notes::NoteNameTable;
    use crate::timeline::{build_melody, TimelineParams};
    use midly::{MetaMessage, MidiMessage, Smf, TrackEventKind};

    fn streams(events: &[MusicEvent], duration: u32) -> (Vec<TimelineEvent>, Vec<TimelineEvent>) {
        let params = TimelineParams::default();
        let melody = build_melody(events, duration, &params).unwrap();
        let harmony = harmonize(events, duration, &params, &NoteNameTable::default())
            .unwrap()
            .events;
        (melody, harmony)
    }

    #[test]
    fn header_is_format_one_with_two_tracks() {
        let (melody, harmony) = streams(&[MusicEvent::new(0, 60)], 2);
        let bytes = harmonized_to_midi(&melody, &harmony, &ExportOptions::default());

        let smf = Smf::parse(&bytes).expect("Generated MIDI should be valid");
        assert_eq!(smf.header.format, midly::Format::Parallel);
        assert_eq!(smf.tracks.len(), 2);
        assert_eq!(
            smf.header.timing,
            midly::Timing::Metrical(midly::num::u15::new(480))
        );
    }

    #[test]
    fn melody_track_starts_with_tempo_and_program() {
        let (melody, harmony) = streams(&[MusicEvent::new(0, 64)], 1);
        let bytes = harmonized_to_midi(&melody, &harmony, &ExportOptions::default());
        let smf = Smf::parse(&bytes).unwrap();

        match smf.tracks[0][0].kind {
            TrackEventKind::Meta(MetaMessage::Tempo(t)) => assert_eq!(t.as_int(), 500_000),
            other => panic!("expected tempo, got {:?}", other),
        }
        match smf.tracks[0][1].kind {
            TrackEventKind::Midi {
                channel,
                message: MidiMessage::ProgramChange { program },
            } => {
                assert_eq!(channel.as_int(), 0);
                assert_eq!(program.as_int(), 0);
            }
            other => panic!("expected program change, got {:?}", other),
        }
        match smf.tracks[1][0].kind {
            TrackEventKind::Midi {
                channel,
                message: MidiMessage::ProgramChange { program },
            } => {
                assert_eq!(channel.as_int(), 1);
                assert_eq!(program.as_int(), 48);
            }
            other => panic!("expected program change, got {:?}", other),
        }
    }

    #[test]
    fn track_lengths_match_duration() {
        let events = vec![
            MusicEvent::new(0, 60),
            MusicEvent::new(3, 65),
            MusicEvent::new(4, 67),
        ];
        let (melody, harmony) = streams(&events, 6);
        let bytes = harmonized_to_midi(&melody, &harmony, &ExportOptions::default());
        let smf = Smf::parse(&bytes).unwrap();

        for track in &smf.tracks {
            let ticks: u32 = track.iter().map(|e| e.delta.as_int()).sum();
            assert_eq!(ticks, 6 * 480);
        }
    }

    #[test]
    fn harmony_note_ons_carry_fixed_velocity() {
        let events = vec![MusicEvent::new(0, 62).with_velocity(120)];
        let (melody, harmony) = streams(&events, 1);
        let bytes = harmonized_to_midi(&melody, &harmony, &ExportOptions::default());
        let smf = Smf::parse(&bytes).unwrap();

        let velocities = |track: &[midly::TrackEvent]| -> Vec<u8> {
            track
                .iter()
                .filter_map(|e| match e.kind {
                    TrackEventKind::Midi {
                        message: MidiMessage::NoteOn { vel, .. },
                        ..
                    } => Some(vel.as_int()),
                    _ => None,
                })
                .collect()
        };
        assert_eq!(velocities(&smf.tracks[0][..]), vec![120]);
        assert_eq!(velocities(&smf.tracks[1][..]), vec![60, 60, 60]);
    }

    #[test]
    fn delta_encoding() {
        let encode = |ticks: u32| {
            let mut buf = Vec::new();
            write_delta(&mut buf, ticks);
            buf
        };
        assert_eq!(encode(0), vec![0x00]);
        assert_eq!(encode(127), vec![0x7F]);
        assert_eq!(encode(128), vec![0x81, 0x00]);
        assert_eq!(encode(480), vec![0x83, 0x60]);
        assert_eq!(encode(28_800), vec![0x81, 0xE1, 0x00]);
    }

    #[test]
    fn header_chunk_layout() {
        let options = ExportOptions {
            ticks_per_beat: 96,
            ..ExportOptions::default()
        };
        let (melody, harmony) = streams(&[MusicEvent::new(0, 60)], 1);
        let bytes = harmonized_to_midi(&melody, &harmony, &options);

        assert_eq!(
            &bytes[..14],
            &[b'M', b'T', b'h', b'd', 0, 0, 0, 6, 0, 1, 0, 2, 0, 96]
        );
        assert_eq!(&bytes[14..18], b"MTrk");
    }
}

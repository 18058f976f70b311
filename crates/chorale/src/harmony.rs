//! Triad harmonization of a melody line.
//!
//! Every melody note becomes the root of a closed-position major triad that
//! sounds until the next melody onset (or the end of the timeline).

use serde::{Deserialize, Serialize};

use crate::event::MusicEvent;
use crate::notes::NoteNameTable;
use crate::timeline::{checked_sorted, TimelineEvent, TimelineParams};
use crate::Result;

/// Semitones from root to major third
const MAJOR_THIRD: u8 = 4;
/// Semitones from root to perfect fifth
const PERFECT_FIFTH: u8 = 7;

/// A root-position major triad.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Triad {
    pub root: u8,
    pub third: u8,
    pub fifth: u8,
}

impl Triad {
    pub fn major(root: u8) -> Self {
        Triad {
            root,
            third: root.saturating_add(MAJOR_THIRD).min(127),
            fifth: root.saturating_add(PERFECT_FIFTH).min(127),
        }
    }

    pub fn notes(&self) -> [u8; 3] {
        [self.root, self.third, self.fifth]
    }
}

/// Human-readable description of one generated chord.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChordDescriptor {
    pub time_sec: u32,
    pub duration_sec: u32,
    pub root_note: u8,
    pub chord_name: String,
    pub notes: [u8; 3],
    pub note_names: [String; 3],
}

/// Harmony channel stream plus one descriptor per melody event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HarmonyTrack {
    pub events: Vec<TimelineEvent>,
    pub chords: Vec<ChordDescriptor>,
}

/// Emit all three notes of a chord; only the first carries `delta`.
fn push_chord(
    out: &mut Vec<TimelineEvent>,
    triad: &Triad,
    delta: u32,
    mut make: impl FnMut(u8, u32) -> TimelineEvent,
) {
    for (i, note) in triad.notes().into_iter().enumerate() {
        out.push(make(note, if i == 0 { delta } else { 0 }));
    }
}

/// Generate the harmony stream for a melody.
pub fn harmonize(
    events: &[MusicEvent],
    duration_sec: u32,
    params: &TimelineParams,
    names: &NoteNameTable,
) -> Result<HarmonyTrack> {
    let sorted = checked_sorted(events, duration_sec)?;
    let channel = params.harmony_channel;
    let velocity = params.harmony_velocity;

    let mut out = Vec::with_capacity(sorted.len() * 6);
    let mut chords = Vec::with_capacity(sorted.len());
    let mut current_tick = 0u32;
    let mut current: Option<Triad> = None;

    for (i, event) in sorted.iter().enumerate() {
        let tick = params.ticks_at(event.t_sec);
        let chord_end = sorted
            .get(i + 1)
            .map(|next| next.t_sec)
            .unwrap_or(duration_sec);

        if let Some(previous) = current {
            push_chord(&mut out, &previous, tick - current_tick, |note, delta| {
                TimelineEvent::note_off(channel, note, delta)
            });
            current_tick = tick;
        }

        let triad = Triad::major(event.note);
        let notes = triad.notes();
        chords.push(ChordDescriptor {
            time_sec: event.t_sec,
            duration_sec: chord_end - event.t_sec,
            root_note: triad.root,
            chord_name: format!("{} Major", names.name(triad.root)),
            notes,
            note_names: notes.map(|n| names.name(n)),
        });

        push_chord(&mut out, &triad, tick - current_tick, |note, delta| {
            TimelineEvent::note_on(channel, note, velocity, delta)
        });
        current = Some(triad);
        current_tick = tick;
    }

    if let Some(last) = current {
        let end_tick = params.ticks_at(duration_sec);
        push_chord(&mut out, &last, end_tick - current_tick, |note, delta| {
            TimelineEvent::note_off(channel, note, delta)
        });
    }

    tracing::debug!(
        chords = chords.len(),
        timeline_events = out.len(),
        "built harmony timeline"
    );

    Ok(HarmonyTrack {
        events: out,
        chords,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timeline::{total_ticks, EventKind};
    use crate::DIATONIC_NOTES;
    use pretty_assertions::assert_eq;

    fn harmonize_default(events: &[MusicEvent], duration_sec: u32) -> HarmonyTrack {
        harmonize(
            events,
            duration_sec,
            &TimelineParams::default(),
            &NoteNameTable::default(),
        )
        .unwrap()
    }

    #[test]
    fn test_triad_intervals() {
        for root in DIATONIC_NOTES {
            let triad = Triad::major(root);
            assert_eq!(triad.third, root + 4);
            assert_eq!(triad.fifth, root + 7);
        }
    }

    #[test]
    fn test_single_chord_stream() {
        let track = harmonize_default(&[MusicEvent::new(0, 60)], 2);

        assert_eq!(
            track.events,
            vec![
                TimelineEvent::note_on(1, 60, 60, 0),
                TimelineEvent::note_on(1, 64, 60, 0),
                TimelineEvent::note_on(1, 67, 60, 0),
                TimelineEvent::note_off(1, 60, 960),
                TimelineEvent::note_off(1, 64, 0),
                TimelineEvent::note_off(1, 67, 0),
            ]
        );
    }

    #[test]
    fn test_chord_change_closes_previous_chord() {
        let events = vec![MusicEvent::new(1, 62), MusicEvent::new(3, 67)];
        let track = harmonize_default(&events, 4);

        let expected = vec![
            TimelineEvent::note_on(1, 62, 60, 480),
            TimelineEvent::note_on(1, 66, 60, 0),
            TimelineEvent::note_on(1, 69, 60, 0),
            TimelineEvent::note_off(1, 62, 960),
            TimelineEvent::note_off(1, 66, 0),
            TimelineEvent::note_off(1, 69, 0),
            TimelineEvent::note_on(1, 67, 60, 0),
            TimelineEvent::note_on(1, 71, 60, 0),
            TimelineEvent::note_on(1, 74, 60, 0),
            TimelineEvent::note_off(1, 67, 480),
            TimelineEvent::note_off(1, 71, 0),
            TimelineEvent::note_off(1, 74, 0),
        ];
        assert_eq!(track.events, expected);
        assert_eq!(total_ticks(&track.events), 4 * 480);
    }

    #[test]
    fn test_chord_descriptors() {
        let events = vec![
            MusicEvent::new(0, 60),
            MusicEvent::new(2, 71),
            MusicEvent::new(5, 65),
        ];
        let track = harmonize_default(&events, 8);

        assert_eq!(
            track.chords[1],
            ChordDescriptor {
                time_sec: 2,
                duration_sec: 3,
                root_note: 71,
                chord_name: "B Major".to_string(),
                notes: [71, 75, 78],
                note_names: ["B".to_string(), "D#".to_string(), "F#".to_string()],
            }
        );
        assert_eq!(track.chords[2].chord_name, "F Major");
        assert_eq!(track.chords[2].duration_sec, 3);
    }

    #[test]
    fn test_chords_tile_the_timeline() {
        let events: Vec<_> = [0u32, 1, 4, 5, 9, 17]
            .iter()
            .enumerate()
            .map(|(i, t)| MusicEvent::new(*t, DIATONIC_NOTES[i % 7]))
            .collect();
        let duration = 20;
        let track = harmonize_default(&events, duration);

        assert_eq!(track.chords.len(), events.len());
        let mut cursor = 0;
        for chord in &track.chords {
            assert_eq!(chord.time_sec, cursor, "gap or overlap before {:?}", chord);
            cursor += chord.duration_sec;
        }
        assert_eq!(cursor, duration);
        assert_eq!(total_ticks(&track.events), duration * 480);
    }

    #[test]
    fn test_harmony_is_three_voices_per_chord() {
        let events: Vec<_> = DIATONIC_NOTES
            .iter()
            .enumerate()
            .map(|(i, n)| MusicEvent::new(i as u32, *n))
            .collect();
        let track = harmonize_default(&events, 7);

        let ons = track
            .events
            .iter()
            .filter(|e| e.kind == EventKind::NoteOn)
            .count();
        let offs = track.events.len() - ons;
        assert_eq!(ons, 21);
        assert_eq!(offs, 21);
        assert!(track.events.iter().all(|e| e.channel == 1));
    }

    #[test]
    fn test_names_outside_table_render_unknown() {
        let names = NoteNameTable::octaves_from(60, 1);
        let track = harmonize(
            &[MusicEvent::new(0, 67)],
            1,
            &TimelineParams::default(),
            &names,
        )
        .unwrap();

        assert_eq!(track.chords[0].chord_name, "G Major");
        assert_eq!(
            track.chords[0].note_names,
            ["G".to_string(), "B".to_string(), "Unknown(74)".to_string()]
        );
    }
}

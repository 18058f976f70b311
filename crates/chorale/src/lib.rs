//! Melody harmonization and performance scoring.
//!
//! Three stateless pieces sit at the center of this crate:
//!
//! - [`timeline::build_melody`] turns sorted melody events into a note-on /
//!   note-off stream with exact tick deltas.
//! - [`harmony::harmonize`] derives a major triad per melody note and emits
//!   the parallel harmony stream plus chord metadata.
//! - [`scoring::evaluate`] grades a played sequence against a reference
//!   template.
//!
//! Around them, [`request`] validates incoming requests and
//! [`midi_writer`] packs both streams into a Standard MIDI File.
//!
//! # Example
//!
//! ```
//! use chorale::{harmonize_to_midi, MidiParams, MusicEvent};
//!
//! let events = vec![MusicEvent::new(0, 60), MusicEvent::new(2, 67)];
//! let output = harmonize_to_midi(&events, 4, &MidiParams::default()).unwrap();
//!
//! assert_eq!(&output.midi[0..4], b"MThd");
//! assert_eq!(output.chords[1].chord_name, "G Major");
//! ```

pub mod event;
pub mod harmony;
pub mod midi_writer;
pub mod notes;
pub mod reference;
pub mod request;
pub mod scoring;
pub mod timeline;

pub use event::{sorted_by_time, MusicEvent, DEFAULT_VELOCITY, DIATONIC_NOTES};
pub use harmony::{harmonize, ChordDescriptor, HarmonyTrack, Triad};
pub use midi_writer::{harmonized_to_midi, ExportOptions};
pub use notes::NoteNameTable;
pub use reference::{ReferenceLibrary, ReferenceLookup, ReferenceTemplate};
pub use request::{
    EvaluateRequest, HarmonizeRequest, ReturnMode, ValidEvaluate, ValidHarmonize,
    ValidationError,
};
pub use scoring::{evaluate, ErrorType, EvaluationResult, Mistake, Subscores};
pub use timeline::{build_melody, EventKind, TimelineEvent, TimelineParams};

/// Errors raised by the core components.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Reference not found: {0}")]
    ReferenceNotFound(String),

    #[error("event at {t_sec}s is not before the end of the {duration_sec}s timeline")]
    EventOutOfRange { t_sec: u32, duration_sec: u32 },

    #[error("no melody events to harmonize")]
    EmptySequence,
}

pub type Result<T> = std::result::Result<T, Error>;

/// Parameters for timeline and MIDI generation.
#[derive(Debug, Clone)]
pub struct MidiParams {
    /// Ticks per second of timeline (MIDI division, typically 480)
    pub ticks_per_beat: u16,
    /// Tempo meta-event value in microseconds per beat
    pub tempo_us_per_beat: u32,
    /// GM program for the melody track (0 = Acoustic Grand Piano)
    pub melody_program: u8,
    /// GM program for the harmony track (48 = String Ensemble 1)
    pub harmony_program: u8,
    /// Note-on velocity for every harmony note
    pub harmony_velocity: u8,
    /// Note names used for chord metadata
    pub note_names: NoteNameTable,
}

impl Default for MidiParams {
    fn default() -> Self {
        MidiParams {
            ticks_per_beat: 480,
            tempo_us_per_beat: 500_000,
            melody_program: 0,
            harmony_program: 48,
            harmony_velocity: 60,
            note_names: NoteNameTable::default(),
        }
    }
}

impl MidiParams {
    pub fn timeline(&self) -> TimelineParams {
        TimelineParams {
            ticks_per_beat: self.ticks_per_beat,
            harmony_velocity: self.harmony_velocity,
            ..TimelineParams::default()
        }
    }

    pub fn export_options(&self) -> ExportOptions {
        ExportOptions {
            ticks_per_beat: self.ticks_per_beat,
            tempo_us_per_beat: self.tempo_us_per_beat,
            melody_program: self.melody_program,
            harmony_program: self.harmony_program,
        }
    }
}

/// A generated two-track MIDI file with its chord metadata.
#[derive(Debug, Clone)]
pub struct HarmonizedOutput {
    pub midi: Vec<u8>,
    pub chords: Vec<ChordDescriptor>,
}

/// Build the melody and harmony streams and encode them as SMF format 1.
pub fn harmonize_to_midi(
    events: &[MusicEvent],
    duration_sec: u32,
    params: &MidiParams,
) -> Result<HarmonizedOutput> {
    if events.is_empty() {
        return Err(Error::EmptySequence);
    }

    let timeline = params.timeline();
    let melody = build_melody(events, duration_sec, &timeline)?;
    let harmony = harmonize(events, duration_sec, &timeline, &params.note_names)?;
    let midi = harmonized_to_midi(&melody, &harmony.events, &params.export_options());

    tracing::debug!(
        events = events.len(),
        duration_sec,
        bytes = midi.len(),
        "generated harmonized MIDI"
    );

    Ok(HarmonizedOutput {
        midi,
        chords: harmony.chords,
    })
}

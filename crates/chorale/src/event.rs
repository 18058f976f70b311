use serde::{Deserialize, Serialize};

/// Velocity assumed when a request omits it.
pub const DEFAULT_VELOCITY: u8 = 96;

/// The C major white keys of the octave starting at middle C.
pub const DIATONIC_NOTES: [u8; 7] = [60, 62, 64, 65, 67, 69, 71];

/// A single timestamped melody (or played) note.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MusicEvent {
    /// Onset in whole seconds
    pub t_sec: u32,
    /// MIDI note number
    pub note: u8,
    #[serde(rename = "vel", alias = "velocity", default = "default_velocity")]
    pub velocity: u8,
}

fn default_velocity() -> u8 {
    DEFAULT_VELOCITY
}

impl MusicEvent {
    pub fn new(t_sec: u32, note: u8) -> Self {
        MusicEvent {
            t_sec,
            note,
            velocity: DEFAULT_VELOCITY,
        }
    }

    pub fn with_velocity(mut self, velocity: u8) -> Self {
        self.velocity = velocity;
        self
    }
}

/// Copy of `events` ordered by onset. Stable, so equal onsets keep input order.
pub fn sorted_by_time(events: &[MusicEvent]) -> Vec<MusicEvent> {
    let mut sorted = events.to_vec();
    sorted.sort_by_key(|e| e.t_sec);
    sorted
}

//! Melody note-on/note-off stream with tick-delta accounting.
//!
//! Time is fixed at one second per `ticks_per_beat` ticks, so an event at
//! `t_sec` lands on tick `t_sec * ticks_per_beat`. Every stream produced here
//! (and by [`crate::harmony`]) carries deltas that sum to exactly
//! `duration_sec * ticks_per_beat`.

use serde::{Deserialize, Serialize};

use crate::event::{sorted_by_time, MusicEvent};
use crate::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    NoteOn,
    NoteOff,
}

/// One channel event, timed relative to the previous event on its channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelineEvent {
    pub kind: EventKind,
    pub channel: u8,
    pub note: u8,
    pub velocity: u8,
    pub delta_ticks: u32,
}

impl TimelineEvent {
    pub fn note_on(channel: u8, note: u8, velocity: u8, delta_ticks: u32) -> Self {
        TimelineEvent {
            kind: EventKind::NoteOn,
            channel,
            note,
            velocity,
            delta_ticks,
        }
    }

    pub fn note_off(channel: u8, note: u8, delta_ticks: u32) -> Self {
        TimelineEvent {
            kind: EventKind::NoteOff,
            channel,
            note,
            velocity: 0,
            delta_ticks,
        }
    }
}

/// Timing and channel layout shared by the melody and harmony streams.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimelineParams {
    pub ticks_per_beat: u16,
    pub melody_channel: u8,
    pub harmony_channel: u8,
    pub harmony_velocity: u8,
}

impl Default for TimelineParams {
    fn default() -> Self {
        TimelineParams {
            ticks_per_beat: 480,
            melody_channel: 0,
            harmony_channel: 1,
            harmony_velocity: 60,
        }
    }
}

impl TimelineParams {
    pub fn ticks_at(&self, t_sec: u32) -> u32 {
        t_sec * self.ticks_per_beat as u32
    }
}

/// Sort `events` by onset and reject any that would start at or after the
/// end of the timeline.
pub(crate) fn checked_sorted(events: &[MusicEvent], duration_sec: u32) -> Result<Vec<MusicEvent>> {
    let sorted = sorted_by_time(events);
    if let Some(late) = sorted.iter().find(|e| e.t_sec >= duration_sec) {
        return Err(Error::EventOutOfRange {
            t_sec: late.t_sec,
            duration_sec,
        });
    }
    Ok(sorted)
}

/// Build the melody channel stream.
///
/// Each note sounds until the next onset; the last one is held to the end
/// of the timeline. An empty input yields an empty stream.
pub fn build_melody(
    events: &[MusicEvent],
    duration_sec: u32,
    params: &TimelineParams,
) -> Result<Vec<TimelineEvent>> {
    let sorted = checked_sorted(events, duration_sec)?;
    let channel = params.melody_channel;

    let mut out = Vec::with_capacity(sorted.len() * 2);
    let mut current_tick = 0u32;
    let mut sounding: Option<u8> = None;

    for event in &sorted {
        let tick = params.ticks_at(event.t_sec);
        let mut delta = tick - current_tick;

        if let Some(note) = sounding {
            out.push(TimelineEvent::note_off(channel, note, delta));
            current_tick = tick;
            delta = 0;
        }

        out.push(TimelineEvent::note_on(channel, event.note, event.velocity, delta));
        sounding = Some(event.note);
        current_tick = tick;
    }

    if let Some(note) = sounding {
        let end_tick = params.ticks_at(duration_sec);
        out.push(TimelineEvent::note_off(channel, note, end_tick - current_tick));
    }

    tracing::debug!(
        events = sorted.len(),
        timeline_events = out.len(),
        "built melody timeline"
    );

    Ok(out)
}

/// Sum of all deltas in a stream, i.e. its length in ticks.
pub fn total_ticks(events: &[TimelineEvent]) -> u32 {
    events.iter().map(|e| e.delta_ticks).sum()
}

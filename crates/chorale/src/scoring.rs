//! Performance scoring against a reference template.
//!
//! The overall score blends note accuracy (70%) with a timing score (30%)
//! that loses 10 points per missing or extra note.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::event::MusicEvent;
use crate::reference::{ReferenceLookup, ReferenceTemplate};
use crate::{Error, Result};

const ACCURACY_WEIGHT: f64 = 0.7;
const TIMING_WEIGHT: f64 = 0.3;
const TIMING_PENALTY: f64 = 10.0;

/// Accuracy granted when the reference has no points in range but the
/// performer played something anyway.
const UNREFERENCED_PLAY_ACCURACY: f64 = 50.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorType {
    WrongNote,
    MissingNote,
    ExtraNote,
}

impl ErrorType {
    /// Whether this kind of mistake costs timing points.
    pub fn affects_timing(&self) -> bool {
        matches!(self, ErrorType::MissingNote | ErrorType::ExtraNote)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mistake {
    pub time_sec: u32,
    pub expected_note: Option<u8>,
    pub played_note: Option<u8>,
    pub error_type: ErrorType,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Subscores {
    pub accuracy: f64,
    pub timing: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationResult {
    pub score: f64,
    pub subscores: Subscores,
    pub mistakes: Vec<Mistake>,
    pub advice: String,
}

/// Grade `events` against the template registered as `reference_id`.
///
/// Only the first `duration_sec` seconds of both the performance and the
/// template are considered.
pub fn evaluate(
    events: &[MusicEvent],
    reference_id: &str,
    duration_sec: u32,
    references: &dyn ReferenceLookup,
) -> Result<EvaluationResult> {
    let reference = references
        .lookup(reference_id)
        .ok_or_else(|| Error::ReferenceNotFound(reference_id.to_string()))?;

    let result = score_against(events, reference, duration_sec);

    tracing::debug!(
        reference_id,
        duration_sec,
        score = result.score,
        mistakes = result.mistakes.len(),
        "evaluated performance"
    );

    Ok(result)
}

/// Score a performance against an already-resolved template.
pub fn score_against(
    events: &[MusicEvent],
    reference: &ReferenceTemplate,
    duration_sec: u32,
) -> EvaluationResult {
    let mut played: BTreeMap<u32, u8> = BTreeMap::new();
    for event in events.iter().filter(|e| e.t_sec < duration_sec) {
        played.insert(event.t_sec, event.note);
    }

    let mut total_points = 0usize;
    let mut correct_notes = 0usize;
    let mut mistakes = Vec::new();

    for (sec, expected) in reference.points_before(duration_sec) {
        total_points += 1;
        match played.get(&sec) {
            Some(&note) if note == expected => correct_notes += 1,
            Some(&note) => mistakes.push(Mistake {
                time_sec: sec,
                expected_note: Some(expected),
                played_note: Some(note),
                error_type: ErrorType::WrongNote,
            }),
            None => mistakes.push(Mistake {
                time_sec: sec,
                expected_note: Some(expected),
                played_note: None,
                error_type: ErrorType::MissingNote,
            }),
        }
    }

    // A time point carries at most one mistake; the reference pass wins.
    for (&sec, &note) in &played {
        let expected = reference.expected_at(sec);
        if expected == Some(note) {
            continue;
        }
        if mistakes.iter().any(|m| m.time_sec == sec) {
            continue;
        }
        mistakes.push(Mistake {
            time_sec: sec,
            expected_note: expected,
            played_note: Some(note),
            error_type: ErrorType::ExtraNote,
        });
    }

    let accuracy = if total_points > 0 {
        correct_notes as f64 / total_points as f64 * 100.0
    } else if !played.is_empty() {
        UNREFERENCED_PLAY_ACCURACY
    } else {
        100.0
    };

    let timing_mistakes = mistakes
        .iter()
        .filter(|m| m.error_type.affects_timing())
        .count();
    let timing = (100.0 - TIMING_PENALTY * timing_mistakes as f64).max(0.0);

    let overall = accuracy * ACCURACY_WEIGHT + timing * TIMING_WEIGHT;
    let advice = advice(&mistakes, correct_notes, total_points);

    EvaluationResult {
        score: round1(overall),
        subscores: Subscores {
            accuracy: round1(accuracy),
            timing: round1(timing),
        },
        mistakes,
        advice,
    }
}

/// One decimal place, ties to even (41.25 -> 41.2).
fn round1(value: f64) -> f64 {
    (value * 10.0).round_ties_even() / 10.0
}

/// Build the feedback text shown with a score.
pub fn advice(mistakes: &[Mistake], correct_notes: usize, total_points: usize) -> String {
    if mistakes.is_empty() {
        return "Perfect performance! Keep up the excellent work!".to_string();
    }

    let count = |kind: ErrorType| mistakes.iter().filter(|m| m.error_type == kind).count();
    let wrong = count(ErrorType::WrongNote);
    let missing = count(ErrorType::MissingNote);
    let extra = count(ErrorType::ExtraNote);

    let mut parts = Vec::new();
    if wrong > 0 {
        parts.push(format!(
            "Focus on accuracy - you played {} wrong notes.",
            wrong
        ));
    }
    if missing > 0 {
        parts.push(format!("Don't miss notes - you missed {} notes.", missing));
    }
    if extra > 0 {
        parts.push(format!(
            "Avoid extra notes - you played {} additional notes.",
            extra
        ));
    }

    let closing = if total_points == 0 {
        "No reference template available for this duration."
    } else {
        let ratio = correct_notes as f64 / total_points as f64;
        if ratio >= 0.8 {
            "You're doing well overall, just need minor adjustments."
        } else if ratio >= 0.6 {
            "Good progress, but practice more to improve accuracy."
        } else {
            "Focus on learning the basic melody pattern first."
        }
    };
    parts.push(closing.to_string());

    parts.join(" ")
}

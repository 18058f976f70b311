//! Request schema and the validation boundary in front of the core.
//!
//! Requests deserialize into loosely typed structs so that every schema
//! problem can be reported with a specific error code instead of a generic
//! deserialization failure. [`HarmonizeRequest::validate`] and
//! [`EvaluateRequest::validate`] check fields in schema order and stop at the
//! first failure.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::event::{MusicEvent, DEFAULT_VELOCITY, DIATONIC_NOTES};

pub const SUPPORTED_VERSION: &str = "1.0";
pub const SUPPORTED_QUANTIZE: &str = "1s";
pub const SUPPORTED_OCTAVE_BASE: &str = "C4";
pub const SUPPORTED_KEY: &str = "C major";

pub const MAX_DURATION_SEC: i64 = 60;
pub const MAX_EVENT_SEC: i64 = 60;

pub const MODE_HARMONIZE: &str = "harmonize";
pub const MODE_EVALUATE: &str = "evaluate";

/// Why a request was refused before reaching the core.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Malformed request: {0}")]
    Malformed(String),

    #[error("Unsupported version: {0}")]
    UnsupportedVersion(String),

    #[error("Invalid mode: {0}")]
    InvalidMode(String),

    #[error("Invalid duration: {0}")]
    InvalidDuration(String),

    #[error("Invalid quantize: {0}")]
    InvalidQuantize(String),

    #[error("Empty sequence")]
    EmptySequence,

    #[error("Duplicate timeslot at {0}s")]
    DuplicateTimeslot(u32),

    #[error("Note must be one of C major white keys [60, 62, 64, 65, 67, 69, 71], got {note} at event {index}")]
    InvalidNote { index: usize, note: i64 },

    #[error("Event at {t_sec}s must start before duration_sec ({duration_sec}s)")]
    EventOutOfRange { t_sec: u32, duration_sec: u32 },

    #[error("{0}")]
    Invalid(String),
}

impl ValidationError {
    /// Stable machine-readable code for API responses.
    pub fn code(&self) -> &'static str {
        match self {
            ValidationError::Malformed(_) | ValidationError::Invalid(_) => "validation_error",
            ValidationError::UnsupportedVersion(_) => "unsupported_version",
            ValidationError::InvalidMode(_) => "invalid_mode",
            ValidationError::InvalidDuration(_) => "invalid_duration",
            ValidationError::InvalidQuantize(_) => "invalid_quantize",
            ValidationError::EmptySequence => "empty_sequence",
            ValidationError::DuplicateTimeslot(_) => "duplicate_timeslot",
            ValidationError::InvalidNote { .. } => "invalid_note",
            ValidationError::EventOutOfRange { .. } => "event_out_of_range",
        }
    }
}

/// An event as it arrives on the wire, before range checks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawEvent {
    pub t_sec: i64,
    pub note: i64,
    #[serde(default, alias = "velocity", skip_serializing_if = "Option::is_none")]
    pub vel: Option<i64>,
}

/// Fields shared by every request mode.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BaseRequest {
    pub version: Option<String>,
    pub mode: Option<String>,
    pub duration_sec: Option<i64>,
    pub quantize: Option<String>,
    pub octave_base: Option<String>,
    pub key: Option<String>,
    #[serde(default)]
    pub events: Vec<RawEvent>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReturnMode {
    Bytes,
    Url,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HarmonizeRequest {
    #[serde(flatten)]
    pub base: BaseRequest,
    pub return_mode: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluateRequest {
    #[serde(flatten)]
    pub base: BaseRequest,
    pub reference_id: Option<String>,
}

/// A harmonize request that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidHarmonize {
    pub duration_sec: u32,
    pub events: Vec<MusicEvent>,
    pub return_mode: ReturnMode,
}

/// An evaluate request that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidEvaluate {
    pub duration_sec: u32,
    pub events: Vec<MusicEvent>,
    pub reference_id: String,
}

fn parse_json<'a, T: Deserialize<'a>>(body: &'a [u8]) -> Result<T, ValidationError> {
    serde_json::from_slice(body).map_err(|e| ValidationError::Malformed(e.to_string()))
}

fn require_exact(
    field: &str,
    value: Option<&str>,
    expected: &str,
) -> Result<(), ValidationError> {
    match value {
        Some(v) if v == expected => Ok(()),
        Some(v) => Err(ValidationError::Invalid(format!(
            "{} must be '{}', got '{}'",
            field, expected, v
        ))),
        None => Err(ValidationError::Invalid(format!("{} is required", field))),
    }
}

impl BaseRequest {
    /// Validate the shared fields, returning `(duration_sec, events)`.
    pub fn validate(&self, expected_mode: &str) -> Result<(u32, Vec<MusicEvent>), ValidationError> {
        match self.version.as_deref() {
            Some(SUPPORTED_VERSION) => {}
            Some(other) => return Err(ValidationError::UnsupportedVersion(other.to_string())),
            None => return Err(ValidationError::Invalid("version is required".to_string())),
        }

        if let Some(mode) = self.mode.as_deref() {
            if mode != expected_mode {
                return Err(ValidationError::InvalidMode(mode.to_string()));
            }
        }

        let duration_sec = match self.duration_sec {
            Some(d) if (1..=MAX_DURATION_SEC).contains(&d) => d as u32,
            Some(d) => {
                return Err(ValidationError::InvalidDuration(format!(
                    "duration_sec must be between 1 and {}, got {}",
                    MAX_DURATION_SEC, d
                )))
            }
            None => {
                return Err(ValidationError::InvalidDuration(
                    "duration_sec is required".to_string(),
                ))
            }
        };

        match self.quantize.as_deref() {
            Some(SUPPORTED_QUANTIZE) => {}
            Some(other) => {
                return Err(ValidationError::InvalidQuantize(format!(
                    "quantize must be '{}', got '{}'",
                    SUPPORTED_QUANTIZE, other
                )))
            }
            None => {
                return Err(ValidationError::InvalidQuantize(
                    "quantize is required".to_string(),
                ))
            }
        }

        require_exact("octave_base", self.octave_base.as_deref(), SUPPORTED_OCTAVE_BASE)?;
        require_exact("key", self.key.as_deref(), SUPPORTED_KEY)?;

        let events = validate_events(&self.events)?;
        Ok((duration_sec, events))
    }
}

fn validate_events(raw: &[RawEvent]) -> Result<Vec<MusicEvent>, ValidationError> {
    if raw.is_empty() {
        return Err(ValidationError::EmptySequence);
    }

    let mut events = Vec::with_capacity(raw.len());
    for (index, event) in raw.iter().enumerate() {
        if !(0..=MAX_EVENT_SEC).contains(&event.t_sec) {
            return Err(ValidationError::Invalid(format!(
                "event {}: t_sec must be between 0 and {}, got {}",
                index, MAX_EVENT_SEC, event.t_sec
            )));
        }

        let note = u8::try_from(event.note)
            .ok()
            .filter(|n| DIATONIC_NOTES.contains(n))
            .ok_or(ValidationError::InvalidNote {
                index,
                note: event.note,
            })?;

        let velocity = match event.vel {
            None => DEFAULT_VELOCITY,
            Some(v) if (1..=127).contains(&v) => v as u8,
            Some(v) => {
                return Err(ValidationError::Invalid(format!(
                    "event {}: vel must be between 1 and 127, got {}",
                    index, v
                )))
            }
        };

        events.push(MusicEvent::new(event.t_sec as u32, note).with_velocity(velocity));
    }

    let mut seen = BTreeSet::new();
    for event in &events {
        if !seen.insert(event.t_sec) {
            return Err(ValidationError::DuplicateTimeslot(event.t_sec));
        }
    }

    Ok(events)
}

impl HarmonizeRequest {
    pub fn from_json(body: &[u8]) -> Result<Self, ValidationError> {
        parse_json(body)
    }

    /// Validate for harmonization.
    ///
    /// Every event must start strictly before `duration_sec`; a note at or
    /// past the end of the timeline would have no length.
    pub fn validate(&self) -> Result<ValidHarmonize, ValidationError> {
        let (duration_sec, events) = self.base.validate(MODE_HARMONIZE)?;

        let return_mode = match self.return_mode.as_deref() {
            None | Some("bytes") => ReturnMode::Bytes,
            Some("url") => ReturnMode::Url,
            Some(other) => {
                return Err(ValidationError::Invalid(format!(
                    "return_mode must be 'bytes' or 'url', got '{}'",
                    other
                )))
            }
        };

        if let Some(late) = events.iter().find(|e| e.t_sec >= duration_sec) {
            return Err(ValidationError::EventOutOfRange {
                t_sec: late.t_sec,
                duration_sec,
            });
        }

        Ok(ValidHarmonize {
            duration_sec,
            events,
            return_mode,
        })
    }
}

impl EvaluateRequest {
    pub fn from_json(body: &[u8]) -> Result<Self, ValidationError> {
        parse_json(body)
    }

    /// Validate for evaluation. Events past `duration_sec` are allowed here;
    /// the scorer ignores them.
    pub fn validate(&self) -> Result<ValidEvaluate, ValidationError> {
        let (duration_sec, events) = self.base.validate(MODE_EVALUATE)?;

        let reference_id = match self.reference_id.as_deref() {
            Some(id) if !id.is_empty() => id.to_string(),
            _ => {
                return Err(ValidationError::Invalid(
                    "reference_id is required".to_string(),
                ))
            }
        };

        Ok(ValidEvaluate {
            duration_sec,
            events,
            reference_id,
        })
    }
}

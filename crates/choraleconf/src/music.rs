//! Musical settings: MIDI rendering parameters and extra reference templates.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// MIDI rendering and artifact handling for harmonize requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HarmonyConfig {
    /// MIDI division; one timeline second is one beat.
    /// Default: 480
    #[serde(default = "HarmonyConfig::default_ticks_per_beat")]
    pub ticks_per_beat: u16,

    /// Tempo meta-event value.
    /// Default: 500000 (120 BPM)
    #[serde(default = "HarmonyConfig::default_tempo")]
    pub tempo_us_per_beat: u32,

    /// Default: 0 (Acoustic Grand Piano)
    #[serde(default)]
    pub melody_program: u8,

    /// Default: 48 (String Ensemble 1)
    #[serde(default = "HarmonyConfig::default_harmony_program")]
    pub harmony_program: u8,

    /// Note-on velocity for every chord tone.
    /// Default: 60
    #[serde(default = "HarmonyConfig::default_harmony_velocity")]
    pub harmony_velocity: u8,

    /// Write each generated file under `paths.output_dir`.
    /// Default: true
    #[serde(default = "HarmonyConfig::default_persist_artifacts")]
    pub persist_artifacts: bool,

    /// URL returned by `return_mode = "url"` requests.
    #[serde(default = "HarmonyConfig::default_placeholder_url")]
    pub placeholder_url: String,
}

impl HarmonyConfig {
    fn default_ticks_per_beat() -> u16 {
        480
    }

    fn default_tempo() -> u32 {
        500_000
    }

    fn default_harmony_program() -> u8 {
        48
    }

    fn default_harmony_velocity() -> u8 {
        60
    }

    fn default_persist_artifacts() -> bool {
        true
    }

    fn default_placeholder_url() -> String {
        "https://example.com/generated/harmony.mid".to_string()
    }

    /// Check ranges that the MIDI encoder cannot represent.
    pub fn validate(&self) -> Result<(), String> {
        if self.ticks_per_beat == 0 || self.ticks_per_beat > 0x7FFF {
            return Err(format!(
                "harmony.ticks_per_beat must be between 1 and 32767, got {}",
                self.ticks_per_beat
            ));
        }
        if self.tempo_us_per_beat == 0 || self.tempo_us_per_beat > 0xFF_FFFF {
            return Err(format!(
                "harmony.tempo_us_per_beat must fit in 24 bits, got {}",
                self.tempo_us_per_beat
            ));
        }
        for (field, value) in [
            ("melody_program", self.melody_program),
            ("harmony_program", self.harmony_program),
        ] {
            if value > 127 {
                return Err(format!("harmony.{} must be at most 127, got {}", field, value));
            }
        }
        if !(1..=127).contains(&self.harmony_velocity) {
            return Err(format!(
                "harmony.harmony_velocity must be between 1 and 127, got {}",
                self.harmony_velocity
            ));
        }
        Ok(())
    }
}

impl Default for HarmonyConfig {
    fn default() -> Self {
        Self {
            ticks_per_beat: Self::default_ticks_per_beat(),
            tempo_us_per_beat: Self::default_tempo(),
            melody_program: 0,
            harmony_program: Self::default_harmony_program(),
            harmony_velocity: Self::default_harmony_velocity(),
            persist_artifacts: Self::default_persist_artifacts(),
            placeholder_url: Self::default_placeholder_url(),
        }
    }
}

/// A grading template declared in config.
///
/// ```toml
/// [references.exercise_g_major_01]
/// name = "G Major Exercise 01"
/// description = "Five-note run from G"
///
/// [references.exercise_g_major_01.points]
/// 0 = 67
/// 1 = 69
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceConfig {
    pub name: String,

    #[serde(default)]
    pub description: String,

    /// Second offset (as a TOML key) to expected MIDI note.
    #[serde(default)]
    pub points: BTreeMap<String, u8>,
}

impl ReferenceConfig {
    /// Points keyed by whole second.
    pub fn points(&self) -> Result<BTreeMap<u32, u8>, String> {
        self.points
            .iter()
            .map(|(sec, note)| {
                let sec: u32 = sec
                    .parse()
                    .map_err(|_| format!("point key '{}' is not a whole second", sec))?;
                if *note > 127 {
                    return Err(format!("point {} has note {} above 127", sec, note));
                }
                Ok((sec, *note))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_harmony_defaults_are_valid() {
        let harmony = HarmonyConfig::default();
        assert_eq!(harmony.harmony_program, 48);
        assert!(harmony.persist_artifacts);
        assert!(harmony.validate().is_ok());
    }

    #[test]
    fn test_harmony_validate_ranges() {
        let zero_velocity = HarmonyConfig {
            harmony_velocity: 0,
            ..HarmonyConfig::default()
        };
        assert!(zero_velocity.validate().is_err());

        let bad_program = HarmonyConfig {
            harmony_program: 200,
            ..HarmonyConfig::default()
        };
        assert!(bad_program.validate().unwrap_err().contains("harmony_program"));

        let bad_division = HarmonyConfig {
            ticks_per_beat: 0,
            ..HarmonyConfig::default()
        };
        assert!(bad_division.validate().is_err());
    }

    #[test]
    fn test_reference_points_parse() {
        let reference = ReferenceConfig {
            name: "Two".to_string(),
            description: String::new(),
            points: [("0".to_string(), 60), ("10".to_string(), 67)].into(),
        };
        let points = reference.points().unwrap();
        assert_eq!(points.get(&10), Some(&67));

        let bad = ReferenceConfig {
            points: [("first".to_string(), 60)].into(),
            ..reference
        };
        assert!(bad.points().is_err());
    }
}

//! Reference templates: the `second → expected pitch` rubrics that played
//! performances are graded against.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

/// Identifier of the template that ships with every library.
pub const BUILTIN_C_MAJOR_01: &str = "exercise_c_major_01";

/// An immutable grading rubric.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceTemplate {
    pub id: String,
    pub name: String,
    pub description: String,
    /// Expected pitch per whole second, ordered by time
    pub points: BTreeMap<u32, u8>,
}

impl ReferenceTemplate {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        description: impl Into<String>,
        points: impl IntoIterator<Item = (u32, u8)>,
    ) -> Self {
        ReferenceTemplate {
            id: id.into(),
            name: name.into(),
            description: description.into(),
            points: points.into_iter().collect(),
        }
    }

    /// Ascending C major scale and back up to E, one note per second.
    pub fn c_major_exercise() -> Self {
        Self::new(
            BUILTIN_C_MAJOR_01,
            "C Major Exercise 01",
            "Basic C major scale exercise",
            [
                (0, 60),
                (1, 62),
                (2, 64),
                (3, 65),
                (4, 67),
                (5, 69),
                (6, 71),
                (7, 60),
                (8, 62),
                (9, 64),
            ],
        )
    }

    pub fn expected_at(&self, t_sec: u32) -> Option<u8> {
        self.points.get(&t_sec).copied()
    }

    /// Points strictly before `duration_sec`.
    pub fn points_before(&self, duration_sec: u32) -> impl Iterator<Item = (u32, u8)> + '_ {
        self.points
            .range(..duration_sec)
            .map(|(t, note)| (*t, *note))
    }
}

/// Lookup seam between the scorer and wherever templates live.
pub trait ReferenceLookup: Send + Sync {
    fn lookup(&self, reference_id: &str) -> Option<&ReferenceTemplate>;
}

/// In-memory template registry, built once and shared read-only.
#[derive(Debug, Clone, Default)]
pub struct ReferenceLibrary {
    templates: HashMap<String, ReferenceTemplate>,
}

impl ReferenceLibrary {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Library containing the built-in exercises.
    pub fn builtin() -> Self {
        let mut library = Self::empty();
        library.insert(ReferenceTemplate::c_major_exercise());
        library
    }

    /// Add or replace a template, keyed by its id.
    pub fn insert(&mut self, template: ReferenceTemplate) -> Option<ReferenceTemplate> {
        self.templates.insert(template.id.clone(), template)
    }

    pub fn with(mut self, template: ReferenceTemplate) -> Self {
        self.insert(template);
        self
    }

    /// Templates sorted by id.
    pub fn list(&self) -> Vec<&ReferenceTemplate> {
        let mut all: Vec<_> = self.templates.values().collect();
        all.sort_by(|a, b| a.id.cmp(&b.id));
        all
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

impl ReferenceLookup for ReferenceLibrary {
    fn lookup(&self, reference_id: &str) -> Option<&ReferenceTemplate> {
        self.templates.get(reference_id)
    }
}

//! Persistent record of issued motion directives (Sled).
//!
//! Purely observational: the coordinator writes to it when one is attached, and a failed
//! write never affects control.

use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

const MOTION_TREE: &str = "motion_facts";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Directive {
    Point,
    Gaze,
    ToReady,
    ToResting,
    Fidget,
    FallStop,
    Shutdown,
}

/// One directive the kernel issued (or failed to issue) to the actuator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MotionFact {
    pub timestamp_ms: u64,
    pub directive: Directive,
    pub target: Option<[f64; 3]>,
    pub angles: Vec<f64>,
    pub status: String,
}

impl MotionFact {
    /// A fact stamped with the current wall-clock time.
    pub fn now(directive: Directive, status: impl Into<String>) -> Self {
        let timestamp_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or_default();
        Self {
            timestamp_ms,
            directive,
            target: None,
            angles: Vec::new(),
            status: status.into(),
        }
    }

    pub fn with_target(mut self, target: [f64; 3]) -> Self {
        self.target = Some(target);
        self
    }

    pub fn with_angles(mut self, angles: &[f64]) -> Self {
        self.angles = angles.to_vec();
        self
    }
}

#[derive(thiserror::Error, Debug)]
pub enum JournalError {
    #[error("journal storage error: {0}")]
    Storage(#[from] sled::Error),

    #[error("journal encoding error: {0}")]
    Encoding(#[from] serde_json::Error),
}

pub struct MotionJournal {
    db: sled::Db,
}

impl std::fmt::Debug for MotionJournal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MotionJournal")
            .field("tree", &MOTION_TREE)
            .field("size_on_disk", &self.db.size_on_disk().ok())
            .finish()
    }
}

impl MotionJournal {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, JournalError> {
        Ok(Self::from_db(sled::open(path)?))
    }

    /// Wraps an already-open Sled handle (e.g. a temporary one).
    pub fn from_db(db: sled::Db) -> Self {
        Self { db }
    }

    pub fn record(&self, fact: &MotionFact) -> Result<(), JournalError> {
        let tree = self.db.open_tree(MOTION_TREE)?;
        let id = self.db.generate_id()?;

        // Zero-padded so lexicographic key order is time order.
        let key = format!("{:020}_{id:020}", fact.timestamp_ms);
        tree.insert(key.as_bytes(), serde_json::to_vec(fact)?)?;
        Ok(())
    }

    /// All facts recorded at or after `start_ms`, oldest first.
    pub fn facts_since(&self, start_ms: u64) -> Vec<MotionFact> {
        let Ok(tree) = self.db.open_tree(MOTION_TREE) else {
            return Vec::new();
        };

        let start = format!("{start_ms:020}");
        tree.range(start.as_bytes()..)
            .filter_map(|res| res.ok())
            .filter_map(|(_, v)| serde_json::from_slice::<MotionFact>(&v).ok())
            .collect()
    }

    pub fn flush(&self) -> Result<(), JournalError> {
        self.db.flush()?;
        Ok(())
    }
}

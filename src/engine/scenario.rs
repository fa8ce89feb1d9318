use crate::engine::engine::BookingEngine;
use crate::error::ScenarioError;
use crate::venue::Venue;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// On-disk shape: whole venue aggregates, seats and bookings inline.
#[derive(Serialize, Deserialize)]
struct ScenarioFile {
    venues: Vec<Venue>,
}

impl BookingEngine {
    pub fn load_from_file(path: &Path) -> Result<Self, ScenarioError> {
        let data = fs::read_to_string(path)?;
        BookingEngine::load_from_str(&data)
    }

    pub fn load_from_str(data: &str) -> Result<Self, ScenarioError> {
        let raw: ScenarioFile = serde_json::from_str(data)?;
        let engine = BookingEngine::new();
        for venue in raw.venues {
            engine
                .add_venue(venue)
                .map_err(|e| ScenarioError::Invalid(e.to_string()))?;
        }
        Ok(engine)
    }

    pub fn to_json(&self) -> Result<String, ScenarioError> {
        let file = ScenarioFile {
            venues: self.venues(),
        };
        Ok(serde_json::to_string_pretty(&file)?)
    }

    /// Writes to a sibling temp file first so a crash never leaves a torn document.
    pub fn save_to_file(&self, path: &Path) -> Result<(), ScenarioError> {
        let json = self.to_json()?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, json)?;
        fs::rename(&tmp, path)?;
        Ok(())
    }
}

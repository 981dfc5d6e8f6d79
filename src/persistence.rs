//! Saved analyses: the step history (type, version, params) serialized to a
//! recoverable JSON record, one file per analysis under the config
//! directory. Consumed by save/replay handlers, not by the engine itself.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use color_eyre::Result;
use serde::{Deserialize, Serialize};

use crate::codegen::make_valid_df_name;
use crate::config::ConfigManager;
use crate::errors::{StepError, StepResult};
use crate::params::StepParams;
use crate::step::is_supported_step;
use crate::steps_manager::StepsManager;

pub const ANALYSIS_FORMAT_VERSION: u32 = 1;

// Custom serialization for SystemTime (convert to/from seconds since epoch)
mod time_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::{SystemTime, UNIX_EPOCH};

    pub fn serialize<S>(time: &SystemTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let duration = time.duration_since(UNIX_EPOCH).map_err(|e| {
            serde::ser::Error::custom(format!("Failed to serialize SystemTime: {}", e))
        })?;
        duration.as_secs().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<SystemTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(UNIX_EPOCH + std::time::Duration::from_secs(secs))
    }
}

/// One recorded step: id, schema version, and the tagged params.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SavedStep {
    pub step_id: String,
    pub step_version: u32,
    #[serde(flatten)]
    pub params: StepParams,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SavedAnalysis {
    pub name: String,
    pub format_version: u32,
    #[serde(with = "time_serde")]
    pub created: SystemTime,
    pub steps: Vec<SavedStep>,
}

impl SavedAnalysis {
    pub fn from_steps_manager(manager: &StepsManager, name: &str) -> Self {
        let steps = manager
            .active_steps()
            .iter()
            .map(|step| SavedStep {
                step_id: step.step_id.clone(),
                step_version: step.step_version(),
                params: step.params.clone(),
            })
            .collect();
        Self {
            name: name.to_string(),
            format_version: ANALYSIS_FORMAT_VERSION,
            created: SystemTime::now(),
            steps,
        }
    }

    /// Feeds the saved steps back through the manager. The same skip and
    /// saturation logic that ran originally runs again, so replaying an
    /// analysis with overwritten pivots or refiltered columns converges to
    /// the same history.
    pub fn replay_onto(&self, manager: &mut StepsManager) -> StepResult<()> {
        for step in &self.steps {
            if !is_supported_step(step.params.step_type(), step.step_version) {
                return Err(StepError::UnsupportedStep {
                    step_type: step.params.step_type().to_string(),
                    step_version: step.step_version,
                });
            }
            manager.execute_new_step(step.step_id.clone(), step.params.clone())?;
        }
        Ok(())
    }
}

/// Stores analyses as JSON files in a directory, lazily created on the
/// first save.
pub struct AnalysisStore {
    analyses_dir: PathBuf,
}

impl AnalysisStore {
    pub fn new(config: &ConfigManager) -> Self {
        Self {
            analyses_dir: config.config_path("analyses"),
        }
    }

    /// Store rooted at a custom directory (primarily for testing).
    pub fn with_dir(analyses_dir: PathBuf) -> Self {
        Self { analyses_dir }
    }

    pub fn analyses_dir(&self) -> &Path {
        &self.analyses_dir
    }

    fn file_path(&self, name: &str) -> PathBuf {
        self.analyses_dir
            .join(format!("analysis_{}.json", make_valid_df_name(name)))
    }

    /// Serializes the manager's active steps under the given name. Uses an
    /// exclusive file lock so concurrent saves cannot interleave.
    pub fn save(&self, manager: &StepsManager, name: &str) -> Result<PathBuf> {
        fs::create_dir_all(&self.analyses_dir)?;
        let analysis = SavedAnalysis::from_steps_manager(manager, name);
        let json = serde_json::to_string_pretty(&analysis)?;
        let file_path = self.file_path(name);

        use fs2::FileExt;
        let mut file = fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&file_path)?;
        file.lock_exclusive()?;
        file.write_all(json.as_bytes())?;
        file.flush()?;
        file.unlock()?;

        Ok(file_path)
    }

    /// Loads a saved analysis, verifying every step against the supported
    /// catalog before any of it is handed back.
    pub fn load(&self, name: &str) -> Result<SavedAnalysis> {
        let contents = fs::read_to_string(self.file_path(name))?;
        let analysis = parse_saved_analysis(&contents)?;
        Ok(analysis)
    }

    pub fn delete(&self, name: &str) -> Result<()> {
        let file_path = self.file_path(name);
        if file_path.exists() {
            fs::remove_file(file_path)?;
        }
        Ok(())
    }

    pub fn list(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        if !self.analyses_dir.exists() {
            return Ok(names);
        }
        for entry in fs::read_dir(&self.analyses_dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            if let Ok(contents) = fs::read_to_string(&path) {
                if let Ok(analysis) = serde_json::from_str::<SavedAnalysis>(&contents) {
                    names.push(analysis.name);
                }
            }
        }
        names.sort();
        Ok(names)
    }
}

/// Parses a saved analysis. Steps with an unknown type or version surface
/// as typed unsupported-step errors instead of opaque parse failures.
pub fn parse_saved_analysis(contents: &str) -> Result<SavedAnalysis> {
    let value: serde_json::Value = serde_json::from_str(contents)?;
    if let Some(steps) = value.get("steps").and_then(|s| s.as_array()) {
        for step in steps {
            let step_type = step
                .get("step_type")
                .and_then(|t| t.as_str())
                .unwrap_or("unknown");
            let step_version = step
                .get("step_version")
                .and_then(|v| v.as_u64())
                .unwrap_or(0) as u32;
            if !is_supported_step(step_type, step_version) {
                return Err(StepError::UnsupportedStep {
                    step_type: step_type.to_string(),
                    step_version,
                }
                .into());
            }
        }
    }
    Ok(serde_json::from_value(value)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::{SortDirection, SortParams};
    use polars::prelude::*;

    fn manager_with_sheet() -> StepsManager {
        let df = df!("age" => [3i64, 1, 2]).unwrap();
        StepsManager::new(vec![df], None).unwrap()
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = AnalysisStore::with_dir(dir.path().to_path_buf());

        let mut manager = manager_with_sheet();
        manager
            .execute_new_step(
                "s1",
                StepParams::Sort(SortParams {
                    sheet_index: 0,
                    column_id: "age".to_string(),
                    sort_direction: SortDirection::Ascending,
                }),
            )
            .unwrap();

        store.save(&manager, "my analysis").unwrap();
        assert_eq!(store.list().unwrap(), vec!["my analysis".to_string()]);

        let loaded = store.load("my analysis").unwrap();
        assert_eq!(loaded.format_version, ANALYSIS_FORMAT_VERSION);
        assert_eq!(loaded.steps.len(), 1);
        assert_eq!(loaded.steps[0].params.step_type(), "sort");

        // Replaying reproduces the same generated code.
        let mut replayed = manager_with_sheet();
        loaded.replay_onto(&mut replayed).unwrap();
        assert_eq!(
            replayed.transpiled_code(),
            manager.transpiled_code()
        );
    }

    #[test]
    fn test_unknown_step_type_is_unsupported() {
        let json = r#"{
            "name": "bad",
            "format_version": 1,
            "created": 1700000000,
            "steps": [
                {"step_id": "x", "step_version": 1, "step_type": "telepathy"}
            ]
        }"#;
        let err = parse_saved_analysis(json).unwrap_err();
        let step_error = err.downcast_ref::<StepError>().unwrap();
        assert!(matches!(step_error, StepError::UnsupportedStep { .. }));
    }

    #[test]
    fn test_unsupported_version_is_rejected() {
        let json = r#"{
            "name": "bad",
            "format_version": 1,
            "created": 1700000000,
            "steps": [
                {"step_id": "x", "step_version": 99, "step_type": "sort",
                 "sheet_index": 0, "column_id": "a", "sort_direction": "ascending"}
            ]
        }"#;
        let err = parse_saved_analysis(json).unwrap_err();
        let step_error = err.downcast_ref::<StepError>().unwrap();
        assert!(matches!(
            step_error,
            StepError::UnsupportedStep {
                step_version: 99,
                ..
            }
        ));
    }

    #[test]
    fn test_delete_removes_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = AnalysisStore::with_dir(dir.path().to_path_buf());
        let manager = manager_with_sheet();
        store.save(&manager, "gone soon").unwrap();
        store.delete("gone soon").unwrap();
        assert!(store.list().unwrap().is_empty());
    }
}

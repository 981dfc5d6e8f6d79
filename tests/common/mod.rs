use std::path::PathBuf;

use gridscript::params::{SimpleImportParams, StepParams};
use gridscript::steps_manager::StepsManager;

/// Writes a CSV into the given temp dir and returns its path.
pub fn write_csv(dir: &tempfile::TempDir, name: &str, contents: &str) -> PathBuf {
    let path = dir.path().join(name);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(&path, contents).unwrap();
    path
}

/// A manager with no initial dataframes.
pub fn empty_manager() -> StepsManager {
    StepsManager::new(Vec::new(), None).unwrap()
}

/// Step params importing the given files with sniffed settings.
pub fn import_params(files: &[&PathBuf]) -> StepParams {
    StepParams::SimpleImport(SimpleImportParams {
        file_names: files
            .iter()
            .map(|p| p.to_string_lossy().to_string())
            .collect(),
        delimiters: None,
        encodings: None,
        skiprows: None,
    })
}

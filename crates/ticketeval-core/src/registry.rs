//! Datasets, prompts and models addressable by name

use std::fs;
use std::path::PathBuf;

use walkdir::WalkDir;

use crate::config::{EngineConfig, ResolvedPaths};
use crate::dataset::DATASET_FILE;
use crate::error::{EvalError, Result};

const PROMPT_EXTENSION: &str = "txt";

/// Read-only view over the data root
#[derive(Debug, Clone)]
pub struct Registry {
    paths: ResolvedPaths,
    models: Vec<String>,
}

impl Registry {
    pub fn new(paths: ResolvedPaths, config: &EngineConfig) -> Self {
        Self {
            paths,
            models: config.models(),
        }
    }

    pub fn paths(&self) -> &ResolvedPaths {
        &self.paths
    }

    /// Dataset versions: subdirectories of the datasets dir holding `bugs.jsonl`
    pub fn list_dataset_versions(&self) -> Vec<String> {
        let dir = &self.paths.datasets_dir;
        if !dir.exists() {
            return Vec::new();
        }

        let mut versions: Vec<String> = WalkDir::new(dir)
            .min_depth(1)
            .max_depth(1)
            .follow_links(true)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_dir() && e.path().join(DATASET_FILE).is_file())
            .filter_map(|e| e.file_name().to_str().map(str::to_string))
            .collect();
        versions.sort();
        versions
    }

    /// Prompt names: stems of `*.txt` files in the prompts dir
    pub fn list_prompt_names(&self) -> Vec<String> {
        let dir = &self.paths.prompts_dir;
        if !dir.exists() {
            return Vec::new();
        }

        let mut names: Vec<String> = WalkDir::new(dir)
            .min_depth(1)
            .max_depth(1)
            .follow_links(true)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .filter(|e| e.path().extension().is_some_and(|ext| ext == PROMPT_EXTENSION))
            .filter_map(|e| e.path().file_stem().and_then(|s| s.to_str()).map(str::to_string))
            .collect();
        names.sort();
        names
    }

    pub fn list_models(&self) -> Vec<String> {
        self.models.clone()
    }

    /// Path of a dataset version's sample file
    pub fn dataset_path(&self, version: &str) -> Result<PathBuf> {
        if !self.list_dataset_versions().iter().any(|v| v == version) {
            return Err(EvalError::not_found("dataset version", version));
        }
        Ok(self.paths.datasets_dir.join(version).join(DATASET_FILE))
    }

    /// Text of a named prompt
    pub fn load_prompt(&self, name: &str) -> Result<String> {
        if !self.list_prompt_names().iter().any(|p| p == name) {
            return Err(EvalError::not_found("prompt", name));
        }
        let path = self
            .paths
            .prompts_dir
            .join(format!("{}.{}", name, PROMPT_EXTENSION));
        fs::read_to_string(&path).map_err(|e| EvalError::io_operation("read prompt", path.display(), e))
    }
}

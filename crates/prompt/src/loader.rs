//! Template set with per-task YAML overrides.
//!
//! An override lives in `<prompts dir>/<task>.yml` and may replace the
//! system template, the user template, or both:
//!
//! ```yaml
//! system: |
//!   You are a terse sales analyst.
//! user: |
//!   {{query}}
//!
//!   {{context}}
//! ```

use crate::task::TaskKind;
use crate::types::PromptTemplate;
use sales_core::{AppError, AppResult};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct TemplateOverride {
    system: Option<String>,
    user: Option<String>,
}

/// One template per task.
#[derive(Debug, Clone)]
pub struct TemplateSet {
    templates: HashMap<TaskKind, PromptTemplate>,
}

impl TemplateSet {
    /// Built-in templates for every task.
    pub fn builtin() -> Self {
        let templates = TaskKind::ALL
            .iter()
            .map(|task| (*task, task.builtin_template()))
            .collect();
        Self { templates }
    }

    /// Built-in templates with any overrides found in `prompts_dir` applied.
    ///
    /// A missing directory is not an error.
    pub fn load(prompts_dir: &Path) -> AppResult<Self> {
        let mut set = Self::builtin();

        for (task, path) in list_overrides(prompts_dir)? {
            let contents = std::fs::read_to_string(&path).map_err(|e| {
                AppError::Prompt(format!("Failed to read prompt file {:?}: {}", path, e))
            })?;

            let over: TemplateOverride = serde_yaml::from_str(&contents).map_err(|e| {
                AppError::Prompt(format!("Failed to parse prompt YAML {:?}: {}", path, e))
            })?;

            set.apply(task, over)?;
            tracing::info!("Loaded prompt override for {} from {:?}", task, path);
        }

        Ok(set)
    }

    fn apply(&mut self, task: TaskKind, over: TemplateOverride) -> AppResult<()> {
        let template = self
            .templates
            .entry(task)
            .or_insert_with(|| task.builtin_template());

        if let Some(system) = over.system {
            if system.trim().is_empty() {
                return Err(AppError::Prompt(format!(
                    "System template for {} cannot be empty",
                    task
                )));
            }
            template.system = system.trim_end().to_string();
        }

        if let Some(user) = over.user {
            if !user.contains("{{query}}") {
                return Err(AppError::Prompt(format!(
                    "User template for {} must reference {{{{query}}}}",
                    task
                )));
            }
            template.user = user.trim_end().to_string();
        }

        Ok(())
    }

    pub fn get(&self, task: TaskKind) -> PromptTemplate {
        self.templates
            .get(&task)
            .cloned()
            .unwrap_or_else(|| task.builtin_template())
    }
}

impl Default for TemplateSet {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Override files in `prompts_dir`, keyed by task.
///
/// Files whose stem is not a task name are skipped with a warning.
pub fn list_overrides(prompts_dir: &Path) -> AppResult<Vec<(TaskKind, std::path::PathBuf)>> {
    if !prompts_dir.exists() {
        return Ok(Vec::new());
    }

    let mut found = Vec::new();

    for entry in walkdir::WalkDir::new(prompts_dir)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let path = entry.path();
        let is_yaml = matches!(
            path.extension().and_then(|s| s.to_str()),
            Some("yml") | Some("yaml")
        );
        if !path.is_file() || !is_yaml {
            continue;
        }

        let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };

        match TaskKind::parse(stem) {
            Some(task) => found.push((task, path.to_path_buf())),
            None => tracing::warn!("Ignoring prompt file {:?}: unknown task '{}'", path, stem),
        }
    }

    Ok(found)
}

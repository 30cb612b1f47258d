use anyhow::Result;
use std::fs;
use std::path::{Path, PathBuf};

/// Loads prompt templates from an optional directory with fallback to defaults
pub struct PromptLoader {
    prompts_dir: Option<PathBuf>,
}

impl PromptLoader {
    pub fn new(prompts_dir: Option<impl AsRef<Path>>) -> Self {
        Self {
            prompts_dir: prompts_dir.map(|dir| dir.as_ref().to_path_buf()),
        }
    }

    /// Built-in templates only
    pub fn builtin() -> Self {
        Self { prompts_dir: None }
    }

    /// Load `<prompts_dir>/<name>.md`, using `default` if the file doesn't exist
    pub fn load(&self, name: &str, default: &str) -> Result<String> {
        let Some(dir) = &self.prompts_dir else {
            return Ok(default.to_string());
        };

        let path = dir.join(format!("{}.md", name));
        if path.exists() {
            log::debug!("Loading '{}' prompt from: {:?}", name, path);
            return fs::read_to_string(&path)
                .map_err(|e| anyhow::anyhow!("Failed to read prompt '{}': {}", name, e));
        }

        log::debug!("Using default '{}' prompt", name);
        Ok(default.to_string())
    }
}

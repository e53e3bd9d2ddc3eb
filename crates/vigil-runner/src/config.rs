use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    pub project: ProjectConfig,
    pub pipeline: PipelineConfig,
    pub trail: TrailConfig,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProjectConfig {
    pub id: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Coherence pass threshold on the 0-100 scale.
    pub threshold: f64,
    /// Name of the environment this host runs in, fed to the passage
    /// gate's allow-list check.
    #[serde(default)]
    pub environment: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TrailConfig {
    /// Sqlite db location, relative to the project root unless absolute.
    /// Tilde-expanded.
    pub db_path: String,
    /// Default actor recorded on operator verifications.
    #[serde(default)]
    pub verifier: Option<String>,
}

impl Config {
    pub fn default_for_project(project_id: &str) -> Self {
        Self {
            project: ProjectConfig {
                id: project_id.to_string(),
            },
            pipeline: PipelineConfig {
                threshold: 80.0,
                environment: None,
            },
            trail: TrailConfig {
                db_path: ".vigil/vigil.db".to_string(),
                verifier: None,
            },
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let s = std::fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
        let cfg: Config = toml::from_str(&s).with_context(|| "parse vigil.toml")?;
        Ok(cfg)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).ok();
        }
        let s = toml::to_string_pretty(self).with_context(|| "serialize toml")?;
        std::fs::write(path, s).with_context(|| format!("write {}", path.display()))?;
        Ok(())
    }

    pub fn config_path(root: &Path) -> PathBuf {
        root.join(".vigil").join("vigil.toml")
    }

    pub fn db_path(&self, root: &Path) -> PathBuf {
        let expanded = shellexpand::tilde(&self.trail.db_path).to_string();
        let p = PathBuf::from(expanded);
        if p.is_absolute() {
            p
        } else {
            root.join(p)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_round_trips_through_toml() {
        let cfg = Config::default_for_project("demo");
        let s = toml::to_string_pretty(&cfg).unwrap();
        let back: Config = toml::from_str(&s).unwrap();
        assert_eq!(back.project.id, "demo");
        assert_eq!(back.pipeline.threshold, 80.0);
        assert_eq!(back.trail.db_path, ".vigil/vigil.db");
    }

    #[test]
    fn db_path_resolves_relative_to_root() {
        let cfg = Config::default_for_project("demo");
        let p = cfg.db_path(Path::new("/srv/project"));
        assert_eq!(p, PathBuf::from("/srv/project/.vigil/vigil.db"));
    }
}

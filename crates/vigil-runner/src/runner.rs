use std::path::{Path, PathBuf};

use anyhow::Result;
use serde_json::json;
use vigil_core::{Artifact, GateResult, PipelineResult, TrailEntry, TrailFilter};
use vigil_gates::{Pipeline, PipelineOptions};
use vigil_lifecycle::{sweep, verify, SweepReport, VerifyOutcome};
use vigil_trail::TrailStore;
use vigil_trail_sqlite::SqliteTrailStore;

use crate::{util::now_unix, Config};

/// Wires config, the durable trail store, and the standard pipeline
/// together for the CLI and scheduled jobs.
pub struct Runner {
    pub root: PathBuf,
    pub cfg: Config,
    pub store: SqliteTrailStore,
    pub pipeline: Pipeline,
}

impl Runner {
    pub fn open(root: PathBuf) -> Result<Self> {
        let cfg_path = Config::config_path(&root);
        let cfg = if cfg_path.exists() {
            Config::load_from(&cfg_path)?
        } else {
            let project_id = root.file_name().and_then(|s| s.to_str()).unwrap_or("project");
            let cfg = Config::default_for_project(project_id);
            cfg.save_to(&cfg_path)?;
            cfg
        };

        let store = SqliteTrailStore::open(&cfg.db_path(&root))?;
        Ok(Self {
            root,
            cfg,
            store,
            pipeline: Pipeline::standard(),
        })
    }

    pub fn init_root(root: &Path) -> Result<()> {
        let cfg_path = Config::config_path(root);
        if !cfg_path.exists() {
            let project_id = root.file_name().and_then(|s| s.to_str()).unwrap_or("project");
            Config::default_for_project(project_id).save_to(&cfg_path)?;
        }
        let cfg = Config::load_from(&cfg_path)?;
        let _ = SqliteTrailStore::open(&cfg.db_path(root))?;
        Ok(())
    }

    /// Options seeded from config: threshold and, when configured, the
    /// host environment for the passage gate.
    pub fn options(&self) -> PipelineOptions {
        let mut opts = PipelineOptions {
            threshold: self.cfg.pipeline.threshold,
            ..Default::default()
        };
        if let Some(env) = &self.cfg.pipeline.environment {
            opts.context.insert("environment".into(), json!(env));
        }
        opts
    }

    pub fn validate(&self, artifact: &Artifact, opts: &PipelineOptions) -> Result<PipelineResult> {
        Ok(self.pipeline.validate(&self.store, artifact, opts)?)
    }

    pub fn validate_gate(
        &self,
        name: &str,
        artifact: &Artifact,
        opts: &PipelineOptions,
    ) -> Result<GateResult> {
        Ok(self.pipeline.validate_gate(name, artifact, opts)?)
    }

    pub fn query(&self, filter: &TrailFilter) -> Result<Vec<TrailEntry>> {
        Ok(self.store.query(filter)?)
    }

    pub fn show(&self, entry_id: &str) -> Result<Option<TrailEntry>> {
        Ok(self.store.entry(entry_id)?)
    }

    pub fn verify_entry(&self, entry_id: &str, by: Option<&str>) -> Result<VerifyOutcome> {
        let actor = by.or(self.cfg.trail.verifier.as_deref());
        Ok(verify(&self.store, entry_id, actor, now_unix())?)
    }

    pub fn sweep(&self) -> Result<SweepReport> {
        Ok(sweep(&self.store, now_unix())?)
    }
}

//! Service configuration.
//!
//! Every option is a CLI flag with an environment fallback, so the same
//! settings work for one-shot commands and for `codemem serve`.

use std::path::PathBuf;
use std::time::Duration;

use clap::Args;
use codemem_memory::{Scope, ScorerKind, StoreConfig};

use crate::error::ServerResult;

pub const DEFAULT_DATA_DIR: &str = ".codemem/memory";

#[derive(Debug, Clone, Args)]
pub struct ServiceConfig {
    /// Directory holding the object store
    #[arg(long, env = "CODEMEM_DATA_DIR", default_value = DEFAULT_DATA_DIR, global = true)]
    pub data_dir: PathBuf,

    /// Tenant scope for every operation
    #[arg(long, env = "CODEMEM_TENANT", default_value = "default", global = true)]
    pub tenant: String,

    /// Project scope for every operation
    #[arg(long, env = "CODEMEM_PROJECT", default_value = "default", global = true)]
    pub project: String,

    /// Upper bound for a single store I/O operation
    #[arg(long, env = "CODEMEM_STORE_TIMEOUT_MS", default_value_t = 5000, global = true)]
    pub store_timeout_ms: u64,

    /// Ranking strategy: lexical, similarity or hybrid
    #[arg(long, env = "CODEMEM_SCORER", default_value = "lexical", global = true)]
    pub scorer: ScorerKind,

    /// Provenance agent recorded on writes
    #[arg(long, env = "CODEMEM_AGENT", default_value = "codemem", global = true)]
    pub agent: String,

    /// Debug-level logging
    #[arg(long, short, global = true)]
    pub verbose: bool,
}

impl ServiceConfig {
    /// Configuration rooted at `data_dir` with every other option defaulted.
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            tenant: "default".to_string(),
            project: "default".to_string(),
            store_timeout_ms: 5000,
            scorer: ScorerKind::default(),
            agent: "codemem".to_string(),
            verbose: false,
        }
    }

    pub fn store_config(&self) -> StoreConfig {
        StoreConfig {
            io_timeout: Duration::from_millis(self.store_timeout_ms),
            ..StoreConfig::default()
        }
    }

    /// Default scope for CLI commands.
    pub fn scope(&self) -> ServerResult<Scope> {
        Ok(Scope::new(self.tenant.clone(), self.project.clone())?)
    }

    pub fn log_filter(&self) -> &'static str {
        if self.verbose {
            "codemem_server=debug,codemem_memory=debug"
        } else {
            "codemem_server=info,codemem_memory=info"
        }
    }
}

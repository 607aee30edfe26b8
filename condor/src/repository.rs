use crate::{
    FnvIndexMap,
    strategy::{Strategy, StrategyId},
};
use std::{fs, path::PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("strategy repository IO: {0}")]
    Io(#[from] std::io::Error),

    #[error("strategy serialization: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Durable add/update/delete/list of strategies.
///
/// One self-describing JSON file per strategy, keyed by `strategy_id`.
/// Deleting renames the file to `.json_closed`, preserving the audit trail
/// of closed strategies. Callers log failures and keep the in-memory copy
/// authoritative; repository errors never abort the engine loop.
#[derive(Debug, Clone)]
pub struct StrategyRepo {
    path: PathBuf,
}

impl StrategyRepo {
    pub fn new(path: PathBuf) -> Result<Self, RepoError> {
        fs::create_dir_all(&path)?;
        Ok(Self { path })
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    fn file_name(&self, id: &StrategyId) -> PathBuf {
        self.path.join(format!("{id}.json"))
    }

    pub fn add(&self, strategy: &Strategy) -> Result<(), RepoError> {
        let file_name = self.file_name(&strategy.id());
        let json = serde_json::to_string_pretty(strategy)?;
        fs::write(&file_name, json)?;
        debug!(path = %file_name.display(), "StrategyRepo wrote strategy");
        Ok(())
    }

    pub fn update(&self, strategy: &Strategy) -> Result<(), RepoError> {
        self.add(strategy)
    }

    /// Retire a strategy file, keeping it on disk under `.json_closed`.
    pub fn delete(&self, id: &StrategyId) -> Result<(), RepoError> {
        let file_name = self.file_name(id);
        let closed = file_name.with_extension("json_closed");
        fs::rename(&file_name, &closed)?;
        debug!(path = %closed.display(), "StrategyRepo retired strategy");
        Ok(())
    }

    /// Load every active strategy.
    ///
    /// Unreadable files are logged and skipped so one corrupt entry cannot
    /// block a restart.
    pub fn all_items(&self) -> Result<FnvIndexMap<StrategyId, Strategy>, RepoError> {
        let mut strategies = FnvIndexMap::default();
        for entry in fs::read_dir(&self.path)? {
            let entry = entry?;
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }
            match fs::read_to_string(&path)
                .map_err(RepoError::from)
                .and_then(|json| serde_json::from_str::<Strategy>(&json).map_err(RepoError::from))
            {
                Ok(strategy) => {
                    strategies.insert(strategy.id(), strategy);
                }
                Err(error) => {
                    warn!(path = %path.display(), %error, "StrategyRepo skipping unreadable file");
                }
            }
        }
        Ok(strategies)
    }
}

use std::path::{Path, PathBuf};

use tracing::warn;

use crate::types::BlockchainRequest;

/// Best-effort per-wallet history cache on disk, the service-side analog of
/// the dashboard's localStorage fallback. Overwritten on every successful
/// fetch; no expiry. Read/write failures degrade to "no cache".
#[derive(Clone)]
pub struct HistoryStore {
    dir: PathBuf,
}

impl HistoryStore {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    pub fn load(&self, address: &str) -> Option<Vec<BlockchainRequest>> {
        let path = self.path_for(address);
        let raw = std::fs::read_to_string(&path).ok()?;
        match serde_json::from_str(&raw) {
            Ok(requests) => Some(requests),
            Err(e) => {
                warn!("discarding unreadable history cache {:?}: {}", path, e);
                None
            }
        }
    }

    pub fn save(&self, address: &str, requests: &[BlockchainRequest]) {
        if let Err(e) = self.try_save(address, requests) {
            warn!("history cache write failed for {}: {}", address, e);
        }
    }

    fn try_save(&self, address: &str, requests: &[BlockchainRequest]) -> anyhow::Result<()> {
        std::fs::create_dir_all(&self.dir)?;
        let json = serde_json::to_string(requests)?;
        std::fs::write(self.path_for(address), json)?;
        Ok(())
    }

    fn path_for(&self, address: &str) -> PathBuf {
        // Addresses come from the wire; keep only filename-safe characters.
        let safe: String = address
            .to_lowercase()
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect();
        self.dir.join(format!("{}.json", safe))
    }
}

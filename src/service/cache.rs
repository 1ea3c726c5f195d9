//! Verdict cache
//!
//! Decision service answers keyed by a SHA-256 digest of
//! model + rule + both values, optionally persisted next to the input file
//! so a re-run skips the calls it already made.

use super::VerdictRequest;
use crate::error::Result;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use tracing::warn;

const CACHE_FILE_NAME: &str = ".catalog-match-verdicts.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerdictCache {
    version: u32,
    entries: HashMap<String, CachedVerdict>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedVerdict {
    pub field: String,
    pub search: String,
    pub candidate: String,
    pub verdict: bool,
    /// RFC 3339 time of the answer
    #[serde(default)]
    pub cached_at: String,
}

impl VerdictCache {
    const CURRENT_VERSION: u32 = 1;

    pub fn cache_path(folder: &Path) -> PathBuf {
        folder.join(CACHE_FILE_NAME)
    }

    /// Load the cache from `folder`; anything unreadable starts a fresh one.
    pub fn load(folder: &Path) -> Self {
        let cache_path = Self::cache_path(folder);
        if !cache_path.exists() {
            return Self::default();
        }

        let file = match File::open(&cache_path) {
            Ok(f) => f,
            Err(e) => {
                warn!("Cannot open verdict cache {}: {}", cache_path.display(), e);
                return Self::default();
            }
        };

        match serde_json::from_reader::<_, VerdictCache>(BufReader::new(file)) {
            Ok(cache) if cache.version == Self::CURRENT_VERSION => cache,
            Ok(_) => {
                warn!("Verdict cache version mismatch, starting fresh");
                Self::default()
            }
            Err(e) => {
                warn!("Verdict cache unreadable ({}), starting fresh", e);
                Self::default()
            }
        }
    }

    pub fn save(&self, folder: &Path) -> Result<()> {
        let file = File::create(Self::cache_path(folder))?;
        serde_json::to_writer_pretty(BufWriter::new(file), self)?;
        Ok(())
    }

    /// Remove the cache file. `Ok(false)` when there was none.
    pub fn clear(folder: &Path) -> Result<bool> {
        let cache_path = Self::cache_path(folder);
        if cache_path.exists() {
            std::fs::remove_file(cache_path)?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    pub fn get(&self, key: &str) -> Option<bool> {
        self.entries.get(key).map(|e| e.verdict)
    }

    pub fn insert(&mut self, key: String, request: &VerdictRequest, verdict: bool) {
        self.entries.insert(
            key,
            CachedVerdict {
                field: request.field.name().to_string(),
                search: request.search.clone(),
                candidate: request.candidate.clone(),
                verdict,
                cached_at: chrono::Utc::now().to_rfc3339(),
            },
        );
    }

    /// Time of the most recent answer
    pub fn newest(&self) -> Option<&str> {
        self.entries
            .values()
            .map(|e| e.cached_at.as_str())
            .filter(|t| !t.is_empty())
            .max()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for VerdictCache {
    fn default() -> Self {
        Self {
            version: Self::CURRENT_VERSION,
            entries: HashMap::new(),
        }
    }
}

/// Hex SHA-256 of everything that determines a verdict.
pub fn cache_key(model: &str, request: &VerdictRequest) -> String {
    let mut hasher = Sha256::new();
    for part in [
        model,
        request.field.name(),
        request.rule.as_str(),
        request.search.as_str(),
        request.candidate.as_str(),
    ] {
        hasher.update(part.as_bytes());
        hasher.update([0x1f]);
    }
    hex::encode(hasher.finalize())
}

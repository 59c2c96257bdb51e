//! Resume Coordinator: persists a cursor identifying how far the input scan
//! has advanced, so a crashed or interrupted run can restart without
//! re-emitting prior results.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use crate::error::{Notice, Result};

/// Persisted cursor state: `{Index: int, ResumeFrom: string}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResumeState {
    #[serde(rename = "Index")]
    pub index: usize,
    #[serde(rename = "ResumeFrom")]
    pub resume_from: String,
}

pub struct ResumeCoordinator {
    path: PathBuf,
    state: Mutex<ResumeState>,
}

impl ResumeCoordinator {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            state: Mutex::new(ResumeState::default()),
        }
    }

    pub fn default_path() -> PathBuf {
        std::env::temp_dir().join("dnsweep-resume.json")
    }

    /// Updates (current-index, current-host); called before each host is
    /// pushed onto the worker channel.
    pub fn advance(&self, index: usize, host: &str) {
        let mut state = self.state.lock().expect("resume state mutex poisoned");
        state.index = index;
        state.resume_from = host.to_string();
    }

    /// Persists the cursor to `self.path`. Called on an explicit save
    /// (SIGINT or a periodic checkpoint).
    pub fn save(&self) -> Result<()> {
        let state = self.state.lock().expect("resume state mutex poisoned");
        let bytes = serde_json::to_vec(&*state).unwrap_or_default();
        std::fs::write(&self.path, bytes)?;
        Ok(())
    }

    /// On startup, if `resume_requested` and a resume file exists, returns
    /// the index to fast-forward past. A corrupted file is a warn-and-ignore
    /// condition, not a fatal one.
    pub fn load_if_resuming(path: &Path, resume_requested: bool) -> Option<usize> {
        if !resume_requested {
            return None;
        }
        let bytes = std::fs::read(path).ok()?;
        match serde_json::from_slice::<ResumeState>(&bytes) {
            Ok(state) => Some(state.index + 1),
            Err(e) => {
                Notice::ResumeCorrupt { detail: e.to_string() }.log();
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("dnsweep-resume-test-{}-{}.json", std::process::id(), name))
    }

    #[test]
    fn save_then_load_round_trips() {
        let path = scratch_path("roundtrip");
        let coordinator = ResumeCoordinator::new(&path);
        coordinator.advance(39, "host-39.example.com");
        coordinator.save().unwrap();

        let start_index = ResumeCoordinator::load_if_resuming(&path, true);
        assert_eq!(start_index, Some(40));
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn not_resuming_ignores_any_file() {
        let path = scratch_path("ignored");
        std::fs::write(&path, b"garbage, not json").unwrap();
        assert_eq!(ResumeCoordinator::load_if_resuming(&path, false), None);
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn corrupt_file_is_ignored_not_fatal() {
        let path = scratch_path("corrupt");
        std::fs::write(&path, b"not json at all").unwrap();
        assert_eq!(ResumeCoordinator::load_if_resuming(&path, true), None);
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn missing_file_yields_none() {
        let path = scratch_path("missing");
        std::fs::remove_file(&path).ok();
        assert_eq!(ResumeCoordinator::load_if_resuming(&path, true), None);
    }
}

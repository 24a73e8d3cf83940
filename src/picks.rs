use std::{
    fs,
    path::{Path, PathBuf},
};
use tracing::warn;

use crate::config::{append_picks_log, normalize_participant, now_ms};
use crate::types::{ParticipantSummary, PicksFile, PredictionSet};

/// File-backed store of prediction sets, one JSON file per participant
/// under the picks directory. Participant names are normalized to a
/// file-safe key, so "Player One" and "player-one" share a file.
pub struct PickStore {
    dir: PathBuf,
    log_picks: bool,
}

impl PickStore {
    pub fn new(dir: PathBuf, log_picks: bool) -> Self {
        PickStore { dir, log_picks }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn file_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }

    /// Load a participant's prediction set. A missing file is an empty set,
    /// not an error.
    pub fn load(&self, participant: &str) -> Result<PicksFile, String> {
        let key = normalize_participant(participant)?;
        let path = self.file_path(&key);
        if !path.is_file() {
            return Ok(PicksFile {
                participant: key,
                updated_at_ms: 0,
                picks: PredictionSet::new(),
            });
        }
        let data = fs::read_to_string(&path)
            .map_err(|e| format!("read picks {}: {e}", path.display()))?;
        let mut file = serde_json::from_str::<PicksFile>(&data)
            .map_err(|e| format!("parse picks {}: {e}", path.display()))?;
        file.participant = key;
        Ok(file)
    }

    /// Replace a participant's prediction set wholesale.
    pub fn save(&self, participant: &str, picks: PredictionSet) -> Result<PicksFile, String> {
        let key = normalize_participant(participant)?;
        fs::create_dir_all(&self.dir)
            .map_err(|e| format!("create picks dir {}: {e}", self.dir.display()))?;
        let file = PicksFile {
            participant: key.clone(),
            updated_at_ms: now_ms(),
            picks,
        };
        let payload = serde_json::to_string_pretty(&file).map_err(|e| e.to_string())?;
        let path = self.file_path(&key);
        fs::write(&path, payload).map_err(|e| format!("write picks {}: {e}", path.display()))?;
        if self.log_picks {
            append_picks_log(&key, &format!("saved {} picks", file.picks.len()));
        }
        Ok(file)
    }

    pub fn set_pick(
        &self,
        participant: &str,
        matchup_id: &str,
        winner_id: &str,
    ) -> Result<PicksFile, String> {
        let mut file = self.load(participant)?;
        file.picks
            .insert(matchup_id.to_string(), winner_id.to_string());
        self.save(participant, file.picks)
    }

    pub fn clear_pick(&self, participant: &str, matchup_id: &str) -> Result<PicksFile, String> {
        let mut file = self.load(participant)?;
        file.picks.remove(matchup_id);
        self.save(participant, file.picks)
    }

    /// Scan the picks directory for saved participants, sorted by key.
    /// Unreadable files are skipped with a warning rather than failing the
    /// whole listing.
    pub fn list_participants(&self) -> Result<Vec<ParticipantSummary>, String> {
        if !self.dir.is_dir() {
            return Ok(Vec::new());
        }
        let entries = fs::read_dir(&self.dir)
            .map_err(|e| format!("read picks dir {}: {e}", self.dir.display()))?;
        let mut out = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| e.to_string())?;
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }
            let Some(key) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            match self.load(key) {
                Ok(file) => out.push(ParticipantSummary {
                    participant: file.participant,
                    pick_count: file.picks.len(),
                    updated_at_ms: file.updated_at_ms,
                }),
                Err(e) => warn!("skipping picks file {}: {e}", path.display()),
            }
        }
        out.sort_by(|a, b| a.participant.cmp(&b.participant));
        Ok(out)
    }
}

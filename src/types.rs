use serde::{Deserialize, Serialize};
use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use crate::picks::PickStore;

// ── Constants ──────────────────────────────────────────────────────────

pub const DEFAULT_LISTEN_ADDR: &str = "127.0.0.1:17900";
pub const DEFAULT_BRACKET_FILE: &str = "demo_bracket_8.json";
pub const MAX_PARTICIPANT_KEY_LEN: usize = 64;

// ── Shared state type aliases ──────────────────────────────────────────

pub type SharedPickStore = Arc<Mutex<PickStore>>;

/// Sparse mapping of matchup id to the entrant id picked to win it.
pub type PredictionSet = HashMap<String, String>;

// ── Persisted pick types ───────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PicksFile {
    pub participant: String,
    #[serde(default)]
    pub updated_at_ms: u64,
    #[serde(default)]
    pub picks: PredictionSet,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantSummary {
    pub participant: String,
    pub pick_count: usize,
    pub updated_at_ms: u64,
}

// ── API payload types ──────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PickRequest {
    pub matchup_id: String,
    pub winner_id: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BracketResponse {
    pub participant: String,
    pub updated_at_ms: u64,
    pub bracket: crate::bracket::DerivedBracket,
}

// ── Config types ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AppConfig {
    pub bracket_path: String,
    pub picks_dir: String,
    pub ui_dir: String,
    pub listen_addr: String,
    pub log_picks: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bracket_path: String::new(),
            picks_dir: "picks".to_string(),
            ui_dir: "ui".to_string(),
            listen_addr: DEFAULT_LISTEN_ADDR.to_string(),
            log_picks: true,
        }
    }
}

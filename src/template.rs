use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::config::resolve_bracket_path;
use crate::types::AppConfig;

// ── Slot identifiers ───────────────────────────────────────────────────

/// One of a matchup's two entrant slots.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SlotId {
  A,
  B,
}

impl fmt::Display for SlotId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      SlotId::A => write!(f, "A"),
      SlotId::B => write!(f, "B"),
    }
  }
}

// ── Template errors ────────────────────────────────────────────────────

/// Topology violations caught once, at template construction.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum MalformedTemplateError {
  #[error("duplicate matchup id `{0}`")]
  DuplicateMatchupId(String),
  #[error("duplicate entrant id `{0}`")]
  DuplicateEntrantId(String),
  #[error("no final matchup: every matchup advances somewhere")]
  NoFinal,
  #[error("multiple final matchups: `{0}` and `{1}`")]
  MultipleFinals(String, String),
  #[error("matchup `{0}` advances into unknown matchup `{1}`")]
  UnknownNextMatchup(String, String),
  #[error("matchup `{0}` has a next matchup but no advance slot")]
  MissingAdvanceSlot(String),
  #[error("matchup `{0}` has an advance slot but no next matchup")]
  DanglingAdvanceSlot(String),
  #[error("matchups `{first}` and `{second}` both advance into `{target}` slot {slot}")]
  DuplicateSlotTarget {
    first: String,
    second: String,
    target: String,
    slot: SlotId,
  },
  #[error("matchup `{0}` has round 0; rounds start at 1")]
  ZeroRound(String),
  #[error("matchup `{from}` (round {from_round}) must precede `{to}` (round {to_round})")]
  NonMonotonicRounds {
    from: String,
    from_round: u32,
    to: String,
    to_round: u32,
  },
  #[error("round-1 matchup `{0}` is missing a fixed seed")]
  MissingSeed(String),
  #[error("round-{1} matchup `{0}` must not carry fixed seeds")]
  SeedInLaterRound(String, u32),
  #[error("matchup `{0}` seeds unknown entrant `{1}`")]
  UnknownSeedEntrant(String, String),
  #[error("matchup `{0}` never reaches the final")]
  DisconnectedMatchup(String),
}

// ── File-format types ──────────────────────────────────────────────────

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateEntrantConfig {
  pub id: String,
  pub name: String,
  pub seed: Option<u32>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateMatchupConfig {
  pub id: String,
  pub round: u32,
  #[serde(default)]
  pub slot_a: Option<String>,
  #[serde(default)]
  pub slot_b: Option<String>,
  #[serde(default)]
  pub next_matchup_id: Option<String>,
  #[serde(default)]
  pub advance_to_slot: Option<SlotId>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateConfig {
  pub name: String,
  pub entrants: Vec<TemplateEntrantConfig>,
  pub matchups: Vec<TemplateMatchupConfig>,
}

// ── Validated template ─────────────────────────────────────────────────

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateEntrant {
  pub id: String,
  pub name: String,
  pub seed: u32,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Matchup {
  pub id: String,
  pub round: u32,
  pub seed_a: Option<String>,
  pub seed_b: Option<String>,
  pub next_matchup_id: Option<String>,
  pub advance_to_slot: Option<SlotId>,
}

/// The fixed tournament topology. Validated once in [`BracketTemplate::new`]
/// and read-only for the life of the process.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BracketTemplate {
  name: String,
  entrants: Vec<TemplateEntrant>,
  #[serde(skip)]
  entrant_index: HashMap<String, usize>,
  matchups: Vec<Matchup>,
  #[serde(skip)]
  matchup_index: HashMap<String, usize>,
  final_id: String,
}

impl BracketTemplate {
  pub fn new(config: TemplateConfig) -> Result<Self, MalformedTemplateError> {
    let entrants = normalize_entrants(&config.entrants)?;
    let entrant_index = entrants
      .iter()
      .enumerate()
      .map(|(idx, e)| (e.id.clone(), idx))
      .collect::<HashMap<_, _>>();

    let mut matchups = Vec::with_capacity(config.matchups.len());
    let mut matchup_index: HashMap<String, usize> = HashMap::new();
    for raw in &config.matchups {
      if matchup_index.contains_key(&raw.id) {
        return Err(MalformedTemplateError::DuplicateMatchupId(raw.id.clone()));
      }
      let matchup = Matchup {
        id: raw.id.clone(),
        round: raw.round,
        seed_a: raw.slot_a.clone(),
        seed_b: raw.slot_b.clone(),
        next_matchup_id: raw.next_matchup_id.clone(),
        advance_to_slot: raw.advance_to_slot,
      };
      matchups.push(matchup);
      matchup_index.insert(raw.id.clone(), matchups.len() - 1);
    }

    let final_id = validate_topology(&matchups, &matchup_index, &entrant_index)?;

    Ok(BracketTemplate {
      name: config.name,
      entrants,
      entrant_index,
      matchups,
      matchup_index,
      final_id,
    })
  }

  pub fn name(&self) -> &str {
    &self.name
  }

  pub fn entrants(&self) -> &[TemplateEntrant] {
    &self.entrants
  }

  pub fn entrant(&self, id: &str) -> Option<&TemplateEntrant> {
    self.entrant_index.get(id).map(|idx| &self.entrants[*idx])
  }

  pub fn matchups(&self) -> &[Matchup] {
    &self.matchups
  }

  pub fn get(&self, id: &str) -> Option<&Matchup> {
    self.matchup_index.get(id).map(|idx| &self.matchups[*idx])
  }

  /// The root matchup: the only one with no outgoing edge.
  pub fn final_id(&self) -> &str {
    &self.final_id
  }
}

fn normalize_entrants(
  config_entrants: &[TemplateEntrantConfig],
) -> Result<Vec<TemplateEntrant>, MalformedTemplateError> {
  let mut seen_ids = HashSet::new();
  let mut used_seeds = HashSet::new();
  let mut assigned: Vec<(TemplateEntrantConfig, u32)> = Vec::with_capacity(config_entrants.len());

  for entrant in config_entrants {
    if !seen_ids.insert(entrant.id.clone()) {
      return Err(MalformedTemplateError::DuplicateEntrantId(entrant.id.clone()));
    }
    let seed = entrant.seed.filter(|s| *s > 0 && !used_seeds.contains(s));
    let final_seed = if let Some(seed) = seed {
      used_seeds.insert(seed);
      seed
    } else {
      0
    };
    assigned.push((entrant.clone(), final_seed));
  }

  // Entrants without a usable seed take the lowest unclaimed one.
  let mut next_seed = 1u32;
  for (_, seed) in assigned.iter_mut() {
    if *seed != 0 {
      continue;
    }
    while used_seeds.contains(&next_seed) {
      next_seed += 1;
    }
    *seed = next_seed;
    used_seeds.insert(next_seed);
    next_seed += 1;
  }

  Ok(
    assigned
      .into_iter()
      .map(|(entrant, seed)| TemplateEntrant {
        id: entrant.id,
        name: entrant.name,
        seed,
      })
      .collect(),
  )
}

/// Check every topology invariant and return the final matchup's id.
/// Structural checks run first, then cycle detection, then round
/// monotonicity, so a cycle surfaces as a cycle rather than as whichever
/// of its edges happens to break the round ordering.
fn validate_topology(
  matchups: &[Matchup],
  matchup_index: &HashMap<String, usize>,
  entrant_index: &HashMap<String, usize>,
) -> Result<String, MalformedTemplateError> {
  let mut final_id: Option<String> = None;
  let mut slot_targets: HashMap<(String, SlotId), String> = HashMap::new();

  for matchup in matchups {
    if matchup.round == 0 {
      return Err(MalformedTemplateError::ZeroRound(matchup.id.clone()));
    }

    match (&matchup.next_matchup_id, matchup.advance_to_slot) {
      (Some(next_id), Some(slot)) => {
        if !matchup_index.contains_key(next_id) {
          return Err(MalformedTemplateError::UnknownNextMatchup(
            matchup.id.clone(),
            next_id.clone(),
          ));
        }
        if let Some(first) = slot_targets.insert((next_id.clone(), slot), matchup.id.clone()) {
          return Err(MalformedTemplateError::DuplicateSlotTarget {
            first,
            second: matchup.id.clone(),
            target: next_id.clone(),
            slot,
          });
        }
      }
      (Some(_), None) => {
        return Err(MalformedTemplateError::MissingAdvanceSlot(matchup.id.clone()));
      }
      (None, Some(_)) => {
        return Err(MalformedTemplateError::DanglingAdvanceSlot(matchup.id.clone()));
      }
      (None, None) => {
        if let Some(existing) = &final_id {
          return Err(MalformedTemplateError::MultipleFinals(
            existing.clone(),
            matchup.id.clone(),
          ));
        }
        final_id = Some(matchup.id.clone());
      }
    }

    if matchup.round == 1 {
      for seed in [&matchup.seed_a, &matchup.seed_b] {
        let Some(entrant_id) = seed else {
          return Err(MalformedTemplateError::MissingSeed(matchup.id.clone()));
        };
        if !entrant_index.contains_key(entrant_id) {
          return Err(MalformedTemplateError::UnknownSeedEntrant(
            matchup.id.clone(),
            entrant_id.clone(),
          ));
        }
      }
    } else if matchup.seed_a.is_some() || matchup.seed_b.is_some() {
      return Err(MalformedTemplateError::SeedInLaterRound(
        matchup.id.clone(),
        matchup.round,
      ));
    }
  }

  let final_id = final_id.ok_or(MalformedTemplateError::NoFinal)?;

  // Every matchup must reach the final by following next pointers. With
  // unique outgoing edges a walk that exceeds the matchup count is cycling.
  for matchup in matchups {
    let mut current = matchup;
    let mut hops = 0usize;
    while let Some(next_id) = &current.next_matchup_id {
      hops += 1;
      if hops > matchups.len() {
        return Err(MalformedTemplateError::DisconnectedMatchup(matchup.id.clone()));
      }
      current = &matchups[matchup_index[next_id]];
    }
    if current.id != final_id {
      return Err(MalformedTemplateError::DisconnectedMatchup(matchup.id.clone()));
    }
  }

  for matchup in matchups {
    if let Some(next_id) = &matchup.next_matchup_id {
      let next = &matchups[matchup_index[next_id]];
      if matchup.round >= next.round {
        return Err(MalformedTemplateError::NonMonotonicRounds {
          from: matchup.id.clone(),
          from_round: matchup.round,
          to: next.id.clone(),
          to_round: next.round,
        });
      }
    }
  }

  Ok(final_id)
}

// ── Loading ────────────────────────────────────────────────────────────

pub fn load_template_from(path: &Path) -> Result<BracketTemplate, String> {
  let data =
    fs::read_to_string(path).map_err(|e| format!("read bracket template {}: {e}", path.display()))?;
  let config = serde_json::from_str::<TemplateConfig>(&data)
    .map_err(|e| format!("parse bracket template {}: {e}", path.display()))?;
  BracketTemplate::new(config).map_err(|e| format!("bracket template {}: {e}", path.display()))
}

pub fn load_template(config: &AppConfig) -> Result<BracketTemplate, String> {
  let path = resolve_bracket_path(&config.bracket_path);
  load_template_from(&path)
}

#[cfg(test)]
mod tests {
  use super::*;

  fn entrant(id: &str, seed: u32) -> TemplateEntrantConfig {
    TemplateEntrantConfig {
      id: id.to_string(),
      name: id.to_ascii_uppercase(),
      seed: Some(seed),
    }
  }

  fn matchup(
    id: &str,
    round: u32,
    seeds: Option<(&str, &str)>,
    next: Option<(&str, SlotId)>,
  ) -> TemplateMatchupConfig {
    TemplateMatchupConfig {
      id: id.to_string(),
      round,
      slot_a: seeds.map(|(a, _)| a.to_string()),
      slot_b: seeds.map(|(_, b)| b.to_string()),
      next_matchup_id: next.map(|(id, _)| id.to_string()),
      advance_to_slot: next.map(|(_, slot)| slot),
    }
  }

  fn four_entrant_config() -> TemplateConfig {
    TemplateConfig {
      name: "Test Cup".to_string(),
      entrants: vec![
        entrant("seed-a", 1),
        entrant("seed-b", 4),
        entrant("seed-c", 2),
        entrant("seed-d", 3),
      ],
      matchups: vec![
        matchup("m1", 1, Some(("seed-a", "seed-b")), Some(("f", SlotId::A))),
        matchup("m2", 1, Some(("seed-c", "seed-d")), Some(("f", SlotId::B))),
        matchup("f", 2, None, None),
      ],
    }
  }

  #[test]
  fn test_valid_template_builds() {
    let template = BracketTemplate::new(four_entrant_config()).unwrap();
    assert_eq!(template.final_id(), "f");
    assert_eq!(template.matchups().len(), 3);
    assert_eq!(template.get("m1").unwrap().seed_a.as_deref(), Some("seed-a"));
    assert_eq!(template.entrant("seed-c").unwrap().seed, 2);
    assert!(template.get("missing").is_none());
  }

  #[test]
  fn test_duplicate_slot_target_rejected() {
    let mut config = four_entrant_config();
    config.matchups[1].advance_to_slot = Some(SlotId::A);
    let err = BracketTemplate::new(config).unwrap_err();
    assert_eq!(
      err,
      MalformedTemplateError::DuplicateSlotTarget {
        first: "m1".to_string(),
        second: "m2".to_string(),
        target: "f".to_string(),
        slot: SlotId::A,
      }
    );
  }

  #[test]
  fn test_missing_round_one_seed_rejected() {
    let mut config = four_entrant_config();
    config.matchups[0].slot_b = None;
    let err = BracketTemplate::new(config).unwrap_err();
    assert_eq!(err, MalformedTemplateError::MissingSeed("m1".to_string()));
  }

  #[test]
  fn test_non_monotonic_rounds_rejected() {
    let mut config = four_entrant_config();
    // Pull the final down into round 1 (seeded so only rounds are wrong).
    config.matchups[2].round = 1;
    config.matchups[2].slot_a = Some("seed-a".to_string());
    config.matchups[2].slot_b = Some("seed-c".to_string());
    let err = BracketTemplate::new(config).unwrap_err();
    assert_eq!(
      err,
      MalformedTemplateError::NonMonotonicRounds {
        from: "m1".to_string(),
        from_round: 1,
        to: "f".to_string(),
        to_round: 1,
      }
    );
  }

  #[test]
  fn test_cycle_rejected() {
    let mut config = four_entrant_config();
    // m1 and m2 feed each other instead of the final.
    config.matchups[0].next_matchup_id = Some("m2".to_string());
    config.matchups[1].next_matchup_id = Some("m1".to_string());
    config.matchups[1].round = 2;
    config.matchups[1].slot_a = None;
    config.matchups[1].slot_b = None;
    let err = BracketTemplate::new(config).unwrap_err();
    assert_eq!(err, MalformedTemplateError::DisconnectedMatchup("m1".to_string()));
  }

  #[test]
  fn test_unreachable_final_rejected() {
    let mut config = four_entrant_config();
    // A second two-matchup island whose members feed each other.
    config.matchups.push(matchup("x1", 1, Some(("seed-a", "seed-b")), Some(("x2", SlotId::A))));
    config.matchups.push(matchup("x2", 2, None, Some(("x1", SlotId::A))));
    let err = BracketTemplate::new(config).unwrap_err();
    assert_eq!(err, MalformedTemplateError::DisconnectedMatchup("x1".to_string()));
  }

  #[test]
  fn test_multiple_finals_rejected() {
    let mut config = four_entrant_config();
    config.matchups[1].next_matchup_id = None;
    config.matchups[1].advance_to_slot = None;
    let err = BracketTemplate::new(config).unwrap_err();
    assert_eq!(
      err,
      MalformedTemplateError::MultipleFinals("m2".to_string(), "f".to_string())
    );
  }

  #[test]
  fn test_unknown_next_matchup_rejected() {
    let mut config = four_entrant_config();
    config.matchups[0].next_matchup_id = Some("ghost".to_string());
    let err = BracketTemplate::new(config).unwrap_err();
    assert_eq!(
      err,
      MalformedTemplateError::UnknownNextMatchup("m1".to_string(), "ghost".to_string())
    );
  }

  #[test]
  fn test_dangling_advance_slot_rejected() {
    let mut config = four_entrant_config();
    config.matchups[2].advance_to_slot = Some(SlotId::A);
    let err = BracketTemplate::new(config).unwrap_err();
    assert_eq!(err, MalformedTemplateError::DanglingAdvanceSlot("f".to_string()));
  }

  #[test]
  fn test_seed_in_later_round_rejected() {
    let mut config = four_entrant_config();
    config.matchups[2].slot_a = Some("seed-a".to_string());
    let err = BracketTemplate::new(config).unwrap_err();
    assert_eq!(err, MalformedTemplateError::SeedInLaterRound("f".to_string(), 2));
  }

  #[test]
  fn test_unknown_seed_entrant_rejected() {
    let mut config = four_entrant_config();
    config.matchups[0].slot_a = Some("seed-z".to_string());
    let err = BracketTemplate::new(config).unwrap_err();
    assert_eq!(
      err,
      MalformedTemplateError::UnknownSeedEntrant("m1".to_string(), "seed-z".to_string())
    );
  }

  #[test]
  fn test_seed_backfill() {
    let mut config = four_entrant_config();
    config.entrants[1].seed = None;
    config.entrants[3].seed = None;
    let template = BracketTemplate::new(config).unwrap();
    let seeds: Vec<u32> = template.entrants().iter().map(|e| e.seed).collect();
    assert_eq!(seeds, vec![1, 3, 2, 4]);
  }
}

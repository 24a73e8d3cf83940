use serde::Serialize;
use std::collections::HashMap;

use crate::template::{BracketTemplate, SlotId};
use crate::types::PredictionSet;

// ── Derived bracket types ──────────────────────────────────────────────

/// A template matchup plus whichever entrants are currently known, either
/// from the template's fixed seeds or from a predecessor's predicted winner.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedMatchup {
  pub id: String,
  pub round: u32,
  pub slot_a: Option<String>,
  pub slot_b: Option<String>,
  pub next_matchup_id: Option<String>,
  pub advance_to_slot: Option<SlotId>,
  /// The participant's own recorded pick for this matchup, passed through
  /// uninterpreted for display.
  pub pick: Option<String>,
}

impl ResolvedMatchup {
  pub fn slot(&self, slot: SlotId) -> Option<&str> {
    match slot {
      SlotId::A => self.slot_a.as_deref(),
      SlotId::B => self.slot_b.as_deref(),
    }
  }

  fn slot_mut(&mut self, slot: SlotId) -> &mut Option<String> {
    match slot {
      SlotId::A => &mut self.slot_a,
      SlotId::B => &mut self.slot_b,
    }
  }
}

/// The complete materialized view of one participant's bracket. Rebuilt
/// from scratch on every derivation; never mutated incrementally.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DerivedBracket {
  pub matchups: Vec<ResolvedMatchup>,
  pub champion: Option<String>,
  #[serde(skip)]
  index: HashMap<String, usize>,
}

impl DerivedBracket {
  pub fn get(&self, id: &str) -> Option<&ResolvedMatchup> {
    self.index.get(id).map(|idx| &self.matchups[*idx])
  }
}

// ── Derivation ─────────────────────────────────────────────────────────

/// Materialize a bracket from the template and a sparse prediction set.
///
/// Each prediction propagates its winner exactly one hop, into the slot of
/// the matchup it feeds; the root matchup's pick becomes the champion.
/// Because the template guarantees at most one predecessor per slot, the
/// pass is order-independent and idempotent. Predictions for unknown
/// matchup ids are noise from a stale or foreign set and are skipped;
/// entrant ids are not interpreted here at all.
pub fn derive(template: &BracketTemplate, picks: &PredictionSet) -> DerivedBracket {
  let mut matchups = template
    .matchups()
    .iter()
    .map(|m| ResolvedMatchup {
      id: m.id.clone(),
      round: m.round,
      slot_a: m.seed_a.clone(),
      slot_b: m.seed_b.clone(),
      next_matchup_id: m.next_matchup_id.clone(),
      advance_to_slot: m.advance_to_slot,
      pick: None,
    })
    .collect::<Vec<_>>();
  let index = matchups
    .iter()
    .enumerate()
    .map(|(idx, m)| (m.id.clone(), idx))
    .collect::<HashMap<_, _>>();

  let mut champion = None;
  for (matchup_id, winner) in picks {
    let Some(matchup) = template.get(matchup_id) else {
      continue;
    };
    if let Some(idx) = index.get(matchup_id) {
      matchups[*idx].pick = Some(winner.clone());
    }
    match (&matchup.next_matchup_id, matchup.advance_to_slot) {
      (Some(next_id), Some(slot)) => {
        if let Some(next_idx) = index.get(next_id) {
          *matchups[*next_idx].slot_mut(slot) = Some(winner.clone());
        }
      }
      // The root has no slot to advance into; its pick names the champion.
      _ => champion = Some(winner.clone()),
    }
  }

  DerivedBracket {
    matchups,
    champion,
    index,
  }
}

use crate::types::*;
use chrono::Local;
use std::{
    env,
    fs,
    io::Write,
    path::PathBuf,
    time::{SystemTime, UNIX_EPOCH},
};

pub fn repo_root() -> PathBuf {
  PathBuf::from(env!("CARGO_MANIFEST_DIR"))
}

pub fn resolve_repo_path(raw: &str) -> PathBuf {
  let path = PathBuf::from(raw);
  if path.is_absolute() {
    path
  } else {
    repo_root().join(path)
  }
}

pub fn config_path() -> PathBuf {
  repo_root().join("config.json")
}

pub fn env_default(key: &str) -> Option<String> {
  env::var(key)
    .ok()
    .map(|value| value.trim().to_string())
    .filter(|value| !value.is_empty())
}

pub fn env_flag_true_default(key: &str, default: bool) -> bool {
  match env::var(key) {
    Ok(value) => {
      let value = value.trim().to_ascii_lowercase();
      matches!(value.as_str(), "1" | "true" | "yes" | "on")
    }
    Err(_) => default,
  }
}

pub fn apply_env_defaults(mut config: AppConfig) -> AppConfig {
  if config.bracket_path.trim().is_empty() {
    if let Some(value) = env_default("BRACKET_TEMPLATE_PATH") {
      config.bracket_path = value;
    }
  }
  if config.picks_dir.trim().is_empty() {
    if let Some(value) = env_default("PICKS_DIR") {
      config.picks_dir = value;
    }
  }
  if config.ui_dir.trim().is_empty() {
    if let Some(value) = env_default("PICKEM_UI_DIR") {
      config.ui_dir = value;
    }
  }
  if config.listen_addr.trim().is_empty() {
    config.listen_addr = env_default("PICKEM_LISTEN_ADDR")
      .unwrap_or_else(|| DEFAULT_LISTEN_ADDR.to_string());
  }
  config.log_picks = env_flag_true_default("PICKEM_LOG_PICKS", config.log_picks);
  config
}

pub fn load_config_inner() -> Result<AppConfig, String> {
  let path = config_path();
  if !path.is_file() {
    return Ok(apply_env_defaults(AppConfig::default()));
  }
  let data = fs::read_to_string(&path).map_err(|e| format!("read config {}: {e}", path.display()))?;
  let config =
    serde_json::from_str::<AppConfig>(&data).map_err(|e| format!("parse config {}: {e}", path.display()))?;
  Ok(apply_env_defaults(config))
}

pub fn load_env_file() {
  let env_path = repo_root().join(".env");
  if !env_path.is_file() {
    return;
  }
  let contents = match fs::read_to_string(&env_path) {
    Ok(data) => data,
    Err(_) => return,
  };
  for line in contents.lines() {
    if let Some((key, value)) = parse_env_line(line) {
      if env::var_os(&key).is_none() {
        env::set_var(key, value);
      }
    }
  }
}

pub fn parse_env_line(line: &str) -> Option<(String, String)> {
  let trimmed = line.trim();
  if trimmed.is_empty() || trimmed.starts_with('#') {
    return None;
  }
  let trimmed = trimmed.strip_prefix("export ").unwrap_or(trimmed);
  let (key, raw_value) = trimmed.split_once('=')?;
  let key = key.trim();
  if key.is_empty() {
    return None;
  }
  let mut value = raw_value.trim();
  if value.starts_with('"') && value.ends_with('"') && value.len() >= 2 {
    value = &value[1..value.len() - 1];
  } else if value.starts_with('\'') && value.ends_with('\'') && value.len() >= 2 {
    value = &value[1..value.len() - 1];
  } else if let Some(idx) = value.find('#') {
    value = value[..idx].trim_end();
  }
  Some((key.to_string(), value.to_string()))
}

pub fn now_ms() -> u64 {
  SystemTime::now()
    .duration_since(UNIX_EPOCH)
    .unwrap_or_default()
    .as_millis() as u64
}

// ── Bracket template paths ─────────────────────────────────────────────

pub fn bracket_configs_dir() -> PathBuf {
  repo_root().join("brackets")
}

pub fn default_bracket_path() -> PathBuf {
  if let Ok(raw) = env::var("BRACKET_TEMPLATE_PATH") {
    let trimmed = raw.trim();
    if !trimmed.is_empty() {
      return PathBuf::from(trimmed);
    }
  }
  bracket_configs_dir().join(DEFAULT_BRACKET_FILE)
}

/// Resolve a bracket path from config: absolute paths pass through, paths
/// with separators resolve against the repo root, bare names against the
/// brackets dir, and an empty value falls back to the default bracket.
pub fn resolve_bracket_path(raw: &str) -> PathBuf {
  let trimmed = raw.trim();
  if trimmed.is_empty() {
    return default_bracket_path();
  }
  let path = PathBuf::from(trimmed);
  if path.is_absolute() {
    return path;
  }
  if trimmed.contains(std::path::MAIN_SEPARATOR) || trimmed.contains('/') {
    return repo_root().join(path);
  }
  bracket_configs_dir().join(path)
}

// ── Pick audit log ─────────────────────────────────────────────────────

pub fn picks_log_path() -> PathBuf {
  repo_root().join("logs").join("picks.log")
}

pub fn append_picks_log(participant: &str, summary: &str) {
  let dir = repo_root().join("logs");
  if fs::create_dir_all(&dir).is_err() {
    return;
  }
  let path = picks_log_path();
  let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S%.3f");
  let entry = format!("[{timestamp}] {participant}: {summary}\n");
  if let Ok(mut file) = fs::OpenOptions::new().create(true).append(true).open(&path) {
    let _ = file.write_all(entry.as_bytes());
  }
}

// ── Participant keys ───────────────────────────────────────────────────

/// Reduce a participant name to a lowercase file-safe key. Runs of
/// non-alphanumeric characters collapse to a single dash.
pub fn normalize_participant(raw: &str) -> Result<String, String> {
  let mut out = String::new();
  let mut last_dash = false;
  for ch in raw.trim().chars() {
    let lower = ch.to_ascii_lowercase();
    if lower.is_ascii_alphanumeric() {
      out.push(lower);
      last_dash = false;
    } else if !last_dash && !out.is_empty() {
      out.push('-');
      last_dash = true;
    }
  }
  out.truncate(MAX_PARTICIPANT_KEY_LEN);
  let out = out.trim_matches('-').to_string();
  if out.is_empty() {
    return Err(format!("Participant name {raw:?} has no usable characters."));
  }
  Ok(out)
}

pub fn log_env_warnings(config: &AppConfig) {
  let mut warnings = Vec::new();

  let bracket_path = resolve_bracket_path(&config.bracket_path);
  if !bracket_path.is_file() {
    warnings.push(format!(
      "Bracket template not found at {} — startup will fail without one",
      bracket_path.display()
    ));
  }
  if config.listen_addr.trim().is_empty() {
    warnings.push("Listen address is empty — falling back to the default".to_string());
  }

  for msg in warnings {
    tracing::warn!("{}", msg);
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_parse_env_line() {
    assert_eq!(
      parse_env_line("PICKS_DIR=picks"),
      Some(("PICKS_DIR".to_string(), "picks".to_string()))
    );
    assert_eq!(
      parse_env_line("export ADDR=\"127.0.0.1:9000\""),
      Some(("ADDR".to_string(), "127.0.0.1:9000".to_string()))
    );
    assert_eq!(
      parse_env_line("KEY=value # trailing comment"),
      Some(("KEY".to_string(), "value".to_string()))
    );
    assert_eq!(parse_env_line("# comment"), None);
    assert_eq!(parse_env_line("   "), None);
  }

  #[test]
  fn test_normalize_participant() {
    assert_eq!(normalize_participant("Player One").unwrap(), "player-one");
    assert_eq!(normalize_participant("  J.R.  Smith! ").unwrap(), "j-r-smith");
    assert_eq!(normalize_participant("abc123").unwrap(), "abc123");
    assert!(normalize_participant("!!!").is_err());
    assert!(normalize_participant("").is_err());
  }

  #[test]
  fn test_resolve_bracket_path_bare_name() {
    let resolved = resolve_bracket_path("my_bracket.json");
    assert_eq!(resolved, bracket_configs_dir().join("my_bracket.json"));
  }
}

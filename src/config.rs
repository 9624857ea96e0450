use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tracing::info;

const CONFIG_PATH: &str = "./config/game.json";

/// Rule constants for a single game. Missing fields fall back to the classic values.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    pub starting_cash: i64,
    pub go_bonus: i64,
    pub jail_fee: i64,
    pub jail_turns: u32,
    pub dice_tries: u32,
    pub bid_increment: i64,
    pub doubles_grant_extra_roll: bool,
    /// Seeds both the dice and the card draws when set.
    pub seed: Option<u64>,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            starting_cash: 1500,
            go_bonus: 200,
            jail_fee: 50,
            jail_turns: 3,
            dice_tries: 3,
            bid_increment: 10,
            doubles_grant_extra_roll: false,
            seed: None,
        }
    }
}

impl GameConfig {

    /// Reads the config from `path`, writing the defaults there first if the file is missing.
    pub fn load_or_init(path: Option<&Path>) -> anyhow::Result<Self> {
        let path = path.unwrap_or_else(|| Path::new(CONFIG_PATH));
        if path.exists() {
            let mut file = File::open(path).with_context(|| format!("opening config {}", path.display()))?;
            let mut buf = String::new();
            file.read_to_string(&mut buf)?;
            let config = serde_json::from_str(&buf).with_context(|| format!("parsing config {}", path.display()))?;
            info!(path = %path.display(), "loaded game config");
            Ok(config)
        } else {
            let config = Self::default();
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let mut file = File::create(path).with_context(|| format!("creating config {}", path.display()))?;
            file.write_all(serde_json::to_string_pretty(&config)?.as_bytes())?;
            info!(path = %path.display(), "wrote default game config");
            Ok(config)
        }
    }

}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let config: GameConfig = serde_json::from_str(r#"{"go_bonus": 400, "seed": 9}"#).unwrap();
        assert_eq!(config.go_bonus, 400);
        assert_eq!(config.seed, Some(9));
        assert_eq!(config.starting_cash, 1500);
        assert_eq!(config.jail_turns, 3);
        assert!(!config.doubles_grant_extra_roll);
    }

    #[test]
    fn load_or_init_writes_then_reads_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("game.json");
        let written = GameConfig::load_or_init(Some(&path)).unwrap();
        assert!(path.exists());
        assert_eq!(written, GameConfig::default());
        std::fs::write(&path, r#"{"jail_fee": 75}"#).unwrap();
        let read = GameConfig::load_or_init(Some(&path)).unwrap();
        assert_eq!(read.jail_fee, 75);
        assert_eq!(read.bid_increment, 10);
    }

    #[test]
    fn malformed_config_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("game.json");
        std::fs::write(&path, "{not json").unwrap();
        let err = GameConfig::load_or_init(Some(&path)).unwrap_err();
        assert!(format!("{err:#}").contains("game.json"));
    }
}

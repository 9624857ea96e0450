//! Bulk overwrite of player balances from an authoritative remote source.

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::player::{Player, PlayerId};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerSnapshot {
    #[serde(rename = "playerName")]
    pub name: String,
    #[serde(rename = "balance")]
    pub cash: i64,
    #[serde(default = "default_tries")]
    pub tries: u32,
}

fn default_tries() -> u32 {
    3
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncPayload {
    pub players: Vec<PlayerSnapshot>,
}

impl SyncPayload {

    pub fn from_json(json: &str) -> anyhow::Result<Self> {
        serde_json::from_str(json).context("parsing player snapshot payload")
    }

}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SnapshotReport {
    pub updated: Vec<PlayerId>,
    /// Names with no matching local player. They are never created.
    pub unknown: Vec<String>,
}

/// Merges snapshots into `players` by name. Applying the same snapshot twice changes nothing further.
pub fn apply_snapshot(players: &mut [Player], snapshots: &[PlayerSnapshot]) -> SnapshotReport {
    let mut report = SnapshotReport::default();
    for snapshot in snapshots {
        match players.iter_mut().find(|player| player.name == snapshot.name) {
            Some(player) => {
                player.cash = snapshot.cash;
                player.dice_tries = snapshot.tries;
                debug!(player = %player.name, cash = player.cash, tries = player.dice_tries, "player synced");
                report.updated.push(player.id);
            }
            None => {
                warn!(name = %snapshot.name, "snapshot names an unknown player");
                report.unknown.push(snapshot.name.clone());
            }
        }
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;

    fn players() -> Vec<Player> {
        vec![
            Player::new(PlayerId(0), "Ada", 1500, 3),
            Player::new(PlayerId(1), "Bo", 1500, 3),
        ]
    }

    #[test]
    fn parses_remote_payload_with_default_tries() {
        let payload = SyncPayload::from_json(
            r#"{"players":[{"playerName":"Ada","balance":900,"tries":1},{"playerName":"Bo","balance":-20}]}"#,
        )
        .unwrap();
        assert_eq!(payload.players.len(), 2);
        assert_eq!(payload.players[0].tries, 1);
        assert_eq!(payload.players[1].cash, -20);
        assert_eq!(payload.players[1].tries, 3);
    }

    #[test]
    fn rejects_malformed_payload() {
        assert!(SyncPayload::from_json(r#"{"players":[{"balance":1}]}"#).is_err());
    }

    #[test]
    fn merge_is_idempotent_and_by_name() {
        let mut players = players();
        let snapshots = vec![PlayerSnapshot {
            name: "Bo".to_string(),
            cash: 700,
            tries: 0,
        }];
        let first = apply_snapshot(&mut players, &snapshots);
        let after_first = players.clone();
        let second = apply_snapshot(&mut players, &snapshots);
        assert_eq!(first, second);
        assert_eq!(players, after_first);
        assert_eq!(players[1].cash, 700);
        assert_eq!(players[1].dice_tries, 0);
        assert_eq!(players[0].cash, 1500);
    }

    #[test]
    fn unknown_names_are_reported_not_created() {
        let mut players = players();
        let report = apply_snapshot(
            &mut players,
            &[PlayerSnapshot {
                name: "Cy".to_string(),
                cash: 1,
                tries: 3,
            }],
        );
        assert_eq!(report.unknown, vec!["Cy".to_string()]);
        assert!(report.updated.is_empty());
        assert_eq!(players.len(), 2);
    }
}

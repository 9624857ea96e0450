use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{RuleError, RuleResult};

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PlayerId(pub usize);

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "player #{}", self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    // may go negative, there is no bankruptcy rule
    pub cash: i64,
    pub properties: BTreeSet<usize>,
    pub position: usize,
    pub jail_free_cards: u32,
    // 0 means not in jail
    pub jail_turns: u32,
    pub dice_tries: u32,
}

impl Player {

    pub fn new(id: PlayerId, name: impl Into<String>, cash: i64, dice_tries: u32) -> Self {
        Self {
            id,
            name: name.into(),
            cash,
            properties: BTreeSet::new(),
            position: 0,
            jail_free_cards: 0,
            jail_turns: 0,
            dice_tries,
        }
    }

    #[inline]
    pub fn in_jail(&self) -> bool {
        self.jail_turns > 0
    }

    /// Entering jail while already jailed keeps the remaining sentence.
    pub fn enter_jail(&mut self, turns: u32) {
        if !self.in_jail() {
            self.jail_turns = turns;
        }
    }

    pub fn leave_jail(&mut self) {
        self.jail_turns = 0;
    }

    pub fn can_afford(&self, amount: i64) -> bool {
        self.cash >= amount
    }

    pub fn require_funds(&self, amount: i64) -> RuleResult<()> {
        if self.can_afford(amount) {
            Ok(())
        } else {
            Err(RuleError::InsufficientFunds {
                needed: amount,
                available: self.cash,
            })
        }
    }

}

pub fn player(players: &[Player], id: PlayerId) -> RuleResult<&Player> {
    players.get(id.0).ok_or(RuleError::UnknownPlayer(id))
}

pub fn player_mut(players: &mut [Player], id: PlayerId) -> RuleResult<&mut Player> {
    players.get_mut(id.0).ok_or(RuleError::UnknownPlayer(id))
}

/// Moves `amount` from `from` to `to`. The payer may end up below zero.
pub fn transfer(players: &mut [Player], from: PlayerId, to: PlayerId, amount: i64) -> RuleResult<()> {
    player(players, from)?;
    player(players, to)?;
    players[from.0].cash -= amount;
    players[to.0].cash += amount;
    Ok(())
}

pub fn total_cash(players: &[Player]) -> i64 {
    players.iter().map(|player| player.cash).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_players() -> Vec<Player> {
        vec![
            Player::new(PlayerId(0), "Ada", 1500, 3),
            Player::new(PlayerId(1), "Bo", 1500, 3),
        ]
    }

    #[test]
    fn jail_entry_keeps_remaining_sentence() {
        let mut player = Player::new(PlayerId(0), "Ada", 1500, 3);
        player.enter_jail(3);
        player.jail_turns = 1;
        player.enter_jail(3);
        assert_eq!(player.jail_turns, 1);
        player.leave_jail();
        assert!(!player.in_jail());
    }

    #[test]
    fn transfer_conserves_cash() {
        let mut players = two_players();
        transfer(&mut players, PlayerId(0), PlayerId(1), 1600).unwrap();
        assert_eq!(players[0].cash, -100);
        assert_eq!(players[1].cash, 3100);
        assert_eq!(total_cash(&players), 3000);
    }

    #[test]
    fn transfer_to_unknown_player_changes_nothing() {
        let mut players = two_players();
        let err = transfer(&mut players, PlayerId(0), PlayerId(7), 10).unwrap_err();
        assert_eq!(err, RuleError::UnknownPlayer(PlayerId(7)));
        assert_eq!(total_cash(&players), 3000);
        assert_eq!(players[0].cash, 1500);
    }

    #[test]
    fn require_funds_reports_shortfall() {
        let player = Player::new(PlayerId(0), "Ada", 50, 3);
        assert_eq!(
            player.require_funds(60),
            Err(RuleError::InsufficientFunds { needed: 60, available: 50 })
        );
        assert!(player.require_funds(50).is_ok());
    }
}

use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use anyhow::{bail, Context};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::board::Board;
use crate::error::{RuleError, RuleResult};
use crate::player::{player, Player, PlayerId};

const ACTION_CARDS_PATH: &str = "./config/action_cards.json";

/// Reads both decks from `path`, writing the default decks there first if the file is missing.
pub fn load_cards(path: Option<&Path>) -> anyhow::Result<Decks> {
    let path = path.unwrap_or_else(|| Path::new(ACTION_CARDS_PATH));
    if path.exists() {
        let mut file = File::open(path).with_context(|| format!("opening cards {}", path.display()))?;
        let mut buf = String::new();
        file.read_to_string(&mut buf)?;
        let decks: Decks = serde_json::from_str(&buf).with_context(|| format!("parsing cards {}", path.display()))?;
        for stack in [&decks.chance, &decks.community_chest] {
            if stack.cards.is_empty() {
                bail!("The {:?} deck in {} has no cards!", stack.kind, path.display());
            }
        }
        Ok(decks)
    } else {
        let decks = Decks::default();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut file = File::create(path).with_context(|| format!("creating cards {}", path.display()))?;
        file.write_all(serde_json::to_string_pretty(&decks)?.as_bytes())?;
        Ok(decks)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(usize)]
pub enum CardKind {
    Chance = 0,
    CommunityChest = 1,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionCard {
    pub name: String,
    pub description: String,
    pub effect: CardEffect,
}

impl ActionCard {

    fn new(name: &str, description: &str, effect: CardEffect) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            effect,
        }
    }

}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CardEffect {
    // currency is exchanged between the player and the bank, `amount` is a signed delta
    GainMoney {
        amount: i64,
    },
    LoseMoney {
        amount: i64,
    },
    // currency is exchanged between players
    PayAllPlayers {
        amount: i64,
    },
    CollectFromAllPlayers {
        amount: i64,
    },
    MoveTiles {
        tiles: i32,
    },
    GoToTile {
        tile: usize,
    },
    GoToJail,
    JailFree,
}

/// What the turn controller still has to do after a card was applied.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum CardOutcome {
    Settled,
    Move { steps: i32 },
    GoToJail,
}

/// Applies `card` for `drawer`. Movement is returned to the caller rather than performed here.
pub fn apply_card(card: &ActionCard, drawer: PlayerId, players: &mut [Player], board: &Board) -> RuleResult<CardOutcome> {
    let position = player(players, drawer)?.position;
    let outcome = match card.effect {
        CardEffect::GainMoney { amount } | CardEffect::LoseMoney { amount } => {
            players[drawer.0].cash += amount;
            CardOutcome::Settled
        }
        CardEffect::PayAllPlayers { amount } => {
            let others = players.len() as i64 - 1;
            for other in players.iter_mut().filter(|other| other.id != drawer) {
                other.cash += amount;
            }
            players[drawer.0].cash -= amount * others;
            CardOutcome::Settled
        }
        CardEffect::CollectFromAllPlayers { amount } => {
            let others = players.len() as i64 - 1;
            for other in players.iter_mut().filter(|other| other.id != drawer) {
                other.cash -= amount;
            }
            players[drawer.0].cash += amount * others;
            CardOutcome::Settled
        }
        CardEffect::MoveTiles { tiles } => CardOutcome::Move { steps: tiles },
        CardEffect::GoToTile { tile } => {
            if tile >= board.len() {
                return Err(RuleError::UnknownTile(tile));
            }
            CardOutcome::Move {
                steps: board.forward_distance(position, tile) as i32,
            }
        }
        CardEffect::GoToJail => CardOutcome::GoToJail,
        CardEffect::JailFree => {
            players[drawer.0].jail_free_cards += 1;
            CardOutcome::Settled
        }
    };
    info!(player = %players[drawer.0].name, card = %card.name, "card applied");
    Ok(outcome)
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardStack {
    pub kind: CardKind,
    pub cards: Vec<ActionCard>,
}

impl CardStack {

    #[inline]
    pub fn new(kind: CardKind, cards: Vec<ActionCard>) -> Self {
        Self { kind, cards }
    }

    /// Uniform draw with replacement.
    pub fn draw<R: Rng + ?Sized>(&self, rng: &mut R) -> RuleResult<&ActionCard> {
        if self.cards.is_empty() {
            return Err(RuleError::EmptyDeck(self.kind));
        }
        let card = &self.cards[rng.gen_range(0..self.cards.len())];
        debug!(deck = ?self.kind, card = %card.name, "card drawn");
        Ok(card)
    }

}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decks {
    pub chance: CardStack,
    pub community_chest: CardStack,
}

impl Decks {

    pub fn stack(&self, kind: CardKind) -> &CardStack {
        match kind {
            CardKind::Chance => &self.chance,
            CardKind::CommunityChest => &self.community_chest,
        }
    }

}

impl Default for Decks {
    fn default() -> Self {
        let chance = vec![
            ActionCard::new("Advance to Go", "Advance to Go and collect your bonus.", CardEffect::GoToTile { tile: 0 }),
            ActionCard::new("Advance to Illinois Avenue", "If you pass Go, collect your bonus.", CardEffect::GoToTile { tile: 24 }),
            ActionCard::new("Advance to Boardwalk", "Take a walk on the boardwalk.", CardEffect::GoToTile { tile: 39 }),
            ActionCard::new("Go back 3 spaces", "Move back three tiles.", CardEffect::MoveTiles { tiles: -3 }),
            ActionCard::new("Bank pays you dividend", "Collect 50.", CardEffect::GainMoney { amount: 50 }),
            ActionCard::new("Speeding fine", "Pay 15.", CardEffect::LoseMoney { amount: -15 }),
            ActionCard::new("Chairman of the board", "Pay each player 50.", CardEffect::PayAllPlayers { amount: 50 }),
            ActionCard::new("Go to jail", "Go directly to jail, do not pass Go.", CardEffect::GoToJail),
            ActionCard::new("Get out of jail free", "Keep this card until needed.", CardEffect::JailFree),
        ];
        let community_chest = vec![
            ActionCard::new("Bank error in your favor", "Collect 200.", CardEffect::GainMoney { amount: 200 }),
            ActionCard::new("Doctor's fee", "Pay 50.", CardEffect::LoseMoney { amount: -50 }),
            ActionCard::new("Income tax refund", "Collect 20.", CardEffect::GainMoney { amount: 20 }),
            ActionCard::new("It is your birthday", "Collect 10 from every player.", CardEffect::CollectFromAllPlayers { amount: 10 }),
            ActionCard::new("Hospital fees", "Pay 100.", CardEffect::LoseMoney { amount: -100 }),
            ActionCard::new("Advance to Go", "Advance to Go and collect your bonus.", CardEffect::GoToTile { tile: 0 }),
            ActionCard::new("Go forward 2 spaces", "Move two tiles forward.", CardEffect::MoveTiles { tiles: 2 }),
            ActionCard::new("Go to jail", "Go directly to jail, do not pass Go.", CardEffect::GoToJail),
            ActionCard::new("Get out of jail free", "Keep this card until needed.", CardEffect::JailFree),
        ];
        Self {
            chance: CardStack::new(CardKind::Chance, chance),
            community_chest: CardStack::new(CardKind::CommunityChest, community_chest),
        }
    }
}

//! Rules engine for a Monopoly-style board game.
//!
//! [`Game`] owns the whole table and consumes [`Command`]s, answering each with
//! the [`Event`]s it caused. Dice come from an injected [`DiceSource`], so the
//! same engine runs against local randomness, a remote server or a script.

pub mod action_cards;
pub mod auction;
pub mod autoplay;
pub mod board;
pub mod command;
pub mod config;
pub mod dice;
pub mod error;
pub mod event;
pub mod game;
pub mod player;
pub mod property;
pub mod sync;

pub use action_cards::{load_cards, ActionCard, CardEffect, CardKind, Decks};
pub use board::{load_board, Board, Tile, TileKind};
pub use command::Command;
pub use config::GameConfig;
pub use dice::{DiceRoll, DiceSource, RandomDice, ScriptedDice};
pub use error::{ErrorKind, RuleError, RuleResult};
pub use event::Event;
pub use game::{Game, TurnPhase};
pub use player::{Player, PlayerId};
pub use sync::{PlayerSnapshot, SyncPayload};

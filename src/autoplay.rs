//! Headless bot self-play.
//!
//! Every seat is a simple bot that only talks to the engine through [`Command`]s,
//! so a run exercises the same paths a real front end would.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::action_cards::Decks;
use crate::board::Board;
use crate::command::Command;
use crate::config::GameConfig;
use crate::dice::RandomDice;
use crate::error::RuleResult;
use crate::event::Event;
use crate::game::{Game, Resolution, TurnPhase};
use crate::player::PlayerId;

// commands a single turn may take before the bot gives up on it
const MAX_STEPS_PER_TURN: u32 = 256;

#[derive(Clone, Debug)]
pub struct AutoplayConfig {
    /// Number of bot players.
    pub players: usize,
    /// Seed for dice and card draws.
    pub seed: u64,
    /// Turns to play before stopping.
    pub max_turns: u32,
    /// Cash a bot keeps in hand when buying, bidding or building.
    pub cash_reserve: i64,
    /// Highest bid a bot makes, in percent of the list price.
    pub max_bid_percent: i64,
    pub game: GameConfig,
}

impl Default for AutoplayConfig {
    fn default() -> Self {
        Self {
            players: 4,
            seed: 42,
            max_turns: 200,
            cash_reserve: 200,
            max_bid_percent: 80,
            game: GameConfig::default(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Standing {
    pub player: PlayerId,
    pub name: String,
    pub cash: i64,
    pub properties: usize,
    /// Cash plus list price of unmortgaged property and buildings at cost.
    pub net_worth: i64,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutoplayReport {
    pub seed: u64,
    pub turns_played: u32,
    pub properties_bought: u32,
    pub auctions_won: u32,
    pub auctions_unsold: u32,
    pub rent_paid: i64,
    pub jail_entries: u32,
    pub negative_balances: u32,
    /// Sorted by net worth, richest first.
    pub standings: Vec<Standing>,
}

impl AutoplayReport {

    fn record(&mut self, events: &[Event]) {
        for event in events {
            match event {
                Event::PropertyBought { .. } => self.properties_bought += 1,
                Event::AuctionWon { .. } => self.auctions_won += 1,
                Event::AuctionUnsold { .. } => self.auctions_unsold += 1,
                Event::RentPaid { amount, .. } => self.rent_paid += amount,
                Event::JailEntered { .. } => self.jail_entries += 1,
                Event::BalanceNegative { .. } => self.negative_balances += 1,
                _ => {}
            }
        }
    }

}

/// Plays `config.max_turns` turns with bots in every seat.
pub fn run_autoplay(config: &AutoplayConfig, board: Board, decks: Decks) -> RuleResult<AutoplayReport> {
    let game_config = GameConfig {
        seed: Some(config.seed),
        ..config.game.clone()
    };
    let names = (1..=config.players).map(|n| format!("Bot {n}"));
    let dice = Box::new(RandomDice::seeded(config.seed));
    let mut game = Game::new(game_config, board, decks, names, dice);
    let mut report = AutoplayReport {
        seed: config.seed,
        ..AutoplayReport::default()
    };
    if config.players == 0 {
        return Ok(report);
    }
    info!(players = config.players, seed = config.seed, max_turns = config.max_turns, "autoplay started");

    while report.turns_played < config.max_turns {
        play_turn(&mut game, config, &mut report)?;
        report.turns_played += 1;
    }
    report.standings = standings(&game);
    info!(turns = report.turns_played, rent = report.rent_paid, "autoplay finished");
    Ok(report)
}

fn play_turn(game: &mut Game, config: &AutoplayConfig, report: &mut AutoplayReport) -> RuleResult<()> {
    let me = game.current_player();
    for _ in 0..MAX_STEPS_PER_TURN {
        let phase = game.phase().clone();
        let command = match phase {
            TurnPhase::AwaitingRoll => {
                let player = game.player(me)?;
                if player.in_jail() && player.cash >= game.config().jail_fee + config.cash_reserve {
                    Command::PayJailFee
                } else if player.dice_tries == 0 {
                    Command::EndTurn
                } else {
                    Command::Roll
                }
            }
            TurnPhase::Moving(_) => Command::MovementFinished,
            TurnPhase::ResolvingTile(Resolution::PurchaseOffer { tile }) => {
                let price = game.board().property(tile).map(|frame| frame.price).unwrap_or(i64::MAX);
                if game.player(me)?.cash.saturating_sub(price) >= config.cash_reserve {
                    Command::Buy
                } else {
                    Command::Decline
                }
            }
            TurnPhase::ResolvingTile(Resolution::Auction { tile }) => auction_move(game, config, tile)?,
            TurnPhase::ResolvingTile(Resolution::UtilityRoll { .. }) => Command::RollForRent,
            TurnPhase::TurnEnded => {
                manage(game, config, me, report);
                Command::EndTurn
            }
        };
        let ends_turn = command == Command::EndTurn;
        let events = game.handle(command)?;
        report.record(&events);
        if ends_turn {
            return Ok(());
        }
    }
    debug!(player = %me, "turn hit the step limit");
    let events = game.handle(Command::EndTurn)?;
    report.record(&events);
    Ok(())
}

fn auction_move(game: &Game, config: &AutoplayConfig, tile: usize) -> RuleResult<Command> {
    let Some(bidder) = game.auction().current_bidder() else {
        return Ok(Command::Pass);
    };
    let price = game.board().property(tile).map(|frame| frame.price).unwrap_or(0);
    let next_bid = game.auction().next_bid();
    let cash = game.player(bidder)?.cash;
    if next_bid * 100 <= price * config.max_bid_percent && cash - next_bid >= config.cash_reserve {
        Ok(Command::Bid)
    } else {
        Ok(Command::Pass)
    }
}

// end of turn bookkeeping: raise cash when broke, otherwise develop
fn manage(game: &mut Game, config: &AutoplayConfig, me: PlayerId, report: &mut AutoplayReport) {
    let owned = match game.player(me) {
        Ok(player) => player.properties.iter().copied().collect::<Vec<_>>(),
        Err(_) => return,
    };
    let cash = |game: &Game| game.player(me).map(|player| player.cash).unwrap_or(0);

    if cash(game) < 0 {
        for &tile in owned.iter().rev() {
            if cash(game) >= 0 {
                break;
            }
            while cash(game) < 0 && try_command(game, Command::Downgrade { tile }, report) {}
            if cash(game) < 0 {
                try_command(game, Command::Mortgage { tile }, report);
            }
        }
        return;
    }

    for &tile in &owned {
        let mortgaged = game.properties().get(tile).map(|state| state.mortgaged).unwrap_or(false);
        let price = game.board().property(tile).map(|frame| frame.price).unwrap_or(0);
        if mortgaged && cash(game) - price >= config.cash_reserve * 2 {
            try_command(game, Command::Unmortgage { tile }, report);
        }
    }
    for &tile in &owned {
        let Some(frame) = game.board().property(tile) else {
            continue;
        };
        if cash(game) - frame.hotel_cost.max(frame.house_cost * 4) < config.cash_reserve {
            continue;
        }
        if game.properties().can_build(game.board(), game.players(), tile, me).is_ok() {
            try_command(game, Command::Upgrade { tile }, report);
        }
    }
}

fn try_command(game: &mut Game, command: Command, report: &mut AutoplayReport) -> bool {
    match game.handle(command.clone()) {
        Ok(events) => {
            report.record(&events);
            true
        }
        Err(err) => {
            debug!(?command, %err, "bot command rejected");
            false
        }
    }
}

fn standings(game: &Game) -> Vec<Standing> {
    let mut standings = game
        .players()
        .iter()
        .map(|player| {
            let holdings: i64 = player
                .properties
                .iter()
                .filter_map(|tile| Some((game.board().property(*tile)?, game.properties().get(*tile)?)))
                .map(|(frame, state)| {
                    let land = if state.mortgaged { 0 } else { frame.price };
                    let buildings = if state.hotel {
                        frame.hotel_cost
                    } else {
                        state.houses as i64 * frame.house_cost
                    };
                    land + buildings
                })
                .sum();
            Standing {
                player: player.id,
                name: player.name.clone(),
                cash: player.cash,
                properties: player.properties.len(),
                net_worth: player.cash + holdings,
            }
        })
        .collect::<Vec<_>>();
    standings.sort_by(|a, b| b.net_worth.cmp(&a.net_worth).then(a.player.cmp(&b.player)));
    standings
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(seed: u64, turns: u32) -> AutoplayReport {
        let config = AutoplayConfig {
            seed,
            max_turns: turns,
            ..AutoplayConfig::default()
        };
        run_autoplay(&config, Board::classic(), Decks::default()).unwrap()
    }

    #[test]
    fn same_seed_replays_identically() {
        assert_eq!(run(7, 60), run(7, 60));
    }

    #[test]
    fn plays_the_requested_number_of_turns() {
        let report = run(3, 80);
        assert_eq!(report.turns_played, 80);
        assert_eq!(report.standings.len(), 4);
        assert!(report.properties_bought > 0);
        assert!(report.standings.windows(2).all(|pair| pair[0].net_worth >= pair[1].net_worth));
    }

    #[test]
    fn no_players_means_no_turns() {
        let config = AutoplayConfig {
            players: 0,
            ..AutoplayConfig::default()
        };
        let report = run_autoplay(&config, Board::classic(), Decks::default()).unwrap();
        assert_eq!(report.turns_played, 0);
        assert!(report.standings.is_empty());
    }
}

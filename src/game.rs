use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, info, warn};

use crate::action_cards::{apply_card, CardOutcome, Decks};
use crate::auction::{Auction, AuctionOutcome};
use crate::board::{Board, Tile};
use crate::command::Command;
use crate::config::GameConfig;
use crate::dice::{DiceRoll, DiceSource, RandomDice};
use crate::error::{RuleError, RuleResult};
use crate::event::{Event, JailRelease};
use crate::player::{player, player_mut, transfer, Player, PlayerId};
use crate::property::{Downgrade, Estates, PropertyType, Upgrade};
use crate::sync::{apply_snapshot, PlayerSnapshot, SnapshotReport};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TurnPhase {
    AwaitingRoll,
    /// Waiting for the presentation layer to report the movement as finished.
    Moving(Movement),
    ResolvingTile(Resolution),
    /// The current player may still manage properties before ending the turn.
    TurnEnded,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Movement {
    pub player: PlayerId,
    pub from: usize,
    pub steps: i32,
    pub award_go_bonus: bool,
    pub purpose: MovePurpose,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum MovePurpose {
    Roll,
    Card,
    ToJail,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Resolution {
    PurchaseOffer { tile: usize },
    Auction { tile: usize },
    UtilityRoll { tile: usize },
}

// everything a rejected command must leave untouched
struct Checkpoint {
    players: Vec<Player>,
    properties: Estates,
    phase: TurnPhase,
    auction: Auction,
    curr_player: usize,
    rent_paid_this_visit: Option<usize>,
    last_roll: Option<DiceRoll>,
    extra_roll: bool,
}

pub struct Game {
    config: GameConfig,
    board: Board,
    properties: Estates,
    players: Vec<Player>,
    decks: Decks,
    curr_player: usize,
    phase: TurnPhase,
    dice: Box<dyn DiceSource>,
    rng: StdRng,
    auction: Auction,
    // the tile the current visitor already paid rent on
    rent_paid_this_visit: Option<usize>,
    last_roll: Option<DiceRoll>,
    extra_roll: bool,
}

impl Game {

    pub fn new<S: Into<String>>(
        config: GameConfig,
        board: Board,
        decks: Decks,
        names: impl IntoIterator<Item = S>,
        dice: Box<dyn DiceSource>,
    ) -> Self {
        let players = names
            .into_iter()
            .enumerate()
            .map(|(idx, name)| {
                let mut player = Player::new(PlayerId(idx), name, config.starting_cash, config.dice_tries);
                player.position = board.index.go;
                player
            })
            .collect::<Vec<_>>();
        // card draws get their own stream so scripted dice never shift them
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed.rotate_left(32)),
            None => StdRng::from_entropy(),
        };
        info!(players = players.len(), tiles = board.len(), "game created");
        Self {
            properties: Estates::new(&board),
            auction: Auction::new(config.bid_increment),
            config,
            board,
            players,
            decks,
            curr_player: 0,
            phase: TurnPhase::AwaitingRoll,
            dice,
            rng,
            rent_paid_this_visit: None,
            last_roll: None,
            extra_roll: false,
        }
    }

    /// The classic board and decks with local random dice.
    pub fn classic<S: Into<String>>(config: GameConfig, names: impl IntoIterator<Item = S>) -> Self {
        let dice: Box<dyn DiceSource> = match config.seed {
            Some(seed) => Box::new(RandomDice::seeded(seed)),
            None => Box::new(RandomDice::from_entropy()),
        };
        Self::new(config, Board::classic(), Decks::default(), names, dice)
    }

    #[inline]
    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    #[inline]
    pub fn board(&self) -> &Board {
        &self.board
    }

    #[inline]
    pub fn properties(&self) -> &Estates {
        &self.properties
    }

    #[inline]
    pub fn players(&self) -> &[Player] {
        &self.players
    }

    pub fn player(&self, id: PlayerId) -> RuleResult<&Player> {
        player(&self.players, id)
    }

    pub fn current_player(&self) -> PlayerId {
        PlayerId(self.curr_player)
    }

    #[inline]
    pub fn phase(&self) -> &TurnPhase {
        &self.phase
    }

    #[inline]
    pub fn auction(&self) -> &Auction {
        &self.auction
    }

    pub fn last_roll(&self) -> Option<DiceRoll> {
        self.last_roll
    }

    /// Applies `command` for the current player (or current bidder).
    /// On error nothing changes apart from consumed dice and card draws.
    pub fn handle(&mut self, command: Command) -> RuleResult<Vec<Event>> {
        let checkpoint = self.checkpoint();
        debug!(?command, phase = ?self.phase, "handling command");
        match self.dispatch(&command) {
            Ok(mut events) => {
                self.flag_negative_balances(&checkpoint.players, &mut events);
                Ok(events)
            }
            Err(err) => {
                debug!(?command, %err, "command rejected");
                self.restore(checkpoint);
                Err(err)
            }
        }
    }

    /// Ends a running auction from outside, selling to the leader if anyone bid.
    pub fn close_auction(&mut self) -> RuleResult<Vec<Event>> {
        if !matches!(self.phase, TurnPhase::ResolvingTile(Resolution::Auction { .. })) {
            return Err(RuleError::NoAuction);
        }
        let outcome = self.auction.close().ok_or(RuleError::NoAuction)?;
        let mut events = Vec::new();
        self.settle_auction(outcome, &mut events)?;
        Ok(events)
    }

    /// Overwrites cash and dice tries of the named players from a remote snapshot.
    pub fn apply_player_snapshot(&mut self, snapshots: &[PlayerSnapshot]) -> (SnapshotReport, Vec<Event>) {
        let before = self.players.clone();
        let report = apply_snapshot(&mut self.players, snapshots);
        let mut events = report
            .updated
            .iter()
            .map(|id| {
                let player = &self.players[id.0];
                Event::PlayerSynced {
                    player: *id,
                    cash: player.cash,
                    tries: player.dice_tries,
                }
            })
            .collect::<Vec<_>>();
        self.flag_negative_balances(&before, &mut events);
        (report, events)
    }

    fn dispatch(&mut self, command: &Command) -> RuleResult<Vec<Event>> {
        let current = self.current()?;
        let mut events = Vec::new();
        match *command {
            Command::Roll => self.roll(current, &mut events)?,
            Command::PayJailFee => self.pay_jail_fee(current, &mut events)?,
            Command::MovementFinished => self.finish_movement(&mut events)?,
            Command::EndTurn => self.end_turn(current, &mut events)?,
            Command::Buy => {
                let tile = self.purchase_offer()?;
                let price = self.properties.buy(&self.board, &mut self.players, tile, current)?;
                events.push(Event::PropertyBought {
                    player: current,
                    tile,
                    price,
                });
                self.finish_landing();
            }
            Command::Decline => {
                let tile = self.purchase_offer()?;
                self.start_auction(current, tile, &mut events)?;
            }
            Command::Bid => {
                self.auction_tile()?;
                let bidder = self.auction.current_bidder().ok_or(RuleError::NoAuction)?;
                player(&self.players, bidder)?.require_funds(self.auction.next_bid())?;
                let (bid, outcome) = self.auction.place_bid()?;
                events.push(Event::BidPlaced {
                    player: bid.bidder,
                    amount: bid.amount,
                });
                if let Some(outcome) = outcome {
                    self.settle_auction(outcome, &mut events)?;
                }
            }
            Command::Pass => {
                self.auction_tile()?;
                let (passer, outcome) = self.auction.pass()?;
                events.push(Event::BidderPassed { player: passer });
                if let Some(outcome) = outcome {
                    self.settle_auction(outcome, &mut events)?;
                }
            }
            Command::RollForRent => self.roll_for_rent(current, &mut events)?,
            Command::Upgrade { tile } => {
                self.require_management(current, tile)?;
                match self.properties.build(&self.board, &mut self.players, tile, current)? {
                    Upgrade::House { houses, cost } => events.push(Event::HouseBuilt { tile, houses, cost }),
                    Upgrade::Hotel { cost } => events.push(Event::HotelBuilt { tile, cost }),
                }
            }
            Command::Downgrade { tile } => {
                self.require_management(current, tile)?;
                match self.properties.downgrade(&self.board, &mut self.players, tile)? {
                    Downgrade::House { houses, refund } => events.push(Event::HouseSold { tile, houses, refund }),
                    Downgrade::Hotel { refund } => events.push(Event::HotelSold { tile, refund }),
                }
            }
            Command::Mortgage { tile } => {
                self.require_management(current, tile)?;
                let value = self.properties.mortgage(&self.board, &mut self.players, tile)?;
                events.push(Event::Mortgaged { tile, value });
            }
            Command::Unmortgage { tile } => {
                self.require_management(current, tile)?;
                let cost = self.properties.unmortgage(&self.board, &mut self.players, tile)?;
                events.push(Event::Unmortgaged { tile, cost });
            }
            Command::Sell { tile } => {
                self.require_management(current, tile)?;
                let proceeds = self.properties.sell(&self.board, &mut self.players, tile)?;
                events.push(Event::PropertySold {
                    player: current,
                    tile,
                    proceeds,
                });
            }
        }
        Ok(events)
    }

    fn current(&self) -> RuleResult<PlayerId> {
        let id = PlayerId(self.curr_player);
        player(&self.players, id)?;
        Ok(id)
    }

    fn wrong_phase(&self) -> RuleError {
        RuleError::WrongPhase {
            phase: self.phase.clone(),
        }
    }

    fn roll(&mut self, current: PlayerId, events: &mut Vec<Event>) -> RuleResult<()> {
        if self.phase != TurnPhase::AwaitingRoll {
            return Err(self.wrong_phase());
        }
        if self.players[current.0].dice_tries == 0 {
            return Err(RuleError::NoTriesLeft { player: current });
        }
        let roll = self.dice.roll()?;
        self.last_roll = Some(roll);
        events.push(Event::DiceRolled {
            player: current,
            first: roll.first,
            second: roll.second,
        });
        let player = &mut self.players[current.0];
        player.dice_tries -= 1;
        let steps = roll.sum() as i32;

        if !player.in_jail() {
            self.extra_roll = self.config.doubles_grant_extra_roll && roll.is_double();
            self.start_movement(current, steps, true, MovePurpose::Roll, events);
            return Ok(());
        }

        let release = if player.jail_free_cards > 0 {
            player.jail_free_cards -= 1;
            Some(JailRelease::Card)
        } else if roll.is_double() {
            Some(JailRelease::Doubles)
        } else if player.jail_turns <= 1 {
            Some(JailRelease::SentenceServed)
        } else {
            None
        };
        match release {
            Some(reason) => {
                player.leave_jail();
                info!(player = %player.name, ?reason, "left jail");
                events.push(Event::JailLeft { player: current, reason });
                self.start_movement(current, steps, true, MovePurpose::Roll, events);
            }
            None => {
                player.jail_turns -= 1;
                info!(player = %player.name, turns_left = player.jail_turns, "stays in jail");
                events.push(Event::StayedInJail {
                    player: current,
                    turns_left: player.jail_turns,
                });
                self.phase = TurnPhase::TurnEnded;
            }
        }
        Ok(())
    }

    fn pay_jail_fee(&mut self, current: PlayerId, events: &mut Vec<Event>) -> RuleResult<()> {
        if self.phase != TurnPhase::AwaitingRoll {
            return Err(self.wrong_phase());
        }
        let fee = self.config.jail_fee;
        let player = player_mut(&mut self.players, current)?;
        if !player.in_jail() {
            return Err(RuleError::NotInJail { player: current });
        }
        player.require_funds(fee)?;
        player.cash -= fee;
        player.leave_jail();
        info!(player = %player.name, fee, "paid jail fee");
        events.push(Event::JailLeft {
            player: current,
            reason: JailRelease::Fee,
        });
        Ok(())
    }

    fn start_movement(&mut self, player: PlayerId, steps: i32, award_go_bonus: bool, purpose: MovePurpose, events: &mut Vec<Event>) {
        let from = self.players[player.0].position;
        events.push(Event::MovementStarted { player, from, steps });
        debug!(%player, from, steps, ?purpose, "movement started");
        self.phase = TurnPhase::Moving(Movement {
            player,
            from,
            steps,
            award_go_bonus,
            purpose,
        });
    }

    fn finish_movement(&mut self, events: &mut Vec<Event>) -> RuleResult<()> {
        let TurnPhase::Moving(movement) = self.phase.clone() else {
            return Err(self.wrong_phase());
        };
        let go = self.board.index.go;
        let go_bonus = self.config.go_bonus;
        let forward = movement.steps > 0;
        let mut position = movement.from;
        for _ in 0..movement.steps.unsigned_abs() {
            position = self.board.offset(position, if forward { 1 } else { -1 });
            if movement.award_go_bonus && position == go {
                self.players[movement.player.0].cash += go_bonus;
                events.push(Event::PassedGo {
                    player: movement.player,
                    bonus: go_bonus,
                });
            }
        }
        if movement.steps != 0 {
            self.rent_paid_this_visit = None;
        }
        self.players[movement.player.0].position = position;
        events.push(Event::Moved {
            player: movement.player,
            tile: position,
        });

        if movement.purpose == MovePurpose::ToJail {
            let turns = self.config.jail_turns;
            let player = &mut self.players[movement.player.0];
            player.enter_jail(turns);
            info!(player = %player.name, turns = player.jail_turns, "sent to jail");
            events.push(Event::JailEntered {
                player: movement.player,
                turns: player.jail_turns,
            });
            self.extra_roll = false;
            self.phase = TurnPhase::TurnEnded;
            return Ok(());
        }
        self.resolve_tile(movement.player, position, events)
    }

    fn resolve_tile(&mut self, current: PlayerId, tile: usize, events: &mut Vec<Event>) -> RuleResult<()> {
        let def = self.board.tile(tile).cloned().ok_or(RuleError::UnknownTile(tile))?;
        debug!(%current, tile, name = def.name(), "resolving tile");
        match def {
            Tile::Property { property } => match self.properties.owner_of(tile) {
                None => {
                    events.push(Event::PurchaseOffered {
                        player: current,
                        tile,
                        price: property.price,
                    });
                    self.phase = TurnPhase::ResolvingTile(Resolution::PurchaseOffer { tile });
                }
                Some(owner) if owner == current || self.rent_paid_this_visit == Some(tile) => {
                    self.finish_landing();
                }
                Some(owner) => {
                    if property.ty == PropertyType::Utility {
                        events.push(Event::UtilityRollRequested { player: current, tile });
                        self.phase = TurnPhase::ResolvingTile(Resolution::UtilityRoll { tile });
                    } else {
                        let rent = self.properties.rent(&self.board, tile)?;
                        self.pay_rent(current, owner, tile, rent, events)?;
                        self.finish_landing();
                    }
                }
            },
            Tile::Tax { rule, .. } => {
                let player = &mut self.players[current.0];
                let amount = rule.amount_for(player.cash);
                player.cash -= amount;
                info!(player = %player.name, amount, "tax paid");
                events.push(Event::TaxPaid { player: current, amount });
                self.finish_landing();
            }
            Tile::DrawCard { kind, .. } => {
                let card = self.decks.stack(kind).draw(&mut self.rng)?.clone();
                events.push(Event::CardDrawn {
                    player: current,
                    deck: kind,
                    name: card.name.clone(),
                });
                match apply_card(&card, current, &mut self.players, &self.board)? {
                    CardOutcome::Settled => self.finish_landing(),
                    CardOutcome::Move { steps } => self.start_movement(current, steps, true, MovePurpose::Card, events),
                    CardOutcome::GoToJail => self.send_to_jail(current, events),
                }
            }
            Tile::GoToJail { .. } => self.send_to_jail(current, events),
            Tile::Go { .. } | Tile::Jail { .. } | Tile::FreeParking { .. } => self.finish_landing(),
        }
        Ok(())
    }

    fn send_to_jail(&mut self, player: PlayerId, events: &mut Vec<Event>) {
        let from = self.players[player.0].position;
        let steps = self.board.forward_distance(from, self.board.index.jail) as i32;
        self.start_movement(player, steps, false, MovePurpose::ToJail, events);
    }

    fn pay_rent(&mut self, from: PlayerId, to: PlayerId, tile: usize, amount: i64, events: &mut Vec<Event>) -> RuleResult<()> {
        transfer(&mut self.players, from, to, amount)?;
        self.rent_paid_this_visit = Some(tile);
        info!(%from, %to, tile, amount, "rent paid");
        events.push(Event::RentPaid { from, to, tile, amount });
        Ok(())
    }

    fn roll_for_rent(&mut self, current: PlayerId, events: &mut Vec<Event>) -> RuleResult<()> {
        let TurnPhase::ResolvingTile(Resolution::UtilityRoll { tile }) = self.phase else {
            return Err(self.wrong_phase());
        };
        let owner = self.properties.owner_of(tile).ok_or(RuleError::NotOwned)?;
        let roll = self.dice.roll()?;
        events.push(Event::DiceRolled {
            player: current,
            first: roll.first,
            second: roll.second,
        });
        let rent = self.properties.calculate_rent(&self.board, tile, roll.sum())?;
        self.pay_rent(current, owner, tile, rent, events)?;
        self.finish_landing();
        Ok(())
    }

    // the landing is fully resolved, either roll again after doubles or wait for the turn to end
    fn finish_landing(&mut self) {
        self.phase = if std::mem::take(&mut self.extra_roll) {
            TurnPhase::AwaitingRoll
        } else {
            TurnPhase::TurnEnded
        };
    }

    fn purchase_offer(&self) -> RuleResult<usize> {
        match self.phase {
            TurnPhase::ResolvingTile(Resolution::PurchaseOffer { tile }) => Ok(tile),
            _ => Err(self.wrong_phase()),
        }
    }

    fn auction_tile(&self) -> RuleResult<usize> {
        match self.phase {
            TurnPhase::ResolvingTile(Resolution::Auction { tile }) => Ok(tile),
            _ => Err(self.wrong_phase()),
        }
    }

    fn start_auction(&mut self, decliner: PlayerId, tile: usize, events: &mut Vec<Event>) -> RuleResult<()> {
        let bidders = self
            .players
            .iter()
            .map(|player| player.id)
            .filter(|id| *id != decliner)
            .collect::<Vec<_>>();
        info!(tile, bidders = bidders.len(), "auction started");
        events.push(Event::AuctionStarted {
            tile,
            bidders: bidders.clone(),
        });
        self.phase = TurnPhase::ResolvingTile(Resolution::Auction { tile });
        if let Some(outcome) = self.auction.start(tile, bidders)? {
            self.settle_auction(outcome, events)?;
        }
        Ok(())
    }

    fn settle_auction(&mut self, outcome: AuctionOutcome, events: &mut Vec<Event>) -> RuleResult<()> {
        match outcome {
            AuctionOutcome::Sold { tile, winner, price } => {
                self.properties.award(&self.board, &mut self.players, tile, winner, price)?;
                info!(%winner, tile, price, "auction won");
                events.push(Event::AuctionWon {
                    player: winner,
                    tile,
                    price,
                });
            }
            AuctionOutcome::Unsold { tile } => {
                info!(tile, "auction closed without bids");
                events.push(Event::AuctionUnsold { tile });
            }
        }
        self.finish_landing();
        Ok(())
    }

    fn require_management(&self, current: PlayerId, tile: usize) -> RuleResult<()> {
        if !matches!(self.phase, TurnPhase::AwaitingRoll | TurnPhase::TurnEnded) {
            return Err(self.wrong_phase());
        }
        if self.board.tile(tile).is_none() {
            return Err(RuleError::UnknownTile(tile));
        }
        let state = self.properties.get(tile).ok_or(RuleError::NotAProperty(tile))?;
        match state.owner {
            None => Err(RuleError::NotOwned),
            Some(owner) if owner != current => Err(RuleError::NotOwner { player: current }),
            Some(_) => Ok(()),
        }
    }

    fn end_turn(&mut self, current: PlayerId, events: &mut Vec<Event>) -> RuleResult<()> {
        if !matches!(self.phase, TurnPhase::AwaitingRoll | TurnPhase::TurnEnded) {
            return Err(self.wrong_phase());
        }
        events.push(Event::TurnEnded { player: current });
        self.curr_player = (self.curr_player + 1) % self.players.len();
        self.rent_paid_this_visit = None;
        self.last_roll = None;
        self.extra_roll = false;
        self.phase = TurnPhase::AwaitingRoll;
        let next = &mut self.players[self.curr_player];
        next.dice_tries = self.config.dice_tries;
        info!(player = %next.name, "turn started");
        events.push(Event::TurnStarted { player: next.id });
        Ok(())
    }

    fn flag_negative_balances(&self, before: &[Player], events: &mut Vec<Event>) {
        for (old, new) in before.iter().zip(self.players.iter()) {
            if new.cash < 0 && new.cash < old.cash {
                warn!(player = %new.name, cash = new.cash, "balance went negative");
                events.push(Event::BalanceNegative {
                    player: new.id,
                    cash: new.cash,
                });
            }
        }
    }

    fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            players: self.players.clone(),
            properties: self.properties.clone(),
            phase: self.phase.clone(),
            auction: self.auction.clone(),
            curr_player: self.curr_player,
            rent_paid_this_visit: self.rent_paid_this_visit,
            last_roll: self.last_roll,
            extra_roll: self.extra_roll,
        }
    }

    fn restore(&mut self, checkpoint: Checkpoint) {
        self.players = checkpoint.players;
        self.properties = checkpoint.properties;
        self.phase = checkpoint.phase;
        self.auction = checkpoint.auction;
        self.curr_player = checkpoint.curr_player;
        self.rent_paid_this_visit = checkpoint.rent_paid_this_visit;
        self.last_roll = checkpoint.last_roll;
        self.extra_roll = checkpoint.extra_roll;
    }

}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action_cards::{ActionCard, CardEffect, CardKind, CardStack};
    use crate::dice::ScriptedDice;
    use crate::error::ErrorKind;
    use crate::player::total_cash;

    const BALTIC: usize = 3;
    const ORIENTAL: usize = 6;
    const ELECTRIC: usize = 12;

    fn game_with(config: GameConfig, rolls: &[(u8, u8)]) -> Game {
        Game::new(
            config,
            Board::classic(),
            Decks::default(),
            ["Ada", "Bo", "Cy"],
            Box::new(ScriptedDice::new(rolls.iter().copied())),
        )
    }

    fn game(rolls: &[(u8, u8)]) -> Game {
        game_with(GameConfig::default(), rolls)
    }

    fn single_card_decks(effect: CardEffect) -> Decks {
        let card = ActionCard {
            name: "only".to_string(),
            description: String::new(),
            effect,
        };
        Decks {
            chance: CardStack::new(CardKind::Chance, vec![card.clone()]),
            community_chest: CardStack::new(CardKind::CommunityChest, vec![card]),
        }
    }

    fn roll_and_land(game: &mut Game) -> Vec<Event> {
        let mut events = game.handle(Command::Roll).unwrap();
        events.extend(game.handle(Command::MovementFinished).unwrap());
        events
    }

    #[test]
    fn roll_waits_for_movement_then_offers_purchase() {
        let mut game = game(&[(1, 2)]);
        let events = game.handle(Command::Roll).unwrap();
        assert_eq!(events[1], Event::MovementStarted { player: PlayerId(0), from: 0, steps: 3 });
        assert!(matches!(game.phase(), TurnPhase::Moving(_)));
        assert_eq!(game.players()[0].position, 0);
        let err = game.handle(Command::Roll).unwrap_err();
        assert!(matches!(err, RuleError::WrongPhase { .. }));
        let events = game.handle(Command::MovementFinished).unwrap();
        assert!(events.contains(&Event::PurchaseOffered { player: PlayerId(0), tile: BALTIC, price: 60 }));
        assert_eq!(game.phase(), &TurnPhase::ResolvingTile(Resolution::PurchaseOffer { tile: BALTIC }));
        game.handle(Command::Buy).unwrap();
        assert_eq!(game.properties().owner_of(BALTIC), Some(PlayerId(0)));
        assert_eq!(game.players()[0].cash, 1440);
        assert_eq!(game.phase(), &TurnPhase::TurnEnded);
    }

    #[test]
    fn rolling_consumes_tries() {
        let mut game = game(&[(1, 2)]);
        game.players[0].dice_tries = 0;
        assert_eq!(game.handle(Command::Roll), Err(RuleError::NoTriesLeft { player: PlayerId(0) }));
        game.players[0].dice_tries = 3;
        game.handle(Command::Roll).unwrap();
        assert_eq!(game.players()[0].dice_tries, 2);
    }

    #[test]
    fn rejected_command_leaves_state_untouched() {
        let mut game = game(&[(1, 2)]);
        roll_and_land(&mut game);
        game.players[0].cash = 10;
        let before = game.players().to_vec();
        let err = game.handle(Command::Buy).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidOperation);
        assert_eq!(game.players(), before.as_slice());
        assert_eq!(game.phase(), &TurnPhase::ResolvingTile(Resolution::PurchaseOffer { tile: BALTIC }));
    }

    #[test]
    fn passing_go_pays_the_bonus_once() {
        let mut game = game(&[(1, 2)]);
        game.players[0].position = 38;
        let events = roll_and_land(&mut game);
        assert_eq!(events.iter().filter(|e| matches!(e, Event::PassedGo { .. })).count(), 1);
        assert_eq!(game.players()[0].position, 1);
        assert_eq!(game.players()[0].cash, 1700);
    }

    #[test]
    fn landing_exactly_on_go_pays_the_bonus() {
        let mut game = game(&[(1, 3)]);
        game.players[0].position = 36;
        let events = roll_and_land(&mut game);
        assert_eq!(events.iter().filter(|e| matches!(e, Event::PassedGo { .. })).count(), 1);
        assert_eq!(game.players()[0].position, 0);
        assert_eq!(game.players()[0].cash, 1700);
        assert_eq!(game.phase(), &TurnPhase::TurnEnded);
    }

    #[test]
    fn rent_is_charged_once_per_visit() {
        let mut game = game(&[(1, 2)]);
        game.properties.award(&game.board, &mut game.players, BALTIC, PlayerId(1), 0).unwrap();
        let events = roll_and_land(&mut game);
        assert!(events.contains(&Event::RentPaid { from: PlayerId(0), to: PlayerId(1), tile: BALTIC, amount: 4 }));
        let mut events = Vec::new();
        game.resolve_tile(PlayerId(0), BALTIC, &mut events).unwrap();
        assert!(events.is_empty());
        assert_eq!(game.players()[0].cash, 1496);
        assert_eq!(game.players()[1].cash, 1504);
    }

    #[test]
    fn utility_rent_waits_for_secondary_roll() {
        let mut game = game(&[(6, 6), (3, 4)]);
        game.properties.award(&game.board, &mut game.players, ELECTRIC, PlayerId(1), 0).unwrap();
        let events = roll_and_land(&mut game);
        assert!(events.contains(&Event::UtilityRollRequested { player: PlayerId(0), tile: ELECTRIC }));
        assert_eq!(game.handle(Command::EndTurn).unwrap_err().kind(), ErrorKind::InvalidOperation);
        let events = game.handle(Command::RollForRent).unwrap();
        assert!(events.contains(&Event::RentPaid { from: PlayerId(0), to: PlayerId(1), tile: ELECTRIC, amount: 28 }));
        assert_eq!(game.phase(), &TurnPhase::TurnEnded);
    }

    #[test]
    fn tax_tile_uses_income_rule() {
        let mut game = game(&[(1, 3)]);
        game.players[0].cash = 3000;
        let events = roll_and_land(&mut game);
        assert!(events.contains(&Event::TaxPaid { player: PlayerId(0), amount: 300 }));
        assert_eq!(game.players()[0].cash, 2700);
    }

    #[test]
    fn go_to_jail_tile_relocates_without_bonus() {
        let mut game = game(&[(2, 3)]);
        game.players[0].position = 25;
        let events = roll_and_land(&mut game);
        assert!(matches!(
            game.phase(),
            TurnPhase::Moving(Movement { purpose: MovePurpose::ToJail, award_go_bonus: false, .. })
        ));
        assert!(!events.iter().any(|e| matches!(e, Event::PassedGo { .. })));
        let events = game.handle(Command::MovementFinished).unwrap();
        assert!(events.contains(&Event::JailEntered { player: PlayerId(0), turns: 3 }));
        assert!(!events.iter().any(|e| matches!(e, Event::PassedGo { .. })));
        assert_eq!(game.players()[0].position, 10);
        assert_eq!(game.players()[0].cash, 1500);
        assert_eq!(game.phase(), &TurnPhase::TurnEnded);
    }

    #[test]
    fn card_move_resolves_destination() {
        let mut game = Game::new(
            GameConfig::default(),
            Board::classic(),
            single_card_decks(CardEffect::MoveTiles { tiles: -3 }),
            ["Ada", "Bo"],
            Box::new(ScriptedDice::new([(3, 4)])),
        );
        roll_and_land(&mut game);
        assert!(matches!(game.phase(), TurnPhase::Moving(Movement { steps: -3, purpose: MovePurpose::Card, .. })));
        let events = game.handle(Command::MovementFinished).unwrap();
        assert!(events.contains(&Event::Moved { player: PlayerId(0), tile: 4 }));
        assert!(events.contains(&Event::TaxPaid { player: PlayerId(0), amount: 200 }));
    }

    #[test]
    fn pay_all_players_card_conserves_money() {
        let mut game = Game::new(
            GameConfig::default(),
            Board::classic(),
            single_card_decks(CardEffect::PayAllPlayers { amount: 50 }),
            ["Ada", "Bo", "Cy"],
            Box::new(ScriptedDice::new([(3, 4)])),
        );
        let total = total_cash(game.players());
        roll_and_land(&mut game);
        assert_eq!(total_cash(game.players()), total);
        assert_eq!(game.players()[0].cash, 1400);
    }

    #[test]
    fn declining_starts_auction_among_others() {
        let mut game = game(&[(1, 2)]);
        roll_and_land(&mut game);
        let events = game.handle(Command::Decline).unwrap();
        assert!(events.contains(&Event::AuctionStarted { tile: BALTIC, bidders: vec![PlayerId(1), PlayerId(2)] }));
        assert_eq!(game.auction().current_bidder(), Some(PlayerId(1)));
        game.handle(Command::Bid).unwrap();
        let events = game.handle(Command::Pass).unwrap();
        assert!(events.contains(&Event::AuctionWon { player: PlayerId(1), tile: BALTIC, price: 10 }));
        assert_eq!(game.players()[1].cash, 1490);
        assert_eq!(game.phase(), &TurnPhase::TurnEnded);
    }

    #[test]
    fn bidding_requires_funds_for_the_next_bid() {
        let mut game = game(&[(1, 2)]);
        roll_and_land(&mut game);
        game.handle(Command::Decline).unwrap();
        game.players[1].cash = 5;
        assert_eq!(
            game.handle(Command::Bid),
            Err(RuleError::InsufficientFunds { needed: 10, available: 5 })
        );
        assert_eq!(game.auction().current_bidder(), Some(PlayerId(1)));
    }

    #[test]
    fn external_close_settles_auction() {
        let mut game = game(&[(1, 2)]);
        roll_and_land(&mut game);
        game.handle(Command::Decline).unwrap();
        let events = game.close_auction().unwrap();
        assert_eq!(events, vec![Event::AuctionUnsold { tile: BALTIC }]);
        assert_eq!(game.properties().owner_of(BALTIC), None);
        assert_eq!(game.close_auction(), Err(RuleError::NoAuction));
    }

    #[test]
    fn management_requires_ownership_and_quiet_phase() {
        let mut game = game(&[(1, 2)]);
        game.properties.award(&game.board, &mut game.players, ORIENTAL, PlayerId(1), 0).unwrap();
        assert_eq!(
            game.handle(Command::Mortgage { tile: ORIENTAL }),
            Err(RuleError::NotOwner { player: PlayerId(0) })
        );
        assert_eq!(game.handle(Command::Mortgage { tile: 0 }), Err(RuleError::NotAProperty(0)));
        assert_eq!(game.handle(Command::Sell { tile: 99 }).unwrap_err().kind(), ErrorKind::NotFound);
        game.handle(Command::Roll).unwrap();
        assert!(matches!(game.handle(Command::Mortgage { tile: ORIENTAL }), Err(RuleError::WrongPhase { .. })));
    }

    #[test]
    fn end_turn_advances_and_resets_tries() {
        let mut game = game(&[(1, 2)]);
        roll_and_land(&mut game);
        game.handle(Command::Buy).unwrap();
        game.players[1].dice_tries = 0;
        let events = game.handle(Command::EndTurn).unwrap();
        assert_eq!(events, vec![Event::TurnEnded { player: PlayerId(0) }, Event::TurnStarted { player: PlayerId(1) }]);
        assert_eq!(game.current_player(), PlayerId(1));
        assert_eq!(game.players()[1].dice_tries, 3);
        assert_eq!(game.phase(), &TurnPhase::AwaitingRoll);
    }

    #[test]
    fn doubles_grant_extra_roll_when_enabled() {
        let config = GameConfig {
            doubles_grant_extra_roll: true,
            ..GameConfig::default()
        };
        let mut game = game_with(config, &[(3, 3), (1, 2)]);
        roll_and_land(&mut game);
        game.handle(Command::Decline).unwrap();
        game.handle(Command::Pass).unwrap();
        game.handle(Command::Pass).unwrap();
        assert_eq!(game.phase(), &TurnPhase::AwaitingRoll);
        assert_eq!(game.current_player(), PlayerId(0));
        roll_and_land(&mut game);
        assert_eq!(game.players()[0].position, 9);
    }

    #[test]
    fn doubles_end_turn_by_default() {
        let mut game = game(&[(3, 3)]);
        roll_and_land(&mut game);
        game.handle(Command::Buy).unwrap();
        assert_eq!(game.phase(), &TurnPhase::TurnEnded);
    }

    #[test]
    fn jail_fee_releases_before_rolling() {
        let mut game = game(&[]);
        assert_eq!(game.handle(Command::PayJailFee), Err(RuleError::NotInJail { player: PlayerId(0) }));
        game.players[0].enter_jail(3);
        let events = game.handle(Command::PayJailFee).unwrap();
        assert_eq!(events, vec![Event::JailLeft { player: PlayerId(0), reason: JailRelease::Fee }]);
        assert_eq!(game.players()[0].cash, 1450);
        assert_eq!(game.phase(), &TurnPhase::AwaitingRoll);
    }

    #[test]
    fn jail_free_card_takes_priority_over_doubles() {
        let mut game = game(&[(3, 3)]);
        game.players[0].position = 10;
        game.players[0].enter_jail(3);
        game.players[0].jail_free_cards = 1;
        let events = game.handle(Command::Roll).unwrap();
        assert!(events.contains(&Event::JailLeft { player: PlayerId(0), reason: JailRelease::Card }));
        assert_eq!(game.players()[0].jail_free_cards, 0);
        assert!(matches!(game.phase(), TurnPhase::Moving(_)));
    }

    #[test]
    fn snapshot_updates_and_flags_negative_balance() {
        let mut game = game(&[]);
        let (report, events) = game.apply_player_snapshot(&[PlayerSnapshot {
            name: "Bo".to_string(),
            cash: -40,
            tries: 2,
        }]);
        assert_eq!(report.updated, vec![PlayerId(1)]);
        assert!(events.contains(&Event::PlayerSynced { player: PlayerId(1), cash: -40, tries: 2 }));
        assert!(events.contains(&Event::BalanceNegative { player: PlayerId(1), cash: -40 }));
    }
}

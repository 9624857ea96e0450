use serde::{Deserialize, Serialize};

use crate::action_cards::CardKind;
use crate::player::PlayerId;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum JailRelease {
    Card,
    Doubles,
    SentenceServed,
    Fee,
}

/// Everything the presentation layer may want to show. Fully serializable.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    // Turn flow
    TurnStarted { player: PlayerId },
    DiceRolled { player: PlayerId, first: u8, second: u8 },
    TurnEnded { player: PlayerId },

    // Movement
    /// The controller waits for `MovementFinished` before resolving the destination.
    MovementStarted { player: PlayerId, from: usize, steps: i32 },
    PassedGo { player: PlayerId, bonus: i64 },
    Moved { player: PlayerId, tile: usize },

    // Purchases and auctions
    PurchaseOffered { player: PlayerId, tile: usize, price: i64 },
    PropertyBought { player: PlayerId, tile: usize, price: i64 },
    AuctionStarted { tile: usize, bidders: Vec<PlayerId> },
    BidPlaced { player: PlayerId, amount: i64 },
    BidderPassed { player: PlayerId },
    AuctionWon { player: PlayerId, tile: usize, price: i64 },
    AuctionUnsold { tile: usize },

    // Tile effects
    RentPaid { from: PlayerId, to: PlayerId, tile: usize, amount: i64 },
    UtilityRollRequested { player: PlayerId, tile: usize },
    TaxPaid { player: PlayerId, amount: i64 },
    CardDrawn { player: PlayerId, deck: CardKind, name: String },

    // Jail
    JailEntered { player: PlayerId, turns: u32 },
    JailLeft { player: PlayerId, reason: JailRelease },
    StayedInJail { player: PlayerId, turns_left: u32 },

    // Property management
    HouseBuilt { tile: usize, houses: u8, cost: i64 },
    HotelBuilt { tile: usize, cost: i64 },
    HouseSold { tile: usize, houses: u8, refund: i64 },
    HotelSold { tile: usize, refund: i64 },
    Mortgaged { tile: usize, value: i64 },
    Unmortgaged { tile: usize, cost: i64 },
    PropertySold { player: PlayerId, tile: usize, proceeds: i64 },

    // Ledger
    BalanceNegative { player: PlayerId, cash: i64 },
    PlayerSynced { player: PlayerId, cash: i64, tries: u32 },
}

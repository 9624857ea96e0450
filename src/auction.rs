//! Sequential bidding for a property the lander declined to buy.
//!
//! Bidders take turns in circular order. A bid raises the price by a fixed
//! increment and hands the turn to the next bidder. A pass drops the bidder
//! from the auction for good. The auction closes once nobody is left, or once
//! the last bidder standing already holds the high bid.

use std::collections::BTreeSet;

use tracing::debug;

use crate::error::{RuleError, RuleResult};
use crate::player::PlayerId;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum AuctionPhase {
    Idle,
    Bidding,
    Closed,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum AuctionOutcome {
    Sold {
        tile: usize,
        winner: PlayerId,
        price: i64,
    },
    Unsold {
        tile: usize,
    },
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Bid {
    pub bidder: PlayerId,
    pub amount: i64,
}

#[derive(Clone, Debug)]
pub struct Auction {
    phase: AuctionPhase,
    tile: usize,
    bidders: Vec<PlayerId>,
    current: usize,
    bid: i64,
    leader: Option<PlayerId>,
    passed: BTreeSet<PlayerId>,
    increment: i64,
}

impl Auction {

    pub fn new(increment: i64) -> Self {
        Self {
            phase: AuctionPhase::Idle,
            tile: 0,
            bidders: Vec::new(),
            current: 0,
            bid: 0,
            leader: None,
            passed: BTreeSet::new(),
            increment,
        }
    }

    #[inline]
    pub fn phase(&self) -> AuctionPhase {
        self.phase
    }

    pub fn tile(&self) -> Option<usize> {
        (self.phase == AuctionPhase::Bidding).then_some(self.tile)
    }

    pub fn bidders(&self) -> &[PlayerId] {
        &self.bidders
    }

    pub fn current_bid(&self) -> i64 {
        self.bid
    }

    pub fn leader(&self) -> Option<PlayerId> {
        self.leader
    }

    pub fn current_bidder(&self) -> Option<PlayerId> {
        match self.phase {
            AuctionPhase::Bidding => self.bidders.get(self.current).copied(),
            _ => None,
        }
    }

    /// The amount the current bidder would commit to by bidding.
    pub fn next_bid(&self) -> i64 {
        self.bid + self.increment
    }

    /// Opens bidding on `tile`. An empty bidder list closes the auction right away.
    pub fn start(&mut self, tile: usize, bidders: Vec<PlayerId>) -> RuleResult<Option<AuctionOutcome>> {
        if self.phase == AuctionPhase::Bidding {
            return Err(RuleError::AuctionInProgress);
        }
        self.phase = AuctionPhase::Bidding;
        self.tile = tile;
        self.bidders = bidders;
        self.current = 0;
        self.bid = 0;
        self.leader = None;
        self.passed.clear();
        debug!(tile, bidders = self.bidders.len(), "auction started");
        if self.bidders.is_empty() {
            return Ok(Some(self.finish()));
        }
        Ok(None)
    }

    pub fn place_bid(&mut self) -> RuleResult<(Bid, Option<AuctionOutcome>)> {
        let bidder = self.current_bidder().ok_or(RuleError::NoAuction)?;
        self.bid += self.increment;
        self.leader = Some(bidder);
        // a bid reopens the round for everyone still active
        self.passed.clear();
        let bid = Bid {
            bidder,
            amount: self.bid,
        };
        debug!(%bidder, amount = self.bid, "bid placed");
        self.advance();
        Ok((bid, self.settle_if_done()))
    }

    pub fn pass(&mut self) -> RuleResult<(PlayerId, Option<AuctionOutcome>)> {
        let bidder = self.current_bidder().ok_or(RuleError::NoAuction)?;
        self.bidders.remove(self.current);
        self.passed.insert(bidder);
        debug!(%bidder, "bidder passed");
        if !self.bidders.is_empty() {
            self.current %= self.bidders.len();
        }
        Ok((bidder, self.settle_if_done()))
    }

    /// Ends the auction from outside, selling to the leader if anyone bid.
    pub fn close(&mut self) -> Option<AuctionOutcome> {
        match self.phase {
            AuctionPhase::Bidding => Some(self.finish()),
            _ => None,
        }
    }

    fn advance(&mut self) {
        let len = self.bidders.len();
        self.current = (self.current + 1) % len;
        while self.passed.contains(&self.bidders[self.current]) {
            self.current = (self.current + 1) % len;
        }
    }

    fn settle_if_done(&mut self) -> Option<AuctionOutcome> {
        let done = match self.bidders.as_slice() {
            [] => true,
            [last] => self.leader == Some(*last),
            _ => false,
        };
        done.then(|| self.finish())
    }

    fn finish(&mut self) -> AuctionOutcome {
        let outcome = match self.leader {
            Some(winner) => AuctionOutcome::Sold {
                tile: self.tile,
                winner,
                price: self.bid,
            },
            None => AuctionOutcome::Unsold { tile: self.tile },
        };
        self.phase = AuctionPhase::Closed;
        self.bidders.clear();
        self.passed.clear();
        self.leader = None;
        self.bid = 0;
        self.current = 0;
        debug!(?outcome, "auction closed");
        outcome
    }

}

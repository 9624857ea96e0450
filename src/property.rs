use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::board::Board;
use crate::error::{RuleError, RuleResult};
use crate::player::{player, player_mut, Player, PlayerId};

pub const MAX_HOUSES: u8 = 4;
pub const RAILROAD_BASE_RENT: i64 = 25;
/// Unmortgage interest, in percent of the list price.
pub const MORTGAGE_INTEREST: i64 = 10;

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ColorGroup {
    Purple,
    LightBlue,
    Pink,
    Orange,
    Red,
    Yellow,
    Green,
    Blue,
    Railroads,
    Utilities,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyFrame {
    pub id: usize,
    pub name: String,
    pub price: i64,
    pub rent: i64,
    // rent with 1 to 4 houses
    pub house_rents: [i64; 4],
    pub hotel_rent: i64,
    pub group: ColorGroup,
    pub ty: PropertyType,
    #[serde(default = "default_house_cost")]
    pub house_cost: i64,
    #[serde(default = "default_hotel_cost")]
    pub hotel_cost: i64,
    #[serde(default = "default_utility_base")]
    pub utility_base_multiplier: i64,
    #[serde(default = "default_utility_full")]
    pub utility_full_multiplier: i64,
}

fn default_house_cost() -> i64 {
    100
}

fn default_hotel_cost() -> i64 {
    1000
}

fn default_utility_base() -> i64 {
    4
}

fn default_utility_full() -> i64 {
    10
}

impl PropertyFrame {

    /// `rents` is base rent, 1 to 4 houses, then hotel.
    pub fn street(id: usize, name: &str, group: ColorGroup, price: i64, rents: [i64; 6]) -> Self {
        Self {
            id,
            name: name.to_string(),
            price,
            rent: rents[0],
            house_rents: [rents[1], rents[2], rents[3], rents[4]],
            hotel_rent: rents[5],
            group,
            ty: PropertyType::Street,
            house_cost: default_house_cost(),
            hotel_cost: default_hotel_cost(),
            utility_base_multiplier: default_utility_base(),
            utility_full_multiplier: default_utility_full(),
        }
    }

    pub fn railroad(id: usize, name: &str) -> Self {
        Self {
            ty: PropertyType::Railroad,
            ..Self::street(id, name, ColorGroup::Railroads, 200, [RAILROAD_BASE_RENT, 0, 0, 0, 0, 0])
        }
    }

    pub fn utility(id: usize, name: &str) -> Self {
        Self {
            ty: PropertyType::Utility,
            ..Self::street(id, name, ColorGroup::Utilities, 150, [0; 6])
        }
    }

    /// Rent by house count, falling back to base rent with no houses.
    pub fn tier_rent(&self, houses: u8) -> i64 {
        match houses {
            1..=4 => self.house_rents[houses as usize - 1],
            _ => self.rent,
        }
    }

}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PropertyType {
    Street,
    Railroad,
    Utility,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyState {
    pub tile: usize,
    pub owner: Option<PlayerId>,
    pub houses: u8,
    // a hotel sits on top of 4 houses, which stay counted
    pub hotel: bool,
    pub mortgaged: bool,
}

impl PropertyState {

    fn unowned(tile: usize) -> Self {
        Self {
            tile,
            owner: None,
            houses: 0,
            hotel: false,
            mortgaged: false,
        }
    }

    #[inline]
    pub fn is_owned(&self) -> bool {
        self.owner.is_some()
    }

    #[inline]
    pub fn is_maxed_out(&self) -> bool {
        self.hotel
    }

}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Upgrade {
    House { houses: u8, cost: i64 },
    Hotel { cost: i64 },
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Downgrade {
    House { houses: u8, refund: i64 },
    Hotel { refund: i64 },
}

/// Mutable state of every ownable tile, keyed by board position.
#[derive(Clone, Debug, Default)]
pub struct Estates {
    states: BTreeMap<usize, PropertyState>,
}

impl Estates {

    pub fn new(board: &Board) -> Self {
        let states = board
            .property_indices()
            .map(|idx| (idx, PropertyState::unowned(idx)))
            .collect();
        Self { states }
    }

    pub fn get(&self, tile: usize) -> Option<&PropertyState> {
        self.states.get(&tile)
    }

    pub fn iter(&self) -> impl Iterator<Item = &PropertyState> {
        self.states.values()
    }

    pub fn owner_of(&self, tile: usize) -> Option<PlayerId> {
        self.states.get(&tile).and_then(|state| state.owner)
    }

    fn state(&self, tile: usize) -> RuleResult<&PropertyState> {
        self.states.get(&tile).ok_or(RuleError::NotAProperty(tile))
    }

    fn frame(board: &Board, tile: usize) -> RuleResult<&crate::property::PropertyFrame> {
        match board.tile(tile) {
            None => Err(RuleError::UnknownTile(tile)),
            Some(_) => board.property(tile).ok_or(RuleError::NotAProperty(tile)),
        }
    }

    fn owner(&self, tile: usize) -> RuleResult<PlayerId> {
        self.state(tile)?.owner.ok_or(RuleError::NotOwned)
    }

    pub fn count_owned(&self, board: &Board, owner: PlayerId, group: ColorGroup) -> usize {
        board
            .group_members(group)
            .filter(|idx| self.owner_of(*idx) == Some(owner))
            .count()
    }

    pub fn railroads_owned(&self, board: &Board, owner: PlayerId) -> usize {
        self.count_owned(board, owner, ColorGroup::Railroads)
    }

    pub fn utilities_owned(&self, board: &Board, owner: PlayerId) -> usize {
        self.count_owned(board, owner, ColorGroup::Utilities)
    }

    pub fn owns_full_group(&self, board: &Board, owner: PlayerId, group: ColorGroup) -> bool {
        let total = board.group_size(group);
        total > 0 && self.count_owned(board, owner, group) == total
    }

    fn group_states<'a>(&'a self, board: &'a Board, group: ColorGroup) -> impl Iterator<Item = &'a PropertyState> + 'a {
        board.group_members(group).filter_map(move |idx| self.states.get(&idx))
    }

    pub fn buy(&mut self, board: &Board, players: &mut [Player], tile: usize, buyer: PlayerId) -> RuleResult<i64> {
        let price = Self::frame(board, tile)?.price;
        if self.state(tile)?.is_owned() {
            return Err(RuleError::AlreadyOwned);
        }
        player(players, buyer)?.require_funds(price)?;
        self.award(board, players, tile, buyer, price)?;
        Ok(price)
    }

    /// Hands an unowned property to `owner` for `price` without a funds check.
    pub fn award(&mut self, board: &Board, players: &mut [Player], tile: usize, owner: PlayerId, price: i64) -> RuleResult<()> {
        let name = &Self::frame(board, tile)?.name;
        if self.state(tile)?.is_owned() {
            return Err(RuleError::AlreadyOwned);
        }
        let player = player_mut(players, owner)?;
        player.cash -= price;
        player.properties.insert(tile);
        if let Some(state) = self.states.get_mut(&tile) {
            state.owner = Some(owner);
        }
        info!(player = %player.name, property = %name, price, "property acquired");
        Ok(())
    }

    pub fn mortgage(&mut self, board: &Board, players: &mut [Player], tile: usize) -> RuleResult<i64> {
        let frame = Self::frame(board, tile)?;
        let owner = self.owner(tile)?;
        if self.group_states(board, frame.group).any(|state| state.houses > 0) {
            return Err(RuleError::HousesInGroup);
        }
        if self.state(tile)?.mortgaged {
            return Err(RuleError::AlreadyMortgaged);
        }
        let value = frame.price / 2;
        player_mut(players, owner)?.cash += value;
        if let Some(state) = self.states.get_mut(&tile) {
            state.mortgaged = true;
        }
        info!(property = %frame.name, value, "mortgaged");
        Ok(value)
    }

    pub fn unmortgage(&mut self, board: &Board, players: &mut [Player], tile: usize) -> RuleResult<i64> {
        let frame = Self::frame(board, tile)?;
        let owner = self.owner(tile)?;
        if !self.state(tile)?.mortgaged {
            return Err(RuleError::NotMortgaged);
        }
        let cost = frame.price / 2 + frame.price * MORTGAGE_INTEREST / 100;
        player_mut(players, owner)?.cash -= cost;
        if let Some(state) = self.states.get_mut(&tile) {
            state.mortgaged = false;
        }
        info!(property = %frame.name, cost, "unmortgaged");
        Ok(cost)
    }

    /// Returns the property to the bank for half its price. Buildings are not refunded.
    /// A mortgaged property has to be unmortgaged first.
    pub fn sell(&mut self, board: &Board, players: &mut [Player], tile: usize) -> RuleResult<i64> {
        let frame = Self::frame(board, tile)?;
        let owner = self.owner(tile)?;
        if self.state(tile)?.mortgaged {
            return Err(RuleError::Mortgaged);
        }
        let proceeds = frame.price / 2;
        let player = player_mut(players, owner)?;
        player.cash += proceeds;
        player.properties.remove(&tile);
        self.states.insert(tile, PropertyState::unowned(tile));
        info!(property = %frame.name, proceeds, "sold to the bank");
        Ok(proceeds)
    }

    /// Adds one building. A house costs its post-build count times the house cost.
    pub fn upgrade(&mut self, board: &Board, players: &mut [Player], tile: usize) -> RuleResult<Upgrade> {
        let frame = Self::frame(board, tile)?;
        let owner = self.owner(tile)?;
        let state = self.state(tile)?;
        if state.mortgaged {
            return Err(RuleError::Mortgaged);
        }
        if state.is_maxed_out() {
            return Err(RuleError::FullyUpgraded);
        }
        let upgrade = if state.houses < MAX_HOUSES {
            let houses = state.houses + 1;
            Upgrade::House {
                houses,
                cost: houses as i64 * frame.house_cost,
            }
        } else {
            Upgrade::Hotel { cost: frame.hotel_cost }
        };
        let player = player_mut(players, owner)?;
        let state = self.states.get_mut(&tile).ok_or(RuleError::NotAProperty(tile))?;
        match upgrade {
            Upgrade::House { houses, cost } => {
                state.houses = houses;
                player.cash -= cost;
                debug!(property = %frame.name, houses, cost, "house built");
            }
            Upgrade::Hotel { cost } => {
                state.hotel = true;
                player.cash -= cost;
                debug!(property = %frame.name, cost, "hotel built");
            }
        }
        Ok(upgrade)
    }

    /// Checks everything a player must satisfy before adding a building to `tile`.
    pub fn can_build(&self, board: &Board, players: &[Player], tile: usize, builder: PlayerId) -> RuleResult<()> {
        let frame = Self::frame(board, tile)?;
        if frame.ty != PropertyType::Street {
            return Err(RuleError::NotBuildable);
        }
        let state = self.state(tile)?;
        if state.owner != Some(builder) {
            return Err(RuleError::NotOwner { player: builder });
        }
        if state.mortgaged {
            return Err(RuleError::Mortgaged);
        }
        if state.is_maxed_out() {
            return Err(RuleError::FullyUpgraded);
        }
        if !self.owns_full_group(board, builder, frame.group) {
            return Err(RuleError::IncompleteGroup);
        }
        let min_houses = self
            .group_states(board, frame.group)
            .filter(|state| !state.hotel)
            .map(|state| state.houses)
            .min()
            .unwrap_or(0);
        if state.houses > min_houses {
            return Err(RuleError::UnevenBuilding);
        }
        let cost = if state.houses < MAX_HOUSES {
            (state.houses as i64 + 1) * frame.house_cost
        } else {
            frame.hotel_cost
        };
        player(players, builder)?.require_funds(cost)
    }

    pub fn build(&mut self, board: &Board, players: &mut [Player], tile: usize, builder: PlayerId) -> RuleResult<Upgrade> {
        self.can_build(board, players, tile, builder)?;
        self.upgrade(board, players, tile)
    }

    /// Removes a hotel (back to 4 houses) or else a single house.
    pub fn downgrade(&mut self, board: &Board, players: &mut [Player], tile: usize) -> RuleResult<Downgrade> {
        let frame = Self::frame(board, tile)?;
        let owner = self.owner(tile)?;
        let state = self.state(tile)?;
        if state.hotel {
            let refund = frame.hotel_cost / 2;
            player_mut(players, owner)?.cash += refund;
            if let Some(state) = self.states.get_mut(&tile) {
                state.hotel = false;
                state.houses = MAX_HOUSES;
            }
            debug!(property = %frame.name, refund, "hotel sold");
            return Ok(Downgrade::Hotel { refund });
        }
        if state.houses == 0 {
            return Err(RuleError::NoHouses);
        }
        self.sell_house(board, players, tile)
    }

    pub fn sell_house(&mut self, board: &Board, players: &mut [Player], tile: usize) -> RuleResult<Downgrade> {
        let frame = Self::frame(board, tile)?;
        let owner = self.owner(tile)?;
        let state = self.state(tile)?;
        let max_houses = self
            .group_states(board, frame.group)
            .filter(|state| state.owner == Some(owner))
            .map(|state| state.houses)
            .max()
            .unwrap_or(0);
        if state.houses < max_houses {
            return Err(RuleError::UnevenSelling);
        }
        if state.houses == 0 {
            return Err(RuleError::NoHouses);
        }
        let refund = frame.house_cost / 2;
        player_mut(players, owner)?.cash += refund;
        let state = self.states.get_mut(&tile).ok_or(RuleError::NotAProperty(tile))?;
        state.houses -= 1;
        debug!(property = %frame.name, houses = state.houses, refund, "house sold");
        Ok(Downgrade::House {
            houses: state.houses,
            refund,
        })
    }

    pub fn rent(&self, board: &Board, tile: usize) -> RuleResult<i64> {
        let frame = Self::frame(board, tile)?;
        let state = self.state(tile)?;
        if state.mortgaged {
            return Ok(0);
        }
        if state.hotel {
            return Ok(frame.hotel_rent);
        }
        if frame.group == ColorGroup::Railroads {
            let owned = state
                .owner
                .map(|owner| self.railroads_owned(board, owner))
                .unwrap_or(0);
            return Ok(match owned {
                0 => 0,
                n => RAILROAD_BASE_RENT << (n - 1),
            });
        }
        Ok(frame.tier_rent(state.houses))
    }

    /// Rent owed for landing on `tile`; utilities scale with `dice_roll`.
    pub fn calculate_rent(&self, board: &Board, tile: usize, dice_roll: u32) -> RuleResult<i64> {
        let frame = Self::frame(board, tile)?;
        if frame.ty != PropertyType::Utility {
            return self.rent(board, tile);
        }
        let state = self.state(tile)?;
        let Some(owner) = state.owner else {
            return Ok(0);
        };
        if state.mortgaged {
            return Ok(0);
        }
        let multiplier = if self.owns_full_group(board, owner, ColorGroup::Utilities) {
            frame.utility_full_multiplier
        } else {
            frame.utility_base_multiplier
        };
        Ok(dice_roll as i64 * multiplier)
    }

}

use thiserror::Error;

use crate::action_cards::CardKind;
use crate::game::TurnPhase;
use crate::player::PlayerId;

/// Broad classification of a rejected action.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// The action is not allowed in the current state. Nothing changed.
    InvalidOperation,
    /// A referenced player, tile or collaborator does not exist. Nothing changed.
    NotFound,
}

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum RuleError {
    #[error("property is already owned")]
    AlreadyOwned,
    #[error("insufficient funds: {needed} needed, {available} available")]
    InsufficientFunds { needed: i64, available: i64 },
    #[error("property has no owner")]
    NotOwned,
    #[error("{player} does not own this property")]
    NotOwner { player: PlayerId },
    #[error("property is already mortgaged")]
    AlreadyMortgaged,
    #[error("property is not mortgaged")]
    NotMortgaged,
    #[error("property is mortgaged")]
    Mortgaged,
    #[error("all houses in the color group must be sold first")]
    HousesInGroup,
    #[error("property is fully upgraded")]
    FullyUpgraded,
    #[error("no houses to sell on this property")]
    NoHouses,
    #[error("houses must be sold evenly across the color group")]
    UnevenSelling,
    #[error("houses must be built evenly across the color group")]
    UnevenBuilding,
    #[error("the whole color group must be owned to build")]
    IncompleteGroup,
    #[error("houses can only be built on streets")]
    NotBuildable,
    #[error("{player} has no dice tries left")]
    NoTriesLeft { player: PlayerId },
    #[error("{player} is not in jail")]
    NotInJail { player: PlayerId },
    #[error("command not allowed while {phase:?}")]
    WrongPhase { phase: TurnPhase },
    #[error("no auction is running")]
    NoAuction,
    #[error("an auction is already running")]
    AuctionInProgress,
    #[error("unknown tile {0}")]
    UnknownTile(usize),
    #[error("tile {0} is not a property")]
    NotAProperty(usize),
    #[error("unknown player {0}")]
    UnknownPlayer(PlayerId),
    #[error("the {0:?} deck is empty")]
    EmptyDeck(CardKind),
    #[error("dice source unavailable")]
    DiceUnavailable,
}

impl RuleError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RuleError::UnknownTile(_)
            | RuleError::NotAProperty(_)
            | RuleError::UnknownPlayer(_)
            | RuleError::EmptyDeck(_)
            | RuleError::DiceUnavailable => ErrorKind::NotFound,
            _ => ErrorKind::InvalidOperation,
        }
    }
}

pub type RuleResult<T> = Result<T, RuleError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_missing_references_as_not_found() {
        assert_eq!(RuleError::UnknownTile(99).kind(), ErrorKind::NotFound);
        assert_eq!(RuleError::DiceUnavailable.kind(), ErrorKind::NotFound);
        assert_eq!(RuleError::AlreadyOwned.kind(), ErrorKind::InvalidOperation);
        assert_eq!(RuleError::UnevenSelling.kind(), ErrorKind::InvalidOperation);
    }

    #[test]
    fn messages_carry_amounts() {
        let err = RuleError::InsufficientFunds { needed: 400, available: 120 };
        assert_eq!(err.to_string(), "insufficient funds: 400 needed, 120 available");
    }
}

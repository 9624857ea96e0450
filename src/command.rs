use serde::{Deserialize, Serialize};

/// Everything a player (or a bot) can ask the turn controller to do.
/// Commands always act on behalf of the current player or, during an auction, the current bidder.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Command {
    // Turn flow
    Roll,
    PayJailFee,
    /// The presentation layer finished animating the pending movement.
    MovementFinished,
    EndTurn,

    // Purchase decision
    Buy,
    Decline,

    // Auction
    Bid,
    Pass,

    /// Secondary roll owed when landing on someone else's utility.
    RollForRent,

    // Property management
    Upgrade { tile: usize },
    Downgrade { tile: usize },
    Mortgage { tile: usize },
    Unmortgage { tile: usize },
    Sell { tile: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commands_are_tagged_by_type() {
        let json = serde_json::to_string(&Command::Upgrade { tile: 3 }).unwrap();
        assert_eq!(json, r#"{"type":"Upgrade","tile":3}"#);
        let parsed: Command = serde_json::from_str(r#"{"type":"Roll"}"#).unwrap();
        assert_eq!(parsed, Command::Roll);
    }
}

use std::collections::VecDeque;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::error::{RuleError, RuleResult};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiceRoll {
    pub first: u8,
    pub second: u8,
}

impl DiceRoll {

    pub fn new(first: u8, second: u8) -> Self {
        Self { first, second }
    }

    #[inline]
    pub fn sum(&self) -> u32 {
        self.first as u32 + self.second as u32
    }

    #[inline]
    pub fn is_double(&self) -> bool {
        self.first == self.second
    }

}

/// Where dice outcomes come from: a local RNG, a remote server, a replay.
pub trait DiceSource {
    fn roll(&mut self) -> RuleResult<DiceRoll>;
}

pub struct RandomDice {
    rng: StdRng,
}

impl RandomDice {

    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

}

impl DiceSource for RandomDice {
    fn roll(&mut self) -> RuleResult<DiceRoll> {
        Ok(DiceRoll::new(self.rng.gen_range(1..=6), self.rng.gen_range(1..=6)))
    }
}

/// Plays back queued outcomes, e.g. values fetched from an authoritative server.
#[derive(Clone, Debug, Default)]
pub struct ScriptedDice {
    rolls: VecDeque<DiceRoll>,
}

impl ScriptedDice {

    pub fn new(rolls: impl IntoIterator<Item = (u8, u8)>) -> Self {
        Self {
            rolls: rolls.into_iter().map(|(a, b)| DiceRoll::new(a, b)).collect(),
        }
    }

    pub fn push(&mut self, first: u8, second: u8) {
        self.rolls.push_back(DiceRoll::new(first, second));
    }

    pub fn remaining(&self) -> usize {
        self.rolls.len()
    }

}

impl DiceSource for ScriptedDice {
    fn roll(&mut self) -> RuleResult<DiceRoll> {
        let roll = self.rolls.pop_front().ok_or(RuleError::DiceUnavailable)?;
        if !(1..=6).contains(&roll.first) || !(1..=6).contains(&roll.second) {
            return Err(RuleError::DiceUnavailable);
        }
        Ok(roll)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeded_dice_are_deterministic_and_in_range() {
        let mut a = RandomDice::seeded(42);
        let mut b = RandomDice::seeded(42);
        for _ in 0..100 {
            let roll = a.roll().unwrap();
            assert_eq!(roll, b.roll().unwrap());
            assert!((1..=6).contains(&roll.first));
            assert!((1..=6).contains(&roll.second));
            assert!((2..=12).contains(&roll.sum()));
        }
    }

    #[test]
    fn scripted_dice_play_back_in_order() {
        let mut dice = ScriptedDice::new([(3, 3), (1, 2)]);
        let first = dice.roll().unwrap();
        assert!(first.is_double());
        assert_eq!(first.sum(), 6);
        assert!(!dice.roll().unwrap().is_double());
        assert_eq!(dice.roll(), Err(RuleError::DiceUnavailable));
    }

    #[test]
    fn scripted_dice_reject_out_of_range_faces() {
        let mut dice = ScriptedDice::new([(0, 7)]);
        assert_eq!(dice.roll(), Err(RuleError::DiceUnavailable));
        assert_eq!(dice.remaining(), 0);
    }
}

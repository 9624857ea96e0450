use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};

use crate::action_cards::CardKind;
use crate::property::{ColorGroup, PropertyFrame, PropertyType};

pub const TILES: usize = 40;

#[derive(Clone, Debug)]
pub struct Board {
    tiles: Vec<Tile>,
    pub index: BoardIndex,
}

impl Board {

    pub fn new(tiles: Vec<Tile>) -> anyhow::Result<Self> {
        let index = BoardIndex::new(&tiles)?;
        Ok(Self { tiles, index })
    }

    /// The standard 40 tile board: Go at 0, Jail at 10, Go To Jail at 30.
    pub fn classic() -> Self {
        let tiles = classic_tiles();
        let index = BoardIndex {
            go: 0,
            jail: 10,
        };
        Self { tiles, index }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    pub fn tile(&self, idx: usize) -> Option<&Tile> {
        self.tiles.get(idx)
    }

    pub fn tiles(&self) -> &[Tile] {
        &self.tiles
    }

    pub fn property(&self, idx: usize) -> Option<&PropertyFrame> {
        match self.tiles.get(idx)? {
            Tile::Property { property } => Some(property),
            _ => None,
        }
    }

    /// Indices of every ownable tile, in board order.
    pub fn property_indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.tiles
            .iter()
            .enumerate()
            .filter(|(_, tile)| matches!(tile, Tile::Property { .. }))
            .map(|(idx, _)| idx)
    }

    pub fn group_members(&self, group: ColorGroup) -> impl Iterator<Item = usize> + '_ {
        self.tiles.iter().enumerate().filter_map(move |(idx, tile)| match tile {
            Tile::Property { property } if property.group == group => Some(idx),
            _ => None,
        })
    }

    pub fn group_size(&self, group: ColorGroup) -> usize {
        self.group_members(group).count()
    }

    /// Wraps `from + delta` around the board loop.
    pub fn offset(&self, from: usize, delta: i32) -> usize {
        let len = self.len() as i64;
        (from as i64 + delta as i64).rem_euclid(len) as usize
    }

    /// Forward steps needed to reach `to` from `from`.
    pub fn forward_distance(&self, from: usize, to: usize) -> usize {
        (to + self.len() - from % self.len()) % self.len()
    }

}

const BOARD_PATH: &str = "./config/board.json";

/// Reads the board from `path`, writing the classic board there first if the file is missing.
pub fn load_board(path: Option<&Path>) -> anyhow::Result<Board> {
    let path = path.unwrap_or_else(|| Path::new(BOARD_PATH));
    if path.exists() {
        let mut file = File::open(path).with_context(|| format!("opening board {}", path.display()))?;
        let mut buf = String::new();
        file.read_to_string(&mut buf)?;
        let tiles: Vec<Tile> = serde_json::from_str(&buf)
            .with_context(|| format!("parsing board {}", path.display()))?;
        Board::new(tiles)
    } else {
        let board = Board::classic();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut file = File::create(path).with_context(|| format!("creating board {}", path.display()))?;
        file.write_all(serde_json::to_string_pretty(board.tiles())?.as_bytes())?;
        Ok(board)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum Tile {
    Go {
        name: String,
    },
    Jail {
        name: String,
    },
    FreeParking {
        name: String,
    },
    GoToJail {
        name: String,
    },
    Property {
        property: PropertyFrame,
    },
    Tax {
        name: String,
        rule: TaxRule,
    },
    DrawCard {
        name: String,
        kind: CardKind,
    },
}

impl Tile {

    pub fn kind(&self) -> TileKind {
        match self {
            Tile::Go { .. } => TileKind::Go,
            Tile::Jail { .. } => TileKind::Jail,
            Tile::FreeParking { .. } => TileKind::FreeParking,
            Tile::GoToJail { .. } => TileKind::GoToJail,
            Tile::Property { property } => match property.ty {
                PropertyType::Street => TileKind::Property,
                PropertyType::Railroad => TileKind::Railroad,
                PropertyType::Utility => TileKind::Utility,
            },
            Tile::Tax { .. } => TileKind::Tax,
            Tile::DrawCard { kind: CardKind::Chance, .. } => TileKind::Chance,
            Tile::DrawCard { kind: CardKind::CommunityChest, .. } => TileKind::CommunityChest,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Tile::Go { name }
            | Tile::Jail { name }
            | Tile::FreeParking { name }
            | Tile::GoToJail { name }
            | Tile::Tax { name, .. }
            | Tile::DrawCard { name, .. } => name,
            Tile::Property { property } => &property.name,
        }
    }

}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TileKind {
    Go,
    Property,
    Railroad,
    Utility,
    Chance,
    CommunityChest,
    Jail,
    FreeParking,
    GoToJail,
    Tax,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaxRule {
    Flat {
        amount: i64,
    },
    // percentage of cash once the player holds at least `threshold`, otherwise `flat`
    Income {
        threshold: i64,
        percent: i64,
        flat: i64,
    },
}

impl TaxRule {

    pub fn amount_for(&self, cash: i64) -> i64 {
        match *self {
            TaxRule::Flat { amount } => amount,
            TaxRule::Income { threshold, percent, flat } => {
                if cash >= threshold {
                    cash * percent / 100
                } else {
                    flat
                }
            }
        }
    }

}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct BoardIndex {
    pub go: usize,
    pub jail: usize,
}

impl BoardIndex {

    pub fn new(board: &[Tile]) -> anyhow::Result<Self> {
        let mut jail_idx = None;
        let mut go_idx = None;
        for (idx, tile) in board.iter().enumerate() {
            if tile.kind() == TileKind::Jail && jail_idx.replace(idx).is_some() {
                bail!("There may only be 1 jail!");
            }
            if tile.kind() == TileKind::Go && go_idx.replace(idx).is_some() {
                bail!("There may only be 1 go tile!");
            }
        }
        Ok(Self {
            jail: jail_idx.context("No jail was found on the board.")?,
            go: go_idx.context("No go tile was found on the board.")?,
        })
    }

}

fn street(id: usize, name: &str, group: ColorGroup, price: i64, rents: [i64; 6]) -> Tile {
    Tile::Property {
        property: PropertyFrame::street(id, name, group, price, rents),
    }
}

fn railroad(id: usize, name: &str) -> Tile {
    Tile::Property {
        property: PropertyFrame::railroad(id, name),
    }
}

fn utility(id: usize, name: &str) -> Tile {
    Tile::Property {
        property: PropertyFrame::utility(id, name),
    }
}

fn named(f: fn(String) -> Tile, name: &str) -> Tile {
    f(name.to_string())
}

fn draw(kind: CardKind) -> Tile {
    let name = match kind {
        CardKind::Chance => "Chance",
        CardKind::CommunityChest => "Community Chest",
    };
    Tile::DrawCard { name: name.to_string(), kind }
}

fn classic_tiles() -> Vec<Tile> {
    use ColorGroup::*;
    vec![
        named(|name| Tile::Go { name }, "Go"),
        street(1, "Mediterranean Avenue", Purple, 60, [2, 10, 30, 90, 160, 250]),
        draw(CardKind::CommunityChest),
        street(3, "Baltic Avenue", Purple, 60, [4, 20, 60, 180, 320, 450]),
        Tile::Tax {
            name: "Income Tax".to_string(),
            rule: TaxRule::Income { threshold: 2000, percent: 10, flat: 200 },
        },
        railroad(5, "Reading Railroad"),
        street(6, "Oriental Avenue", LightBlue, 100, [6, 30, 90, 270, 400, 550]),
        draw(CardKind::Chance),
        street(8, "Vermont Avenue", LightBlue, 100, [6, 30, 90, 270, 400, 550]),
        street(9, "Connecticut Avenue", LightBlue, 120, [8, 40, 100, 300, 450, 600]),
        named(|name| Tile::Jail { name }, "Jail"),
        street(11, "St. Charles Place", Pink, 140, [10, 50, 150, 450, 625, 750]),
        utility(12, "Electric Company"),
        street(13, "States Avenue", Pink, 140, [10, 50, 150, 450, 625, 750]),
        street(14, "Virginia Avenue", Pink, 160, [12, 60, 180, 500, 700, 900]),
        railroad(15, "Pennsylvania Railroad"),
        street(16, "St. James Place", Orange, 180, [14, 70, 200, 550, 750, 950]),
        draw(CardKind::CommunityChest),
        street(18, "Tennessee Avenue", Orange, 180, [14, 70, 200, 550, 750, 950]),
        street(19, "New York Avenue", Orange, 200, [16, 80, 220, 600, 800, 1000]),
        named(|name| Tile::FreeParking { name }, "Free Parking"),
        street(21, "Kentucky Avenue", Red, 220, [18, 90, 250, 700, 875, 1050]),
        draw(CardKind::Chance),
        street(23, "Indiana Avenue", Red, 220, [18, 90, 250, 700, 875, 1050]),
        street(24, "Illinois Avenue", Red, 240, [20, 100, 300, 750, 925, 1100]),
        railroad(25, "B&O Railroad"),
        street(26, "Atlantic Avenue", Yellow, 260, [22, 110, 330, 800, 975, 1150]),
        street(27, "Ventnor Avenue", Yellow, 260, [22, 110, 330, 800, 975, 1150]),
        utility(28, "Water Works"),
        street(29, "Marvin Gardens", Yellow, 280, [24, 120, 360, 850, 1025, 1200]),
        named(|name| Tile::GoToJail { name }, "Go To Jail"),
        street(31, "Pacific Avenue", Green, 300, [26, 130, 390, 900, 1100, 1275]),
        street(32, "North Carolina Avenue", Green, 300, [26, 130, 390, 900, 1100, 1275]),
        draw(CardKind::CommunityChest),
        street(34, "Pennsylvania Avenue", Green, 320, [28, 150, 450, 1000, 1200, 1400]),
        railroad(35, "Short Line"),
        draw(CardKind::Chance),
        street(37, "Park Place", Blue, 350, [35, 175, 500, 1100, 1300, 1500]),
        Tile::Tax {
            name: "Luxury Tax".to_string(),
            rule: TaxRule::Flat { amount: 75 },
        },
        street(39, "Boardwalk", Blue, 400, [50, 200, 600, 1400, 1700, 2000]),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classic_board_has_expected_landmarks() {
        let board = Board::classic();
        assert_eq!(board.len(), TILES);
        assert_eq!(board.index, BoardIndex::new(board.tiles()).unwrap());
        assert_eq!(board.tile(30).unwrap().kind(), TileKind::GoToJail);
        assert_eq!(board.group_size(ColorGroup::Railroads), 4);
        assert_eq!(board.group_size(ColorGroup::Utilities), 2);
        assert_eq!(board.group_size(ColorGroup::Purple), 2);
        assert_eq!(board.property_indices().count(), 28);
    }

    #[test]
    fn property_ids_match_positions() {
        let board = Board::classic();
        for idx in board.property_indices() {
            assert_eq!(board.property(idx).unwrap().id, idx);
        }
    }

    #[test]
    fn offsets_wrap_in_both_directions() {
        let board = Board::classic();
        assert_eq!(board.offset(38, 5), 3);
        assert_eq!(board.offset(2, -3), 39);
        assert_eq!(board.forward_distance(35, 5), 10);
        assert_eq!(board.forward_distance(5, 5), 0);
    }

    #[test]
    fn income_tax_switches_to_percentage() {
        let rule = TaxRule::Income { threshold: 2000, percent: 10, flat: 200 };
        assert_eq!(rule.amount_for(1999), 200);
        assert_eq!(rule.amount_for(2500), 250);
        assert_eq!(TaxRule::Flat { amount: 75 }.amount_for(10), 75);
    }

    #[test]
    fn rejects_board_with_two_jails() {
        let tiles = vec![
            Tile::Go { name: "Go".into() },
            Tile::Jail { name: "A".into() },
            Tile::Jail { name: "B".into() },
        ];
        assert!(Board::new(tiles).is_err());
    }

    #[test]
    fn load_board_writes_default_then_reads_it_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config").join("board.json");
        let first = load_board(Some(&path)).unwrap();
        assert!(path.exists());
        let second = load_board(Some(&path)).unwrap();
        assert_eq!(first.len(), second.len());
        assert_eq!(second.index, first.index);
        assert_eq!(second.tile(39).unwrap().name(), "Boardwalk");
    }
}

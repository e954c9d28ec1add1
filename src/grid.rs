//! Settlement map - a fixed tile grid generated once per session

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::rng::UnitSource;

/// Terrain of a single tile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TileKind {
    Grass,
    Forest,
    Rock,
    Water,
}

impl TileKind {
    pub fn as_str(self) -> &'static str {
        match self {
            TileKind::Grass => "grass",
            TileKind::Forest => "forest",
            TileKind::Rock => "rock",
            TileKind::Water => "water",
        }
    }

    /// Single-character form used by the text map.
    pub fn symbol(self) -> char {
        match self {
            TileKind::Grass => '.',
            TileKind::Forest => 'T',
            TileKind::Rock => '^',
            TileKind::Water => '~',
        }
    }
}

impl fmt::Display for TileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Harvestable resource a tile offers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Wood,
    Stone,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceKind::Wood => f.write_str("wood"),
            ResourceKind::Stone => f.write_str("stone"),
        }
    }
}

/// The resource is fully determined by terrain, so it is never stored.
pub fn resource_for(kind: TileKind) -> Option<ResourceKind> {
    match kind {
        TileKind::Forest => Some(ResourceKind::Wood),
        TileKind::Rock => Some(ResourceKind::Stone),
        TileKind::Grass | TileKind::Water => None,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tile {
    pub kind: TileKind,
    pub row: u32,
    pub col: u32,
}

impl Tile {
    pub fn resource(&self) -> Option<ResourceKind> {
        resource_for(self.kind)
    }
}

/// Per-tile probabilities; grass takes whatever is left.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TerrainOdds {
    #[serde(default = "default_forest")]
    pub forest: f64,
    #[serde(default = "default_rock")]
    pub rock: f64,
    #[serde(default = "default_water")]
    pub water: f64,
}

fn default_forest() -> f64 {
    0.15
}

fn default_rock() -> f64 {
    0.10
}

fn default_water() -> f64 {
    0.05
}

impl Default for TerrainOdds {
    fn default() -> Self {
        Self {
            forest: default_forest(),
            rock: default_rock(),
            water: default_water(),
        }
    }
}

impl TerrainOdds {
    pub fn is_valid(&self) -> bool {
        let parts = [self.forest, self.rock, self.water];
        parts.iter().all(|p| p.is_finite() && *p >= 0.0) && parts.iter().sum::<f64>() <= 1.0
    }

    /// Maps one uniform draw onto a terrain using cumulative thresholds.
    pub fn classify(&self, draw: f64) -> TileKind {
        let forest = self.forest;
        let rock = forest + self.rock;
        let water = rock + self.water;
        if draw < forest {
            TileKind::Forest
        } else if draw < rock {
            TileKind::Rock
        } else if draw < water {
            TileKind::Water
        } else {
            TileKind::Grass
        }
    }
}

/// Row-major tile grid
#[derive(Debug, Clone)]
pub struct Grid {
    rows: u32,
    cols: u32,
    tiles: Vec<Tile>,
}

impl Grid {
    /// Draws once per cell in row-major order. Cells are independent.
    pub fn generate(rows: u32, cols: u32, odds: &TerrainOdds, source: &mut impl UnitSource) -> Self {
        let mut tiles = Vec::with_capacity(rows as usize * cols as usize);
        for row in 0..rows {
            for col in 0..cols {
                let kind = odds.classify(source.next_unit());
                tiles.push(Tile { kind, row, col });
            }
        }
        Self { rows, cols, tiles }
    }

    pub fn rows(&self) -> u32 {
        self.rows
    }

    pub fn cols(&self) -> u32 {
        self.cols
    }

    pub fn tile_count(&self) -> usize {
        self.tiles.len()
    }

    pub fn contains(&self, row: i64, col: i64) -> bool {
        (0..self.rows as i64).contains(&row) && (0..self.cols as i64).contains(&col)
    }

    pub fn get(&self, row: i64, col: i64) -> Option<&Tile> {
        if !self.contains(row, col) {
            return None;
        }
        self.tiles.get(row as usize * self.cols as usize + col as usize)
    }

    pub fn tiles(&self) -> &[Tile] {
        &self.tiles
    }

    pub fn count(&self, kind: TileKind) -> usize {
        self.tiles.iter().filter(|t| t.kind == kind).count()
    }

    /// Tile kinds as nested rows, for serialization.
    pub fn kind_rows(&self) -> Vec<Vec<TileKind>> {
        self.tiles
            .chunks(self.cols.max(1) as usize)
            .map(|row| row.iter().map(|t| t.kind).collect())
            .collect()
    }
}

impl fmt::Display for Grid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in self.tiles.chunks(self.cols.max(1) as usize) {
            let line: String = row.iter().map(|t| t.kind.symbol()).collect();
            writeln!(f, "{line}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::ScriptedDraws;

    #[test]
    fn resource_follows_terrain() {
        assert_eq!(resource_for(TileKind::Forest), Some(ResourceKind::Wood));
        assert_eq!(resource_for(TileKind::Rock), Some(ResourceKind::Stone));
        assert_eq!(resource_for(TileKind::Grass), None);
        assert_eq!(resource_for(TileKind::Water), None);
    }

    #[test]
    fn classify_thresholds() {
        let odds = TerrainOdds::default();
        assert_eq!(odds.classify(0.0), TileKind::Forest);
        assert_eq!(odds.classify(0.10), TileKind::Forest);
        assert_eq!(odds.classify(0.15), TileKind::Rock);
        assert_eq!(odds.classify(0.20), TileKind::Rock);
        assert_eq!(odds.classify(0.25), TileKind::Water);
        assert_eq!(odds.classify(0.27), TileKind::Water);
        assert_eq!(odds.classify(0.30), TileKind::Grass);
        assert_eq!(odds.classify(0.95), TileKind::Grass);
    }

    #[test]
    fn generate_fills_row_major() {
        let mut draws = ScriptedDraws::new([0.10, 0.20, 0.27, 0.95]);
        let grid = Grid::generate(2, 2, &TerrainOdds::default(), &mut draws);

        assert_eq!(grid.tile_count(), 4);
        assert_eq!(grid.get(0, 0).unwrap().kind, TileKind::Forest);
        assert_eq!(grid.get(0, 1).unwrap().kind, TileKind::Rock);
        assert_eq!(grid.get(1, 0).unwrap().kind, TileKind::Water);
        assert_eq!(grid.get(1, 1).unwrap().kind, TileKind::Grass);

        let tile = grid.get(1, 0).unwrap();
        assert_eq!((tile.row, tile.col), (1, 0));
    }

    #[test]
    fn out_of_bounds_lookup() {
        let grid = Grid::generate(3, 4, &TerrainOdds::default(), &mut ScriptedDraws::constant(0.5));
        assert!(grid.get(-1, 0).is_none());
        assert!(grid.get(3, 0).is_none());
        assert!(grid.get(0, 4).is_none());
        assert!(grid.get(2, 3).is_some());
    }

    #[test]
    fn odds_validation() {
        assert!(TerrainOdds::default().is_valid());
        assert!(!TerrainOdds { forest: 0.6, rock: 0.3, water: 0.2 }.is_valid());
        assert!(!TerrainOdds { forest: -0.1, rock: 0.1, water: 0.1 }.is_valid());
    }

    #[test]
    fn text_rendering() {
        let mut draws = ScriptedDraws::new([0.10, 0.95, 0.20, 0.27]);
        let grid = Grid::generate(2, 2, &TerrainOdds::default(), &mut draws);
        assert_eq!(grid.to_string(), "T.\n^~\n");
        assert_eq!(
            grid.kind_rows(),
            vec![
                vec![TileKind::Forest, TileKind::Grass],
                vec![TileKind::Rock, TileKind::Water]
            ]
        );
    }
}

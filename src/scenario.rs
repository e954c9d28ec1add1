use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{ensure, Context, Result};
use serde::{Deserialize, Serialize};

use crate::{
    grid::{Grid, TerrainOdds},
    rng::{RngManager, TERRAIN_STREAM},
    settlement::{HutBlueprint, ResourceStock, Settlement, SettlementState},
};

fn default_name() -> String {
    "stone_age".into()
}

fn default_food() -> u64 {
    10
}

fn default_population() -> u64 {
    1
}

fn default_era() -> String {
    "Stone Age".into()
}

fn default_map_size() -> u32 {
    10
}

fn default_tile_size() -> u32 {
    40
}

/// Largest map, in tiles, a scenario may request.
pub const MAX_MAP_TILES: u64 = 1_000_000;

fn default_journal_capacity() -> usize {
    200
}

fn default_log_level() -> String {
    "info".into()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Omit to seed from OS entropy.
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(default)]
    pub resources: ResourceInit,
    #[serde(default)]
    pub settlement: SettlementInit,
    #[serde(default)]
    pub map: MapConfig,
    #[serde(default)]
    pub terrain: TerrainOdds,
    #[serde(default)]
    pub hut: HutBlueprint,
    #[serde(default = "default_journal_capacity")]
    pub journal_capacity: usize,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceInit {
    #[serde(default)]
    pub wood: u64,
    #[serde(default)]
    pub stone: u64,
    #[serde(default = "default_food")]
    pub food: u64,
}

impl Default for ResourceInit {
    fn default() -> Self {
        Self {
            wood: 0,
            stone: 0,
            food: default_food(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettlementInit {
    #[serde(default = "default_population")]
    pub population: u64,
    #[serde(default = "default_population")]
    pub max_population: u64,
    #[serde(default = "default_era")]
    pub era: String,
}

impl Default for SettlementInit {
    fn default() -> Self {
        Self {
            population: default_population(),
            max_population: default_population(),
            era: default_era(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MapConfig {
    #[serde(default = "default_map_size")]
    pub rows: u32,
    #[serde(default = "default_map_size")]
    pub cols: u32,
    /// Pixel size of one tile in the web view.
    #[serde(default = "default_tile_size")]
    pub tile_size: u32,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            rows: default_map_size(),
            cols: default_map_size(),
            tile_size: default_tile_size(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Default for Scenario {
    fn default() -> Self {
        Self {
            name: default_name(),
            description: None,
            seed: None,
            resources: ResourceInit::default(),
            settlement: SettlementInit::default(),
            map: MapConfig::default(),
            terrain: TerrainOdds::default(),
            hut: HutBlueprint::default(),
            journal_capacity: default_journal_capacity(),
            logging: LoggingConfig::default(),
        }
    }
}

pub struct ScenarioLoader {
    base_dir: PathBuf,
}

impl ScenarioLoader {
    pub fn new(base_dir: impl AsRef<Path>) -> Self {
        Self {
            base_dir: base_dir.as_ref().to_path_buf(),
        }
    }

    pub fn load(&self, file: impl AsRef<Path>) -> Result<Scenario> {
        let path = self.base_dir.join(file);
        let data = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read scenario file {}", path.display()))?;
        let scenario: Scenario = serde_yaml::from_str(&data)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        scenario
            .validate()
            .with_context(|| format!("Invalid scenario {}", path.display()))?;
        Ok(scenario)
    }
}

impl Scenario {
    pub fn validate(&self) -> Result<()> {
        ensure!(self.settlement.population >= 1, "population must be at least 1");
        ensure!(
            self.settlement.max_population >= 1,
            "max_population must be at least 1"
        );
        ensure!(
            self.map.rows >= 1 && self.map.cols >= 1,
            "map must have at least one row and one column, got {}x{}",
            self.map.rows,
            self.map.cols
        );
        ensure!(
            u64::from(self.map.rows) * u64::from(self.map.cols) <= MAX_MAP_TILES,
            "map of {}x{} tiles exceeds the limit of {MAX_MAP_TILES} tiles",
            self.map.rows,
            self.map.cols
        );
        ensure!(
            self.terrain.is_valid(),
            "terrain odds must be non-negative and sum to at most 1, got {:?}",
            self.terrain
        );
        Ok(())
    }

    /// RNG for this scenario: the configured seed, or a fresh one from entropy.
    pub fn rng(&self) -> RngManager {
        match self.seed {
            Some(seed) => RngManager::new(seed),
            None => RngManager::from_entropy(),
        }
    }

    pub fn build_settlement(&self, rng: &mut RngManager) -> Settlement {
        let grid = Grid::generate(
            self.map.rows,
            self.map.cols,
            &self.terrain,
            &mut rng.stream(TERRAIN_STREAM),
        );
        let resources = ResourceStock {
            wood: self.resources.wood,
            stone: self.resources.stone,
            food: self.resources.food,
        };
        let state = SettlementState {
            population: self.settlement.population,
            max_population: self.settlement.max_population,
            era: self.settlement.era.clone(),
        };
        Settlement::new(resources, state, self.hut, grid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_stone_age() {
        let scenario = Scenario::default();
        assert_eq!(scenario.name, "stone_age");
        assert_eq!(scenario.resources.food, 10);
        assert_eq!(scenario.settlement.population, 1);
        assert_eq!(scenario.settlement.max_population, 1);
        assert_eq!(scenario.map.rows, 10);
        assert_eq!(scenario.map.cols, 10);
        assert_eq!(scenario.hut.wood, 10);
        assert_eq!(scenario.hut.capacity, 2);
        assert!(scenario.validate().is_ok());
    }

    #[test]
    fn empty_yaml_uses_defaults() {
        let scenario: Scenario = serde_yaml::from_str("{}").unwrap();
        assert_eq!(scenario.name, "stone_age");
        assert_eq!(scenario.settlement.era, "Stone Age");
        assert_eq!(scenario.terrain, TerrainOdds::default());
        assert_eq!(scenario.logging.level, "info");
    }

    #[test]
    fn partial_sections_fill_missing_fields() {
        let scenario: Scenario = serde_yaml::from_str(
            "resources:\n  wood: 5\nmap:\n  rows: 4\nterrain:\n  water: 0.2\n",
        )
        .unwrap();
        assert_eq!(scenario.resources.wood, 5);
        assert_eq!(scenario.resources.food, 10);
        assert_eq!(scenario.map.rows, 4);
        assert_eq!(scenario.map.cols, 10);
        assert_eq!(scenario.terrain.forest, 0.15);
        assert_eq!(scenario.terrain.water, 0.2);
    }

    #[test]
    fn validation_rejects_bad_values() {
        let mut scenario = Scenario::default();
        scenario.settlement.population = 0;
        assert!(scenario.validate().is_err());

        let mut scenario = Scenario::default();
        scenario.map.cols = 0;
        assert!(scenario.validate().is_err());

        let mut scenario = Scenario::default();
        scenario.terrain.forest = 0.9;
        assert!(scenario.validate().is_err());

        let mut scenario = Scenario::default();
        scenario.map.rows = u32::MAX;
        scenario.map.cols = u32::MAX;
        assert!(scenario.validate().is_err());

        let mut scenario = Scenario::default();
        scenario.map.rows = 1_000;
        scenario.map.cols = 1_001;
        assert!(scenario.validate().is_err());
        scenario.map.cols = 1_000;
        assert!(scenario.validate().is_ok());
    }

    #[test]
    fn seeded_builds_are_reproducible() {
        let scenario = Scenario {
            seed: Some(11),
            ..Scenario::default()
        };
        let a = scenario.build_settlement(&mut scenario.rng());
        let b = scenario.build_settlement(&mut scenario.rng());
        assert_eq!(a.grid().tiles(), b.grid().tiles());
        assert_eq!(a.grid().tile_count(), 100);
    }
}

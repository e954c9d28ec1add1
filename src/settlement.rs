use serde::{Deserialize, Serialize};

use crate::{
    error::SettlementError,
    grid::{Grid, ResourceKind, Tile, TileKind},
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceStock {
    pub wood: u64,
    pub stone: u64,
    pub food: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementState {
    pub population: u64,
    pub max_population: u64,
    pub era: String,
}

/// Price and payoff of a hut.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HutBlueprint {
    pub wood: u64,
    pub capacity: u64,
}

impl Default for HutBlueprint {
    fn default() -> Self {
        Self {
            wood: 10,
            capacity: 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum BuildOutcome {
    Built { max_population: u64 },
    Unaffordable { needed: u64, available: u64 },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TileReport {
    pub tile: Tile,
    pub resource: Option<ResourceKind>,
    pub hint: &'static str,
}

impl TileReport {
    fn for_tile(tile: Tile) -> Self {
        let resource = tile.resource();
        let hint = match (resource, tile.kind) {
            (Some(ResourceKind::Wood), _) => "wood can be gathered here",
            (Some(ResourceKind::Stone), _) => "stone can be gathered here",
            (None, TileKind::Water) => "water tile, nothing to do yet",
            (None, _) => "open grassland",
        };
        Self {
            tile,
            resource,
            hint,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SettlementSnapshot {
    pub scenario: String,
    pub resources: ResourceStock,
    pub population: u64,
    pub max_population: u64,
    pub population_display: String,
    pub era: String,
    pub can_build_hut: bool,
    pub hut: HutBlueprint,
    pub rows: u32,
    pub cols: u32,
    pub tiles: Vec<Vec<TileKind>>,
}

/// The whole game state. Owned by exactly one controller.
#[derive(Debug, Clone)]
pub struct Settlement {
    resources: ResourceStock,
    state: SettlementState,
    hut: HutBlueprint,
    grid: Grid,
}

impl Settlement {
    pub fn new(resources: ResourceStock, state: SettlementState, hut: HutBlueprint, grid: Grid) -> Self {
        Self {
            resources,
            state,
            hut,
            grid,
        }
    }

    pub fn resources(&self) -> ResourceStock {
        self.resources
    }

    pub fn state(&self) -> &SettlementState {
        &self.state
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn hut(&self) -> HutBlueprint {
        self.hut
    }

    /// Adds one unit of wood per person. Returns the amount gathered.
    pub fn gather_wood(&mut self) -> u64 {
        let amount = self.state.population;
        self.resources.wood = self.resources.wood.saturating_add(amount);
        amount
    }

    pub fn gather_stone(&mut self) -> u64 {
        let amount = self.state.population;
        self.resources.stone = self.resources.stone.saturating_add(amount);
        amount
    }

    /// Hunting yields two food per person.
    pub fn hunt_food(&mut self) -> u64 {
        let amount = self.state.population.saturating_mul(2);
        self.resources.food = self.resources.food.saturating_add(amount);
        amount
    }

    pub fn can_build_hut(&self) -> bool {
        self.resources.wood >= self.hut.wood
    }

    /// Leaves every field untouched when the settlement cannot pay.
    pub fn build_hut(&mut self) -> BuildOutcome {
        if !self.can_build_hut() {
            return BuildOutcome::Unaffordable {
                needed: self.hut.wood,
                available: self.resources.wood,
            };
        }
        self.resources.wood -= self.hut.wood;
        self.state.max_population = self.state.max_population.saturating_add(self.hut.capacity);
        BuildOutcome::Built {
            max_population: self.state.max_population,
        }
    }

    pub fn inspect_tile(&self, row: i64, col: i64) -> Result<TileReport, SettlementError> {
        self.grid
            .get(row, col)
            .copied()
            .map(TileReport::for_tile)
            .ok_or(SettlementError::TileOutOfRange {
                row,
                col,
                rows: self.grid.rows(),
                cols: self.grid.cols(),
            })
    }

    pub fn population_display(&self) -> String {
        format!("{}/{}", self.state.population, self.state.max_population)
    }

    pub fn snapshot(&self, scenario: &str) -> SettlementSnapshot {
        SettlementSnapshot {
            scenario: scenario.to_string(),
            resources: self.resources,
            population: self.state.population,
            max_population: self.state.max_population,
            population_display: self.population_display(),
            era: self.state.era.clone(),
            can_build_hut: self.can_build_hut(),
            hut: self.hut(),
            rows: self.grid.rows(),
            cols: self.grid.cols(),
            tiles: self.grid.kind_rows(),
        }
    }
}

use std::{collections::VecDeque, fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, error, info};

use crate::{
    error::SettlementError,
    scenario::Scenario,
    settlement::{BuildOutcome, Settlement, SettlementSnapshot, TileReport},
};

/// One player action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum Command {
    GatherWood,
    GatherStone,
    HuntFood,
    BuildHut,
    InspectTile { row: i64, col: i64 },
}

impl Command {
    /// Whether the command may change settlement state.
    pub fn is_mutating(&self) -> bool {
        !matches!(self, Command::InspectTile { .. })
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::GatherWood => f.write_str("gather-wood"),
            Command::GatherStone => f.write_str("gather-stone"),
            Command::HuntFood => f.write_str("hunt-food"),
            Command::BuildHut => f.write_str("build-hut"),
            Command::InspectTile { row, col } => write!(f, "inspect:{row},{col}"),
        }
    }
}

impl FromStr for Command {
    type Err = SettlementError;

    /// Accepts the button names plus `inspect:ROW,COL`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let unknown = || SettlementError::UnknownCommand(s.to_string());
        match s.trim() {
            "gather-wood" => Ok(Command::GatherWood),
            "gather-stone" => Ok(Command::GatherStone),
            "hunt-food" => Ok(Command::HuntFood),
            "build-hut" => Ok(Command::BuildHut),
            other => {
                let coords = other.strip_prefix("inspect:").ok_or_else(unknown)?;
                let (row, col) = coords.split_once(',').ok_or_else(unknown)?;
                let row = row.trim().parse().map_err(|_| unknown())?;
                let col = col.trim().parse().map_err(|_| unknown())?;
                Ok(Command::InspectTile { row, col })
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Good {
    Wood,
    Stone,
    Food,
}

impl fmt::Display for Good {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Good::Wood => f.write_str("wood"),
            Good::Stone => f.write_str("stone"),
            Good::Food => f.write_str("food"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Outcome {
    Gathered { good: Good, amount: u64, total: u64 },
    Build(BuildOutcome),
    Inspected(TileReport),
}

impl Outcome {
    pub fn changed_state(&self) -> bool {
        matches!(
            self,
            Outcome::Gathered { .. } | Outcome::Build(BuildOutcome::Built { .. })
        )
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Gathered {
                good,
                amount,
                total,
            } => write!(f, "gathered {amount} {good}, now {total}"),
            Outcome::Build(BuildOutcome::Built { max_population }) => {
                write!(f, "built a hut, max population now {max_population}")
            }
            Outcome::Build(BuildOutcome::Unaffordable { needed, available }) => {
                write!(f, "not enough wood for a hut: need {needed}, have {available}")
            }
            Outcome::Inspected(report) => write!(
                f,
                "tile ({}, {}) is {}: {}",
                report.tile.row, report.tile.col, report.tile.kind, report.hint
            ),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct JournalEntry {
    pub at: DateTime<Utc>,
    pub command: Command,
    pub ok: bool,
    pub message: String,
}

/// Owns the settlement and serializes every action against it.
pub struct Controller {
    scenario_name: String,
    seed: u64,
    settlement: Settlement,
    journal: VecDeque<JournalEntry>,
    journal_capacity: usize,
}

impl Controller {
    pub fn new(
        scenario_name: impl Into<String>,
        seed: u64,
        settlement: Settlement,
        journal_capacity: usize,
    ) -> Self {
        Self {
            scenario_name: scenario_name.into(),
            seed,
            settlement,
            journal: VecDeque::with_capacity(journal_capacity.min(1024)),
            journal_capacity,
        }
    }

    pub fn from_scenario(scenario: &Scenario) -> Self {
        let mut rng = scenario.rng();
        let settlement = scenario.build_settlement(&mut rng);
        let grid = settlement.grid();
        info!(
            scenario = %scenario.name,
            seed = rng.seed(),
            rows = grid.rows(),
            cols = grid.cols(),
            "settlement founded"
        );
        Self::new(
            scenario.name.clone(),
            rng.seed(),
            settlement,
            scenario.journal_capacity,
        )
    }

    pub fn scenario_name(&self) -> &str {
        &self.scenario_name
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn settlement(&self) -> &Settlement {
        &self.settlement
    }

    pub fn snapshot(&self) -> SettlementSnapshot {
        self.settlement.snapshot(&self.scenario_name)
    }

    pub fn apply(&mut self, command: Command) -> Result<Outcome, SettlementError> {
        let result = self.dispatch(command);
        match &result {
            Ok(outcome) => {
                if command.is_mutating() {
                    info!(%command, "{outcome}");
                } else {
                    debug!(%command, "{outcome}");
                }
                self.record(command, true, outcome.to_string());
            }
            Err(err) => {
                error!(%command, "{err}");
                self.record(command, false, err.to_string());
            }
        }
        result
    }

    /// Like [`Controller::apply`], then hands the fresh projection to `hook`
    /// whenever the command changed state.
    pub fn apply_with_hook<F>(&mut self, command: Command, mut hook: F) -> Result<Outcome, SettlementError>
    where
        F: FnMut(SettlementSnapshot),
    {
        let outcome = self.apply(command)?;
        if outcome.changed_state() {
            hook(self.snapshot());
        }
        Ok(outcome)
    }

    pub fn journal(&self) -> impl Iterator<Item = &JournalEntry> {
        self.journal.iter()
    }

    /// The newest `limit` entries, oldest first.
    pub fn recent_journal(&self, limit: usize) -> Vec<JournalEntry> {
        let skip = self.journal.len().saturating_sub(limit);
        self.journal.iter().skip(skip).cloned().collect()
    }

    fn dispatch(&mut self, command: Command) -> Result<Outcome, SettlementError> {
        let settlement = &mut self.settlement;
        let outcome = match command {
            Command::GatherWood => Outcome::Gathered {
                good: Good::Wood,
                amount: settlement.gather_wood(),
                total: settlement.resources().wood,
            },
            Command::GatherStone => Outcome::Gathered {
                good: Good::Stone,
                amount: settlement.gather_stone(),
                total: settlement.resources().stone,
            },
            Command::HuntFood => Outcome::Gathered {
                good: Good::Food,
                amount: settlement.hunt_food(),
                total: settlement.resources().food,
            },
            Command::BuildHut => Outcome::Build(settlement.build_hut()),
            Command::InspectTile { row, col } => Outcome::Inspected(settlement.inspect_tile(row, col)?),
        };
        Ok(outcome)
    }

    fn record(&mut self, command: Command, ok: bool, message: String) {
        if self.journal_capacity == 0 {
            return;
        }
        while self.journal.len() >= self.journal_capacity {
            self.journal.pop_front();
        }
        self.journal.push_back(JournalEntry {
            at: Utc::now(),
            command,
            ok,
            message,
        });
    }
}

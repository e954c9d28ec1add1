pub mod controller;
pub mod error;
pub mod grid;
pub mod rng;
pub mod scenario;
pub mod settlement;
pub mod web;

pub use controller::{Command, Controller, Outcome};
pub use error::SettlementError;
pub use scenario::{Scenario, ScenarioLoader};
pub use settlement::{BuildOutcome, Settlement, SettlementSnapshot};

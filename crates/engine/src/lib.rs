pub mod binance;
pub mod lifecycle;
pub mod orchestrator;
pub mod scheduler;
pub mod universe;

#[cfg(test)]
mod testing;

pub use binance::BinanceFuturesClient;
pub use lifecycle::{Engine, TickSummary};
pub use orchestrator::{FetchOrchestrator, PairOutcome, TickReport};
pub use scheduler::{CloseBand, CloseBands, SchedulePlan};
pub use universe::{RefreshReport, SymbolUniverse};

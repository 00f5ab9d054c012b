//! Configuration types for Potluck.
//!
//! These types represent the validated runtime configuration used by the
//! core. Loading and parsing the configuration file is handled by the server
//! crate.

mod competition;
mod ledger;

pub use competition::CompetitionConfig;
pub use ledger::LedgerConfig;

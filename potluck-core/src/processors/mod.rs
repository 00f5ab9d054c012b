//! Processors that drive competitions forward.
//!
//! - `TransactionScanner`: resolves the full history of an escrow
//! - `LifecycleEngine`: ticks on an interval, starts and settles competitions
//! - `PayoutEngine`: draws a winner and sends the award
//! - `EntryBuilder`: builds the transaction a participant signs to enter

pub mod entry_builder;
pub mod lifecycle;
pub mod payout;
pub mod scanner;

pub use entry_builder::EntryBuilder;
pub use lifecycle::LifecycleEngine;
pub use payout::{PayoutEngine, PayoutOutcome};
pub use scanner::TransactionScanner;

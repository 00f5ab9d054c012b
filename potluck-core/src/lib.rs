#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::panic))]
#![forbid(unsafe_code)]

pub mod config;
pub mod entities;
pub mod framework;
pub mod ledger;
pub mod processors;
pub mod service;
pub mod utils;

#[cfg(test)]
pub(crate) mod testing;

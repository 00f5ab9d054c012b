//! Shared request and response objects for the Potluck HTTP surface.

pub mod objects;

#![deny(clippy::all)]

pub mod audio;
pub mod cli;
pub mod config;
pub mod conversation;
pub mod error;
pub mod itinerary;
pub mod recording;
pub mod render;
pub mod repl;
pub mod storage;
pub mod trips;

#[cfg(test)]
mod test_utils;

pub use error::*;

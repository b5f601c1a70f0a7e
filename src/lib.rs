//! chocdb - query a chocolate bar ratings dataset with short token commands
//!
//! This crate provides:
//! - A command compiler turning commands like `bars country=BR source 8`
//!   into SQL (`command`)
//! - A small embedded SQL engine that runs the compiled queries (`sql`)
//! - Pluggable byte-level storage engines (`storage`)
//! - A CSV dataset loader (`dataset`) and result rendering (`output`)

pub mod command;
pub mod dataset;
pub mod error;
pub mod output;
pub mod sql;
pub mod storage;

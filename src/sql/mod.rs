//! SQL processing module
//!
//! This module provides:
//! - `parser`: SQL lexer and parser, AST with SQL rendering
//! - `types`: SQL data types
//! - `schema`: Table and column schema definitions
//! - `plan`: Execution plan generation
//! - `executor`: Query execution
//! - `engine`: Storage engine abstraction and sessions

pub mod engine;
pub mod executor;
pub mod parser;
pub mod plan;
pub mod schema;
pub mod types;

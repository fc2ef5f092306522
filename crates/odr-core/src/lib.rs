//! Core odr library (session driver, engine boundary, config).

pub mod config;
pub mod core;
pub mod engine;

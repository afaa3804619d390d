//! Core types, config, errors, chat store, and history cursor for Murmur.

pub mod config;
pub mod error;
pub mod history;
pub mod store;
pub mod types;

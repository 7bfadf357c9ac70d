//! Core abstractions for the model service

pub mod config;
pub mod error;
pub mod provider;
pub mod types;

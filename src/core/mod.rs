//! Core types shared by the translation pipeline

pub mod cache;
pub mod client;
pub mod config;
pub mod errors;
pub mod language;
pub mod models;
pub mod stats;
pub mod tokens;

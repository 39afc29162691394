// src/actions/mod.rs
// One handler per label, all converging on the uniform response envelope.

pub mod chat;
pub mod config;
pub mod format;
pub mod issues;
pub mod repo;

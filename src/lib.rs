// src/lib.rs

pub mod actions;
pub mod api;
pub mod config;
pub mod gateway;
pub mod handlers;
pub mod llm;
pub mod routing;

// src/handlers/mod.rs

pub mod auth;
pub mod authoring;
pub mod catalog;
pub mod diagnostic;
pub mod enrollment;
pub mod evaluation;
pub mod progress;

// src/services/mod.rs

pub mod certificate;
pub mod comparator;
pub mod diagnostic;
pub mod evaluation;
pub mod progress;
pub mod unlock;

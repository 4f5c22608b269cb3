// src/models/mod.rs

pub mod certificate;
pub mod course;
pub mod diagnostic;
pub mod enrollment;
pub mod evaluation;
pub mod question;
pub mod user;

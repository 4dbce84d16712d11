//! Schema and model helpers shared by several services

pub mod identity;
pub mod location;
pub mod tags;

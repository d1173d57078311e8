//! Core engine types and utilities shared by the weather simulation crates.
//!
//! This crate provides the foundational types used across all systems:
//! - 2D bounds and play-area geometry
//! - Frame / fixed-step timing
//! - Common component types for ECS

pub mod bounds;
pub mod components;
pub mod time;

pub use bounds::*;
pub use components::*;
pub use time::*;

// Re-export commonly used types
pub use glam::Vec2;
pub use hecs::{Entity, World};

//! Domain layer containing business entities and the seams to infrastructure.
//!
//! # Architecture
//!
//! - [`entities`] - Core business data structures
//! - [`repositories`] - Data access trait definitions
//! - [`access_event`] - Redirect analytics event model
//! - [`dispatcher`] - Analytics sink and notifier traits
//! - [`clock`] - Time source for expiry decisions
//!
//! # Design Principles
//!
//! - Domain layer has no dependencies on the presentation layer
//! - Repository traits define contracts implemented by infrastructure layer
//! - Store logic lives in [`crate::application::store`]

pub mod access_event;
pub mod clock;
pub mod dispatcher;
pub mod entities;
pub mod repositories;

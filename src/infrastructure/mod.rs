//! Infrastructure layer.
//!
//! Provides technical concerns that support the application without containing
//! business logic: configuration, exchange wiring and the composition root.
//!
//! # Submodules
//!
//! - [`bootstrap`] - Composition root for runtime wiring
//! - [`config`] - Configuration loading and validation
//! - [`exchange`] - Exchange client factory

pub mod bootstrap;
pub mod config;
pub mod exchange;

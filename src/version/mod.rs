//! Version model
//!
//! Versions come in three forms, all behind the closed [`Version`] enum:
//!
//! - semantic versions (`1.2.3`, `v2.0.0-rc.1`), optionally carrying a
//!   secondary app label such as a Helm chart's appVersion
//! - full commit hashes
//! - channel snapshots (`nixos-24.05.1234.a1b2c3d`) embedding a short hash
//!
//! # Modules
//!
//! - [`model`]: the `Version` enum with compare/satisfies/equivalent
//! - [`range`]: npm-style version-spec ranges
//! - [`semver`]: cleaning, coercion and natural ordering helpers

pub mod model;
pub mod range;
pub mod semver;

pub use model::Version;
pub use range::Range;

//! kbase: wiki repositories and model providers with a distributed creation lock.
//!
//! Creation of a resource is guarded by a named, TTL-bounded lock held in a
//! store shared by every process using the same data directory, so two
//! callers can never both pass the uniqueness check for the same key.
//!
//! - [`locks`] holds the lock itself and its stores
//! - [`creation`] wraps a creation in the lock and a database transaction
//! - [`wiki`] and [`provider`] are the guarded domains
//! - [`model`] and [`model_config`] hang off providers and need no lock

pub mod cli;
pub mod commands;
pub mod config;
pub mod context;
pub mod creation;
pub mod db;
pub mod error;
pub mod events;
pub mod exit_codes;
pub mod fs;
pub mod locks;
pub mod model;
pub mod model_config;
pub mod provider;
pub mod wiki;

mod fields;

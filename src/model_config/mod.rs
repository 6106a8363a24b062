//! Sampling defaults for model calls.
//!
//! A config row either belongs to one provider or, with no provider, is the
//! global fallback. The effective config for a provider is its own newest
//! config if it has one, otherwise the newest global config.

mod model;
mod repository;
mod service;


pub use model::{CreateModelConfig, ModelConfig, UpdateModelConfig};
pub use service::ModelConfigService;

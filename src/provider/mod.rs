//! AI model providers.
//!
//! A provider holds the credentials a user registered for one AI platform.
//! Each user may register every platform at most once; registration runs
//! under the creation lock keyed on the user and platform.

mod model;
mod repository;
mod service;

#[cfg(test)]
mod tests;

pub(crate) use service::owned_provider;

pub use model::{CreateModelProvider, ModelProvider, Platform, UpdateModelProvider};
pub use service::{CREATE_ACTION, ModelProviderService};

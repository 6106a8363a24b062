//! Wiki repositories.
//!
//! A wiki repository is a knowledge base owned by the user who created it.
//! Creation goes through the creation lock so that two concurrent requests
//! for the same access path cannot both pass the uniqueness check; updates
//! and deletes are restricted to the creator.

mod model;
mod repository;
mod service;

#[cfg(test)]
mod tests;

pub use model::{CreateWikiRepo, UpdateWikiRepo, WikiRepo, WikiRepoDetail};
pub use service::{CREATE_ACTION, WikiRepoService};

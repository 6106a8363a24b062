//! Models offered by a registered provider.
//!
//! A model names one concrete model on a provider's platform (for example an
//! embedding model a wiki repository refers to). Models are not unique on any
//! key, so creation runs in a plain unit of work without the creation lock.

mod types;
mod repository;
mod service;


pub(crate) use repository::provider_types;

pub use types::{CreateModel, Model, ModelType, UpdateModel};
pub use service::ModelService;

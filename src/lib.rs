pub mod api;
pub mod config;
pub mod domain;
pub mod error;
pub mod ledger;
pub mod reconcile;
pub mod store;

pub use config::Config;
pub use error::{AppError, AppResult};

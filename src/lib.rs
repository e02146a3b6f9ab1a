pub mod config;
pub mod drill;
pub mod error;
pub mod progress;
pub mod review;
pub mod scheduler;
pub mod store;
pub mod topic;
pub mod web;

pub use error::{Error, Result};

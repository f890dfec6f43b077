pub mod changes;
pub mod ci;
pub mod config;
pub mod domain;
pub mod error;
pub mod git;
pub mod github;
pub mod logging;
pub mod matcher;
pub mod outputs;
pub mod release;
pub mod ui;
pub mod unit_config;
pub mod workspace;

pub use error::{CiError, Result};

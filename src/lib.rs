pub mod config;
pub mod error;
pub mod runner;
pub mod script;
pub mod store;

pub use config::{Config, Mode};
pub use error::{Error, Result, StoreError};
pub use runner::Runner;

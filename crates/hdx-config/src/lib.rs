pub mod config;
pub mod error;
pub mod loader;

pub use config::{Configuration, ConfigurationOptions};

#[cfg(test)]
pub mod test_utils;

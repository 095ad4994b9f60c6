use error::HdxError;

pub mod context;
pub mod dataset;
pub mod date_helper;
pub mod error;
pub mod error_handler;
pub mod filestore;
pub mod locations;
pub mod object;
pub mod organization;
pub mod quickcharts;
pub mod resource;
pub mod resource_matcher;
pub mod resource_view;
pub mod showcase;
pub mod state;
pub mod title_helper;
pub mod url_utils;
pub mod user;
pub mod vocabulary;

#[cfg(test)]
pub mod test_utils;

pub use context::Hdx;
pub use dataset::{Dataset, DatasetUpdateOptions, SearchOptions};
pub use object::{HdxObject, UpdateOptions};

pub type HdxResult<T> = std::result::Result<T, HdxError>;

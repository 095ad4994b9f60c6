pub mod ckan;
pub mod error;
pub mod http_client;
pub mod multipart;

pub use ckan::{FileUpload, HttpCkan, RemoteCkan};

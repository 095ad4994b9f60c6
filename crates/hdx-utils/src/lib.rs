pub mod dict;
pub mod error;
pub mod hash;
pub mod path;
pub mod string;
pub mod uuid;

pub mod api;
pub mod blacklist;
pub mod error;
pub mod ingestion;
pub mod joint_table;
pub mod models;
pub mod normalizer;
pub mod portfolio;
pub mod table;

pub use error::{Result, SiftError};

pub mod charts;
pub mod error;
pub mod export;
pub mod inspection;
pub mod models;
pub mod repository;
pub mod scope;
pub mod service;
pub mod upload;
pub mod validate;

pub mod agent;
pub mod auth;
pub mod dashboard;
pub mod export;
pub mod health;
pub mod inspection;
pub mod product;
pub mod settings;
pub mod super_admin;
pub mod upload;

pub mod config;
pub mod export;
pub mod filter;
pub mod models;
pub mod session;
pub mod validation;

pub mod app;
pub mod auth;
pub mod config;
pub mod error;
pub mod roster;
pub mod session;
pub mod state;
pub mod store;
pub mod weights;

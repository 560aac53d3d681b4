//! event-push-service Library Crate

// Declare modules as public to be accessible from the binary crate and integration tests
pub mod config;
pub mod dispatch;
pub mod error;
pub mod fcm_sender;
pub mod handlers;
pub mod models;
pub mod payload;
pub mod state;
pub mod validation;

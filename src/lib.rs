#![deny(missing_docs)]
//! Overseerr request bot.
//!
//! A Telegram bot that searches an Overseerr instance, renders the results
//! as interactive messages and turns button presses into media requests.

/// Telegram bot implementation
pub mod bot;
/// Configuration management
pub mod config;
/// Overseerr API client
pub mod overseerr;
/// Utility functions
pub mod utils;

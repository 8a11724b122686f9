pub mod api;
pub mod auth;
pub mod client;
pub mod config;
pub mod constants;
pub mod core;
pub mod infrastructure;

pub use client::{ApiClient, ClientError, Session};
pub use core::errors::{ExpenseError, SplitError};
pub use core::services::ExpenseService;

#[cfg(test)]
mod tests;

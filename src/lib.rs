//! # Orderly Client
//!
//! An async Rust client library for the Orderly Network EVM REST and WebSocket APIs.
//!
//! ## Features
//!
//! - Full REST API support for public market data and private trading
//! - Public and private WebSocket streams with automatic reconnection
//! - Per-topic message queues with in-order delivery
//! - Ed25519 request signing for authenticated endpoints
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use orderly_api_client::ws::PublicWsManager;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let ws = PublicWsManager::builder()
//!         .account_id("<account id>")
//!         .build()?;
//!
//!     // Topics registered before start are subscribed on connect.
//!     ws.subscribe("bbos");
//!     ws.start();
//!
//!     loop {
//!         let update = ws.recv("bbos").await?;
//!         println!("bbos: {update}");
//!     }
//! }
//! ```

pub mod auth;
pub mod error;
pub mod rest;
pub mod ws;

// Re-export commonly used types at crate root
pub use error::OrderlyError;

/// Result type alias using OrderlyError
pub type Result<T> = std::result::Result<T, OrderlyError>;

//! Orderly REST API.
//!
//! This module provides access to the Orderly EVM REST API, covering public
//! market data endpoints and private account and trading endpoints.
//!
//! # Example
//!
//! ```rust,no_run
//! use orderly_api_client::rest::RestClient;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = RestClient::new();
//!     let symbols = client.get_available_symbols().await?;
//!     println!("symbols: {}", symbols.data);
//!     Ok(())
//! }
//! ```

mod client;
pub mod endpoints;

pub use client::{ApiResponse, RestClient, RestClientBuilder};

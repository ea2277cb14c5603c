//! Orderly WebSocket API client.
//!
//! A single connection carries many logical topic streams. Topics are
//! registered with a manager, which routes every incoming frame into a
//! per-topic queue; consumers pull messages with [`recv`](WsTopicManager::recv).
//! When the connection drops, the manager reconnects and replays every
//! registered subscription, so consumers never see the gap.
//!
//! # Example
//!
//! ```rust,no_run
//! use orderly_api_client::ws::PublicWsManager;
//!
//! # async fn run() -> Result<(), orderly_api_client::OrderlyError> {
//! let ws = PublicWsManager::builder()
//!     .account_id("<your account id>")
//!     .build()?;
//!
//! ws.subscribe("bbos");
//! ws.start();
//!
//! loop {
//!     let bbos = ws.recv("bbos").await?;
//!     println!("bbos: {bbos}");
//! }
//! # }
//! ```

mod client;
mod manager;
pub mod messages;
mod private;
mod public;
mod registry;
mod session;

pub use client::{endpoints, WsConfig, WsConfigBuilder};
pub use manager::WsTopicManager;
pub use private::{PrivateWsManager, PrivateWsManagerBuilder};
pub use public::{PublicWsManager, PublicWsManagerBuilder};

//! Example: Public WebSocket market data streams.
//!
//! Run with: cargo run --example ws_market_data

use orderly_api_client::ws::PublicWsManager;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing for logging (optional)
    tracing_subscriber::fmt::init();

    let _ = dotenv::dotenv();
    let account_id = match std::env::var("ORDERLY_ACCOUNT_ID") {
        Ok(id) => id,
        Err(_) => {
            println!("Set ORDERLY_ACCOUNT_ID to run this example.");
            return Ok(());
        }
    };

    let ws = PublicWsManager::builder()
        .testnet()
        .account_id(account_id)
        .build()?;

    // Topics registered before start are subscribed on connect.
    ws.subscribe("bbos");
    ws.subscribe("PERP_ETH_USDC@trade");
    ws.start();

    for _ in 0..10 {
        let bbos = ws.recv("bbos").await?;
        println!("bbos: {bbos}");
    }

    // On-demand orderbook snapshot, delivered to its own topic queue.
    ws.request_orderbook("PERP_ETH_USDC")?;
    let snapshot = ws.recv("PERP_ETH_USDC@orderbook").await?;
    println!("orderbook snapshot: {snapshot}");

    ws.stop().await;
    Ok(())
}

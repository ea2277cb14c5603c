//! Example: Public REST market data.
//!
//! Run with: cargo run --example public_market_data

use orderly_api_client::rest::RestClient;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let client = RestClient::new();

    let info = client.get_maintenance_info().await?;
    println!("System status: {}", info.data);

    let symbols = client.get_available_symbols().await?;
    println!("Symbols: {}", symbols.data["rows"]);

    let market = client.get_futures_for_one_market("PERP_ETH_USDC").await?;
    println!("PERP_ETH_USDC: {}", market.data);

    let rate = client.get_funding_rates(Some("PERP_ETH_USDC")).await?;
    println!("Funding rate: {}", rate.data);

    let orderbook = client.get_orderbook("PERP_ETH_USDC", Some(5)).await?;
    println!("Orderbook: {}", orderbook.data);

    let klines = client
        .get_kline("PERP_ETH_USDC", "1h", &[("limit", "10".to_string())])
        .await?;
    println!("Klines: {}", klines.data);

    Ok(())
}

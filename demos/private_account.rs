use std::sync::Arc;

use orderly_api_client::auth::EnvCredentials;
use orderly_api_client::rest::RestClient;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _ = dotenv::dotenv();
    let credentials = match EnvCredentials::try_from_env() {
        Some(creds) => Arc::new(creds),
        None => {
            println!("Set ORDERLY_ACCOUNT_ID, ORDERLY_KEY and ORDERLY_SECRET to run this example.");
            return Ok(());
        }
    };

    let client = RestClient::builder()
        .testnet()
        .credentials(credentials)
        .build();

    let account = client.get_account_info().await?;
    println!("Account: {}", account.data);

    let holdings = client.get_current_holding().await?;
    println!("Holdings: {}", holdings.data);

    let positions = client.get_all_positions().await?;
    println!("Positions: {}", positions.data);

    let orders = client
        .get_orders(&[("symbol", "PERP_ETH_USDC".to_string())])
        .await?;
    println!("Orders: {}", orders.data);

    Ok(())
}

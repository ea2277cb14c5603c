use orderly_api_client::auth::{CredentialsProvider, EnvCredentials};
use orderly_api_client::ws::PrivateWsManager;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing for logging (optional)
    tracing_subscriber::fmt::init();

    let _ = dotenv::dotenv();
    let credentials = match EnvCredentials::try_from_env() {
        Some(creds) => creds.get_credentials().clone(),
        None => {
            println!("Set ORDERLY_ACCOUNT_ID, ORDERLY_KEY and ORDERLY_SECRET to run this example.");
            return Ok(());
        }
    };

    let ws = PrivateWsManager::builder()
        .testnet()
        .credentials(credentials)
        .build()?;

    ws.subscribe("position");
    ws.subscribe("balance");
    ws.start();

    // Each topic queue is consumable from its own task.
    let positions = {
        let ws = ws.clone();
        tokio::spawn(async move {
            while let Ok(update) = ws.recv("position").await {
                println!("position: {update}");
            }
        })
    };

    while let Ok(update) = ws.recv("balance").await {
        println!("balance: {update}");
    }

    positions.await?;
    Ok(())
}

//! Example: Working with OrderlyError and ApiError.
//!
//! Run with: cargo run --example error_handling

use orderly_api_client::OrderlyError;
use orderly_api_client::error::ApiError;

fn main() {
    let api_error = ApiError::new(429, -1003, "Too many requests");
    println!("API error: {}", api_error);
    println!("Is rate limit: {}", api_error.is_rate_limit());
    println!("Is auth error: {}", api_error.is_auth_error());

    let error = OrderlyError::Api(api_error);
    match &error {
        OrderlyError::Api(api) if api.is_rate_limit() => {
            println!("Back off and retry: {error}");
        }
        OrderlyError::Api(api) => println!("Request rejected with code {}", api.code),
        other => println!("Other error: {other}"),
    }

    // WebSocket-side errors carry the context needed to react.
    let rejected = OrderlyError::AckFailure {
        event: "subscribe".to_string(),
        message: "topic does not exist".to_string(),
    };
    println!("Control rejection: {rejected}");

    let unknown = OrderlyError::UnknownTopic {
        topic: "PERP_ETH_USDC@trade".to_string(),
    };
    println!("Routing error: {unknown}");
}

//! REST API endpoint constants.

/// Base URL for the Orderly EVM mainnet API.
pub const ORDERLY_MAINNET_URL: &str = "https://api-evm.orderly.org";

/// Base URL for the Orderly EVM testnet API.
pub const ORDERLY_TESTNET_URL: &str = "https://testnet-api-evm.orderly.org";

/// API version path segment.
pub const API_VERSION: &str = "v1";

/// Public endpoints (no authentication required).
pub mod public {
    /// Get system maintenance status.
    pub const SYSTEM_INFO: &str = "public/system_info";

    /// Get positions under liquidation.
    pub const LIQUIDATION: &str = "public/liquidation";

    /// Get liquidated positions info.
    pub const LIQUIDATED_POSITIONS: &str = "public/liquidated_positions";

    /// Get insurance fund info.
    pub const INSURANCE_FUND: &str = "public/insurancefund";

    /// Get available trading symbols.
    pub const SYMBOLS: &str = "public/info";

    /// Get futures info, per market with `/{symbol}`.
    pub const FUTURES: &str = "public/futures";

    /// Get funding rates for all markets.
    pub const FUNDING_RATES: &str = "public/funding_rates";

    /// Get the funding rate for one market with `/{symbol}`.
    pub const FUNDING_RATE: &str = "public/funding_rate";

    /// Get the orderbook snapshot for a market with `/{symbol}`.
    pub const ORDERBOOK: &str = "orderbook";

    /// Get kline data with `/{symbol}/{type}`.
    pub const KLINE: &str = "kline";

    /// Get recent market trades with `/{symbol}`.
    pub const MARKET_TRADES: &str = "market_trades";
}

/// Private endpoints (authentication required).
pub mod private {
    /// Get user statistics.
    pub const USER_STATISTICS: &str = "client/statistics";

    /// Create an order, or get/cancel one with `/{order_id}`.
    pub const ORDER: &str = "order";

    /// Get the orders list.
    pub const ORDERS: &str = "orders";

    /// Batch cancel orders.
    pub const BATCH_ORDER: &str = "batch-order";

    /// Claim liquidated positions.
    pub const CLAIM_LIQUIDATION: &str = "liquidation";

    /// Claim from the insurance fund.
    pub const CLAIM_INSURANCE_FUND: &str = "claim_insurance_fund";

    /// Get all positions info.
    pub const POSITIONS: &str = "positions";

    /// Get current holdings.
    pub const HOLDING: &str = "client/holding";

    /// Get account information.
    pub const ACCOUNT_INFO: &str = "client/info";

    /// Get trade history.
    pub const TRADES: &str = "trades";

    /// Get funding fee history.
    pub const FUNDING_FEE_HISTORY: &str = "funding_fee/history";
}

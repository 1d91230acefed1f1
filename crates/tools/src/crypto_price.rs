//! Crypto price lookup via the CoinGecko public API.

use async_trait::async_trait;
use loreagent_core::error::ToolError;
use loreagent_core::tool::{AgentContext, Tool, ToolOutput};
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;

pub struct CryptoPriceTool {
    client: reqwest::Client,
    base_url: String,
}

impl CryptoPriceTool {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(10))
                .build()
                .unwrap_or_default(),
            base_url: "https://api.coingecko.com/api/v3".into(),
        }
    }

    /// Point at a different endpoint (used by tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Map a ticker symbol to a CoinGecko asset id. Unknown symbols are
    /// passed through lowercased, which covers assets whose id matches
    /// their name.
    fn symbol_to_id(symbol: &str) -> String {
        match symbol.to_uppercase().as_str() {
            "BTC" => "bitcoin".into(),
            "ETH" => "ethereum".into(),
            "SOL" => "solana".into(),
            "DOGE" => "dogecoin".into(),
            "ADA" => "cardano".into(),
            "XRP" => "ripple".into(),
            _ => symbol.to_lowercase(),
        }
    }
}

impl Default for CryptoPriceTool {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Deserialize)]
struct PriceEntry {
    usd: f64,
}

#[async_trait]
impl Tool for CryptoPriceTool {
    fn name(&self) -> &str {
        "crypto_price"
    }

    fn description(&self) -> &str {
        "Get the current USD price of a cryptocurrency by ticker symbol, e.g. BTC or ETH."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "symbol": {
                    "type": "string",
                    "description": "Ticker symbol of the asset, e.g. 'BTC'"
                }
            },
            "required": ["symbol"]
        })
    }

    async fn invoke(
        &self,
        arguments: serde_json::Value,
        _ctx: Option<&dyn AgentContext>,
    ) -> Result<ToolOutput, ToolError> {
        let symbol = arguments["symbol"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'symbol' argument".into()))?;

        let id = Self::symbol_to_id(symbol);
        let url = format!("{}/simple/price?ids={id}&vs_currencies=usd", self.base_url);
        debug!(symbol, id = %id, "fetching price");

        let response = self.client.get(&url).send().await.map_err(|e| {
            ToolError::ExecutionFailed {
                tool_name: "crypto_price".into(),
                reason: e.to_string(),
            }
        })?;

        if !response.status().is_success() {
            return Ok(ToolOutput {
                error: Some(format!(
                    "price service returned status {}",
                    response.status().as_u16()
                )),
                ..Default::default()
            });
        }

        let prices: HashMap<String, PriceEntry> =
            response
                .json()
                .await
                .map_err(|e| ToolError::ExecutionFailed {
                    tool_name: "crypto_price".into(),
                    reason: format!("unparseable price response: {e}"),
                })?;

        match prices.get(&id) {
            Some(entry) => Ok(ToolOutput::text(format!(
                "{} is currently ${:.2} USD",
                symbol.to_uppercase(),
                entry.usd
            ))),
            None => Ok(ToolOutput {
                error: Some(format!("unknown asset: {symbol}")),
                ..Default::default()
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_symbols_map_to_ids() {
        assert_eq!(CryptoPriceTool::symbol_to_id("BTC"), "bitcoin");
        assert_eq!(CryptoPriceTool::symbol_to_id("btc"), "bitcoin");
        assert_eq!(CryptoPriceTool::symbol_to_id("ETH"), "ethereum");
    }

    #[test]
    fn unknown_symbols_pass_through_lowercased() {
        assert_eq!(CryptoPriceTool::symbol_to_id("Monero"), "monero");
    }

    #[tokio::test]
    async fn missing_symbol_is_invalid_arguments() {
        let tool = CryptoPriceTool::new();
        let err = tool.invoke(serde_json::json!({}), None).await.unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)));
    }
}

//! AI narrative report generation
//!
//! Condenses the latest market snapshot into a small JSON summary and hands
//! it to an OpenAI-compatible chat-completions endpoint, which is treated as
//! an opaque collaborator: we send a summary, we get back a five-section
//! JSON report. None of this runs inside the collection loop.

use crate::constants::{OPENAI_CHAT_COMPLETIONS_URL, REPORT_MODEL, REPORT_TOP_COINS};
use crate::error::ReportError;
use crate::types::{CoinSnapshot, GlobalMetricsSnapshot};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

const SYSTEM_PROMPT: &str = "You are a cryptocurrency market analyst expert. \
Analyze the provided market data and respond with a JSON object containing \
exactly these keys: market_overview, top_performers, risk_analysis, \
key_opportunities, technical_summary. Each key maps to an object with \
'summary' (string), 'key_points' (array of strings), 'metrics' (object of \
relevant numbers), 'risks' (array of strings), and 'opportunities' (array \
of strings). Keep the analysis concise but data-driven, with specific \
numbers and percentages where relevant.";

/// Condensed market summary sent to the report service
#[derive(Debug, Clone, Serialize)]
pub struct MarketSummary {
    pub global_stats: GlobalStats,
    pub top_coins: Vec<CoinStats>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GlobalStats {
    pub total_market_cap: f64,
    pub total_volume_24h: f64,
    pub btc_dominance: f64,
    pub eth_dominance: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct CoinStats {
    pub name: String,
    pub symbol: String,
    pub price_usd: f64,
    pub market_cap: f64,
    pub volume_24h: f64,
    pub percent_change_24h: f64,
}

impl MarketSummary {
    /// Builds a summary from the latest snapshots, keeping the top coins only
    pub fn build(global: &GlobalMetricsSnapshot, coins: &[CoinSnapshot]) -> Self {
        Self {
            global_stats: GlobalStats {
                total_market_cap: global.total_market_cap,
                total_volume_24h: global.total_volume_24h,
                btc_dominance: global.btc_dominance,
                eth_dominance: global.eth_dominance,
            },
            top_coins: coins
                .iter()
                .take(REPORT_TOP_COINS)
                .map(|c| CoinStats {
                    name: c.name.clone(),
                    symbol: c.symbol.clone(),
                    price_usd: c.price_usd,
                    market_cap: c.market_cap,
                    volume_24h: c.volume_24h,
                    percent_change_24h: c.percent_change_24h,
                })
                .collect(),
        }
    }
}

/// One section of the narrative report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportSection {
    pub summary: String,
    #[serde(default)]
    pub key_points: Vec<String>,
    #[serde(default)]
    pub metrics: Value,
    #[serde(default)]
    pub risks: Vec<String>,
    #[serde(default)]
    pub opportunities: Vec<String>,
}

/// Structured multi-section market report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketReport {
    pub market_overview: ReportSection,
    pub top_performers: ReportSection,
    pub risk_analysis: ReportSection,
    pub key_opportunities: ReportSection,
    pub technical_summary: ReportSection,
}

/// Client for the narrative-report service
pub struct ReportClient {
    client: Client,
    endpoint: String,
    api_key: String,
}

impl ReportClient {
    pub fn new(api_key: impl Into<String>) -> Result<Self, ReportError> {
        Self::with_endpoint(OPENAI_CHAT_COMPLETIONS_URL, api_key)
    }

    pub fn with_endpoint(
        endpoint: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Result<Self, ReportError> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .build()
            .map_err(ReportError::Network)?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            api_key: api_key.into(),
        })
    }

    /// Requests a narrative report for the given summary
    pub async fn generate(&self, summary: &MarketSummary) -> Result<MarketReport, ReportError> {
        let body = json!({
            "model": REPORT_MODEL,
            "messages": [
                { "role": "system", "content": SYSTEM_PROMPT },
                {
                    "role": "user",
                    "content": format!(
                        "Please analyze this market data:\n{}",
                        serde_json::to_string_pretty(summary)
                            .map_err(|e| ReportError::InvalidPayload(e.to_string()))?
                    )
                }
            ],
            "response_format": { "type": "json_object" },
            "temperature": 0.7
        });

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(ReportError::Network)?;

        let status = response.status();
        if !status.is_success() {
            return Err(ReportError::Http {
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }

        let reply: Value = response.json().await.map_err(ReportError::Network)?;
        parse_report(&reply)
    }
}

/// Extracts the report JSON from a chat-completions reply
fn parse_report(reply: &Value) -> Result<MarketReport, ReportError> {
    let content = reply
        .pointer("/choices/0/message/content")
        .and_then(Value::as_str)
        .ok_or_else(|| {
            ReportError::InvalidPayload("reply has no message content".to_string())
        })?;

    serde_json::from_str(content)
        .map_err(|e| ReportError::InvalidPayload(format!("report is not valid JSON: {e}")))
}

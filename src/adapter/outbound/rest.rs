//! Generic REST exchange gateway.
//!
//! Speaks a small normalized JSON protocol, so any exchange can be put
//! behind a gateway service that exposes it:
//!
//! - `GET  {api}/v1/balance`   returns `{"total": <decimal>}`
//! - `GET  {api}/v1/positions` returns an array of positions
//! - `POST {api}/v1/orders`    places a reduce-only market order
//!
//! Credentials travel in the `X-API-KEY` and `X-API-SECRET` headers.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client as HttpClient, RequestBuilder, StatusCode};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

use crate::domain::{resolve_opened_at, Position, Side, Symbol};
use crate::error::{ExchangeError, Result};
use crate::port::{ActionExecutor, CloseConfirmation, Credentials, ExchangeClient, SnapshotProvider};

const API_KEY_HEADER: &str = "X-API-KEY";
const API_SECRET_HEADER: &str = "X-API-SECRET";

#[derive(Debug, Deserialize)]
struct BalanceResponse {
    total: Decimal,
}

/// Position as reported by the gateway.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PositionDto {
    symbol: String,
    side: String,
    #[serde(default)]
    leverage: Option<Decimal>,
    entry_price: Decimal,
    mark_price: Decimal,
    contracts: Decimal,
    /// Open time in epoch milliseconds.
    #[serde(default)]
    timestamp: Option<i64>,
    /// Open time as ISO-8601, used when `timestamp` is absent.
    #[serde(default)]
    datetime: Option<String>,
    /// Exchange-computed P&L percent, authoritative when non-zero.
    #[serde(default)]
    percentage: Option<Decimal>,
}

impl PositionDto {
    fn into_position(self) -> Option<Position> {
        let side = match self.side.parse::<Side>() {
            Ok(side) => side,
            Err(e) => {
                warn!(symbol = %self.symbol, error = %e, "Skipping position with unknown side");
                return None;
            }
        };
        let symbol = match Symbol::try_new(self.symbol) {
            Ok(symbol) => symbol,
            Err(e) => {
                warn!(error = %e, "Skipping position without symbol");
                return None;
            }
        };

        let leverage = self.leverage.unwrap_or_else(|| {
            warn!(symbol = %symbol, "Position without leverage, assuming 1x");
            Decimal::ONE
        });

        Some(Position {
            symbol,
            side,
            leverage,
            entry_price: self.entry_price,
            mark_price: self.mark_price,
            contracts: self.contracts,
            opened_at: resolve_opened_at(self.timestamp, self.datetime.as_deref()),
            reported_pnl_percent: self.percentage,
        })
    }
}

/// Map the open entries of a positions payload.
///
/// Entries that cannot be mapped are left out of the excess-trade count,
/// so they are logged at error level.
fn open_positions(dtos: Vec<PositionDto>) -> Vec<Position> {
    let open: Vec<PositionDto> = dtos
        .into_iter()
        .filter(|p| p.contracts > Decimal::ZERO)
        .collect();
    let reported = open.len();
    let positions: Vec<Position> = open
        .into_iter()
        .filter_map(PositionDto::into_position)
        .collect();

    let skipped = reported - positions.len();
    if skipped > 0 {
        error!(skipped, reported, "Open positions dropped from evaluation");
    }
    positions
}

#[derive(Debug, Serialize)]
struct OrderRequest<'a> {
    symbol: &'a str,
    side: &'a str,
    #[serde(rename = "type")]
    order_type: &'a str,
    amount: Decimal,
    reduce_only: bool,
}

#[derive(Debug, Deserialize)]
struct OrderResponse {
    id: String,
}

/// REST gateway client.
pub struct RestExchange {
    http: HttpClient,
    base_url: String,
}

impl RestExchange {
    /// Create a client for the gateway at `base_url`.
    #[must_use]
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        let http = HttpClient::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|err| {
                warn!(error = %err, "Failed to build HTTP client, using defaults");
                HttpClient::new()
            });

        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn authed(&self, request: RequestBuilder, credentials: &Credentials) -> RequestBuilder {
        request
            .header(API_KEY_HEADER, &credentials.api_key)
            .header(API_SECRET_HEADER, &credentials.api_secret)
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn get_positions(&self, credentials: &Credentials) -> Result<Vec<PositionDto>> {
        let response = self
            .authed(self.http.get(self.url("/v1/positions")), credentials)
            .send()
            .await?
            .error_for_status()?;
        Ok(response.json().await?)
    }
}

fn balance_error(reason: impl Into<String>) -> ExchangeError {
    ExchangeError::BalanceUnavailable {
        reason: reason.into(),
    }
}

#[async_trait]
impl SnapshotProvider for RestExchange {
    async fn fetch_balance(&self, credentials: &Credentials) -> Result<Decimal> {
        let response = self
            .authed(self.http.get(self.url("/v1/balance")), credentials)
            .send()
            .await
            .map_err(|e| balance_error(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(ExchangeError::AuthFailed(format!("gateway returned {status}")).into());
        }
        if !status.is_success() {
            return Err(balance_error(format!("gateway returned {status}")).into());
        }

        let body: BalanceResponse = response
            .json()
            .await
            .map_err(|e| balance_error(e.to_string()))?;
        Ok(body.total)
    }

    async fn fetch_open_positions(&self, credentials: &Credentials) -> Vec<Position> {
        match self.get_positions(credentials).await {
            Ok(positions) => open_positions(positions),
            Err(e) => {
                warn!(error = %e, "Failed to fetch positions, treating as none open");
                Vec::new()
            }
        }
    }
}

#[async_trait]
impl ActionExecutor for RestExchange {
    async fn close_position(
        &self,
        credentials: &Credentials,
        symbol: &Symbol,
        side: Side,
        size: Decimal,
    ) -> Result<CloseConfirmation> {
        let close_failed = |reason: String| ExchangeError::CloseFailed {
            symbol: symbol.to_string(),
            reason,
        };

        let order = OrderRequest {
            symbol: symbol.as_str(),
            side: side.closing_order_side(),
            order_type: "market",
            amount: size,
            reduce_only: true,
        };
        debug!(symbol = %symbol, side = order.side, amount = %size, "Placing reduce-only order");

        let response = self
            .authed(self.http.post(self.url("/v1/orders")), credentials)
            .json(&order)
            .send()
            .await
            .map_err(|e| close_failed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(close_failed(format!("gateway returned {status}: {body}")).into());
        }

        let ack: OrderResponse = response
            .json()
            .await
            .map_err(|e| close_failed(e.to_string()))?;

        Ok(CloseConfirmation {
            order_id: ack.id,
            symbol: symbol.clone(),
            side,
            size,
        })
    }
}

impl ExchangeClient for RestExchange {
    fn name(&self) -> &'static str {
        "rest"
    }
}

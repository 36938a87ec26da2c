//! Alpaca API request and response types.
//!
//! These types map directly to Alpaca's REST API format. Quantities and
//! prices travel as strings.

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};

use super::error::AlpacaError;
use crate::application::ports::{BrokerOrder, BrokerOrderStatus, Holding, PlaceOrderRequest};
use crate::domain::shared::{BrokerOrderId, InstrumentId};

/// Market order request.
#[derive(Debug, Clone, Serialize)]
pub struct AlpacaOrderRequest {
    /// Stock symbol.
    pub symbol: String,
    /// Quantity (shares).
    pub qty: String,
    /// Order side.
    pub side: String,
    /// Order type.
    #[serde(rename = "type")]
    pub order_type: String,
    /// Time in force.
    pub time_in_force: String,
    /// Client order ID; Alpaca refuses a second order with the same value.
    pub client_order_id: String,
}

impl From<&PlaceOrderRequest> for AlpacaOrderRequest {
    fn from(request: &PlaceOrderRequest) -> Self {
        Self {
            symbol: request.instrument_id.to_string(),
            qty: request.quantity.to_string(),
            side: request.side.as_str().to_string(),
            order_type: "market".to_string(),
            time_in_force: "day".to_string(),
            client_order_id: request.client_order_id.to_string(),
        }
    }
}

/// Order response from Alpaca API.
#[derive(Debug, Clone, Deserialize)]
pub struct AlpacaOrderResponse {
    /// Broker order ID.
    pub id: String,
    /// Client order ID.
    #[serde(default)]
    pub client_order_id: Option<String>,
    /// Symbol.
    pub symbol: String,
    /// Filled quantity (as string).
    #[serde(default)]
    pub filled_qty: Option<String>,
    /// Average fill price (as string).
    #[serde(default)]
    pub filled_avg_price: Option<String>,
    /// Order status.
    pub status: String,
}

impl AlpacaOrderResponse {
    /// Convert to the port's order view.
    pub fn to_broker_order(&self) -> Result<BrokerOrder, AlpacaError> {
        let filled_qty = parse_quantity(self.filled_qty.as_deref())?;
        let avg_price = self
            .filled_avg_price
            .as_deref()
            .map(parse_decimal)
            .transpose()?;

        let status = match (self.status.as_str(), filled_qty, avg_price) {
            ("filled", quantity, Some(avg_price)) if quantity > 0 => BrokerOrderStatus::Filled {
                quantity,
                avg_price,
            },
            // Partially filled, then no more fills coming.
            ("canceled" | "expired" | "done_for_day", quantity, Some(avg_price)) if quantity > 0 => {
                BrokerOrderStatus::Filled {
                    quantity,
                    avg_price,
                }
            }
            ("rejected", _, _) => BrokerOrderStatus::Rejected {
                reason: "rejected by broker".to_string(),
            },
            ("canceled" | "expired" | "done_for_day", _, _) => BrokerOrderStatus::Cancelled {
                reason: self.status.clone(),
            },
            _ => BrokerOrderStatus::Working,
        };

        Ok(BrokerOrder {
            broker_order_id: BrokerOrderId::new(&self.id),
            client_order_id: self.client_order_id.clone(),
            status,
        })
    }
}

/// Account response from Alpaca API.
#[derive(Debug, Clone, Deserialize)]
pub struct AlpacaAccountResponse {
    /// Cash balance.
    pub cash: String,
}

/// Position response from Alpaca API.
#[derive(Debug, Clone, Deserialize)]
pub struct AlpacaPositionResponse {
    /// Symbol.
    pub symbol: String,
    /// Quantity (as string).
    pub qty: String,
    /// Average entry price (as string).
    pub avg_entry_price: String,
}

impl AlpacaPositionResponse {
    /// Convert to a holding.
    pub fn to_holding(&self) -> Result<Holding, AlpacaError> {
        Ok(Holding {
            instrument_id: InstrumentId::new(&self.symbol)
                .map_err(|e| AlpacaError::JsonParse(e.to_string()))?,
            quantity: parse_quantity(Some(&self.qty))?,
            avg_price: parse_decimal(&self.avg_entry_price)?,
        })
    }
}

/// Latest trade response from the data API.
#[derive(Debug, Clone, Deserialize)]
pub struct AlpacaLatestTradeResponse {
    /// Trade.
    pub trade: AlpacaTrade,
}

/// One trade print.
#[derive(Debug, Clone, Deserialize)]
pub struct AlpacaTrade {
    /// Price.
    #[serde(rename = "p")]
    pub price: Decimal,
}

/// Error response from Alpaca API.
#[derive(Debug, Clone, Deserialize)]
pub struct AlpacaErrorResponse {
    /// Error code.
    #[serde(default, deserialize_with = "code_as_string")]
    pub code: Option<String>,
    /// Error message.
    pub message: String,
}

fn code_as_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.map(|v| match v {
        serde_json::Value::String(s) => s,
        other => other.to_string(),
    }))
}

fn parse_decimal(value: &str) -> Result<Decimal, AlpacaError> {
    value
        .parse()
        .map_err(|_| AlpacaError::JsonParse(format!("not a decimal: {value:?}")))
}

/// Whole shares; fractional quantities are truncated.
fn parse_quantity(value: Option<&str>) -> Result<u64, AlpacaError> {
    let Some(value) = value else {
        return Ok(0);
    };
    let decimal = parse_decimal(value)?;
    decimal
        .trunc()
        .to_u64()
        .ok_or_else(|| AlpacaError::JsonParse(format!("not a share count: {value:?}")))
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;
    use test_case::test_case;

    use super::*;

    fn order(status: &str, filled_qty: &str, avg: Option<&str>) -> AlpacaOrderResponse {
        AlpacaOrderResponse {
            id: "b-1".into(),
            client_order_id: Some("c-1".into()),
            symbol: "AAPL".into(),
            filled_qty: Some(filled_qty.into()),
            filled_avg_price: avg.map(Into::into),
            status: status.into(),
        }
    }

    #[test]
    fn filled_order_maps_to_fill() {
        let order = order("filled", "10", Some("185.31")).to_broker_order().unwrap();
        assert_eq!(
            order.status,
            BrokerOrderStatus::Filled {
                quantity: 10,
                avg_price: dec!(185.31)
            }
        );
    }

    #[test]
    fn partially_filled_then_canceled_keeps_the_fill() {
        let order = order("canceled", "4", Some("185")).to_broker_order().unwrap();
        assert_eq!(
            order.status,
            BrokerOrderStatus::Filled {
                quantity: 4,
                avg_price: dec!(185)
            }
        );
    }

    #[test_case("new" ; "new")]
    #[test_case("accepted" ; "accepted")]
    #[test_case("partially_filled" ; "partial")]
    #[test_case("pending_new" ; "pending")]
    fn open_states_are_working(status: &str) {
        let order = order(status, "0", None).to_broker_order().unwrap();
        assert_eq!(order.status, BrokerOrderStatus::Working);
    }

    #[test]
    fn rejected_and_expired() {
        assert!(matches!(
            order("rejected", "0", None).to_broker_order().unwrap().status,
            BrokerOrderStatus::Rejected { .. }
        ));
        assert!(matches!(
            order("expired", "0", None).to_broker_order().unwrap().status,
            BrokerOrderStatus::Cancelled { .. }
        ));
    }

    #[test]
    fn fractional_quantity_truncates() {
        assert_eq!(parse_quantity(Some("12.75")).unwrap(), 12);
        assert_eq!(parse_quantity(None).unwrap(), 0);
        assert!(parse_quantity(Some("abc")).is_err());
    }
}

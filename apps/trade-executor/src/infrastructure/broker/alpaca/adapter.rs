//! Alpaca implementation of `BrokerPort`.

use async_trait::async_trait;
use rust_decimal::Decimal;

use super::api_types::{
    AlpacaAccountResponse, AlpacaLatestTradeResponse, AlpacaOrderRequest, AlpacaOrderResponse,
    AlpacaPositionResponse,
};
use super::config::{AlpacaConfig, AlpacaEnvironment};
use super::error::AlpacaError;
use super::http_client::AlpacaHttpClient;
use crate::application::ports::{
    Balance, BrokerError, BrokerOrder, BrokerPort, PlaceOrderRequest,
};
use crate::domain::order_execution::IdempotencyKey;
use crate::domain::shared::{BrokerOrderId, InstrumentId};

/// Alpaca Markets broker adapter.
#[derive(Debug, Clone)]
pub struct AlpacaBrokerAdapter {
    client: AlpacaHttpClient,
    environment: AlpacaEnvironment,
}

impl AlpacaBrokerAdapter {
    /// Create a new adapter.
    pub fn new(config: &AlpacaConfig) -> Result<Self, AlpacaError> {
        let client = AlpacaHttpClient::new(config)?;
        tracing::info!(
            environment = %config.environment,
            base_url = config.trading_base_url(),
            "Alpaca broker adapter ready"
        );
        Ok(Self {
            client,
            environment: config.environment,
        })
    }

    /// Check if this adapter trades real money.
    #[must_use]
    pub const fn is_live(&self) -> bool {
        self.environment.is_live()
    }

    async fn lookup_client_order(
        &self,
        client_order_id: &IdempotencyKey,
    ) -> Result<Option<BrokerOrder>, AlpacaError> {
        let path = format!("/v2/orders:by_client_order_id?client_order_id={client_order_id}");
        self.client
            .get_optional::<AlpacaOrderResponse>(&path)
            .await?
            .map(|o| o.to_broker_order())
            .transpose()
    }
}

#[async_trait]
impl BrokerPort for AlpacaBrokerAdapter {
    async fn place_order(&self, request: &PlaceOrderRequest) -> Result<BrokerOrderId, BrokerError> {
        let body = AlpacaOrderRequest::from(request);
        match self
            .client
            .post::<AlpacaOrderResponse, _>("/v2/orders", &body)
            .await
        {
            Ok(response) => Ok(BrokerOrderId::new(response.id)),
            // Alpaca refuses a reused client order id; the earlier order is ours.
            Err(AlpacaError::OrderRejected(message)) if message.contains("client_order_id") => {
                match self.lookup_client_order(&request.client_order_id).await? {
                    Some(existing) => Ok(existing.broker_order_id),
                    None => Err(BrokerError::Rejected { reason: message }),
                }
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn get_order_status(
        &self,
        broker_order_id: &BrokerOrderId,
    ) -> Result<BrokerOrder, BrokerError> {
        let response: AlpacaOrderResponse = self
            .client
            .get(&format!("/v2/orders/{broker_order_id}"))
            .await
            .map_err(|e| match e {
                AlpacaError::NotFound(_) => AlpacaError::NotFound(broker_order_id.to_string()),
                other => other,
            })?;
        Ok(response.to_broker_order()?)
    }

    async fn find_order(
        &self,
        client_order_id: &IdempotencyKey,
    ) -> Result<Option<BrokerOrder>, BrokerError> {
        Ok(self.lookup_client_order(client_order_id).await?)
    }

    async fn get_price(&self, instrument_id: &InstrumentId) -> Result<Decimal, BrokerError> {
        let response: AlpacaLatestTradeResponse = self
            .client
            .data_get(&format!("/v2/stocks/{instrument_id}/trades/latest"))
            .await
            .map_err(|e| match e {
                AlpacaError::NotFound(_) => BrokerError::InvalidInstrument {
                    instrument: instrument_id.to_string(),
                },
                other => other.into(),
            })?;
        if response.trade.price <= Decimal::ZERO {
            return Err(BrokerError::Protocol {
                message: format!("non-positive price for {instrument_id}"),
            });
        }
        Ok(response.trade.price)
    }

    async fn get_balance(&self) -> Result<Balance, BrokerError> {
        let account: AlpacaAccountResponse = self.client.get("/v2/account").await?;
        let positions: Vec<AlpacaPositionResponse> = self.client.get("/v2/positions").await?;

        let cash = account
            .cash
            .parse()
            .map_err(|_| AlpacaError::JsonParse(format!("cash {:?}", account.cash)))?;
        let holdings = positions
            .iter()
            .map(AlpacaPositionResponse::to_holding)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Balance { cash, holdings })
    }
}

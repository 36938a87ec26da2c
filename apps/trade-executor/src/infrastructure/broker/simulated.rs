//! In-process simulated broker.
//!
//! Fills market orders against a settable quote (or the request's reference
//! price), tracks cash and holdings, and deduplicates on client order id the
//! way a real brokerage does. Failures can be queued to exercise retry paths.

use std::collections::{BTreeMap, HashMap, VecDeque};

use async_trait::async_trait;
use parking_lot::Mutex;
use rust_decimal::Decimal;

use crate::application::ports::{
    Balance, BrokerError, BrokerOrder, BrokerOrderStatus, BrokerPort, Holding, PlaceOrderRequest,
};
use crate::domain::order_execution::{IdempotencyKey, OrderSide};
use crate::domain::portfolio::Portfolio;
use crate::domain::shared::{BrokerOrderId, InstrumentId};

/// When accepted orders fill.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FillMode {
    /// Fill on acceptance.
    #[default]
    Immediate,
    /// Stay working until [`SimulatedBroker::fill_working`].
    Manual,
}

#[derive(Debug, Clone)]
struct SimOrder {
    client_order_id: IdempotencyKey,
    request: PlaceOrderRequest,
    status: BrokerOrderStatus,
}

#[derive(Debug, Default)]
struct SimState {
    cash: Decimal,
    holdings: BTreeMap<InstrumentId, Holding>,
    quotes: HashMap<InstrumentId, Decimal>,
    last_trades: HashMap<InstrumentId, Decimal>,
    orders: HashMap<BrokerOrderId, SimOrder>,
    by_client: HashMap<IdempotencyKey, BrokerOrderId>,
    failures: VecDeque<BrokerError>,
    fill_mode: FillMode,
    submissions: usize,
    next_id: u64,
}

impl SimState {
    fn fill_price(&self, request: &PlaceOrderRequest) -> Decimal {
        self.quotes
            .get(&request.instrument_id)
            .copied()
            .unwrap_or(request.reference_price)
    }

    fn check_funds(&self, request: &PlaceOrderRequest) -> Result<(), BrokerError> {
        let price = self.fill_price(request);
        match request.side {
            OrderSide::Buy => {
                let notional = price * Decimal::from(request.quantity);
                if notional > self.cash {
                    return Err(BrokerError::InsufficientFunds {
                        message: format!("need {notional}, have {}", self.cash),
                    });
                }
            }
            OrderSide::Sell => {
                let held = self
                    .holdings
                    .get(&request.instrument_id)
                    .map_or(0, |h| h.quantity);
                if held < request.quantity {
                    return Err(BrokerError::Rejected {
                        reason: format!(
                            "cannot sell {} {}, holding {held}",
                            request.quantity, request.instrument_id
                        ),
                    });
                }
            }
        }
        Ok(())
    }

    fn settle(&mut self, request: &PlaceOrderRequest) -> BrokerOrderStatus {
        if let Err(e) = self.check_funds(request) {
            return BrokerOrderStatus::Rejected {
                reason: e.to_string(),
            };
        }
        let price = self.fill_price(request);
        let quantity = request.quantity;
        let notional = price * Decimal::from(quantity);
        match request.side {
            OrderSide::Buy => {
                self.cash -= notional;
                let holding = self
                    .holdings
                    .entry(request.instrument_id.clone())
                    .or_insert_with(|| Holding {
                        instrument_id: request.instrument_id.clone(),
                        quantity: 0,
                        avg_price: price,
                    });
                let total = holding.quantity + quantity;
                holding.avg_price = (holding.avg_price * Decimal::from(holding.quantity) + notional)
                    / Decimal::from(total);
                holding.quantity = total;
            }
            OrderSide::Sell => {
                self.cash += notional;
                if let Some(holding) = self.holdings.get_mut(&request.instrument_id) {
                    holding.quantity -= quantity;
                    if holding.quantity == 0 {
                        self.holdings.remove(&request.instrument_id);
                    }
                }
            }
        }
        self.last_trades.insert(request.instrument_id.clone(), price);
        BrokerOrderStatus::Filled {
            quantity,
            avg_price: price,
        }
    }
}

/// Paper broker living inside the process.
#[derive(Debug, Default)]
pub struct SimulatedBroker {
    state: Mutex<SimState>,
}

impl SimulatedBroker {
    /// Broker account holding `cash`.
    #[must_use]
    pub fn new(cash: Decimal) -> Self {
        Self {
            state: Mutex::new(SimState {
                cash,
                ..SimState::default()
            }),
        }
    }

    /// Account resuming a persisted portfolio: same cash, one holding per
    /// held position, last trade at the entry price.
    #[must_use]
    pub fn from_portfolio(portfolio: &Portfolio) -> Self {
        let mut state = SimState {
            cash: portfolio.cash,
            ..SimState::default()
        };
        for position in portfolio.positions.values().filter(|p| p.quantity > 0) {
            state
                .last_trades
                .insert(position.instrument_id.clone(), position.entry_price);
            state.holdings.insert(
                position.instrument_id.clone(),
                Holding {
                    instrument_id: position.instrument_id.clone(),
                    quantity: position.quantity,
                    avg_price: position.entry_price,
                },
            );
        }
        Self {
            state: Mutex::new(state),
        }
    }

    /// Set the quote for an instrument.
    pub fn set_price(&self, instrument_id: &InstrumentId, price: Decimal) {
        self.state.lock().quotes.insert(instrument_id.clone(), price);
    }

    /// Fail the next `place_order` call with `error`.
    pub fn push_failure(&self, error: BrokerError) {
        self.state.lock().failures.push_back(error);
    }

    /// Choose when orders fill.
    pub fn set_fill_mode(&self, mode: FillMode) {
        self.state.lock().fill_mode = mode;
    }

    /// Fill every working order at the current quote.
    pub fn fill_working(&self) -> usize {
        let mut state = self.state.lock();
        let working: Vec<BrokerOrderId> = state
            .orders
            .iter()
            .filter(|(_, o)| o.status == BrokerOrderStatus::Working)
            .map(|(id, _)| id.clone())
            .collect();
        for id in &working {
            let Some(request) = state.orders.get(id).map(|o| o.request.clone()) else {
                continue;
            };
            let status = state.settle(&request);
            if let Some(order) = state.orders.get_mut(id) {
                order.status = status;
            }
        }
        working.len()
    }

    /// Give the account an existing holding.
    pub fn seed_holding(&self, holding: Holding) {
        self.state
            .lock()
            .holdings
            .insert(holding.instrument_id.clone(), holding);
    }

    /// `place_order` calls received, including failed ones.
    #[must_use]
    pub fn submissions(&self) -> usize {
        self.state.lock().submissions
    }

    /// Distinct orders accepted.
    #[must_use]
    pub fn order_count(&self) -> usize {
        self.state.lock().orders.len()
    }

    /// Account cash.
    #[must_use]
    pub fn cash(&self) -> Decimal {
        self.state.lock().cash
    }
}

#[async_trait]
impl BrokerPort for SimulatedBroker {
    async fn place_order(&self, request: &PlaceOrderRequest) -> Result<BrokerOrderId, BrokerError> {
        let mut state = self.state.lock();
        state.submissions += 1;
        if let Some(error) = state.failures.pop_front() {
            return Err(error);
        }
        if let Some(existing) = state.by_client.get(&request.client_order_id) {
            return Ok(existing.clone());
        }
        if request.quantity == 0 {
            return Err(BrokerError::Rejected {
                reason: "quantity must be positive".to_string(),
            });
        }
        state.check_funds(request)?;

        state.next_id += 1;
        let id = BrokerOrderId::new(format!("sim-{:06}", state.next_id));
        let status = match state.fill_mode {
            FillMode::Immediate => state.settle(request),
            FillMode::Manual => BrokerOrderStatus::Working,
        };
        state.orders.insert(
            id.clone(),
            SimOrder {
                client_order_id: request.client_order_id,
                request: request.clone(),
                status,
            },
        );
        state.by_client.insert(request.client_order_id, id.clone());
        tracing::debug!(
            broker_order_id = %id,
            instrument = %request.instrument_id,
            side = %request.side,
            quantity = request.quantity,
            "Simulated order accepted"
        );
        Ok(id)
    }

    async fn get_order_status(
        &self,
        broker_order_id: &BrokerOrderId,
    ) -> Result<BrokerOrder, BrokerError> {
        let state = self.state.lock();
        state
            .orders
            .get(broker_order_id)
            .map(|o| BrokerOrder {
                broker_order_id: broker_order_id.clone(),
                client_order_id: Some(o.client_order_id.to_string()),
                status: o.status.clone(),
            })
            .ok_or_else(|| BrokerError::OrderNotFound {
                order_id: broker_order_id.to_string(),
            })
    }

    async fn find_order(
        &self,
        client_order_id: &IdempotencyKey,
    ) -> Result<Option<BrokerOrder>, BrokerError> {
        let state = self.state.lock();
        Ok(state.by_client.get(client_order_id).and_then(|id| {
            state.orders.get(id).map(|o| BrokerOrder {
                broker_order_id: id.clone(),
                client_order_id: Some(client_order_id.to_string()),
                status: o.status.clone(),
            })
        }))
    }

    async fn get_price(&self, instrument_id: &InstrumentId) -> Result<Decimal, BrokerError> {
        let state = self.state.lock();
        state
            .quotes
            .get(instrument_id)
            .or_else(|| state.last_trades.get(instrument_id))
            .copied()
            .ok_or_else(|| BrokerError::InvalidInstrument {
                instrument: instrument_id.to_string(),
            })
    }

    async fn get_balance(&self) -> Result<Balance, BrokerError> {
        let state = self.state.lock();
        Ok(Balance {
            cash: state.cash,
            holdings: state.holdings.values().cloned().collect(),
        })
    }
}

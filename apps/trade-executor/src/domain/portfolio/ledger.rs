//! The ledger: every piece of state the store persists, and the mutations
//! that move it forward.
//!
//! Mutations are applied to a clone first and only swapped in after the
//! clone has been persisted, so `apply` is free to fail halfway.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::{DailyState, DaySummary, Position, PositionStatus, TradeRecord};
use crate::domain::order_execution::{
    Fill, IdempotencyKey, Order, OrderSide, OrderStatus,
};
use crate::domain::shared::{BrokerOrderId, InstrumentId, TradingMode};

/// Violations of the ledger's state machine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    /// No order with this key.
    #[error("unknown order {0}")]
    UnknownOrder(IdempotencyKey),

    /// Key already reserved by a live or filled order.
    #[error("order {0} already reserved")]
    DuplicateOrder(IdempotencyKey),

    /// Transition not allowed from the current status.
    #[error("order {key} cannot move from {from} to {to}")]
    InvalidTransition {
        /// Order key.
        key: IdempotencyKey,
        /// Current status.
        from: OrderStatus,
        /// Requested status.
        to: OrderStatus,
    },

    /// Sell against a position that is not open.
    #[error("no open position in {0}")]
    NoOpenPosition(InstrumentId),

    /// Buy while an exit is in flight.
    #[error("position in {0} is closing")]
    PositionBusy(InstrumentId),

    /// Adoption of an instrument already tracked.
    #[error("position in {0} already tracked")]
    PositionExists(InstrumentId),

    /// Fill quantity outside the order.
    #[error("invalid fill for {key}: {reason}")]
    InvalidFill {
        /// Order key.
        key: IdempotencyKey,
        /// Why it was refused.
        reason: String,
    },

    /// Rollover to a day that is not after the current one.
    #[error("cannot roll over from {current} to {requested}")]
    StaleRollover {
        /// Stored trading day.
        current: NaiveDate,
        /// Requested trading day.
        requested: NaiveDate,
    },
}

/// Cash plus positions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Portfolio {
    /// Available cash.
    pub cash: Decimal,
    /// Positions keyed by instrument.
    pub positions: BTreeMap<InstrumentId, Position>,
}

impl Portfolio {
    /// Empty portfolio holding `cash`.
    #[must_use]
    pub const fn with_cash(cash: Decimal) -> Self {
        Self {
            cash,
            positions: BTreeMap::new(),
        }
    }

    /// Cash plus cost basis of every position.
    #[must_use]
    pub fn value(&self) -> Decimal {
        self.cash + self.positions.values().map(Position::cost_basis).sum::<Decimal>()
    }

    /// Cost basis held in one instrument.
    #[must_use]
    pub fn exposure(&self, instrument_id: &InstrumentId) -> Decimal {
        self.positions
            .get(instrument_id)
            .map_or(Decimal::ZERO, Position::cost_basis)
    }

    /// Positions in `Open` status.
    pub fn open_positions(&self) -> impl Iterator<Item = &Position> {
        self.positions
            .values()
            .filter(|p| p.status == PositionStatus::Open && p.quantity > 0)
    }
}

/// An atomic state change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    /// Start a new trading day, archiving the previous one.
    Rollover {
        /// New day.
        trading_day: NaiveDate,
    },
    /// Set or clear the operator pause.
    SetPaused {
        /// New value.
        paused: bool,
    },
    /// Reserve an idempotency key with a pending order.
    Reserve {
        /// The pending order.
        order: Order,
    },
    /// Broker acknowledged the order.
    MarkSubmitted {
        /// Order key.
        key: IdempotencyKey,
        /// Broker id.
        broker_order_id: BrokerOrderId,
        /// Time.
        at: DateTime<Utc>,
    },
    /// Broker confirmed a fill.
    RecordFill {
        /// Order key.
        key: IdempotencyKey,
        /// Fill details.
        fill: Fill,
    },
    /// Broker refused the order.
    RecordRejected {
        /// Order key.
        key: IdempotencyKey,
        /// Reason.
        reason: String,
        /// Time.
        at: DateTime<Utc>,
    },
    /// Submission given up.
    RecordFailed {
        /// Order key.
        key: IdempotencyKey,
        /// Reason.
        reason: String,
        /// Time.
        at: DateTime<Utc>,
    },
    /// Replace cash with the broker's figure.
    SyncCash {
        /// Broker cash.
        cash: Decimal,
    },
    /// Track a holding the broker reports but the ledger lacks.
    AdoptPosition {
        /// Position to track.
        position: Position,
    },
    /// Forget a position the broker does not hold.
    DropPosition {
        /// Instrument.
        instrument_id: InstrumentId,
    },
}

/// Everything the state store persists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ledger {
    /// Account mode the ledger was created under.
    pub mode: TradingMode,
    /// Today's counters.
    pub daily: DailyState,
    /// Cash and positions.
    pub portfolio: Portfolio,
    /// Orders of the current day plus any still in flight.
    pub orders: BTreeMap<IdempotencyKey, Order>,
    /// Every confirmed fill.
    pub history: Vec<TradeRecord>,
    /// Finished days.
    pub archive: Vec<DaySummary>,
    /// Incremented by every applied mutation.
    pub revision: u64,
}

impl Ledger {
    /// Fresh ledger for `mode` starting on `trading_day` with `cash`.
    #[must_use]
    pub const fn new(mode: TradingMode, trading_day: NaiveDate, cash: Decimal) -> Self {
        Self {
            mode,
            daily: DailyState::new(trading_day, cash),
            portfolio: Portfolio::with_cash(cash),
            orders: BTreeMap::new(),
            history: Vec::new(),
            archive: Vec::new(),
            revision: 0,
        }
    }

    /// Today's buys that are reserved or working at the broker.
    #[must_use]
    pub fn pending_buy_count(&self) -> u32 {
        self.orders
            .values()
            .filter(|o| {
                o.side == OrderSide::Buy
                    && o.status.is_in_flight()
                    && o.trading_day == self.daily.trading_day
            })
            .count() as u32
    }

    /// Notional of in-flight buys for one instrument.
    #[must_use]
    pub fn pending_buy_exposure(&self, instrument_id: &InstrumentId) -> Decimal {
        self.orders
            .values()
            .filter(|o| {
                o.side == OrderSide::Buy
                    && o.status.is_in_flight()
                    && &o.instrument_id == instrument_id
            })
            .map(Order::requested_amount)
            .sum()
    }

    /// Whether the instrument was bought (or is being bought) today.
    #[must_use]
    pub fn bought_today(&self, instrument_id: &InstrumentId) -> bool {
        self.orders.values().any(|o| {
            o.side == OrderSide::Buy
                && &o.instrument_id == instrument_id
                && o.trading_day == self.daily.trading_day
                && matches!(
                    o.status,
                    OrderStatus::Pending | OrderStatus::Submitted | OrderStatus::Filled
                )
        })
    }

    /// Orders still reserved or working.
    pub fn in_flight_orders(&self) -> impl Iterator<Item = &Order> {
        self.orders.values().filter(|o| o.status.is_in_flight())
    }

    /// Lowest intent sequence for `instrument|side` today whose key is unused.
    #[must_use]
    pub fn next_intent_seq(&self, instrument_id: &InstrumentId, side: OrderSide) -> u64 {
        let mut seq = self.daily.next_seq_hint(instrument_id, side);
        while self.orders.contains_key(&IdempotencyKey::derive(
            instrument_id,
            side,
            self.daily.trading_day,
            seq,
        )) {
            seq += 1;
        }
        seq
    }

    /// Apply one mutation in place.
    pub fn apply(&mut self, mutation: Mutation) -> Result<(), LedgerError> {
        match mutation {
            Mutation::Rollover { trading_day } => self.rollover(trading_day)?,
            Mutation::SetPaused { paused } => self.daily.paused = paused,
            Mutation::Reserve { order } => self.reserve(order)?,
            Mutation::MarkSubmitted {
                key,
                broker_order_id,
                at,
            } => {
                let order = self.order_mut(key)?;
                match order.status {
                    OrderStatus::Pending | OrderStatus::Submitted => {
                        order.status = OrderStatus::Submitted;
                        order.broker_order_id = Some(broker_order_id);
                        order.updated_at = at;
                    }
                    from => {
                        return Err(LedgerError::InvalidTransition {
                            key,
                            from,
                            to: OrderStatus::Submitted,
                        });
                    }
                }
            }
            Mutation::RecordFill { key, fill } => self.record_fill(key, fill)?,
            Mutation::RecordRejected { key, reason, at } => {
                self.close_unfilled(key, OrderStatus::Rejected, reason, at)?;
            }
            Mutation::RecordFailed { key, reason, at } => {
                self.close_unfilled(key, OrderStatus::Failed, reason, at)?;
            }
            Mutation::SyncCash { cash } => {
                let traded_today = self
                    .orders
                    .values()
                    .any(|o| o.trading_day == self.daily.trading_day);
                self.portfolio.cash = cash;
                if !traded_today && self.daily.realized_pnl.is_zero() {
                    self.daily.day_start_value = self.portfolio.value();
                }
            }
            Mutation::AdoptPosition { position } => {
                if self.portfolio.positions.contains_key(&position.instrument_id) {
                    return Err(LedgerError::PositionExists(position.instrument_id));
                }
                self.portfolio
                    .positions
                    .insert(position.instrument_id.clone(), position);
            }
            Mutation::DropPosition { instrument_id } => {
                if self.portfolio.positions.remove(&instrument_id).is_none() {
                    return Err(LedgerError::NoOpenPosition(instrument_id));
                }
            }
        }
        self.revision += 1;
        Ok(())
    }

    fn order_mut(&mut self, key: IdempotencyKey) -> Result<&mut Order, LedgerError> {
        self.orders
            .get_mut(&key)
            .ok_or(LedgerError::UnknownOrder(key))
    }

    fn rollover(&mut self, trading_day: NaiveDate) -> Result<(), LedgerError> {
        if trading_day <= self.daily.trading_day {
            return Err(LedgerError::StaleRollover {
                current: self.daily.trading_day,
                requested: trading_day,
            });
        }

        let (finished, live): (BTreeMap<_, _>, BTreeMap<_, _>) = std::mem::take(&mut self.orders)
            .into_iter()
            .partition(|(_, o)| o.status.is_terminal());
        self.orders = live;

        let closing_value = self.portfolio.value();
        self.archive.push(DaySummary {
            trading_day: self.daily.trading_day,
            buy_count: self.daily.buy_count,
            realized_pnl: self.daily.realized_pnl,
            day_start_value: self.daily.day_start_value,
            closing_value,
            paused: self.daily.paused,
            orders: finished.into_values().collect(),
        });
        self.daily = DailyState::new(trading_day, closing_value);
        Ok(())
    }

    fn reserve(&mut self, order: Order) -> Result<(), LedgerError> {
        if let Some(existing) = self.orders.get(&order.key)
            && !matches!(existing.status, OrderStatus::Rejected | OrderStatus::Failed)
        {
            return Err(LedgerError::DuplicateOrder(order.key));
        }

        match order.side {
            OrderSide::Buy => match self.portfolio.positions.get(&order.instrument_id) {
                Some(p) if p.status == PositionStatus::Closing => {
                    return Err(LedgerError::PositionBusy(order.instrument_id));
                }
                Some(_) => {}
                None => {
                    self.portfolio.positions.insert(
                        order.instrument_id.clone(),
                        Position {
                            instrument_id: order.instrument_id.clone(),
                            entry_price: order.requested_price,
                            quantity: 0,
                            entry_at: order.created_at,
                            status: PositionStatus::Opening,
                        },
                    );
                }
            },
            OrderSide::Sell => match self.portfolio.positions.get_mut(&order.instrument_id) {
                Some(p) if p.status == PositionStatus::Open && p.quantity >= order.quantity => {
                    p.status = PositionStatus::Closing;
                }
                Some(p) if p.status == PositionStatus::Closing => {
                    return Err(LedgerError::PositionBusy(order.instrument_id));
                }
                _ => return Err(LedgerError::NoOpenPosition(order.instrument_id)),
            },
        }

        if order.trading_day == self.daily.trading_day {
            let slot = DailyState::seq_slot(&order.instrument_id, order.side);
            let next = self.daily.intent_seqs.entry(slot).or_insert(0);
            *next = (*next).max(order.intent_seq + 1);
        }
        self.orders.insert(order.key, order);
        Ok(())
    }

    fn record_fill(&mut self, key: IdempotencyKey, fill: Fill) -> Result<(), LedgerError> {
        let order = self
            .orders
            .get(&key)
            .ok_or(LedgerError::UnknownOrder(key))?
            .clone();
        if !order.status.is_in_flight() {
            return Err(LedgerError::InvalidTransition {
                key,
                from: order.status,
                to: OrderStatus::Filled,
            });
        }
        if fill.quantity == 0 || fill.quantity > order.quantity {
            return Err(LedgerError::InvalidFill {
                key,
                reason: format!(
                    "filled {} of {} requested",
                    fill.quantity, order.quantity
                ),
            });
        }

        let today = order.trading_day == self.daily.trading_day;
        let notional = fill.price * Decimal::from(fill.quantity);
        let (realized_pnl, position_status) = match order.side {
            OrderSide::Buy => {
                self.portfolio.cash -= notional;
                let position = self
                    .portfolio
                    .positions
                    .entry(order.instrument_id.clone())
                    .or_insert_with(|| Position {
                        instrument_id: order.instrument_id.clone(),
                        entry_price: fill.price,
                        quantity: 0,
                        entry_at: fill.filled_at,
                        status: PositionStatus::Opening,
                    });
                if position.status == PositionStatus::Opening {
                    position.entry_price = fill.price;
                    position.quantity = fill.quantity;
                    position.entry_at = fill.filled_at;
                    position.status = PositionStatus::Open;
                } else {
                    position.add_fill(fill.quantity, fill.price);
                }
                if today {
                    self.daily.buy_count += 1;
                }
                (None, position.status)
            }
            OrderSide::Sell => {
                let position = self
                    .portfolio
                    .positions
                    .get_mut(&order.instrument_id)
                    .ok_or_else(|| LedgerError::NoOpenPosition(order.instrument_id.clone()))?;
                let sold = fill.quantity.min(position.quantity);
                let pnl = (fill.price - position.entry_price) * Decimal::from(sold);
                position.quantity -= sold;
                self.portfolio.cash += notional;
                let status = if position.quantity == 0 {
                    self.portfolio.positions.remove(&order.instrument_id);
                    PositionStatus::Closed
                } else {
                    position.status = PositionStatus::Open;
                    PositionStatus::Open
                };
                if today {
                    self.daily.realized_pnl += pnl;
                }
                (Some(pnl), status)
            }
        };

        self.history.push(TradeRecord {
            key,
            instrument_id: order.instrument_id.clone(),
            side: order.side,
            quantity: fill.quantity,
            price: fill.price,
            realized_pnl,
            position_status,
            trading_day: order.trading_day,
            executed_at: fill.filled_at,
        });

        let stored = self.order_mut(key)?;
        stored.status = OrderStatus::Filled;
        stored.updated_at = fill.filled_at;
        stored.fill = Some(fill);
        Ok(())
    }

    fn close_unfilled(
        &mut self,
        key: IdempotencyKey,
        status: OrderStatus,
        reason: String,
        at: DateTime<Utc>,
    ) -> Result<(), LedgerError> {
        let order = self.order_mut(key)?;
        if !order.status.is_in_flight() {
            return Err(LedgerError::InvalidTransition {
                key,
                from: order.status,
                to: status,
            });
        }
        order.status = status;
        order.reason = Some(reason);
        order.updated_at = at;
        let instrument_id = order.instrument_id.clone();
        let side = order.side;

        match side {
            OrderSide::Buy => {
                let other_buy_in_flight = self.orders.values().any(|o| {
                    o.key != key
                        && o.side == OrderSide::Buy
                        && o.instrument_id == instrument_id
                        && o.status.is_in_flight()
                });
                let is_placeholder = self
                    .portfolio
                    .positions
                    .get(&instrument_id)
                    .is_some_and(|p| p.status == PositionStatus::Opening);
                if is_placeholder && !other_buy_in_flight {
                    self.portfolio.positions.remove(&instrument_id);
                }
            }
            OrderSide::Sell => {
                if let Some(p) = self.portfolio.positions.get_mut(&instrument_id)
                    && p.status == PositionStatus::Closing
                {
                    p.status = PositionStatus::Open;
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, d).unwrap()
    }

    fn id(s: &str) -> InstrumentId {
        InstrumentId::new(s).unwrap()
    }

    fn ledger() -> Ledger {
        Ledger::new(TradingMode::Simulated, day(3), dec!(10000000))
    }

    fn buy(ledger: &Ledger, instrument: &str, qty: u64, price: Decimal) -> Order {
        let instrument = id(instrument);
        let seq = ledger.next_intent_seq(&instrument, OrderSide::Buy);
        Order::pending(
            instrument,
            OrderSide::Buy,
            qty,
            price,
            ledger.daily.trading_day,
            seq,
            Utc::now(),
        )
    }

    fn sell(ledger: &Ledger, instrument: &str, qty: u64, price: Decimal) -> Order {
        let instrument = id(instrument);
        let seq = ledger.next_intent_seq(&instrument, OrderSide::Sell);
        Order::pending(
            instrument,
            OrderSide::Sell,
            qty,
            price,
            ledger.daily.trading_day,
            seq,
            Utc::now(),
        )
    }

    fn fill(qty: u64, price: Decimal) -> Fill {
        Fill {
            quantity: qty,
            price,
            filled_at: Utc::now(),
        }
    }

    fn open_position(ledger: &mut Ledger, instrument: &str, qty: u64, price: Decimal) {
        let order = buy(ledger, instrument, qty, price);
        let key = order.key;
        ledger.apply(Mutation::Reserve { order }).unwrap();
        ledger
            .apply(Mutation::RecordFill {
                key,
                fill: fill(qty, price),
            })
            .unwrap();
    }

    #[test]
    fn buy_reservation_creates_opening_placeholder() {
        let mut l = ledger();
        let order = buy(&l, "005930", 10, dec!(70000));
        l.apply(Mutation::Reserve { order }).unwrap();

        let pos = &l.portfolio.positions[&id("005930")];
        assert_eq!(pos.status, PositionStatus::Opening);
        assert_eq!(l.pending_buy_count(), 1);
        assert_eq!(l.pending_buy_exposure(&id("005930")), dec!(700000));
        assert_eq!(l.portfolio.open_positions().count(), 0);
    }

    #[test]
    fn buy_fill_opens_position_and_counts() {
        let mut l = ledger();
        open_position(&mut l, "005930", 10, dec!(70000));

        let pos = &l.portfolio.positions[&id("005930")];
        assert_eq!(pos.status, PositionStatus::Open);
        assert_eq!(pos.quantity, 10);
        assert_eq!(l.daily.buy_count, 1);
        assert_eq!(l.portfolio.cash, dec!(9300000));
        assert_eq!(l.pending_buy_count(), 0);
        assert_eq!(l.history.len(), 1);
    }

    #[test]
    fn sell_fill_closes_position_and_books_pnl() {
        let mut l = ledger();
        open_position(&mut l, "005930", 10, dec!(100000));

        let order = sell(&l, "005930", 10, dec!(94900));
        let key = order.key;
        l.apply(Mutation::Reserve { order }).unwrap();
        assert_eq!(
            l.portfolio.positions[&id("005930")].status,
            PositionStatus::Closing
        );

        l.apply(Mutation::RecordFill {
            key,
            fill: fill(10, dec!(94900)),
        })
        .unwrap();
        assert!(l.portfolio.positions.is_empty());
        assert_eq!(l.daily.realized_pnl, dec!(-51000));
        assert_eq!(l.history.last().unwrap().position_status, PositionStatus::Closed);
        assert_eq!(l.portfolio.cash, dec!(9949000));
    }

    #[test]
    fn second_exit_is_refused_while_closing() {
        let mut l = ledger();
        open_position(&mut l, "AAPL", 5, dec!(200));
        let first = sell(&l, "AAPL", 5, dec!(190));
        l.apply(Mutation::Reserve { order: first }).unwrap();

        let second = sell(&l, "AAPL", 5, dec!(189));
        assert_eq!(
            l.apply(Mutation::Reserve { order: second }),
            Err(LedgerError::PositionBusy(id("AAPL")))
        );
    }

    #[test]
    fn rejected_exit_reopens_position() {
        let mut l = ledger();
        open_position(&mut l, "AAPL", 5, dec!(200));
        let order = sell(&l, "AAPL", 5, dec!(190));
        let key = order.key;
        l.apply(Mutation::Reserve { order }).unwrap();
        l.apply(Mutation::RecordRejected {
            key,
            reason: "market closed".into(),
            at: Utc::now(),
        })
        .unwrap();

        assert_eq!(
            l.portfolio.positions[&id("AAPL")].status,
            PositionStatus::Open
        );
        assert_eq!(l.orders[&key].status, OrderStatus::Rejected);
    }

    #[test]
    fn failed_first_buy_removes_placeholder() {
        let mut l = ledger();
        let order = buy(&l, "AAPL", 5, dec!(200));
        let key = order.key;
        l.apply(Mutation::Reserve { order }).unwrap();
        l.apply(Mutation::RecordFailed {
            key,
            reason: "retries exhausted".into(),
            at: Utc::now(),
        })
        .unwrap();
        assert!(l.portfolio.positions.is_empty());
        assert_eq!(l.daily.buy_count, 0);
    }

    #[test]
    fn sell_without_position_is_refused() {
        let mut l = ledger();
        let order = sell(&l, "AAPL", 1, dec!(200));
        assert_eq!(
            l.apply(Mutation::Reserve { order }),
            Err(LedgerError::NoOpenPosition(id("AAPL")))
        );
    }

    #[test]
    fn duplicate_reservation_is_refused() {
        let mut l = ledger();
        let order = buy(&l, "AAPL", 5, dec!(200));
        l.apply(Mutation::Reserve {
            order: order.clone(),
        })
        .unwrap();
        assert_eq!(
            l.apply(Mutation::Reserve {
                order: order.clone()
            }),
            Err(LedgerError::DuplicateOrder(order.key))
        );
    }

    #[test]
    fn intent_sequence_advances_past_used_keys() {
        let mut l = ledger();
        assert_eq!(l.next_intent_seq(&id("AAPL"), OrderSide::Buy), 0);
        open_position(&mut l, "AAPL", 1, dec!(200));
        assert_eq!(l.next_intent_seq(&id("AAPL"), OrderSide::Buy), 1);
        assert_eq!(l.next_intent_seq(&id("AAPL"), OrderSide::Sell), 0);
    }

    #[test]
    fn rollover_archives_and_resets() {
        let mut l = ledger();
        open_position(&mut l, "AAPL", 10, dec!(200));
        l.apply(Mutation::SetPaused { paused: true }).unwrap();
        let in_flight = buy(&l, "MSFT", 1, dec!(400));
        let in_flight_key = in_flight.key;
        l.apply(Mutation::Reserve { order: in_flight }).unwrap();

        l.apply(Mutation::Rollover {
            trading_day: day(4),
        })
        .unwrap();

        assert_eq!(l.daily.trading_day, day(4));
        assert_eq!(l.daily.buy_count, 0);
        assert!(!l.daily.paused);
        assert_eq!(l.daily.realized_pnl, Decimal::ZERO);
        assert_eq!(l.archive.len(), 1);
        let summary = &l.archive[0];
        assert_eq!(summary.trading_day, day(3));
        assert_eq!(summary.buy_count, 1);
        assert!(summary.paused);
        assert_eq!(summary.orders.len(), 1);
        assert!(l.orders.contains_key(&in_flight_key));
        assert_eq!(l.portfolio.positions[&id("AAPL")].quantity, 10);
    }

    #[test]
    fn stale_rollover_is_refused() {
        let mut l = ledger();
        assert!(matches!(
            l.apply(Mutation::Rollover {
                trading_day: day(3)
            }),
            Err(LedgerError::StaleRollover { .. })
        ));
    }

    #[test]
    fn late_fill_from_previous_day_does_not_count_today() {
        let mut l = ledger();
        let order = buy(&l, "AAPL", 2, dec!(200));
        let key = order.key;
        l.apply(Mutation::Reserve { order }).unwrap();
        l.apply(Mutation::Rollover {
            trading_day: day(4),
        })
        .unwrap();
        l.apply(Mutation::RecordFill {
            key,
            fill: fill(2, dec!(200)),
        })
        .unwrap();
        assert_eq!(l.daily.buy_count, 0);
        assert_eq!(l.portfolio.positions[&id("AAPL")].quantity, 2);
    }

    #[test]
    fn sync_cash_resets_day_start_before_first_trade() {
        let mut l = ledger();
        l.apply(Mutation::SyncCash {
            cash: dec!(5000000),
        })
        .unwrap();
        assert_eq!(l.daily.day_start_value, dec!(5000000));

        open_position(&mut l, "AAPL", 1, dec!(100));
        l.apply(Mutation::SyncCash {
            cash: dec!(4000000),
        })
        .unwrap();
        assert_eq!(l.daily.day_start_value, dec!(5000000));
    }

    #[test]
    fn overfill_is_refused() {
        let mut l = ledger();
        let order = buy(&l, "AAPL", 2, dec!(200));
        let key = order.key;
        l.apply(Mutation::Reserve { order }).unwrap();
        assert!(matches!(
            l.apply(Mutation::RecordFill {
                key,
                fill: fill(3, dec!(200))
            }),
            Err(LedgerError::InvalidFill { .. })
        ));
    }

    #[test]
    fn ledger_round_trips_through_json() {
        let mut l = ledger();
        open_position(&mut l, "005930", 3, dec!(70000));
        let json = serde_json::to_string(&l).unwrap();
        let back: Ledger = serde_json::from_str(&json).unwrap();
        assert_eq!(back, l);
    }
}

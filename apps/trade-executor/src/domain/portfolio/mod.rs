//! Portfolio context: positions, daily counters, and the persisted ledger.

mod daily_state;
mod ledger;
mod position;
mod trade_record;

pub use daily_state::DailyState;
pub use ledger::{Ledger, LedgerError, Mutation, Portfolio};
pub use position::{Position, PositionStatus};
pub use trade_record::{DaySummary, TradeRecord};

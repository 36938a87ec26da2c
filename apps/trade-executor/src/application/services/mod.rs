//! Application services.

mod coordinator;
mod daily_routine;
mod position_monitor;
mod state_store;
mod trading_engine;

pub use coordinator::{FillPolling, OrderExecutionCoordinator, Reservation, status_mutation};
pub use daily_routine::{DailyRoutine, RoutineReport, ScheduleConfig};
pub use position_monitor::{PollReport, PositionMonitor, PositionMonitorConfig};
pub use state_store::{StateStore, StoreError, StoreGuard};
pub use trading_engine::{ManualOrder, StatusReport, SubmissionOutcome, TradingEngine};

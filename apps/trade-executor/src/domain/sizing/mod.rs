//! Position sizing.

mod sizer;
mod strategy;

pub use sizer::{PositionSizer, SizingError};
pub use strategy::Strategy;

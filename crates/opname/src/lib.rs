//! Stock-take ("opname") domain module.
//!
//! Counting sessions snapshot the stock master, collect physical counts and,
//! on finalization, produce the stock adjustments to apply. Pure domain
//! logic; persistence lives in `estore-infra`.

pub mod finalize;
pub mod session;

pub use finalize::{StockAdjustment, plan_finalize};
pub use session::{OpnameStats, OpnameStatus, StockOpnameItem, StockOpnameSession, session_stats};

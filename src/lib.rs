pub mod config;
pub mod core;
pub mod error;
pub mod payout;
pub mod view;

pub use config::Config;
pub use error::TrackerError;
pub use payout::{MIDDLEMAN_FEE_PERCENT, Payout, PayoutBreakdown, PayoutRow, compute_payout};
pub use view::{FilteredView, ProjectFilter};

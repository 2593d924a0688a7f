pub mod calculator;
pub mod providers;
pub mod ratings;
pub mod selector;
pub mod session;

pub use ratings::{BatchItemResult, BatchItemStatus, RatingService, MAX_BATCH_COMPARISONS};
pub use selector::{OpponentSelector, SelectorPolicy};
pub use session::{ComparisonSession, SessionState};

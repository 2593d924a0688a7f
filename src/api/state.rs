use std::sync::Arc;

use crate::config::Config;
use crate::db::PreferenceStore;
use crate::services::{OpponentSelector, RatingService};

/// Shared application state
///
/// Services are cheap to clone; the preference store sits behind a trait
/// object so tests can wire an in-memory implementation.
#[derive(Clone)]
pub struct AppState {
    pub ratings: RatingService,
    pub selector: OpponentSelector,
    pub preferences: Arc<dyn PreferenceStore>,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(
        ratings: RatingService,
        selector: OpponentSelector,
        preferences: Arc<dyn PreferenceStore>,
        config: Config,
    ) -> Self {
        Self {
            ratings,
            selector,
            preferences,
            config: Arc::new(config),
        }
    }
}

//! Backend construction

use std::sync::Arc;

use waymark_history::{
    BrowserHistory, HashHistory, History, MemoryHistory, NativeHistory, UserConfirmation,
};

use crate::config::{HistoryConfig, HistoryKind};
use crate::error::CoreError;
use crate::Result;

/// Builds a history from a config plus the runtime pieces that cannot be
/// serialized.
pub struct HistoryBuilder {
    config: HistoryConfig,
    medium: Option<Arc<dyn NativeHistory>>,
    user_confirmation: Option<UserConfirmation>,
}

impl HistoryBuilder {
    pub fn new(config: HistoryConfig) -> Self {
        Self {
            config,
            medium: None,
            user_confirmation: None,
        }
    }

    pub fn medium(mut self, medium: Arc<dyn NativeHistory>) -> Self {
        self.medium = Some(medium);
        self
    }

    pub fn user_confirmation(mut self, user_confirmation: UserConfirmation) -> Self {
        self.user_confirmation = Some(user_confirmation);
        self
    }

    pub fn build(self) -> Result<Box<dyn History>> {
        self.config.validate()?;

        let kind = self.config.kind;
        let history: Box<dyn History> = match (kind, self.medium) {
            (HistoryKind::Memory, _) => Box::new(MemoryHistory::new(
                self.config.memory_options(self.user_confirmation),
            )?),
            (_, None) => return Err(CoreError::MissingMedium(kind)),
            (HistoryKind::Browser, Some(medium)) => Box::new(BrowserHistory::new(
                medium,
                self.config.browser_options(self.user_confirmation),
            )?),
            (HistoryKind::Hash, Some(medium)) => Box::new(HashHistory::new(
                medium,
                self.config.hash_options(self.user_confirmation),
            )?),
        };

        tracing::info!(kind = %kind, path = %history.location(), "History ready");
        Ok(history)
    }
}

/// Shorthand for `HistoryBuilder::new(config).medium(..).build()`
pub fn create_history(
    config: HistoryConfig,
    medium: Option<Arc<dyn NativeHistory>>,
) -> Result<Box<dyn History>> {
    let builder = HistoryBuilder::new(config);
    match medium {
        Some(medium) => builder.medium(medium).build(),
        None => builder.build(),
    }
}

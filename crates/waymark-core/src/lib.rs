//! Waymark Core
//!
//! Entry point for applications: pick a backend from a `HistoryConfig`,
//! attach a native medium where one is needed, and get back a
//! `Box<dyn History>`.

mod builder;
mod config;
mod error;

pub use builder::{create_history, HistoryBuilder};
pub use config::{HistoryConfig, HistoryKind};
pub use error::CoreError;

// Re-export the building blocks
pub use waymark_history::{
    Action, BrowserHistory, BrowserHistoryOptions, Capabilities, ConfirmCallback, Disposer,
    EntryState, HashHistory, HashHistoryOptions, HashType, History, HistoryError, Listener,
    MemoryHistory, MemoryHistoryOptions, NativeEvent, NativeEventKind, NativeHistory, Prompt,
    PromptResult, SimulatedMedium, UserConfirmation, Warning,
};
pub use waymark_location::{
    create_location, create_path, locations_are_equal, parse_path, Location, LocationDescriptor,
    LocationError, PartialLocation,
};

pub type Result<T> = std::result::Result<T, CoreError>;

/// Initialize logging
pub fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    fmt().with_env_filter(filter).with_target(true).init();
}

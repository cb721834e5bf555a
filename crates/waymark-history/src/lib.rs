//! Waymark History Backends
//!
//! One contract over three storage media:
//! - `BrowserHistory`: native session history (pushState / popstate)
//! - `HashHistory`: the URL hash fragment
//! - `MemoryHistory`: an in-memory stack
//!
//! Every mutation passes through a `TransitionManager`, which lets a single
//! blocker veto it (optionally after asking the user). Vetoed back/forward
//! navigations coming from the native medium are undone by driving the
//! medium back the right number of steps.

mod action;
mod browser;
mod disposer;
mod error;
mod hash;
mod history;
mod index;
mod medium;
mod memory;
mod pop;
mod subscription;
mod transition;
mod warning;

pub use action::Action;
pub use browser::{BrowserHistory, BrowserHistoryOptions, EntryState};
pub use disposer::Disposer;
pub use error::{HistoryError, MediumError};
pub use hash::{HashHistory, HashHistoryOptions, HashType};
pub use history::History;
pub use medium::{
    Capabilities, HandlerId, NativeEvent, NativeEventHandler, NativeEventKind, NativeHistory,
    SimulatedMedium,
};
pub use memory::{MemoryHistory, MemoryHistoryOptions};
pub use transition::{
    ConfirmCallback, Listener, Prompt, PromptHook, PromptResult, TransitionManager,
    UserConfirmation,
};
pub use warning::Warning;

pub use waymark_location::{
    create_location, create_path, locations_are_equal, parse_path, Location, LocationDescriptor,
    LocationError, PartialLocation,
};

pub type Result<T> = std::result::Result<T, HistoryError>;

//! Non-fatal configuration and capability reports
//!
//! A warning never stops an operation; it is logged and the operation
//! continues with a safe default.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Warning {
    #[error("A history needs a user confirmation function in order to use a prompt message")]
    MissingUserConfirmation,

    #[error("A history supports only one prompt at a time")]
    DuplicatePrompt,

    #[error(
        "You should avoid providing a 2nd state argument to {operation} when the 1st \
         argument is a location-like object that already has state; it is ignored"
    )]
    RedundantState { operation: &'static str },

    #[error("Hash history cannot {operation} state; it is ignored")]
    StateIgnored { operation: &'static str },

    #[error(
        "Browser history cannot {operation} state in browsers that do not support \
         HTML5 history"
    )]
    StateUnsupported { operation: &'static str },

    #[error(
        "You are attempting to use a basename on a page whose URL path does not begin \
         with the basename. Expected path \"{path}\" to begin with \"{basename}\"."
    )]
    BasenameMismatch { path: String, basename: String },

    #[error(
        "Hash history cannot PUSH the same path; a new entry will not be added to \
         the history stack"
    )]
    SamePathPush,

    #[error("Hash history go(n) causes a full page reload in this browser")]
    GoReloadsPage,
}

impl Warning {
    pub fn report(&self) {
        tracing::warn!(warning = ?self, "{}", self);
    }
}

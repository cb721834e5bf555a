//! Location error types

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LocationError {
    #[error(
        "Pathname \"{pathname}\" could not be decoded. \
         This is likely caused by an invalid percent-encoding."
    )]
    PathDecode { pathname: String },
}

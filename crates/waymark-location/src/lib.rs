//! Waymark Location Model
//!
//! A `Location` is the canonical value every history backend produces:
//! - `pathname` is never empty and is percent-decoded
//! - `search` is empty or starts with `?`
//! - `hash` is empty or starts with `#`
//!
//! Locations are built from either a raw path string or a partial
//! location through [`create_location`].

mod error;
mod location;
mod path;

pub use error::LocationError;
pub use location::{
    create_location, create_path, locations_are_equal, Location, LocationDescriptor,
    PartialLocation, PathLike,
};
pub use path::{
    add_leading_slash, decode_uri, has_basename, parse_path, resolve_pathname, strip_basename,
    strip_hash, strip_leading_slash, strip_trailing_slash, ParsedPath,
};

pub type Result<T> = std::result::Result<T, LocationError>;

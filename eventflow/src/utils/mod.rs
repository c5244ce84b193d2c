//! Utility functions for UUID generation and timestamp handling.

mod timestamps;
mod uuid_utils;

pub use timestamps::{iso_timestamp, now_utc, Timestamp};
pub use uuid_utils::{generate_uuid, generate_uuid_string};

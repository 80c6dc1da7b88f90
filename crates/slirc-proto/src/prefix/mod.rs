//! IRC message prefix (message source).

mod types;

pub use self::types::Prefix;

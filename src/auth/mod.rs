//! Keyed access: modification keys derived from emails stand in for sessions.

pub mod access;
pub mod key;

pub use access::{Access, AccessError, AccessResolver};
pub use key::{KeyDeriver, KeyError, KEY_LENGTH};

//! Chat message formatting for the relay.
//!
//! This module turns a sender label and raw client text into the single
//! line every session receives: denylist masking, timestamp and label.

mod codec;
mod denylist;
mod identity;

pub use codec::{ChatMessage, Codec, Outbound, SERVER_LABEL};
pub use denylist::Denylist;
pub use identity::Identity;

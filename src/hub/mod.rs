//! Connection hub for the chat relay
//!
//! The hub owns the set of live sessions. Registration, removal and
//! broadcast fan-out are applied one at a time by a single task.

mod handle;
mod registry;

pub use handle::HubHandle;
pub use registry::{Hub, SessionHandle, SessionId};

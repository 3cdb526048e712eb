//! Session tracking.
//!
//! Two independent maps keyed by [`SessionId`]: [`SessionStore`] records
//! which sessions the transport has opened, and [`SessionIdentities`]
//! records which user, if any, each session is signed in as.

mod id;
mod identity;
mod store;

pub use id::SessionId;
pub use identity::SessionIdentities;
pub use store::{Session, SessionStore};

//! The synchronization engine.
//!
//! A [`Session`] is the explicit context object for one invocation: it owns
//! the local stores, the refs, the identity map, and the remote collaborator
//! clients, and every operation threads through it; there are no global
//! singletons. The protocols (push, fetch, pull, clone, checkout) keep a
//! local working copy consistent with the remote authoritative pointer
//! under optimistic concurrency: integrity failures abort before further
//! mutation, divergence is detected rather than clobbered, and a crashed
//! push resumes from the identity map without re-uploading anything.

pub mod checkout;
pub mod error;
pub mod fetch;
pub mod identity;
pub mod pull;
pub mod push;
pub mod session;
pub mod state;
pub mod types;

pub use error::{ErrorCategory, SyncError, SyncResult};
pub use identity::IdentityMap;
pub use session::{RemoteClients, Session};
pub use state::SyncState;
pub use types::{
    CheckoutReport, FetchReport, LogEntry, PullReport, PushReport, StatusReport,
};

//! Client-local identity and authorization for the board.
//! Keep the public surface thin and split implementation across sub-modules.

mod guard;
mod manager;
mod profile;
mod secret;
mod store;

pub use guard::{Access, Action, KeyGrant, ResourceKind, check};
pub use manager::IdentityManager;
pub use profile::{AuthMode, Identity};
pub use secret::{SECRET_KEY_LEN, generate_secret_key, verify_secret_key};
pub use store::{FileSessionStore, MemorySessionStore, SessionStore};

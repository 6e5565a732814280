pub mod client;
pub mod screens;
pub mod session;
pub mod store;
pub mod validation;

pub use client::{AuthClient, AuthError};
pub use session::{AuthContext, Session, User};
pub use store::{SessionStore, SqliteStore};

//! Credential pools and the rate governor that arbitrates access to them.

pub mod credential;
pub mod governor;

pub use credential::{Credential, ErrorKind, DEFAULT_KEY_RPM, DEFAULT_RPM};
pub use governor::{CredentialPool, PoolError, PoolSnapshot};

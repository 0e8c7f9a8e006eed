//! `dentalcare-auth` — pure authentication/authorization boundary.
//!
//! This crate is intentionally decoupled from HTTP and from the remote service:
//! it defines who a user is (`Principal`, `Profile`), what their role allows
//! (`Permission`, `Access`), and how failures are classified (`AuthError`,
//! `ProfileFetchError`).

pub mod access;
pub mod account;
pub mod authorize;
pub mod error;
pub mod permissions;
pub mod principal;
pub mod profile;
pub mod roles;
pub mod session;

pub use access::Access;
pub use account::{NewAccount, ProfileUpdate};
pub use authorize::{AuthzError, authorize};
pub use error::{AuthError, ProfileFetchError};
pub use permissions::Permission;
pub use principal::{Principal, PrincipalId};
pub use profile::{Profile, ProfileRow};
pub use roles::{Role, UnknownRole};
pub use session::{SessionValidationError, SessionWindow};

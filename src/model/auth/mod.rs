pub mod access_code;
pub mod fingerprint;
pub mod policy;
pub mod token;
pub mod user;

pub use access_code::AccessCode;
pub use fingerprint::Fingerprint;
pub use token::{AuthToken, AUTH_TOKEN_COOKIE};
pub use user::{Rights, User};

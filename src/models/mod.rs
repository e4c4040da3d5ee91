pub mod account;
pub mod auth;

pub use account::Account;
pub use auth::{AuthorizationData, CheckAuthorizationData, JwtTokens};

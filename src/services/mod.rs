pub mod account;
pub mod authorization;
pub mod password;
pub mod totp;

pub use account::AccountService;
pub use authorization::{AuthorizationClient, HttpAuthorizationClient};
pub use password::PasswordHasher;
pub use totp::TotpService;

pub mod account;

pub use account::{AccountRepo, PgAccountRepo};

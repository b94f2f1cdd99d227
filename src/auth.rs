//! Credentials, access tokens, and the refreshing token manager.

pub mod credential;
pub mod exchange;
pub mod manager;
pub mod secret;
pub mod source;
pub mod token;

pub use credential::*;
pub use exchange::*;
pub use manager::*;
pub use secret::*;
pub use source::*;
pub use token::*;

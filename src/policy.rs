//! Typed access to firewall rules exposed by a policy-style REST API.
//!
//! `client` holds [`PolicyResourceClient`], the authenticated create/patch, read, and
//! delete surface. `endpoint` and `path` describe where rules live, `rule` and `id`
//! model what is sent, and `poll` waits for the eventually-consistent backend to reflect
//! a write.

pub mod client;
pub mod endpoint;
pub mod id;
pub mod path;
pub mod poll;
pub mod rule;

pub use client::*;
pub use endpoint::*;
pub use id::*;
pub use path::*;
pub use poll::*;
pub use rule::*;

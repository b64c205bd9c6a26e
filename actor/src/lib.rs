//! cfactor library
//!
//! Actor layer over the Cloud Controller v3 API: waits for staging and
//! application start, streams application logs and carries warnings through
//! every operation.

pub mod actor;
pub mod application;
pub mod client;
pub mod config;
pub mod errors;
pub mod logging;
pub mod logs;
pub mod poll;
pub mod staging;
pub mod utils;
pub mod warnings;

pub use actor::Actor;
pub use ccv3::models;
pub use errors::ActorError;
pub use warnings::Warnings;

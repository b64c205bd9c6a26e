//! Cloud Controller v3 client
//!
//! Resource models, error types and a reqwest-based client for the subset of
//! the Cloud Controller v3 API the actor layer polls.

pub mod applications;
pub mod builds;
pub mod client;
pub mod deployments;
pub mod error;
pub mod jobs;
pub mod models;
pub mod processes;
pub mod warnings;

pub use client::{ClientOptions, HttpClient};
pub use error::ClientError;
pub use warnings::Warnings;

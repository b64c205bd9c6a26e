//! Actor: the entry point for user-level operations
//!
//! The operations themselves live next to their concern: staging in
//! `staging.rs`, application lifecycle in `application.rs` and log streaming
//! in `logging.rs`.

use std::sync::Arc;

use crate::client::CloudControllerClient;
use crate::config::Config;
use crate::logging::StreamOptions;

/// Composes Cloud Controller calls into complete operations.
///
/// Cheap to clone; clones share the same client and configuration.
#[derive(Clone)]
pub struct Actor {
    pub(crate) client: Arc<dyn CloudControllerClient>,
    pub(crate) config: Arc<dyn Config>,
    pub(crate) stream_options: StreamOptions,
}

impl Actor {
    pub fn new(client: Arc<dyn CloudControllerClient>, config: Arc<dyn Config>) -> Self {
        Self {
            client,
            config,
            stream_options: StreamOptions::default(),
        }
    }

    /// Override the log streaming options
    pub fn with_stream_options(mut self, options: StreamOptions) -> Self {
        self.stream_options = options;
        self
    }

    pub fn config(&self) -> &dyn Config {
        self.config.as_ref()
    }
}

impl std::fmt::Debug for Actor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Actor")
            .field("stream_options", &self.stream_options)
            .finish_non_exhaustive()
    }
}

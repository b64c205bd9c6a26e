//! Streaming application logs
//!
//! Raw envelopes and errors from a [`LogStreamClient`] are merged by a single
//! background task into a stream of [`LogMessage`]s and a stream of
//! [`ActorError`]s. After every (re)connect, messages are held back for a
//! short reorder window and released sorted by timestamp, since the log
//! server replays recent history out of order on connect.

use std::borrow::Cow;
use std::fmt;
use std::time::Duration;

use ccv3::models::Application;
use chrono::{DateTime, Utc};
use secrecy::ExposeSecret;
use tokio::sync::mpsc;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info, warn};

use crate::actor::Actor;
use crate::client::{EnvelopeMessageType, LogEnvelope, LogStreamClient, StreamError};
use crate::errors::ActorError;
use crate::warnings::Warnings;

/// Source type of staging logs
pub const STAGING_LOG: &str = "STG";

/// Default time messages are buffered after a connect
pub const REORDER_WINDOW: Duration = Duration::from_millis(300);

/// Capacity of the output channels
const LOG_CHANNEL_BUFFER: usize = 128;

/// Stream of standard output or standard error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageType {
    Out,
    Err,
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageType::Out => f.write_str("OUT"),
            MessageType::Err => f.write_str("ERR"),
        }
    }
}

impl From<EnvelopeMessageType> for MessageType {
    fn from(kind: EnvelopeMessageType) -> Self {
        match kind {
            EnvelopeMessageType::Out => MessageType::Out,
            EnvelopeMessageType::Err => MessageType::Err,
        }
    }
}

/// A single log line of an application
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogMessage {
    message: Vec<u8>,
    message_type: MessageType,
    timestamp: DateTime<Utc>,
    source_type: String,
    source_instance: String,
}

impl LogMessage {
    pub fn new(
        message: impl Into<Vec<u8>>,
        message_type: MessageType,
        timestamp: DateTime<Utc>,
        source_type: impl Into<String>,
        source_instance: impl Into<String>,
    ) -> Self {
        Self {
            message: message.into(),
            message_type,
            timestamp,
            source_type: source_type.into(),
            source_instance: source_instance.into(),
        }
    }

    /// Message text, with invalid UTF-8 replaced
    pub fn message(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.message)
    }

    pub fn payload(&self) -> &[u8] {
        &self.message
    }

    pub fn message_type(&self) -> MessageType {
        self.message_type
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn source_type(&self) -> &str {
        &self.source_type
    }

    pub fn source_instance(&self) -> &str {
        &self.source_instance
    }

    /// True for messages emitted while staging
    pub fn staging(&self) -> bool {
        self.source_type == STAGING_LOG
    }
}

impl From<LogEnvelope> for LogMessage {
    fn from(envelope: LogEnvelope) -> Self {
        Self {
            message: envelope.payload,
            message_type: envelope.message_type.into(),
            timestamp: DateTime::from_timestamp_nanos(envelope.timestamp),
            source_type: envelope.source_type,
            source_instance: envelope.source_instance,
        }
    }
}

/// Log streaming options
#[derive(Debug, Clone, Copy)]
pub struct StreamOptions {
    /// How long messages are buffered after each connect
    pub reorder_window: Duration,
}

impl Default for StreamOptions {
    fn default() -> Self {
        Self {
            reorder_window: REORDER_WINDOW,
        }
    }
}

/// Output of a log stream. Both receivers yield `None` once the upstream
/// client has closed its channels.
#[derive(Debug)]
pub struct LogStream {
    pub messages: mpsc::Receiver<LogMessage>,
    pub errors: mpsc::Receiver<ActorError>,
}

impl Actor {
    /// Tail the logs of an application.
    ///
    /// Must be called from within a tokio runtime.
    pub fn get_streaming_logs(&self, app_guid: &str, client: &dyn LogStreamClient) -> LogStream {
        let (connect_tx, connect_rx) = mpsc::unbounded_channel();
        client.set_on_connect_callback(Box::new(move || {
            let _ = connect_tx.send(());
        }));

        let (envelopes, raw_errors) = client.tailing_logs(app_guid, self.config.access_token().expose_secret());

        let (messages_tx, messages) = mpsc::channel(LOG_CHANNEL_BUFFER);
        let (errors_tx, errors) = mpsc::channel(LOG_CHANNEL_BUFFER);

        let multiplexer = Multiplexer {
            dial_timeout: self.config.dial_timeout(),
            reorder_window: self.stream_options.reorder_window,
            messages: messages_tx,
            errors: errors_tx,
            buffer: Vec::new(),
            window_end: None,
            dial_deadline: None,
        };

        info!("Streaming logs of app {}", app_guid);
        tokio::spawn(multiplexer.run(envelopes, raw_errors, connect_rx));

        LogStream { messages, errors }
    }

    /// Look up an application and tail its logs
    pub async fn get_streaming_logs_for_application_by_name_and_space(
        &self,
        app_name: &str,
        space_guid: &str,
        client: &dyn LogStreamClient,
    ) -> (Result<LogStream, ActorError>, Warnings) {
        let (app, warnings): (Result<Application, ActorError>, Warnings) =
            self.get_application_by_name_and_space(app_name, space_guid).await;

        match app {
            Ok(app) => (Ok(self.get_streaming_logs(&app.guid, client)), warnings),
            Err(e) => (Err(e), warnings),
        }
    }
}

/// State of the background task merging the upstream channels
struct Multiplexer {
    dial_timeout: Duration,
    reorder_window: Duration,
    messages: mpsc::Sender<LogMessage>,
    errors: mpsc::Sender<ActorError>,
    /// Messages held back during a reorder window
    buffer: Vec<LogMessage>,
    window_end: Option<Instant>,
    /// Armed by a retry error, disarmed by a connect
    dial_deadline: Option<Instant>,
}

impl Multiplexer {
    async fn run(
        mut self,
        mut envelopes: mpsc::Receiver<LogEnvelope>,
        mut raw_errors: mpsc::Receiver<Option<StreamError>>,
        mut connects: mpsc::UnboundedReceiver<()>,
    ) {
        let mut envelopes_open = true;
        let mut errors_open = true;

        while envelopes_open || errors_open {
            let window_end = self.window_end.unwrap_or_else(Instant::now);
            let dial_deadline = self.dial_deadline.unwrap_or_else(Instant::now);

            // Errors before connects, so a queued retry is disarmed by the
            // connect that follows it. Connects before envelopes, so a window
            // opens before the messages that follow it.
            let keep_going = tokio::select! {
                biased;
                raw = raw_errors.recv(), if errors_open => match raw {
                    Some(raw) => {
                        self.on_error(raw).await;
                        true
                    }
                    None => {
                        errors_open = false;
                        true
                    }
                },
                Some(()) = connects.recv() => {
                    self.on_connect();
                    true
                }
                envelope = envelopes.recv(), if envelopes_open => match envelope {
                    Some(envelope) => self.on_message(envelope.into()).await,
                    None => {
                        envelopes_open = false;
                        true
                    }
                },
                _ = sleep_until(window_end), if self.window_end.is_some() => self.flush().await,
                _ = sleep_until(dial_deadline), if self.dial_deadline.is_some() => {
                    self.on_dial_timeout().await;
                    true
                }
            };

            if !keep_going {
                debug!("Log message receiver dropped, stopping log stream");
                return;
            }
        }

        if self.flush().await {
            if let Some(deadline) = self.dial_deadline {
                if Instant::now() >= deadline {
                    self.on_dial_timeout().await;
                }
            }
        }
        info!("Log stream closed");
    }

    fn on_connect(&mut self) {
        debug!("Connected to log server");
        self.dial_deadline = None;
        self.window_end = Some(Instant::now() + self.reorder_window);
    }

    async fn on_error(&mut self, raw: Option<StreamError>) {
        match raw {
            None => {}
            Some(StreamError::Retry(reason)) => {
                debug!("Log server connection lost, retrying: {}", reason);
                if self.dial_deadline.is_none() {
                    self.dial_deadline = Some(Instant::now() + self.dial_timeout);
                }
            }
            Some(e) => self.report(ActorError::Stream(e)).await,
        }
    }

    async fn on_dial_timeout(&mut self) {
        self.dial_deadline = None;
        warn!("Log server did not reconnect within {:?}", self.dial_timeout);
        self.report(ActorError::StreamingTimeout).await;
    }

    /// Returns `false` once the consumer is gone
    async fn on_message(&mut self, message: LogMessage) -> bool {
        if self.window_end.is_some() {
            self.buffer.push(message);
            return true;
        }
        self.messages.send(message).await.is_ok()
    }

    /// Close the reorder window and release its messages in timestamp order
    async fn flush(&mut self) -> bool {
        self.window_end = None;
        self.buffer.sort_by_key(LogMessage::timestamp);

        for message in std::mem::take(&mut self.buffer) {
            if self.messages.send(message).await.is_err() {
                return false;
            }
        }
        true
    }

    async fn report(&self, error: ActorError) {
        if self.errors.send(error).await.is_err() {
            debug!("Log error receiver dropped");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn envelope(timestamp: i64, source_type: &str) -> LogEnvelope {
        LogEnvelope {
            payload: b"hello".to_vec(),
            message_type: EnvelopeMessageType::Err,
            timestamp,
            app_id: "app-guid".to_string(),
            source_type: source_type.to_string(),
            source_instance: "0".to_string(),
        }
    }

    #[test]
    fn test_log_message_from_envelope() {
        let message = LogMessage::from(envelope(1_500_000_000_123_456_789, "APP/PROC/WEB"));

        assert_eq!(message.message(), "hello");
        assert_eq!(message.message_type(), MessageType::Err);
        assert_eq!(message.message_type().to_string(), "ERR");
        assert_eq!(message.timestamp().timestamp(), 1_500_000_000);
        assert_eq!(message.timestamp().timestamp_subsec_nanos(), 123_456_789);
        assert_eq!(message.source_type(), "APP/PROC/WEB");
        assert_eq!(message.source_instance(), "0");
        assert!(!message.staging());
    }

    #[test]
    fn test_staging_message() {
        assert!(LogMessage::from(envelope(0, STAGING_LOG)).staging());
        assert!(!LogMessage::from(envelope(0, "stg")).staging());
    }

    #[tokio::test]
    async fn test_flush_is_stable() {
        let (messages, mut rx) = mpsc::channel(8);
        let (errors, _errors_rx) = mpsc::channel(8);
        let mut multiplexer = Multiplexer {
            dial_timeout: Duration::from_secs(1),
            reorder_window: REORDER_WINDOW,
            messages,
            errors,
            buffer: Vec::new(),
            window_end: Some(Instant::now()),
            dial_deadline: None,
        };

        for (ts, instance) in [(5, "a"), (1, "b"), (5, "c"), (1, "d")] {
            let mut env = envelope(ts, "APP");
            env.source_instance = instance.to_string();
            assert!(multiplexer.on_message(env.into()).await);
        }
        assert!(multiplexer.flush().await);
        assert!(multiplexer.window_end.is_none());

        let mut order = Vec::new();
        while let Ok(message) = rx.try_recv() {
            order.push(message.source_instance().to_string());
        }
        assert_eq!(order, vec!["b", "d", "a", "c"]);
    }
}

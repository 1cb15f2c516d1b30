//! Extraction of `+IPD,<id>,<len>:<payload>\n\r` notifications from the
//! module stream.
//!
//! Framing literals are matched structurally rather than skipped by count, so
//! a multi-digit length field or a stray byte is detected instead of silently
//! shifting the payload.

use crate::core::communication::transport::{receive_byte_within, ByteChannel};
use crate::core::relay::client::{ClientId, Notification, PayloadBuffer};
use crate::domain::config::RelayConfig;
use crate::domain::error::ParseError;
use std::time::Duration;
use tracing::{debug, trace};

/// Literal prefix of an inbound data notification
pub const NOTIFICATION_HEADER: &[u8] = b"+IPD,";

const MAX_LENGTH_DIGITS: usize = 4;

/// Parser for module notifications. Holds no per-notification state between
/// calls: every notification gets a fresh [`PayloadBuffer`].
#[derive(Debug, Clone)]
pub struct NotificationParser {
    capacity: usize,
    byte_timeout: Duration,
    poll_interval: Duration,
    noise_bytes: u64,
    // A `+` was consumed by a rejected notification and starts the next one
    resume_header: bool,
}

impl NotificationParser {
    pub fn new(config: &RelayConfig) -> Self {
        Self::with_limits(
            config.payload_capacity,
            config.byte_timeout(),
            config.poll_interval(),
        )
    }

    pub fn with_limits(capacity: usize, byte_timeout: Duration, poll_interval: Duration) -> Self {
        Self {
            capacity,
            byte_timeout,
            poll_interval,
            noise_bytes: 0,
            resume_header: false,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Bytes discarded while idle because they could not start a notification
    pub fn noise_bytes(&self) -> u64 {
        self.noise_bytes
    }

    /// Returns `Ok(None)` immediately when nothing is pending. Once a
    /// notification has started, waits (bounded) for the rest of it.
    pub async fn poll_notification(
        &mut self,
        channel: &mut dyn ByteChannel,
    ) -> Result<Option<Notification>, ParseError> {
        if self.resume_header {
            self.resume_header = false;
        } else {
            if !channel.data_ready().await? {
                return Ok(None);
            }

            let Some(first) = channel.try_receive_byte().await? else {
                return Ok(None);
            };
            if first != NOTIFICATION_HEADER[0] {
                // Echoes, status lines such as "0,CONNECT" and stray terminators
                trace!(byte = first, "discarding byte outside notification");
                self.noise_bytes += 1;
                return Ok(None);
            }
        }

        match self.read_notification(channel).await {
            Ok(notification) => Ok(Some(notification)),
            Err(err) if err.is_fatal() || matches!(err, ParseError::Stalled { .. }) => Err(err),
            Err(err) => {
                self.recover(channel, err.offending_byte()).await?;
                Err(err)
            }
        }
    }

    /// Resynchronise after a rejected notification. The offending byte has
    /// already been consumed: a line feed ends the line, a `+` opens the next
    /// notification, anything else means the rest of the line is still pending.
    async fn recover(&mut self, channel: &mut dyn ByteChannel, offending: Option<u8>) -> Result<(), ParseError> {
        match offending {
            Some(b'\n') => self.finish_line(channel).await,
            Some(byte) if byte == NOTIFICATION_HEADER[0] => {
                self.resume_header = true;
                Ok(())
            }
            _ => self.drain_line(channel).await,
        }
    }

    async fn read_notification(&mut self, channel: &mut dyn ByteChannel) -> Result<Notification, ParseError> {
        self.expect_literal(channel, &NOTIFICATION_HEADER[1..], "header").await?;

        let id_byte = self.next_byte(channel, "client id").await?;
        let client = ClientId::from_byte(id_byte).ok_or(ParseError::InvalidClientId { byte: id_byte })?;

        self.expect_literal(channel, b",", "separator").await?;
        let declared_len = self.read_length(channel).await?;

        let mut buffer = PayloadBuffer::with_capacity(self.capacity);
        let mut terminated = false;
        while !buffer.is_full() {
            let byte = self.next_byte(channel, "payload").await?;
            if byte == b'\n' {
                terminated = true;
                break;
            }
            buffer.push(byte);
        }

        // The byte after the payload is the paired carriage return, except when
        // the buffer filled exactly at the line feed.
        let trailer = self.trailing_byte(channel).await?;
        if !terminated && trailer == Some(b'\n') {
            terminated = true;
            self.finish_line(channel).await?;
        } else if trailer == Some(NOTIFICATION_HEADER[0]) {
            self.resume_header = true;
        }

        if declared_len != buffer.len() {
            debug!(
                declared = declared_len,
                collected = buffer.len(),
                "notification length differs from announced length"
            );
        }

        Ok(Notification {
            client,
            payload: buffer.into_bytes(),
            declared_len,
            truncated: !terminated,
        })
    }

    async fn read_length(&self, channel: &mut dyn ByteChannel) -> Result<usize, ParseError> {
        let mut digits = String::with_capacity(MAX_LENGTH_DIGITS);
        loop {
            let byte = self.next_byte(channel, "length").await?;
            match byte {
                b':' if !digits.is_empty() => break,
                b':' => {
                    return Err(ParseError::InvalidLength {
                        reason: "missing digits".to_string(),
                    })
                }
                b'0'..=b'9' if digits.len() < MAX_LENGTH_DIGITS => digits.push(byte as char),
                b'0'..=b'9' => {
                    return Err(ParseError::InvalidLength {
                        reason: format!("more than {} digits", MAX_LENGTH_DIGITS),
                    })
                }
                other => {
                    return Err(ParseError::UnexpectedByte {
                        stage: "length",
                        expected: ':',
                        found: other,
                    })
                }
            }
        }

        digits.parse().map_err(|e| ParseError::InvalidLength {
            reason: format!("{}", e),
        })
    }

    async fn expect_literal(
        &self,
        channel: &mut dyn ByteChannel,
        literal: &[u8],
        stage: &'static str,
    ) -> Result<(), ParseError> {
        for &expected in literal {
            let found = self.next_byte(channel, stage).await?;
            if found != expected {
                return Err(ParseError::UnexpectedByte {
                    stage,
                    expected: expected as char,
                    found,
                });
            }
        }
        Ok(())
    }

    async fn next_byte(&self, channel: &mut dyn ByteChannel, stage: &'static str) -> Result<u8, ParseError> {
        receive_byte_within(channel, self.byte_timeout, self.poll_interval)
            .await?
            .ok_or(ParseError::Stalled {
                stage,
                waited_ms: self.byte_timeout.as_millis() as u64,
            })
    }

    async fn trailing_byte(&self, channel: &mut dyn ByteChannel) -> Result<Option<u8>, ParseError> {
        Ok(receive_byte_within(channel, self.byte_timeout, self.poll_interval).await?)
    }

    /// Consume the carriage return paired with a line feed that was just read
    async fn finish_line(&mut self, channel: &mut dyn ByteChannel) -> Result<(), ParseError> {
        if self.trailing_byte(channel).await? == Some(NOTIFICATION_HEADER[0]) {
            self.resume_header = true;
        }
        Ok(())
    }

    /// Discard what is already pending of a rejected line, up to its line feed.
    async fn drain_line(&mut self, channel: &mut dyn ByteChannel) -> Result<(), ParseError> {
        let limit = self.capacity + MAX_LENGTH_DIGITS + NOTIFICATION_HEADER.len() + 4;
        for _ in 0..limit {
            match channel.try_receive_byte().await? {
                Some(b'\n') => return self.finish_line(channel).await,
                Some(_) => self.noise_bytes += 1,
                None => break,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::memory::{MemoryChannel, MemoryHandle};

    fn setup(capacity: usize) -> (NotificationParser, MemoryChannel, MemoryHandle) {
        let parser = NotificationParser::with_limits(capacity, Duration::from_millis(20), Duration::from_millis(1));
        let channel = MemoryChannel::new("module");
        let handle = channel.handle();
        (parser, channel, handle)
    }

    #[tokio::test]
    async fn test_idle_returns_none_without_blocking() {
        let (mut parser, mut channel, _handle) = setup(100);
        let result = tokio::time::timeout(Duration::from_millis(5), parser.poll_notification(&mut channel))
            .await
            .expect("idle poll must not wait");
        assert_eq!(result.unwrap(), None);
    }

    #[tokio::test]
    async fn test_parses_simple_notification() {
        let (mut parser, mut channel, handle) = setup(100);
        handle.feed(b"+IPD,0,5:hello\n\r");

        let notification = parser.poll_notification(&mut channel).await.unwrap().unwrap();
        assert_eq!(notification.client, ClientId::A);
        assert_eq!(notification.payload, b"hello".to_vec());
        assert_eq!(notification.declared_len, 5);
        assert!(!notification.truncated);
        assert_eq!(handle.pending(), 0);
    }

    #[tokio::test]
    async fn test_multi_digit_length_field() {
        let (mut parser, mut channel, handle) = setup(100);
        let payload = vec![b'x'; 42];
        let mut frame = b"+IPD,1,42:".to_vec();
        frame.extend_from_slice(&payload);
        frame.extend_from_slice(b"\n\r");
        handle.feed(&frame);

        let notification = parser.poll_notification(&mut channel).await.unwrap().unwrap();
        assert_eq!(notification.client, ClientId::B);
        assert_eq!(notification.payload, payload);
        assert_eq!(notification.declared_len, 42);
    }

    #[tokio::test]
    async fn test_invalid_client_id_drops_notification() {
        let (mut parser, mut channel, handle) = setup(100);
        handle.feed(b"+IPD,9,5:he+lo\n\r+IPD,1,2:ok\n\r");

        let err = parser.poll_notification(&mut channel).await.unwrap_err();
        assert_eq!(err, ParseError::InvalidClientId { byte: b'9' });

        // Rest of the rejected line is gone; the next notification parses cleanly
        let next = parser.poll_notification(&mut channel).await.unwrap().unwrap();
        assert_eq!(next.client, ClientId::B);
        assert_eq!(next.payload, b"ok".to_vec());
    }

    #[tokio::test]
    async fn test_noise_is_skipped_quietly() {
        let (mut parser, mut channel, handle) = setup(100);
        handle.feed(b"0,CONNECT\r\n");

        for _ in 0..11 {
            assert_eq!(parser.poll_notification(&mut channel).await.unwrap(), None);
        }
        assert_eq!(parser.noise_bytes(), 11);
        assert_eq!(handle.pending(), 0);
    }

    #[tokio::test]
    async fn test_header_mismatch() {
        let (mut parser, mut channel, handle) = setup(100);
        handle.feed(b"+CWLAP\n\r");

        let err = parser.poll_notification(&mut channel).await.unwrap_err();
        assert!(matches!(
            err,
            ParseError::UnexpectedByte {
                stage: "header",
                expected: 'I',
                found: b'C'
            }
        ));
        assert_eq!(handle.pending(), 0);
    }

    #[tokio::test]
    async fn test_invalid_length_fields() {
        let (mut parser, mut channel, handle) = setup(100);
        handle.feed(b"+IPD,0,:x\n\r");
        assert!(matches!(
            parser.poll_notification(&mut channel).await,
            Err(ParseError::InvalidLength { .. })
        ));

        handle.feed(b"+IPD,0,12345:x\n\r");
        assert!(matches!(
            parser.poll_notification(&mut channel).await,
            Err(ParseError::InvalidLength { .. })
        ));

        handle.feed(b"+IPD,0,1a:x\n\r");
        assert!(matches!(
            parser.poll_notification(&mut channel).await,
            Err(ParseError::UnexpectedByte {
                stage: "length",
                found: b'a',
                ..
            })
        ));
        assert_eq!(handle.pending(), 0);
    }

    async fn assert_recovers(frame: &[u8]) {
        let (mut parser, mut channel, handle) = setup(100);
        handle.feed(frame);

        let err = parser.poll_notification(&mut channel).await.unwrap_err();
        assert!(!err.is_fatal(), "{}", err);

        let mut delivered = None;
        while delivered.is_none() && (handle.pending() > 0 || parser.resume_header) {
            delivered = parser.poll_notification(&mut channel).await.unwrap();
        }
        let next = delivered.unwrap_or_else(|| panic!("notification after {:?} lost", String::from_utf8_lossy(frame)));
        assert_eq!(next.client, ClientId::B);
        assert_eq!(next.payload, b"ok".to_vec());
        assert_eq!(handle.pending(), 0);
    }

    #[tokio::test]
    async fn test_line_feed_inside_header_does_not_swallow_next_notification() {
        assert_recovers(b"+IPD,0,\n\r+IPD,1,2:ok\n\r").await;
        assert_recovers(b"+IPD,0,7\n\r+IPD,1,2:ok\n\r").await;
        assert_recovers(b"+IPD,\n\r+IPD,1,2:ok\n\r").await;
    }

    #[tokio::test]
    async fn test_repeated_plus_resynchronises() {
        assert_recovers(b"++IPD,1,2:ok\n\r").await;
        assert_recovers(b"+IPD,0+IPD,1,2:ok\n\r").await;
    }

    #[tokio::test]
    async fn test_notification_without_carriage_return_before_next() {
        let (mut parser, mut channel, handle) = setup(100);
        handle.feed(b"+IPD,0,2:hi\n+IPD,1,2:ok\n\r");

        let first = parser.poll_notification(&mut channel).await.unwrap().unwrap();
        assert_eq!(first.payload, b"hi".to_vec());
        let second = parser.poll_notification(&mut channel).await.unwrap().unwrap();
        assert_eq!(second.payload, b"ok".to_vec());
    }

    #[tokio::test]
    async fn test_capacity_reached_without_terminator_is_truncated() {
        let (mut parser, mut channel, handle) = setup(100);
        let mut frame = b"+IPD,0,120:".to_vec();
        frame.extend(std::iter::repeat(b'a').take(100));
        frame.push(b'b');
        handle.feed(&frame);

        let notification = parser.poll_notification(&mut channel).await.unwrap().unwrap();
        assert!(notification.truncated);
        assert_eq!(notification.len(), 100);
        assert!(notification.payload.iter().all(|&b| b == b'a'));
        // The byte after the cap is consumed as the trailer
        assert_eq!(handle.pending(), 0);
    }

    #[tokio::test]
    async fn test_full_buffer_followed_by_terminator_is_complete() {
        let (mut parser, mut channel, handle) = setup(4);
        handle.feed(b"+IPD,1,4:abcd\n\r+IPD,0,1:z\n\r");

        let first = parser.poll_notification(&mut channel).await.unwrap().unwrap();
        assert!(!first.truncated);
        assert_eq!(first.payload, b"abcd".to_vec());

        let second = parser.poll_notification(&mut channel).await.unwrap().unwrap();
        assert_eq!(second.payload, b"z".to_vec());
    }

    #[tokio::test]
    async fn test_stalled_stream_drops_notification() {
        let (mut parser, mut channel, handle) = setup(100);
        handle.feed(b"+IPD,0,5:hel");

        let err = parser.poll_notification(&mut channel).await.unwrap_err();
        assert!(matches!(err, ParseError::Stalled { stage: "payload", .. }));
        assert!(!err.is_fatal());
    }

    #[tokio::test]
    async fn test_missing_carriage_return_still_delivers() {
        let (mut parser, mut channel, handle) = setup(100);
        handle.feed(b"+IPD,0,2:hi\n");

        let notification = parser.poll_notification(&mut channel).await.unwrap().unwrap();
        assert_eq!(notification.payload, b"hi".to_vec());
        assert!(!notification.truncated);
    }

    #[tokio::test]
    async fn test_bytes_arriving_late_are_awaited() {
        let mut parser = NotificationParser::with_limits(100, Duration::from_millis(500), Duration::from_millis(1));
        let mut channel = MemoryChannel::new("module");
        let handle = channel.handle();
        handle.feed(b"+IPD,1,3:a");

        let feeder = handle.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(30)).await;
            feeder.feed(b"bc\n\r");
        });

        let notification = parser.poll_notification(&mut channel).await.unwrap().unwrap();
        assert_eq!(notification.payload, b"abc".to_vec());
    }
}

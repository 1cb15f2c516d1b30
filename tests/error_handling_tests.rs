use espbridge::{BridgeError, BridgeResult, ConfigError, ParseError};
use std::error::Error;

/// Error handling and resilience tests
#[cfg(test)]
mod error_handling_tests {
    use super::*;

    #[test]
    fn test_error_types() {
        let errors = vec![
            BridgeError::Config { message: "Config error".to_string() },
            BridgeError::Communication { message: "Comm error".to_string() },
            BridgeError::ChannelClosed { channel: "module".to_string() },
            BridgeError::InvalidInput("Invalid input".to_string()),
            BridgeError::Output("Output error".to_string()),
            ConfigError::NoResponse { received: String::new() }.into(),
            ParseError::InvalidClientId { byte: b'7' }.into(),
        ];

        for error in errors {
            let display = error.to_string();
            assert!(!display.is_empty(), "Error display should not be empty");
        }

        // Errors cross task boundaries
        fn assert_send_sync<T: Send + Sync + 'static>() {}
        assert_send_sync::<BridgeError>();
        assert_send_sync::<ConfigError>();
        assert_send_sync::<ParseError>();
    }

    #[test]
    fn test_error_conversion() {
        let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "port vanished");
        let bridge_error: BridgeError = io_error.into();
        assert!(matches!(bridge_error, BridgeError::Io(_)));

        let parse: ParseError = bridge_error.into();
        assert!(parse.is_fatal());
        assert!(parse.to_string().contains("port vanished"));

        let bringup: ConfigError = BridgeError::ChannelClosed { channel: "debug".to_string() }.into();
        assert!(matches!(bringup, ConfigError::Channel { .. }));
    }

    #[test]
    fn test_error_chain() {
        let err: BridgeError = ConfigError::NoResponse { received: "ER".to_string() }.into();

        // thiserror #[from] exposes the wrapped error as the source
        let source = err.source().expect("bring-up error should have a source");
        assert_eq!(source.to_string(), "module did not acknowledge liveness probe (received \"ER\")");
    }

    #[test]
    fn test_recoverable_parse_errors() {
        let recoverable = [
            ParseError::InvalidClientId { byte: b'9' },
            ParseError::UnexpectedByte { stage: "header", expected: 'I', found: b'X' },
            ParseError::InvalidLength { reason: "missing digits".to_string() },
            ParseError::Truncated { capacity: 100 },
            ParseError::Stalled { stage: "payload", waited_ms: 500 },
        ];
        for err in recoverable {
            assert!(!err.is_fatal(), "{} should not stop the relay loop", err);
        }
    }

    #[tokio::test]
    async fn test_async_error_propagation() {
        async fn failing_async_function() -> BridgeResult<()> {
            Err(BridgeError::Communication {
                message: "Async operation failed".to_string(),
            })
        }

        async fn calling_function() -> BridgeResult<()> {
            failing_async_function().await?;
            Ok(())
        }

        let error = calling_function().await.unwrap_err();
        assert!(error.to_string().contains("Async operation failed"));
    }
}

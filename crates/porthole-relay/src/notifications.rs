//! Typed notifications a relay emits toward its panel.

/// Everything a panel can learn from its relay.
///
/// The hosting surface encodes these back onto the channel wire
/// (`open:`, `message:`, `navigation:`, `parseError:`, `close:`, `error:`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayNotification {
    /// The CDP socket opened; queued commands have been flushed.
    Open,
    /// Verbatim inbound CDP traffic.
    Message(String),
    /// The inspected page navigated to this URL (synthesized from
    /// `Page.frameNavigated` / `Target.targetInfoChanged`).
    Navigation(String),
    /// A panel message was dropped as malformed or disallowed.
    ParseError(String),
    /// The socket closed. Emitted at most once per connection.
    Closed {
        /// Human-readable close reason.
        reason: String,
    },
    /// The socket failed. Emitted at most once per connection, in place of
    /// `Closed`.
    SocketError {
        /// Human-readable error.
        reason: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_variants_carry_reasons() {
        let closed = RelayNotification::Closed {
            reason: "remote closed".into(),
        };
        match closed {
            RelayNotification::Closed { reason } => assert_eq!(reason, "remote closed"),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn notifications_compare_by_value() {
        assert_eq!(RelayNotification::Open, RelayNotification::Open);
        assert_ne!(
            RelayNotification::Message("a".into()),
            RelayNotification::Message("b".into())
        );
    }
}

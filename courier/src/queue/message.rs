//! Outbound message format.

/// Content type every published message is tagged with.
pub const CONTENT_TYPE_JSON: &str = "application/json";

/// A payload on its way to the broker.
///
/// The body is opaque: nothing here parses or validates it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message<'a> {
    /// Raw request body
    pub payload: &'a [u8],
    /// Content type set on the AMQP properties
    pub content_type: &'static str,
}

impl<'a> Message<'a> {
    /// Wrap a payload as a structured (JSON) message.
    pub fn json(payload: &'a [u8]) -> Self {
        Self {
            payload,
            content_type: CONTENT_TYPE_JSON,
        }
    }

    pub fn len(&self) -> usize {
        self.payload.len()
    }

    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }
}

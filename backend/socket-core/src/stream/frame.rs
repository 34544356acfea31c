use std::borrow::Cow;

/// One inbound data frame, text or binary, as raw bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundFrame {
    payload: Vec<u8>,
}

impl InboundFrame {
    pub fn new(payload: impl Into<Vec<u8>>) -> Self {
        Self {
            payload: payload.into(),
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.payload
    }

    /// Payload as text for logging.
    pub fn as_text_lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.payload)
    }
}

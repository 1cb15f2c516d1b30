use serde::{Deserialize, Serialize};

/// One of the two clients connected through the module's server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ClientId {
    A,
    B,
}

impl ClientId {
    /// Decode the wire digit, `'0'` or `'1'`
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            b'0' => Some(ClientId::A),
            b'1' => Some(ClientId::B),
            _ => None,
        }
    }

    pub fn as_byte(self) -> u8 {
        match self {
            ClientId::A => b'0',
            ClientId::B => b'1',
        }
    }

    pub fn as_char(self) -> char {
        self.as_byte() as char
    }

    /// The client that did not send: messages are never echoed back.
    pub fn peer(self) -> Self {
        match self {
            ClientId::A => ClientId::B,
            ClientId::B => ClientId::A,
        }
    }
}

impl std::fmt::Display for ClientId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

/// Inbound client data extracted from one `+IPD` notification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub client: ClientId,
    pub payload: Vec<u8>,
    /// Length field announced by the module
    pub declared_len: usize,
    /// Payload hit the buffer capacity before a line feed
    pub truncated: bool,
}

impl Notification {
    pub fn new(client: ClientId, payload: Vec<u8>) -> Self {
        let declared_len = payload.len();
        Self {
            client,
            payload,
            declared_len,
            truncated: false,
        }
    }

    pub fn len(&self) -> usize {
        self.payload.len()
    }

    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }
}

/// Fixed-capacity payload accumulator, owned by the parser for one notification.
#[derive(Debug)]
pub struct PayloadBuffer {
    bytes: Vec<u8>,
    capacity: usize,
}

impl PayloadBuffer {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            bytes: Vec::with_capacity(capacity),
            capacity,
        }
    }

    /// Append one byte; returns `false` and stores nothing when full.
    pub fn push(&mut self, byte: u8) -> bool {
        if self.is_full() {
            return false;
        }
        self.bytes.push(byte);
        true
    }

    pub fn is_full(&self) -> bool {
        self.bytes.len() >= self.capacity
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

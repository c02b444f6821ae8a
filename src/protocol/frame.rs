//! # Frames
//!
//! A frame is one opcode plus its payload, written to the characteristic in
//! a single GATT write. There is no length prefix or checksum: the BLE write
//! boundary is the frame boundary.

use std::fmt;

use super::commands::Opcode;

/// One complete command, ready to hand to a transport.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Frame(Vec<u8>);

impl Frame {
    /// Build a frame from an opcode and payload.
    pub fn new(opcode: Opcode, payload: &[u8]) -> Self {
        let mut bytes = Vec::with_capacity(1 + payload.len());
        bytes.push(opcode.byte());
        bytes.extend_from_slice(payload);
        Self(bytes)
    }

    /// A frame with no payload.
    pub fn control(opcode: Opcode) -> Self {
        Self(vec![opcode.byte()])
    }

    /// Wrap already-encoded bytes. Returns `None` if the buffer is empty.
    pub fn from_bytes(bytes: Vec<u8>) -> Option<Self> {
        if bytes.is_empty() { None } else { Some(Self(bytes)) }
    }

    /// Decoded opcode, or `None` for bytes outside the catalog.
    pub fn opcode(&self) -> Option<Opcode> {
        Opcode::from_byte(self.0[0])
    }

    pub fn payload(&self) -> &[u8] {
        &self.0[1..]
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }

    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl AsRef<[u8]> for Frame {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// Space-separated lowercase hex, the format the printer logs use.
///
/// ```
/// use thermoline::protocol::commands;
///
/// assert_eq!(commands::feed(1).to_string(), "06 01");
/// ```
impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, byte) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

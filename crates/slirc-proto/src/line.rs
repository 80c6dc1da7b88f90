//! Line-based codec for tokio.
//!
//! Reads newline-terminated lines and writes CRLF-terminated lines that never
//! exceed the 512-byte IRC limit.

use bytes::{BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::error;
use crate::{MAX_IRC_LINE_LEN, MAX_LINE_LEN};

/// Line-based codec that handles newline-terminated messages.
///
/// Inbound lines are limited to [`MAX_IRC_LINE_LEN`] bytes by default.
/// Outbound lines are cut at the first CR or LF and at [`MAX_LINE_LEN`]
/// bytes (on a character boundary) before the CRLF terminator is appended.
#[derive(Debug)]
pub struct LineCodec {
    /// Index of next byte to check for newline
    next_index: usize,
    /// Maximum inbound line length
    max_len: usize,
}

impl Default for LineCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl LineCodec {
    /// Create a new codec with the default inbound limit.
    pub fn new() -> Self {
        Self::with_max_len(MAX_IRC_LINE_LEN)
    }

    /// Create a new codec with custom max inbound line length.
    pub fn with_max_len(max_len: usize) -> Self {
        Self {
            next_index: 0,
            max_len,
        }
    }

    /// Reduce an outbound line to a single protocol line of at most
    /// [`MAX_LINE_LEN`] bytes.
    pub fn sanitize(line: &str) -> &str {
        let line = match line.find(|c: char| c == '\r' || c == '\n') {
            Some(pos) => &line[..pos],
            None => line,
        };
        if line.len() <= MAX_LINE_LEN {
            return line;
        }
        let mut end = MAX_LINE_LEN;
        while !line.is_char_boundary(end) {
            end -= 1;
        }
        &line[..end]
    }
}

impl Decoder for LineCodec {
    type Item = String;
    type Error = error::ProtocolError;

    fn decode(&mut self, src: &mut BytesMut) -> error::Result<Option<String>> {
        if let Some(offset) = src[self.next_index..].iter().position(|b| *b == b'\n') {
            let line = src.split_to(self.next_index + offset + 1);
            self.next_index = 0;

            if line.len() > self.max_len {
                return Err(error::ProtocolError::MessageTooLong {
                    actual: line.len(),
                    limit: self.max_len,
                });
            }

            let mut raw = line.to_vec();
            while matches!(raw.last(), Some(b'\n' | b'\r')) {
                raw.pop();
            }

            let data = String::from_utf8(raw).map_err(|e| error::ProtocolError::InvalidUtf8 {
                byte_pos: e.utf8_error().valid_up_to(),
                raw_line: e.into_bytes(),
            })?;

            Ok(Some(data))
        } else {
            self.next_index = src.len();

            if src.len() > self.max_len {
                return Err(error::ProtocolError::MessageTooLong {
                    actual: src.len(),
                    limit: self.max_len,
                });
            }

            Ok(None)
        }
    }
}

impl Encoder<String> for LineCodec {
    type Error = error::ProtocolError;

    fn encode(&mut self, msg: String, dst: &mut BytesMut) -> error::Result<()> {
        let line = Self::sanitize(&msg);
        dst.reserve(line.len() + 2);
        dst.put_slice(line.as_bytes());
        dst.put_slice(b"\r\n");
        Ok(())
    }
}

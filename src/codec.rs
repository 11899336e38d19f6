//! Newline-delimited text codec
//!
//! Like `LinesCodec`, but inbound bytes are decoded lossily: a line that is
//! not valid UTF-8 still arrives, with U+FFFD in place of the bad bytes.
//! A trailing `\r` is stripped. Outbound lines get a `\n` appended.

use bytes::{BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::error::CodecError;

#[derive(Debug, Clone, Default)]
pub struct ChatCodec {
    /// Where to resume the newline scan on the next call
    next_index: usize,
    max_length: Option<usize>,
}

impl ChatCodec {
    /// Codec with no limit on line length
    pub fn new() -> Self {
        Self::default()
    }

    /// Codec rejecting lines longer than `max_length` bytes
    pub fn new_with_max_length(max_length: usize) -> Self {
        Self {
            next_index: 0,
            max_length: Some(max_length),
        }
    }

    fn check_length(&self, len: usize) -> Result<(), CodecError> {
        match self.max_length {
            Some(max) if len > max => Err(CodecError::MaxLineLengthExceeded),
            _ => Ok(()),
        }
    }
}

fn to_text(bytes: &[u8]) -> String {
    let bytes = bytes.strip_suffix(b"\r").unwrap_or(bytes);
    String::from_utf8_lossy(bytes).into_owned()
}

impl Decoder for ChatCodec {
    type Item = String;
    type Error = CodecError;

    fn decode(&mut self, buf: &mut BytesMut) -> Result<Option<String>, CodecError> {
        let newline = buf[self.next_index..].iter().position(|b| *b == b'\n');

        match newline {
            Some(offset) => {
                let end = self.next_index + offset;
                self.next_index = 0;
                self.check_length(end)?;
                let line = buf.split_to(end + 1);
                Ok(Some(to_text(&line[..end])))
            }
            None => {
                self.check_length(buf.len())?;
                self.next_index = buf.len();
                Ok(None)
            }
        }
    }

    fn decode_eof(&mut self, buf: &mut BytesMut) -> Result<Option<String>, CodecError> {
        if let Some(line) = self.decode(buf)? {
            return Ok(Some(line));
        }
        if buf.is_empty() {
            return Ok(None);
        }
        self.next_index = 0;
        let line = buf.split_to(buf.len());
        Ok(Some(to_text(&line)))
    }
}

impl<T: AsRef<str>> Encoder<T> for ChatCodec {
    type Error = CodecError;

    fn encode(&mut self, line: T, buf: &mut BytesMut) -> Result<(), CodecError> {
        let line = line.as_ref();
        buf.reserve(line.len() + 1);
        buf.put_slice(line.as_bytes());
        buf.put_u8(b'\n');
        Ok(())
    }
}

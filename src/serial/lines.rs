use bytes::{Buf, BytesMut};
use tokio_util::codec::Decoder;

use crate::source::SourceError;

/// Splits the incoming byte stream on a delimiter character.
/// The delimiter is not included in the yielded lines, and bad UTF-8 is
/// replaced rather than rejected: the controller occasionally garbles a
/// record, and the parser decides what is noise.
///
/// Read-only; this device is never written to.
#[derive(Debug, Clone)]
pub(crate) struct LinesCodec {
    /// How far we have looked for a delimiter into the buffer.
    cursor: usize,

    delimiter: u8,
}

impl LinesCodec {
    pub(crate) fn new(delimiter: u8) -> Self {
        Self {
            cursor: 0,
            delimiter,
        }
    }
}

impl Default for LinesCodec {
    fn default() -> Self {
        Self::new(b'\n')
    }
}

impl Decoder for LinesCodec {
    type Item = String;
    type Error = SourceError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        let read_to = src.len();
        let look_at = &src[self.cursor..read_to];

        if let Some(position) = look_at.iter().position(|&byte| byte == self.delimiter) {
            // We might have started late in the buffer (from the cursor),
            // so the position within the whole buffer has to be calculated.
            let actual_position = self.cursor + position;

            // Next time we start over.
            self.cursor = 0;

            let line = src.split_to(actual_position);

            // Discard the delimiter by advancing the source buffer beyond it.
            src.advance(1);

            Ok(Some(String::from_utf8_lossy(&line).to_string()))
        } else {
            // No full frame yet. The next call gets the same buffer with
            // possibly more data; no need to re-scan what we already saw.
            self.cursor = read_to;

            Ok(None)
        }
    }
}

//! Response stream codec
//!
//! Splits the TCP byte stream into frames. The wire format has no length
//! field, so the expected size comes from the layout of the catalog call whose
//! response header matches. A frame with a header outside the catalog runs up
//! to the next known header, or to the end of the buffer if none follows; the
//! session then reports it as unknown.

use crate::error::{ProtocolError, WxSrvError};
use crate::protocol::catalog::{catalog, CommandSpec};
use crate::protocol::frame::{self, FrameHeader, HEADER_LEN, MAGIC};
use bytes::{BufMut, BytesMut};
use std::collections::HashMap;
use tokio_util::codec::{Decoder, Encoder};

#[derive(Debug, Clone, Default)]
pub struct ResponseCodec {
    expected: HashMap<FrameHeader, &'static CommandSpec>,
}

impl ResponseCodec {
    /// Codec that sizes every response the station can send
    pub fn for_catalog() -> Self {
        Self {
            expected: catalog().iter().map(|spec| (spec.response, spec)).collect(),
        }
    }

    /// Start of the first known frame after the one at offset 0
    fn next_known_frame(&self, src: &[u8]) -> Option<usize> {
        (MAGIC.len()..=src.len().saturating_sub(HEADER_LEN)).find(|&at| {
            src[at..at + MAGIC.len()] == MAGIC
                && self
                    .expected
                    .contains_key(&FrameHeader::new(src[at + 2], src[at + 3]))
        })
    }
}

impl Decoder for ResponseCodec {
    type Item = BytesMut;
    type Error = WxSrvError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.len() < HEADER_LEN {
            return Ok(None);
        }

        let header = frame::decode_header(&src[..HEADER_LEN])?;
        let frame_len = match self.expected.get(&header) {
            Some(spec) => spec.frame_len(),
            None => self.next_known_frame(src).unwrap_or(src.len()),
        };

        if src.len() < frame_len {
            src.reserve(frame_len - src.len());
            return Ok(None);
        }

        Ok(Some(src.split_to(frame_len)))
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if let Some(frame) = self.decode(src)? {
            return Ok(Some(frame));
        }
        if src.is_empty() {
            return Ok(None);
        }

        let header = frame::decode_header(&src[..])?;
        match self.expected.get(&header) {
            Some(spec) => {
                // Only the trailing filler may be missing
                frame::decode(&src[..], &spec.layout)?;
                Ok(Some(src.split_to(src.len())))
            },
            None => Err(ProtocolError::FrameTooShort { len: src.len() }.into()),
        }
    }
}

impl Encoder<&[u8]> for ResponseCodec {
    type Error = WxSrvError;

    fn encode(&mut self, request: &[u8], dst: &mut BytesMut) -> Result<(), Self::Error> {
        dst.reserve(request.len());
        dst.put_slice(request);
        Ok(())
    }
}

// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! [`tokio_util::codec`] glue so a datapath's receive half can drive a `Framed` stream instead
//! of hand-rolling the header-then-body buffering loop.

use super::message::parse;
use super::{CodecError, Header, Message, OFP_HEADER_LEN};
use bytes::{Buf, BytesMut};

/// Frames a raw byte stream into [`Message`]s.
///
/// Encoding is a pure passthrough: [`super::Encoder`] already produces complete,
/// length-prefixed frames, so there's nothing left for this half to do but copy bytes into the
/// write buffer.
#[derive(Debug, Default)]
pub struct Ofp10Codec {
    next_frame_len: Option<usize>,
}

impl tokio_util::codec::Decoder for Ofp10Codec {
    type Item = Message;
    type Error = CodecError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Message>, CodecError> {
        let frame_len = match self.next_frame_len {
            Some(len) => len,
            None => {
                let Some(header) = Header::peek(src) else {
                    return Ok(None);
                };
                header.validate()?;
                let len = header.length as usize;
                self.next_frame_len = Some(len);
                len
            }
        };

        if src.len() < frame_len {
            src.reserve(frame_len - src.len());
            return Ok(None);
        }

        self.next_frame_len = None;
        let mut frame = src.split_to(frame_len).freeze();
        let header = Header::peek(&frame).expect("frame_len >= OFP_HEADER_LEN");
        frame.advance(OFP_HEADER_LEN);
        parse(header, frame).map(Some)
    }
}

impl tokio_util::codec::Encoder<bytes::Bytes> for Ofp10Codec {
    type Error = CodecError;

    fn encode(&mut self, item: bytes::Bytes, dst: &mut BytesMut) -> Result<(), CodecError> {
        dst.extend_from_slice(&item);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wire::Encoder;
    use tokio_util::codec::Decoder;

    #[test]
    fn decodes_one_frame_at_a_time_across_partial_reads() {
        let mut codec = Ofp10Codec::default();
        let wire = Encoder::hello(42);

        let mut partial = BytesMut::from(&wire[..4]);
        assert!(codec.decode(&mut partial).unwrap().is_none());

        partial.extend_from_slice(&wire[4..]);
        let msg = codec.decode(&mut partial).unwrap().unwrap();
        assert!(matches!(msg, Message::Hello { xid: 42, .. }));
        assert!(partial.is_empty());
    }

    #[test]
    fn decodes_back_to_back_frames() {
        let mut codec = Ofp10Codec::default();
        let mut buf = BytesMut::new();
        buf.extend_from_slice(&Encoder::hello(1));
        buf.extend_from_slice(&Encoder::barrier_request(2));

        let first = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(first.xid(), 1);
        let second = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(second.xid(), 2);
        assert!(codec.decode(&mut buf).unwrap().is_none());
    }
}

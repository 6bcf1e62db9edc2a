//! Frame encoding and decoding.
//!
//! Payload frame layout:
//!
//! ```text
//! [header: u8][route extra][session id: u8][type id: u16-prefixed str][body]
//! ```
//!
//! Route extra is empty for `0x10`/`0x11`, a 16-byte target for `0x12`, and a
//! varint count followed by 16-byte ids for `0x13`.

use bytestream::{ByteReader, ByteWriter};

use crate::control::{decode_control_body, decode_hello_body, ControlFrame, HelloFrame};
use crate::error::{DecodeError, EncodeError, LimitKind, WireResult};
use crate::header::{FrameHeader, Route};
use crate::limits::Limits;

/// A decoded payload frame borrowing from the input buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayloadFrame<'a> {
    pub route: Route,
    pub session_id: u8,
    /// Type identifier text, `namespace:path`.
    pub type_id: &'a str,
    /// Payload codec bytes.
    pub body: &'a [u8],
}

/// Any decoded frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame<'a> {
    Control(ControlFrame),
    Hello(HelloFrame),
    Payload(PayloadFrame<'a>),
}

impl Frame<'_> {
    #[must_use]
    pub const fn header(&self) -> FrameHeader {
        match self {
            Self::Control(_) => FrameHeader::Control,
            Self::Hello(_) => FrameHeader::Hello,
            Self::Payload(frame) => frame.route.header(),
        }
    }
}

/// Returns the encoded size of a payload frame.
#[must_use]
pub fn payload_frame_len(route: &Route, type_id: &str, body_len: usize) -> usize {
    1 + route.extra_len() + 1 + 2 + type_id.len() + body_len
}

/// Encodes a payload frame.
///
/// The size is computed before anything is written; a frame that would
/// exceed `limits.max_frame_bytes` fails with [`EncodeError::FrameTooLarge`].
pub fn encode_payload_frame(
    route: &Route,
    session_id: u8,
    type_id: &str,
    body: &[u8],
    limits: &Limits,
) -> Result<Vec<u8>, EncodeError> {
    if type_id.len() > limits.max_type_id_len {
        return Err(EncodeError::TypeIdTooLong {
            length: type_id.len(),
            limit: limits.max_type_id_len,
        });
    }
    if let Route::Exclude(ids) = route {
        if ids.len() > limits.max_exclusions {
            return Err(EncodeError::TooManyExclusions {
                count: ids.len(),
                limit: limits.max_exclusions,
            });
        }
    }
    let size = payload_frame_len(route, type_id, body.len());
    if size > limits.max_frame_bytes {
        return Err(EncodeError::FrameTooLarge {
            size,
            limit: limits.max_frame_bytes,
        });
    }

    let mut writer = ByteWriter::with_capacity(size);
    writer.write_u8(route.header().as_byte());
    match route {
        Route::Client | Route::Broadcast => {}
        Route::Targeted(target) => writer.write_uuid(target),
        Route::Exclude(ids) => {
            writer.write_len(ids.len())?;
            for id in ids {
                writer.write_uuid(id);
            }
        }
    }
    writer.write_u8(session_id);
    writer.write_str(type_id)?;
    writer.write_bytes(body);
    Ok(writer.finish())
}

/// Decodes any frame.
pub fn decode_frame<'a>(bytes: &'a [u8], limits: &Limits) -> WireResult<Frame<'a>> {
    if bytes.len() > limits.max_frame_bytes {
        return Err(DecodeError::LimitsExceeded {
            kind: LimitKind::FrameBytes,
            limit: limits.max_frame_bytes,
            actual: bytes.len(),
        });
    }
    let mut reader = ByteReader::new(bytes);
    let header_byte = reader.read_u8().map_err(|_| DecodeError::EmptyFrame)?;
    let header = FrameHeader::from_byte(header_byte).ok_or(DecodeError::UnknownHeader {
        header: header_byte,
    })?;

    match header {
        FrameHeader::Control => decode_control_body(&mut reader).map(Frame::Control),
        FrameHeader::Hello => decode_hello_body(&mut reader).map(Frame::Hello),
        FrameHeader::Client
        | FrameHeader::Broadcast
        | FrameHeader::Targeted
        | FrameHeader::Exclude => {
            decode_payload_body(header, &mut reader, limits).map(Frame::Payload)
        }
    }
}

fn decode_payload_body<'a>(
    header: FrameHeader,
    reader: &mut ByteReader<'a>,
    limits: &Limits,
) -> WireResult<PayloadFrame<'a>> {
    let route = match header {
        FrameHeader::Targeted => Route::Targeted(reader.read_uuid()?),
        FrameHeader::Exclude => {
            let count = reader.read_count()?;
            if count > limits.max_exclusions {
                return Err(DecodeError::LimitsExceeded {
                    kind: LimitKind::Exclusions,
                    limit: limits.max_exclusions,
                    actual: count,
                });
            }
            let mut ids = Vec::with_capacity(count);
            for _ in 0..count {
                ids.push(reader.read_uuid()?);
            }
            Route::Exclude(ids)
        }
        FrameHeader::Broadcast => Route::Broadcast,
        _ => Route::Client,
    };
    let session_id = reader.read_u8()?;
    let type_id = reader.read_str()?;
    if type_id.len() > limits.max_type_id_len {
        return Err(DecodeError::LimitsExceeded {
            kind: LimitKind::TypeIdLength,
            limit: limits.max_type_id_len,
            actual: type_id.len(),
        });
    }
    Ok(PayloadFrame {
        route,
        session_id,
        type_id,
        body: reader.rest(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::{encode_control_frame, encode_hello_frame, ControlMessage};
    use crate::header::PeerRole;
    use bytestream::ByteError;
    use uuid::Uuid;

    const TYPE_ID: &str = "tether:entity_move";

    #[test]
    fn broadcast_layout() {
        let bytes =
            encode_payload_frame(&Route::Broadcast, 4, "a:b", &[9, 9], &Limits::default()).unwrap();
        assert_eq!(bytes, vec![0x11, 4, 3, 0, b'a', b':', b'b', 9, 9]);
    }

    #[test]
    fn targeted_id_follows_header() {
        let target = Uuid::from_u128(0xAA);
        let bytes =
            encode_payload_frame(&Route::Targeted(target), 2, TYPE_ID, &[], &Limits::default())
                .unwrap();
        assert_eq!(bytes[0], 0x12);
        assert_eq!(&bytes[1..17], target.as_bytes());
        assert_eq!(bytes[17], 2);
    }

    #[test]
    fn exclude_roundtrip() {
        let route = Route::Exclude(vec![Uuid::from_u128(1), Uuid::from_u128(2)]);
        let bytes =
            encode_payload_frame(&route, 9, TYPE_ID, &[1, 2, 3], &Limits::default()).unwrap();
        assert_eq!(bytes.len(), payload_frame_len(&route, TYPE_ID, 3));

        let Frame::Payload(frame) = decode_frame(&bytes, &Limits::default()).unwrap() else {
            panic!("expected payload frame");
        };
        assert_eq!(frame.route, route);
        assert_eq!(frame.session_id, 9);
        assert_eq!(frame.type_id, TYPE_ID);
        assert_eq!(frame.body, &[1, 2, 3]);
    }

    #[test]
    fn oversize_frame_rejected_at_limit_boundary() {
        let limits = Limits::default();
        let fixed = payload_frame_len(&Route::Client, TYPE_ID, 0);
        let fits = vec![0u8; limits.max_frame_bytes - fixed];
        let bytes = encode_payload_frame(&Route::Client, 1, TYPE_ID, &fits, &limits).unwrap();
        assert_eq!(bytes.len(), 4096);

        let too_big = vec![0u8; limits.max_frame_bytes - fixed + 1];
        assert_eq!(
            encode_payload_frame(&Route::Client, 1, TYPE_ID, &too_big, &limits),
            Err(EncodeError::FrameTooLarge {
                size: 4097,
                limit: 4096
            })
        );
    }

    #[test]
    fn decode_rejects_oversize_input() {
        let bytes = vec![0x10; 4097];
        assert!(matches!(
            decode_frame(&bytes, &Limits::default()),
            Err(DecodeError::LimitsExceeded {
                kind: LimitKind::FrameBytes,
                ..
            })
        ));
    }

    #[test]
    fn unknown_header_and_empty() {
        assert_eq!(
            decode_frame(&[0x42], &Limits::default()),
            Err(DecodeError::UnknownHeader { header: 0x42 })
        );
        assert_eq!(decode_frame(&[], &Limits::default()), Err(DecodeError::EmptyFrame));
    }

    #[test]
    fn truncated_type_id_is_underflow() {
        let bytes = [0x10, 1, 10, 0, b'a'];
        assert!(matches!(
            decode_frame(&bytes, &Limits::default()),
            Err(DecodeError::Bytes(ByteError::UnexpectedEof { .. }))
        ));
    }

    #[test]
    fn exclusion_limit_enforced_both_ways() {
        let limits = Limits::for_testing();
        let route = Route::Exclude(vec![Uuid::nil(); limits.max_exclusions + 1]);
        assert!(matches!(
            encode_payload_frame(&route, 1, TYPE_ID, &[], &limits),
            Err(EncodeError::TooManyExclusions { .. })
        ));

        let bytes = encode_payload_frame(&route, 1, TYPE_ID, &[], &Limits::default()).unwrap();
        assert!(matches!(
            decode_frame(&bytes, &limits),
            Err(DecodeError::LimitsExceeded {
                kind: LimitKind::Exclusions,
                ..
            })
        ));
    }

    #[test]
    fn control_and_hello_dispatch_by_header() {
        let control = encode_control_frame(0, &ControlMessage::Registered(12)).unwrap();
        let frame = decode_frame(&control, &Limits::default()).unwrap();
        assert_eq!(frame.header(), FrameHeader::Control);
        assert_eq!(
            frame,
            Frame::Control(ControlFrame {
                session_id: 0,
                message: ControlMessage::Registered(12)
            })
        );

        let hello = HelloFrame {
            role: PeerRole::Server,
            peer_id: Uuid::from_u128(5),
            fingerprint: 77,
        };
        let bytes = encode_hello_frame(&hello);
        assert_eq!(
            decode_frame(&bytes, &Limits::default()).unwrap(),
            Frame::Hello(hello)
        );
    }
}

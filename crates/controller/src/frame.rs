//! Serial API framing -- byte-level decoder and request encoder.
//!
//! Data frames are `SOF LEN TYPE FUNC payload.. CHECKSUM`, where `LEN` counts
//! every byte after itself and the checksum is `0xFF` XOR-ed with each byte
//! from `LEN` through the payload. Between data frames the controller sends
//! single-byte ACK / NAK / CAN acknowledgements.
//!
//! Frames can split across reads, so the decoder is fed byte-by-byte and
//! keeps its state between calls.

/// Start of frame.
pub(crate) const SOF: u8 = 0x01;
/// Positive acknowledgement.
pub(crate) const ACK: u8 = 0x06;
/// Negative acknowledgement (checksum failure).
pub(crate) const NAK: u8 = 0x15;
/// Frame cancelled (collision).
pub(crate) const CAN: u8 = 0x18;

/// Smallest legal `LEN` value: type, function, checksum.
const MIN_LEN: u8 = 3;

/// Direction of a data frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FrameType {
    /// Host request, or unsolicited controller callback.
    Request,
    /// Controller response to a host request.
    Response,
}

impl FrameType {
    fn byte(self) -> u8 {
        match self {
            FrameType::Request => 0x00,
            FrameType::Response => 0x01,
        }
    }
}

/// A checked data frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Frame {
    pub(crate) kind: FrameType,
    pub(crate) function: u8,
    pub(crate) payload: Vec<u8>,
}

/// One unit read off the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Received {
    Ack,
    Nak,
    Can,
    Frame(Frame),
    /// A frame whose checksum or type byte was wrong.
    Corrupt,
}

fn checksum(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0xFF, |acc, b| acc ^ b)
}

/// Encode a host request for `function`.
///
/// Returns `None` when the payload does not fit the one-byte length field.
pub(crate) fn encode_request(function: u8, payload: &[u8]) -> Option<Vec<u8>> {
    let len = u8::try_from(payload.len() + usize::from(MIN_LEN)).ok()?;
    let mut frame = Vec::with_capacity(payload.len() + 5);
    frame.push(SOF);
    frame.push(len);
    frame.push(FrameType::Request.byte());
    frame.push(function);
    frame.extend_from_slice(payload);
    frame.push(checksum(&frame[1..]));
    Some(frame)
}

enum State {
    /// Waiting for SOF; acknowledgements are reported, anything else dropped.
    Idle,
    /// SOF seen, waiting for LEN.
    Length,
    /// Collecting the `len` bytes that follow LEN.
    Body { len: u8, buf: Vec<u8> },
}

/// Incremental Serial API frame decoder.
pub(crate) struct FrameDecoder {
    state: State,
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self { state: State::Idle }
    }
}

impl FrameDecoder {
    /// Feed `bytes` and return every unit they complete.
    pub(crate) fn push(&mut self, bytes: &[u8]) -> Vec<Received> {
        let mut out = Vec::new();
        for &byte in bytes {
            if let Some(unit) = self.push_byte(byte) {
                out.push(unit);
            }
        }
        out
    }

    fn push_byte(&mut self, byte: u8) -> Option<Received> {
        match &mut self.state {
            State::Idle => match byte {
                SOF => {
                    self.state = State::Length;
                    None
                }
                ACK => Some(Received::Ack),
                NAK => Some(Received::Nak),
                CAN => Some(Received::Can),
                // Line noise between frames.
                _ => None,
            },
            State::Length => {
                if byte < MIN_LEN {
                    self.state = State::Idle;
                    return Some(Received::Corrupt);
                }
                self.state = State::Body {
                    len: byte,
                    buf: Vec::with_capacity(usize::from(byte)),
                };
                None
            }
            State::Body { len, buf } => {
                buf.push(byte);
                if buf.len() < usize::from(*len) {
                    return None;
                }
                let len = *len;
                let buf = std::mem::take(buf);
                self.state = State::Idle;
                Some(Self::finish(len, &buf))
            }
        }
    }

    /// `body` is TYPE, FUNC, payload, CHECKSUM.
    fn finish(len: u8, body: &[u8]) -> Received {
        let Some((&received, covered)) = body.split_last() else {
            return Received::Corrupt;
        };
        let expected = checksum(covered) ^ len;
        if received != expected {
            return Received::Corrupt;
        }
        let kind = match covered[0] {
            0x00 => FrameType::Request,
            0x01 => FrameType::Response,
            _ => return Received::Corrupt,
        };
        Received::Frame(Frame {
            kind,
            function: covered[1],
            payload: covered[2..].to_vec(),
        })
    }
}

//! Transport codec: payloads to self-describing compressed blobs and back.
//!
//! Payloads are packed with MessagePack (named fields, so a decoder needs no
//! schema) and wrapped in zlib. Decoding tolerates uncompressed input so a
//! sender may skip compression without coordination.

use std::io::Write as _;

use flate2::write::{ZlibDecoder, ZlibEncoder};
use flate2::Compression;
use zeromq::{SocketRecv, SocketSend, ZmqMessage};

use chunkforge_core::payload::Payload;

use crate::api::{CodecError, DispatchError};

/// Serialize and compress a payload into one wire blob.
pub fn encode(payload: &Payload) -> Result<Vec<u8>, CodecError> {
    let packed = rmp_serde::to_vec_named(payload)?;
    let mut enc = ZlibEncoder::new(Vec::with_capacity(packed.len() / 2), Compression::default());
    enc.write_all(&packed)?;
    Ok(enc.finish()?)
}

/// Decompress and deserialize one wire blob.
pub fn decode(blob: &[u8]) -> Result<Payload, CodecError> {
    let mut dec = ZlibDecoder::new(Vec::new());
    let packed = match dec.write_all(blob).and_then(|()| dec.finish()) {
        Ok(buf) => buf,
        // Not zlib-framed; assume the sender skipped compression.
        Err(_) => blob.to_vec(),
    };
    Ok(rmp_serde::from_slice(&packed)?)
}

/// A message socket carrying whole payloads.
///
/// Wraps any zeromq socket half; the coordinator holds one around its bound
/// REP socket, workers and tests hold one around a connected REQ socket.
pub struct PayloadLink<S> {
    socket: S,
}

impl<S: SocketSend + SocketRecv> PayloadLink<S> {
    /// Wrap an already-bound or already-connected socket.
    pub fn new(socket: S) -> Self {
        Self { socket }
    }

    /// Encode and transmit one payload as one logical message.
    pub async fn send(&mut self, payload: &Payload) -> Result<(), DispatchError> {
        let blob = encode(payload)?;
        self.socket.send(ZmqMessage::from(blob)).await?;
        Ok(())
    }

    /// Receive and decode the next payload.
    pub async fn recv(&mut self) -> Result<Payload, DispatchError> {
        let msg = self.socket.recv().await?;
        let frames = msg.into_vec();
        let frame = frames
            .first()
            .ok_or_else(|| DispatchError::Protocol("empty message on socket".to_string()))?;
        Ok(decode(frame)?)
    }
}

#[cfg(test)]
mod tests {
    use chunkforge_core::payload::{NdArray, Value};

    use super::*;

    fn sample() -> Payload {
        let mut p = Payload::new();
        p.insert("count".into(), Value::Int(-3));
        p.insert("scale".into(), Value::Float(1.5));
        p.insert("flag".into(), Value::Bool(false));
        p.insert("name".into(), Value::Str("chunk".into()));
        p.insert("raw".into(), Value::Bytes(vec![0, 1, 254, 255]));
        p.insert("dat".into(), NdArray::f32(vec![20.0; 64]).into());
        p.insert("idx".into(), NdArray::i64(vec![7, 8, 9]).into());
        p
    }

    #[test]
    fn round_trip_identity() {
        let p = sample();
        let decoded = decode(&encode(&p).unwrap()).unwrap();
        assert_eq!(decoded, p);
    }

    #[test]
    fn preserves_shape_and_dtype() {
        let mut p = Payload::new();
        p.insert(
            "grid".into(),
            Value::Array(NdArray {
                shape: vec![2, 3],
                data: chunkforge_core::payload::ArrayData::F64(vec![0.5; 6]),
            }),
        );
        let decoded = decode(&encode(&p).unwrap()).unwrap();
        let arr = decoded.get("grid").and_then(Value::as_array).unwrap();
        assert_eq!(arr.shape, vec![2, 3]);
        assert_eq!(arr.dtype(), "f64");
    }

    #[test]
    fn accepts_uncompressed_input() {
        let p = sample();
        let packed = rmp_serde::to_vec_named(&p).unwrap();
        assert_eq!(decode(&packed).unwrap(), p);
    }

    #[test]
    fn rejects_garbage() {
        assert!(matches!(
            decode(&[0xde, 0xad, 0xbe, 0xef]),
            Err(CodecError::Decode(_))
        ));
    }

    #[test]
    fn compression_shrinks_repetitive_payloads() {
        let mut p = Payload::new();
        p.insert("dat".into(), NdArray::f32(vec![20.0; 100_000]).into());
        let blob = encode(&p).unwrap();
        assert!(blob.len() < 100_000);
    }
}

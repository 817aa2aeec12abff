//! Wire-protocol message vocabulary.
//!
//! The coordinator and its workers exchange plain payloads; message kind is
//! decided by content, never by peer identity. A work request carries
//! `ready == true` and no `result` field; a result submission carries a
//! `result` field and echoes the chunk index; a stop packet carries the
//! `-1` index sentinel (and a `stop` flag for good measure).

use crate::payload::{Payload, PayloadExt, Value};

/// Field holding the coordinator-assigned chunk index.
pub const KEY_CHUNK_INDEX: &str = "chunk_index";
/// Field marking a work request.
pub const KEY_READY: &str = "ready";
/// Field marking a result submission.
pub const KEY_RESULT: &str = "result";
/// Field marking a stop packet.
pub const KEY_STOP: &str = "stop";
/// Chunk-index sentinel carried by stop packets.
pub const STOP_SENTINEL: i64 = -1;

/// Build a work request.
pub fn work_request() -> Payload {
    let mut p = Payload::new();
    p.insert(KEY_READY.to_string(), Value::Bool(true));
    p
}

/// Build a stop packet.
pub fn stop_packet() -> Payload {
    let mut p = Payload::new();
    p.insert(KEY_CHUNK_INDEX.to_string(), Value::Int(STOP_SENTINEL));
    p.insert(KEY_STOP.to_string(), Value::Bool(true));
    p
}

/// Build the minimal acknowledgement sent in reply to a result.
pub fn ack() -> Payload {
    let mut p = Payload::new();
    p.insert("ok".to_string(), Value::Bool(true));
    p
}

/// True for payloads announcing a worker ready for work.
pub fn is_work_request(p: &Payload) -> bool {
    p.get_bool(KEY_READY) == Some(true) && !p.contains_key(KEY_RESULT)
}

/// True for payloads carrying a completed result.
pub fn is_result(p: &Payload) -> bool {
    p.contains_key(KEY_RESULT)
}

/// True for stop packets (either sentinel form).
pub fn is_stop(p: &Payload) -> bool {
    p.get_bool(KEY_STOP) == Some(true) || p.get_i64(KEY_CHUNK_INDEX) == Some(STOP_SENTINEL)
}

/// The chunk index carried by a work packet or result, if any.
pub fn chunk_index(p: &Payload) -> Option<i64> {
    p.get_i64(KEY_CHUNK_INDEX)
}

/// Stamp the coordinator-assigned index onto an outgoing chunk.
pub fn stamp_chunk_index(p: &mut Payload, index: i64) {
    p.insert(KEY_CHUNK_INDEX.to_string(), Value::Int(index));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification_is_by_content() {
        let req = work_request();
        assert!(is_work_request(&req));
        assert!(!is_result(&req));
        assert!(!is_stop(&req));

        // A result message also carrying `ready` is still a result.
        let mut res = work_request();
        res.insert(KEY_RESULT.to_string(), Value::Int(42));
        res.insert(KEY_CHUNK_INDEX.to_string(), Value::Int(3));
        assert!(is_result(&res));
        assert!(!is_work_request(&res));
        assert_eq!(chunk_index(&res), Some(3));

        let stop = stop_packet();
        assert!(is_stop(&stop));
        assert!(!is_work_request(&stop));
    }

    #[test]
    fn sentinel_only_stop_is_recognized() {
        let mut p = Payload::new();
        p.insert(KEY_CHUNK_INDEX.to_string(), Value::Int(STOP_SENTINEL));
        assert!(is_stop(&p));
    }

    #[test]
    fn stamping_overwrites() {
        let mut p = Payload::new();
        stamp_chunk_index(&mut p, 0);
        stamp_chunk_index(&mut p, 5);
        assert_eq!(chunk_index(&p), Some(5));
    }
}

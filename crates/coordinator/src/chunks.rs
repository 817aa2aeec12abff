use chunkforge_core::payload::{NdArray, Payload, Value};

/// Synthetic benchmark stream: chunk `i` carries `scale = i + 1` and a
/// constant single-precision data array, generated lazily per request.
pub fn synthetic_chunks(n: usize, elems: usize) -> impl Iterator<Item = Payload> {
    (0..n).map(move |i| {
        let mut p = Payload::new();
        p.insert("dat".to_string(), NdArray::f32(vec![20.0; elems]).into());
        p.insert("scale".to_string(), Value::Int(i as i64 + 1));
        p.insert("ntry".to_string(), Value::Int(100_000));
        p.insert("nthrds".to_string(), Value::Int(40));
        p
    })
}

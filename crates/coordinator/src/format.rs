use serde_json::{json, Value as Json};

use chunkforge_core::payload::Value;
use chunkforge_engine::RunOutput;

/// How many leading values the summary shows per key.
const HEAD: usize = 8;

/// Bounded JSON summary of a run's aggregate output. Large arrays are
/// reported by dtype and length, never inlined.
pub fn summarize(out: &RunOutput) -> Json {
    match out {
        RunOutput::Collected(columns) => {
            let mut keys = serde_json::Map::new();
            for (key, values) in columns {
                keys.insert(
                    key.clone(),
                    json!({
                        "chunks": values.len(),
                        "head": values.iter().take(HEAD).map(compact).collect::<Vec<_>>(),
                    }),
                );
            }
            json!({ "mode": "collect", "keys": keys })
        }
        RunOutput::Summed {
            scalar_key,
            array_key,
            scalar,
            array,
        } => json!({
            "mode": "sum",
            "scalar_key": scalar_key,
            "array_key": array_key,
            "scalar": scalar,
            "array_len": array.len(),
            "array_head": &array[..array.len().min(HEAD)],
        }),
    }
}

fn compact(value: &Value) -> Json {
    match value {
        Value::Int(x) => json!(x),
        Value::Float(x) => json!(x),
        Value::Bool(x) => json!(x),
        Value::Str(s) => json!(s),
        Value::Bytes(b) => json!({ "bytes": b.len() }),
        Value::Array(a) => json!({ "dtype": a.dtype(), "len": a.len() }),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use chunkforge_core::payload::NdArray;

    use super::*;

    #[test]
    fn collect_summary_truncates_and_compacts() {
        let out = RunOutput::Collected(BTreeMap::from([(
            "result".to_string(),
            (0..20)
                .map(|i| {
                    if i == 0 {
                        Value::Array(NdArray::f32(vec![0.0; 1000]))
                    } else {
                        Value::Int(i)
                    }
                })
                .collect(),
        )]));
        let summary = summarize(&out);
        assert_eq!(summary["keys"]["result"]["chunks"], 20);
        assert_eq!(summary["keys"]["result"]["head"].as_array().unwrap().len(), HEAD);
        assert_eq!(summary["keys"]["result"]["head"][0]["len"], 1000);
    }

    #[test]
    fn sum_summary_reports_scalar_and_head() {
        let out = RunOutput::Summed {
            scalar_key: "scale".to_string(),
            array_key: "result".to_string(),
            scalar: 6.0,
            array: vec![6.0; 4],
        };
        let summary = summarize(&out);
        assert_eq!(summary["scalar"], 6.0);
        assert_eq!(summary["array_len"], 4);
        assert_eq!(summary["array_head"].as_array().unwrap().len(), 4);
    }
}

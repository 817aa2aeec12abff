//! Result aggregation.
//!
//! The mode is resolved into a concrete accumulator once, before the first
//! message arrives; the dispatch loop never branches on mode again. Both
//! accumulators are commutative in arrival order: collect stores by chunk
//! index, sum is plain addition.

use std::collections::BTreeMap;

use chunkforge_core::payload::{Payload, PayloadExt, Value};

use crate::api::DispatchError;

/// How per-chunk results fold into the run's final output.
#[derive(Debug, Clone)]
pub enum AggregationMode {
    /// Keep every per-chunk value of the named keys, ordered by chunk index.
    Collect {
        /// Result fields to retain.
        keys: Vec<String>,
    },
    /// Stream results into one scaled running sum.
    Sum {
        /// Field holding each result's scale factor.
        scalar_key: String,
        /// Field holding each result's numeric array.
        array_key: String,
        /// Fixed accumulator width.
        array_len: usize,
    },
}

/// Final output of a completed run.
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutput {
    /// Per-key value sequences indexed by chunk index.
    Collected(BTreeMap<String, Vec<Value>>),
    /// Scaled running sum and its scalar total.
    Summed {
        /// Field name the scalar total was accumulated from.
        scalar_key: String,
        /// Field name the array was accumulated from.
        array_key: String,
        /// Sum of all scale factors.
        scalar: f64,
        /// Elementwise sum of scale-weighted arrays.
        array: Vec<f64>,
    },
}

pub(crate) enum Aggregator {
    Collect {
        keys: Vec<String>,
        columns: BTreeMap<String, Vec<Option<Value>>>,
    },
    Sum {
        scalar_key: String,
        array_key: String,
        scalar: f64,
        array: Vec<f64>,
    },
}

impl Aggregator {
    pub(crate) fn new(mode: &AggregationMode, total: usize) -> Self {
        match mode {
            AggregationMode::Collect { keys } => Aggregator::Collect {
                keys: keys.clone(),
                columns: keys
                    .iter()
                    .map(|k| (k.clone(), vec![None; total]))
                    .collect(),
            },
            AggregationMode::Sum {
                scalar_key,
                array_key,
                array_len,
            } => Aggregator::Sum {
                scalar_key: scalar_key.clone(),
                array_key: array_key.clone(),
                scalar: 0.0,
                array: vec![0.0; *array_len],
            },
        }
    }

    /// Fold one result in. The caller guarantees `index` is unique.
    pub(crate) fn absorb(&mut self, index: usize, result: &Payload) -> Result<(), DispatchError> {
        match self {
            Aggregator::Collect { keys, columns } => {
                for key in keys.iter() {
                    let value = result
                        .get(key)
                        .ok_or_else(|| missing_key(key, index))?
                        .clone();
                    let column = columns
                        .get_mut(key)
                        .ok_or_else(|| missing_key(key, index))?;
                    column[index] = Some(value);
                }
                Ok(())
            }
            Aggregator::Sum {
                scalar_key,
                array_key,
                scalar,
                array,
            } => {
                let scale = result
                    .get_f64(scalar_key)
                    .ok_or_else(|| missing_key(scalar_key, index))?;
                let values = result
                    .get_array(array_key)
                    .ok_or_else(|| missing_key(array_key, index))?;
                if values.len() != array.len() {
                    return Err(DispatchError::Protocol(format!(
                        "result for chunk {index} carries {} elements, accumulator holds {}",
                        values.len(),
                        array.len()
                    )));
                }
                *scalar += scale;
                for (acc, x) in array.iter_mut().zip(values.data.iter_f64()) {
                    *acc += scale * x;
                }
                Ok(())
            }
        }
    }

    pub(crate) fn finish(self) -> Result<RunOutput, DispatchError> {
        match self {
            Aggregator::Collect { columns, .. } => {
                let mut out = BTreeMap::new();
                for (key, column) in columns {
                    let mut values = Vec::with_capacity(column.len());
                    for (index, slot) in column.into_iter().enumerate() {
                        values.push(slot.ok_or_else(|| {
                            DispatchError::Protocol(format!(
                                "no result stored for chunk {index} under key {key:?}"
                            ))
                        })?);
                    }
                    out.insert(key, values);
                }
                Ok(RunOutput::Collected(out))
            }
            Aggregator::Sum {
                scalar_key,
                array_key,
                scalar,
                array,
            } => Ok(RunOutput::Summed {
                scalar_key,
                array_key,
                scalar,
                array,
            }),
        }
    }
}

fn missing_key(key: &str, index: usize) -> DispatchError {
    DispatchError::Protocol(format!("result for chunk {index} is missing key {key:?}"))
}

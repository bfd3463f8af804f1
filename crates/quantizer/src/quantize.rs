//! Arg-max selection of gate functions and source wires.

use crate::checkpoint::Checkpoint;
use crate::rectangularize::rectangularize;
use gateforge_netlist::{Error, NetlistArchive, Result, TestVectors};
use ndarray::{Array2, ArrayView1, Axis};
use std::collections::BTreeMap;
use tracing::{info, warn};

/// Number of candidate gate functions per gate.
const OPCODES: usize = 16;

/// Per-layer quantized arrays before padding. `sources` may have one layer
/// fewer than `opcodes` when the input layer's connectivity was not trained.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuantizedLayers {
    pub opcodes: Vec<Vec<u8>>,
    pub sources: Vec<Vec<(i64, i64)>>,
    /// Input width implied by the first layer's connection weights.
    pub inputs: Option<usize>,
}

#[derive(Debug, Clone)]
pub struct Quantized {
    pub archive: NetlistArchive,
    pub architecture: Option<String>,
    pub padding_entries: usize,
}

/// Index of the largest value, lowest index on ties. NaN never wins.
pub fn argmax(values: ArrayView1<'_, f64>) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (index, value) in values.iter().enumerate() {
        if value.is_nan() {
            continue;
        }
        match best {
            Some((_, current)) if *value <= current => {}
            _ => best = Some((index, *value)),
        }
    }
    best.map(|(index, _)| index)
}

fn argmax_columns(weights: &Array2<f64>, name: &str) -> Result<Vec<usize>> {
    weights
        .axis_iter(Axis(1))
        .enumerate()
        .map(|(column, values)| {
            argmax(values).ok_or_else(|| {
                Error::InvalidCheckpoint(format!("'{name}' column {column} has no finite weight"))
            })
        })
        .collect()
}

fn select_opcodes(checkpoint: &Checkpoint, name: &str) -> Result<Vec<u8>> {
    let weights = checkpoint.require(name)?.to_matrix(name)?;
    if weights.nrows() != OPCODES {
        return Err(Error::InvalidCheckpoint(format!(
            "'{name}' has {} rows, expected one per gate function ({OPCODES})",
            weights.nrows()
        )));
    }
    Ok(argmax_columns(&weights, name)?
        .into_iter()
        .map(|op| op as u8)
        .collect())
}

fn pairs(flat: Vec<i64>, name: &str) -> Result<Vec<(i64, i64)>> {
    if flat.len() % 2 != 0 {
        return Err(Error::InvalidCheckpoint(format!(
            "'{name}' holds {} indices, which do not form pairs",
            flat.len()
        )));
    }
    Ok(flat.chunks_exact(2).map(|pair| (pair[0], pair[1])).collect())
}

fn layer_ids(checkpoint: &Checkpoint, suffix: &str) -> Result<Vec<usize>> {
    let mut ids = Vec::new();
    for name in checkpoint.names() {
        let parts: Vec<&str> = name.split('.').collect();
        if let ["layers", id, kind] = parts.as_slice() {
            if *kind == suffix {
                let id = id.parse::<usize>().map_err(|_| {
                    Error::InvalidCheckpoint(format!("'{name}' has a non-numeric layer index"))
                })?;
                ids.push(id);
            }
        }
    }
    ids.sort_unstable();
    Ok(ids)
}

/// Quantize split per-layer tensors: `layers.<i>.w` (gate functions) with
/// `layers.<i>.c` (soft connections) or `layers.<i>.indices` (hard pairs).
fn quantize_split(checkpoint: &Checkpoint) -> Result<QuantizedLayers> {
    let opcode_ids = layer_ids(checkpoint, "w")?;
    let mut connection_ids: BTreeMap<usize, &str> = BTreeMap::new();
    for id in layer_ids(checkpoint, "c")? {
        connection_ids.insert(id, "c");
    }
    for id in layer_ids(checkpoint, "indices")? {
        connection_ids.insert(id, "indices");
    }

    if opcode_ids.is_empty() {
        return Err(Error::InvalidCheckpoint(
            "no 'layers.<i>.w' gate weights found".into(),
        ));
    }
    if opcode_ids.len() != connection_ids.len()
        || !opcode_ids.iter().all(|id| connection_ids.contains_key(id))
    {
        return Err(Error::InvalidCheckpoint(format!(
            "{} gate-weight layers but {} connection layers",
            opcode_ids.len(),
            connection_ids.len()
        )));
    }

    let mut layers = QuantizedLayers::default();
    for (position, id) in opcode_ids.iter().enumerate() {
        let opcodes = select_opcodes(checkpoint, &format!("layers.{id}.w"))?;
        let kind = connection_ids[id];
        let name = format!("layers.{id}.{kind}");
        let sources = if kind == "c" {
            let weights = checkpoint.require(&name)?.to_matrix(&name)?;
            if position == 0 {
                layers.inputs = Some(weights.nrows());
            }
            let chosen = argmax_columns(&weights, &name)?;
            pairs(chosen.into_iter().map(|i| i as i64).collect(), &name)?
        } else {
            pairs(checkpoint.require(&name)?.to_indices(&name)?, &name)?
        };
        if sources.len() != opcodes.len() {
            return Err(Error::InvalidCheckpoint(format!(
                "layer {id}: {} gates but {} connection pairs",
                opcodes.len(),
                sources.len()
            )));
        }
        layers.opcodes.push(opcodes);
        layers.sources.push(sources);
    }
    Ok(layers)
}

/// Quantize a checkpoint whose connections were pre-merged into a single
/// `connections` tensor of shape `[2, layers, width]`.
fn quantize_merged(checkpoint: &Checkpoint) -> Result<QuantizedLayers> {
    let count = layer_ids(checkpoint, "w")?.len();
    if count == 0 {
        return Err(Error::InvalidCheckpoint(
            "no 'layers.<i>.w' gate weights found".into(),
        ));
    }
    let mut layers = QuantizedLayers::default();
    for i in 0..count {
        layers
            .opcodes
            .push(select_opcodes(checkpoint, &format!("layers.{i}.w"))?);
    }

    let merged = checkpoint.require("connections")?;
    let (connection_layers, width) = match merged.shape.as_slice() {
        [2, layers, width] => (*layers, *width),
        shape => {
            return Err(Error::InvalidCheckpoint(format!(
                "'connections' must have shape [2, layers, width], found {shape:?}"
            )))
        }
    };
    let offset = match count.checked_sub(connection_layers) {
        Some(offset @ (0 | 1)) => offset,
        _ => {
            return Err(Error::InvalidCheckpoint(format!(
                "{count} gate-weight layers but {connection_layers} connection layers"
            )))
        }
    };
    let flat = merged.to_indices("connections")?;
    let plane = connection_layers * width;
    for row in 0..connection_layers {
        let gates = layers.opcodes[row + offset].len();
        if gates > width {
            return Err(Error::InvalidCheckpoint(format!(
                "layer {} has {gates} gates but 'connections' is only {width} wide",
                row + offset
            )));
        }
        let start = row * width;
        let sources = (0..gates)
            .map(|j| (flat[start + j], flat[plane + start + j]))
            .collect();
        layers.sources.push(sources);
    }
    Ok(layers)
}

fn test_vectors(checkpoint: &Checkpoint) -> Result<Option<TestVectors>> {
    match (
        checkpoint.get("dataset_input"),
        checkpoint.get("dataset_output"),
    ) {
        (Some(x), Some(y)) => Ok(Some(TestVectors::new(
            x.to_bits("dataset_input")?,
            y.to_bits("dataset_output")?,
        )?)),
        (None, None) => Ok(None),
        _ => {
            warn!("checkpoint carries only one of dataset_input/dataset_output; ignoring both");
            Ok(None)
        }
    }
}

/// One past the highest source index layer 0 reads. A layer 0 without
/// trained connections reads inputs `(0, 1)`.
fn input_reach(layers: &QuantizedLayers) -> i64 {
    let first_gates = layers.opcodes.first().map_or(0, Vec::len);
    if first_gates == 0 {
        return 0;
    }
    if layers.sources.len() < layers.opcodes.len() {
        return 2;
    }
    layers
        .sources
        .first()
        .and_then(|sources| sources.iter().map(|(a, b)| (*a).max(*b)).max())
        .map_or(0, |max| max + 1)
}

/// Reduce a trained checkpoint to a rectangular netlist archive.
pub fn quantize(checkpoint: &Checkpoint) -> Result<Quantized> {
    let architecture = checkpoint.architecture().map(str::to_owned);
    if let Some(architecture) = &architecture {
        info!(architecture = %architecture, "checkpoint architecture");
    }

    let layers = if checkpoint.contains("connections") {
        quantize_merged(checkpoint)?
    } else {
        quantize_split(checkpoint)?
    };
    info!(layers = layers.opcodes.len(), "quantized gate layers");

    let mut archive = rectangularize(&layers);
    let padding_entries = archive.padding_entries();
    if padding_entries > 0 {
        info!(padding_entries, "added null gates and connections for padding");
    }
    info!(
        slots = archive.gate_types.len(),
        gates = layers.opcodes.iter().map(Vec::len).sum::<usize>(),
        "gate slots in the rectangular network"
    );

    archive.test_vectors = test_vectors(checkpoint)?;
    if let Some(vectors) = &archive.test_vectors {
        info!(samples = vectors.len(), "test examples included");
        if archive.inputs.is_none() {
            let width = vectors.inputs.ncols();
            if input_reach(&layers) <= width as i64 {
                archive.inputs = Some(width);
            } else {
                warn!(width, "test inputs are narrower than layer 0 reads; inferring input width");
            }
        }
    }

    Ok(Quantized {
        archive,
        architecture,
        padding_entries,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checkpoint::RawTensor;
    use ndarray::array;
    use std::collections::HashMap;

    /// Opcode weights for `gates` gates where gate j prefers `choice[j]`.
    fn opcode_weights(choice: &[usize]) -> RawTensor {
        let gates = choice.len();
        let mut values = vec![0.0; OPCODES * gates];
        for (j, op) in choice.iter().enumerate() {
            values[op * gates + j] = 1.0;
        }
        RawTensor::float(vec![OPCODES, gates], values)
    }

    fn checkpoint(tensors: Vec<(&str, RawTensor)>) -> Checkpoint {
        Checkpoint::new(
            tensors
                .into_iter()
                .map(|(name, tensor)| (name.to_string(), tensor))
                .collect(),
            HashMap::new(),
        )
    }

    #[test]
    fn test_argmax_lowest_index_wins_ties() {
        assert_eq!(argmax(array![0.1, 0.9, 0.9, 0.2].view()), Some(1));
        assert_eq!(argmax(array![3.0, 3.0].view()), Some(0));
        assert_eq!(argmax(array![f64::NAN, -1.0].view()), Some(1));
        assert_eq!(argmax(array![f64::NAN].view()), None);
    }

    #[test]
    fn test_split_hard_indices() {
        let ckpt = checkpoint(vec![
            ("layers.0.w", opcode_weights(&[7, 1])),
            ("layers.0.indices", RawTensor::int(vec![2, 2], vec![0, 3, 1, 2])),
            ("layers.1.w", opcode_weights(&[6])),
            ("layers.1.indices", RawTensor::int(vec![2], vec![1, 0])),
        ]);
        let layers = quantize_split(&ckpt).unwrap();
        assert_eq!(layers.opcodes, vec![vec![7, 1], vec![6]]);
        assert_eq!(layers.sources, vec![vec![(0, 3), (1, 2)], vec![(1, 0)]]);
        assert_eq!(layers.inputs, None);
    }

    #[test]
    fn test_split_soft_connections_use_argmax_pairs() {
        // 3 inputs, 1 gate -> 2 columns: column 0 picks input 2, column 1 picks input 0.
        let soft = RawTensor::float(vec![3, 2], vec![0.0, 0.9, 0.1, 0.2, 0.8, 0.3]);
        let ckpt = checkpoint(vec![
            ("layers.0.w", opcode_weights(&[14])),
            ("layers.0.c", soft),
        ]);
        let layers = quantize_split(&ckpt).unwrap();
        assert_eq!(layers.sources, vec![vec![(2, 0)]]);
        assert_eq!(layers.inputs, Some(3));
        assert_eq!(layers.opcodes, vec![vec![14]]);
    }

    #[test]
    fn test_mismatched_counts_are_invalid_checkpoint() {
        let ckpt = checkpoint(vec![
            ("layers.0.w", opcode_weights(&[1, 2])),
            ("layers.0.indices", RawTensor::int(vec![2], vec![0, 1])),
        ]);
        assert!(matches!(
            quantize(&ckpt),
            Err(Error::InvalidCheckpoint(_))
        ));

        let ckpt = checkpoint(vec![
            ("layers.0.w", opcode_weights(&[1])),
            ("layers.1.w", opcode_weights(&[1])),
            ("layers.0.indices", RawTensor::int(vec![2], vec![0, 1])),
        ]);
        assert!(matches!(
            quantize(&ckpt),
            Err(Error::InvalidCheckpoint(_))
        ));

        assert!(matches!(
            quantize(&checkpoint(vec![])),
            Err(Error::InvalidCheckpoint(_))
        ));
    }

    #[test]
    fn test_opcode_weights_need_sixteen_rows() {
        let ckpt = checkpoint(vec![
            ("layers.0.w", RawTensor::float(vec![4, 1], vec![0.0; 4])),
            ("layers.0.indices", RawTensor::int(vec![2], vec![0, 1])),
        ]);
        assert!(matches!(
            quantize(&ckpt),
            Err(Error::InvalidCheckpoint(_))
        ));
    }

    #[test]
    fn test_merged_connections_missing_input_layer() {
        // Two gate layers, one connection layer (for layer 1) of width 3.
        let ckpt = checkpoint(vec![
            ("layers.0.w", opcode_weights(&[3, 5, 7])),
            ("layers.1.w", opcode_weights(&[6, 9])),
            (
                "connections",
                RawTensor::int(vec![2, 1, 3], vec![0, 1, 0, 2, 2, 0]),
            ),
        ]);
        let layers = quantize_merged(&ckpt).unwrap();
        assert_eq!(layers.opcodes.len(), 2);
        assert_eq!(layers.sources, vec![vec![(0, 2), (1, 2)]]);

        let quantized = quantize(&ckpt).unwrap();
        let network = quantized.archive.to_network().unwrap();
        assert_eq!(network.layers[0].gates[0].a, 0);
        assert_eq!(network.layers[0].gates[0].b, 1);
        assert_eq!(network.layers[1].gates[1].b, 2);
    }

    #[test]
    fn test_dataset_passthrough() {
        let ckpt = checkpoint(vec![
            ("layers.0.w", opcode_weights(&[3])),
            ("layers.0.indices", RawTensor::int(vec![2], vec![0, 1])),
            ("dataset_input", RawTensor::float(vec![2, 2], vec![1.0, 0.0, 0.0, 1.0])),
            ("dataset_output", RawTensor::int(vec![2, 1], vec![1, 0])),
        ]);
        let quantized = quantize(&ckpt).unwrap();
        let vectors = quantized.archive.test_vectors.unwrap();
        assert_eq!(vectors.len(), 2);
        assert_eq!(vectors.inputs, array![[1u8, 0], [0, 1]]);
        assert_eq!(quantized.archive.inputs, Some(2));
    }

    #[test]
    fn test_unused_top_input_keeps_dataset_width() {
        // Layer 0 reads inputs 0..=2 while the samples are 4 bits wide.
        let ckpt = checkpoint(vec![
            ("layers.0.w", opcode_weights(&[7, 1])),
            ("layers.0.indices", RawTensor::int(vec![2, 2], vec![0, 2, 1, 2])),
            ("dataset_input", RawTensor::int(vec![1, 4], vec![1, 0, 0, 1])),
            ("dataset_output", RawTensor::int(vec![1, 2], vec![1, 0])),
        ]);
        let quantized = quantize(&ckpt).unwrap();
        assert_eq!(quantized.archive.inputs, Some(4));
        let network = quantized.archive.to_network().unwrap();
        assert_eq!(network.input_width, 4);
        assert_eq!(network.evaluate(&[true, false, false, true]).unwrap(), vec![true, false]);

        // Samples narrower than what layer 0 reads are not trusted.
        let ckpt = checkpoint(vec![
            ("layers.0.w", opcode_weights(&[7])),
            ("layers.0.indices", RawTensor::int(vec![2], vec![0, 2])),
            ("dataset_input", RawTensor::int(vec![1, 2], vec![1, 0])),
            ("dataset_output", RawTensor::int(vec![1, 1], vec![1])),
        ]);
        assert_eq!(quantize(&ckpt).unwrap().archive.inputs, None);
    }
}

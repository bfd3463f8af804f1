//! Rectangular netlist archive (`.npz`) and its decoding into a [`Network`].
//!
//! Layers of different widths are stored right-padded to the widest layer:
//!
//! | key             | shape               | meaning                         |
//! |-----------------|---------------------|---------------------------------|
//! | `gate_types`    | `[layers, width]`   | opcode per gate, padded with 0  |
//! | `connections.A` | `[layers', width]`  | source A, padded with 0         |
//! | `connections.B` | `[layers', width]`  | source B, padded with 0         |
//! | `widths`        | `[layers]`          | true width of every layer       |
//! | `inputs`        | scalar              | global input width              |
//! | `input`/`output`| `[samples, bits]`   | optional test vectors           |
//!
//! `layers'` may be one less than `layers` when the input layer's
//! connectivity was never stored; decoding then wires every layer-0 gate to
//! inputs `(0, 1)`.

use crate::error::{Error, Result};
use crate::gate::GateOp;
use crate::network::{Gate, Layer, Network};
use ndarray::{arr0, Array, Array1, Array2, Axis, Dimension, IxDyn, OwnedRepr};
use ndarray_npy::{NpzReader, NpzWriter, ReadableElement};
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Seek, Write};
use std::path::Path;
use tracing::{debug, info, warn};

pub const GATE_TYPES: &str = "gate_types";
pub const CONNECTIONS_A: &str = "connections.A";
pub const CONNECTIONS_B: &str = "connections.B";
pub const WIDTHS: &str = "widths";
pub const INPUTS: &str = "inputs";
pub const TEST_INPUT: &str = "input";
pub const TEST_OUTPUT: &str = "output";

/// Test vectors carried alongside a netlist, one sample per row, one bit per
/// column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestVectors {
    pub inputs: Array2<u8>,
    pub outputs: Array2<u8>,
}

impl TestVectors {
    pub fn new(inputs: Array2<u8>, outputs: Array2<u8>) -> Result<Self> {
        if inputs.nrows() != outputs.nrows() {
            return Err(Error::InvalidInput(format!(
                "test vectors disagree on sample count: {} inputs vs {} outputs",
                inputs.nrows(),
                outputs.nrows()
            )));
        }
        Ok(Self { inputs, outputs })
    }

    pub fn len(&self) -> usize {
        self.inputs.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.inputs.nrows() == 0
    }

    /// Iterate `(input bits, expected output bits)` per sample.
    pub fn samples(&self) -> impl Iterator<Item = (Vec<bool>, Vec<bool>)> + '_ {
        self.inputs
            .axis_iter(Axis(0))
            .zip(self.outputs.axis_iter(Axis(0)))
            .map(|(x, y)| {
                (
                    x.iter().map(|v| *v != 0).collect(),
                    y.iter().map(|v| *v != 0).collect(),
                )
            })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NetlistArchive {
    pub gate_types: Array2<i64>,
    pub conn_a: Array2<i64>,
    pub conn_b: Array2<i64>,
    pub widths: Option<Vec<usize>>,
    pub inputs: Option<usize>,
    pub test_vectors: Option<TestVectors>,
}

impl NetlistArchive {
    /// Number of padding slots (opcodes plus both sources) beyond the real
    /// gates. Zero when widths are unknown.
    pub fn padding_entries(&self) -> usize {
        let Some(widths) = &self.widths else {
            return 0;
        };
        let real: usize = widths.iter().sum();
        let real_connections: usize = widths
            .iter()
            .skip(self.gate_types.nrows().saturating_sub(self.conn_a.nrows()))
            .sum();
        self.gate_types.len().saturating_sub(real)
            + 2 * self.conn_a.len().saturating_sub(real_connections)
    }

    /// Rectangular view of an existing network, padded with opcode 0 and
    /// source 0.
    pub fn from_network(network: &Network) -> Self {
        let rows = network.depth();
        let cols = network.widest_layer();
        let mut gate_types = Array2::zeros((rows, cols));
        let mut conn_a = Array2::zeros((rows, cols));
        let mut conn_b = Array2::zeros((rows, cols));
        for (i, layer) in network.layers.iter().enumerate() {
            for (j, gate) in layer.gates.iter().enumerate() {
                gate_types[[i, j]] = i64::from(gate.op.code());
                conn_a[[i, j]] = gate.a as i64;
                conn_b[[i, j]] = gate.b as i64;
            }
        }
        Self {
            gate_types,
            conn_a,
            conn_b,
            widths: Some(network.layers.iter().map(Layer::width).collect()),
            inputs: Some(network.input_width),
            test_vectors: None,
        }
    }

    pub fn read(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if path.extension().and_then(|ext| ext.to_str()) != Some("npz") {
            return Err(Error::InvalidInput(format!(
                "'{}' is not a .npz file",
                path.display()
            )));
        }
        if !path.is_file() {
            return Err(Error::InvalidInput(format!(
                "'{}' does not exist",
                path.display()
            )));
        }
        Self::from_reader(BufReader::new(File::open(path)?))
    }

    pub fn from_reader<R: Read + Seek>(reader: R) -> Result<Self> {
        let mut npz = NpzReader::new(reader).map_err(archive_error)?;
        let names = npz.names().map_err(archive_error)?;
        for name in &names {
            debug!(entry = %name, "netlist archive entry");
        }
        let has = |key: &str| {
            names
                .iter()
                .any(|name| name == key || name.strip_suffix(".npy") == Some(key))
        };

        for key in [GATE_TYPES, CONNECTIONS_A, CONNECTIONS_B] {
            if !has(key) {
                return Err(Error::InvalidInput(format!(
                    "netlist archive is missing '{key}'"
                )));
            }
        }

        let gate_types = read_ints::<_, ndarray::Ix2>(&mut npz, GATE_TYPES)?;
        let conn_a = read_ints::<_, ndarray::Ix2>(&mut npz, CONNECTIONS_A)?;
        let conn_b = read_ints::<_, ndarray::Ix2>(&mut npz, CONNECTIONS_B)?;

        let widths = if has(WIDTHS) {
            let raw = read_ints::<_, ndarray::Ix1>(&mut npz, WIDTHS)?;
            Some(
                raw.iter()
                    .map(|w| non_negative(*w, WIDTHS))
                    .collect::<Result<Vec<_>>>()?,
            )
        } else {
            None
        };

        let inputs = if has(INPUTS) {
            let raw = read_ints::<_, IxDyn>(&mut npz, INPUTS)?;
            Some(declared_inputs(&raw)?)
        } else {
            None
        };

        let test_vectors = if has(TEST_INPUT) && has(TEST_OUTPUT) {
            match (read_bits(&mut npz, TEST_INPUT), read_bits(&mut npz, TEST_OUTPUT)) {
                (Ok(x), Ok(y)) => Some(TestVectors::new(x, y)?),
                (Err(err), _) | (_, Err(err)) => {
                    warn!(error = %err, "ignoring unreadable test vectors");
                    None
                }
            }
        } else {
            None
        };

        info!(
            layers = gate_types.nrows(),
            width = gate_types.ncols(),
            connection_layers = conn_a.nrows(),
            explicit_widths = widths.is_some(),
            test_vectors = test_vectors.as_ref().map(TestVectors::len).unwrap_or(0),
            "loaded netlist archive"
        );

        Ok(Self {
            gate_types,
            conn_a,
            conn_b,
            widths,
            inputs,
            test_vectors,
        })
    }

    pub fn write(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = BufWriter::new(File::create(path)?);
        self.to_writer(file)?;
        Ok(())
    }

    pub fn to_writer<W: Write + Seek>(&self, writer: W) -> Result<W> {
        let mut npz = NpzWriter::new(writer);
        npz.add_array(GATE_TYPES, &self.gate_types)
            .map_err(archive_error)?;
        npz.add_array(CONNECTIONS_A, &self.conn_a)
            .map_err(archive_error)?;
        npz.add_array(CONNECTIONS_B, &self.conn_b)
            .map_err(archive_error)?;
        if let Some(widths) = &self.widths {
            let widths: Array1<i64> = widths.iter().map(|w| *w as i64).collect();
            npz.add_array(WIDTHS, &widths).map_err(archive_error)?;
        }
        if let Some(inputs) = self.inputs {
            npz.add_array(INPUTS, &arr0(inputs as i64))
                .map_err(archive_error)?;
        }
        if let Some(vectors) = &self.test_vectors {
            npz.add_array(TEST_INPUT, &vectors.inputs)
                .map_err(archive_error)?;
            npz.add_array(TEST_OUTPUT, &vectors.outputs)
                .map_err(archive_error)?;
        }
        npz.finish().map_err(archive_error)
    }

    /// Decode into a [`Network`], restoring true layer widths and repairing a
    /// missing input-layer connection table.
    pub fn to_network(&self) -> Result<Network> {
        let (layers, width) = self.gate_types.dim();
        if self.conn_a.dim() != self.conn_b.dim() {
            return Err(Error::InvalidInput(format!(
                "connections.A {:?} and connections.B {:?} differ in shape",
                self.conn_a.dim(),
                self.conn_b.dim()
            )));
        }
        let (connection_layers, connection_width) = self.conn_a.dim();
        if connection_width != width {
            return Err(Error::InvalidInput(format!(
                "connections are {connection_width} wide but gate_types is {width} wide"
            )));
        }

        // Rows of the connection tables that line up with layer 0.
        let offset = match layers.checked_sub(connection_layers) {
            Some(0) => 0,
            Some(1) => {
                warn!(
                    gates = width,
                    "input layer has no connections; wiring every gate to inputs (0, 1)"
                );
                1
            }
            _ => {
                return Err(Error::InvalidInput(format!(
                    "{layers} gate layers but {connection_layers} connection layers"
                )))
            }
        };

        let widths = match &self.widths {
            Some(widths) => {
                if widths.len() != layers {
                    return Err(Error::InvalidInput(format!(
                        "{} widths recorded for {layers} layers",
                        widths.len()
                    )));
                }
                if let Some(w) = widths.iter().find(|w| **w > width) {
                    return Err(Error::InvalidInput(format!(
                        "recorded width {w} exceeds padded width {width}"
                    )));
                }
                widths.clone()
            }
            None => {
                warn!(
                    width,
                    "archive records no per-layer widths; treating every layer as {width} gates wide"
                );
                vec![width; layers]
            }
        };

        let mut decoded = Vec::with_capacity(layers);
        for (i, layer_width) in widths.iter().enumerate() {
            let mut gates = Vec::with_capacity(*layer_width);
            for j in 0..*layer_width {
                let raw = self.gate_types[[i, j]];
                let op = GateOp::try_from(raw).map_err(|code| {
                    Error::InvalidInput(format!("layer {i} gate {j}: opcode {code} not in 0..16"))
                })?;
                let (a, b) = if i < offset {
                    (0, 1)
                } else {
                    let row = i - offset;
                    (
                        non_negative(self.conn_a[[row, j]], CONNECTIONS_A)?,
                        non_negative(self.conn_b[[row, j]], CONNECTIONS_B)?,
                    )
                };
                gates.push(Gate::new(op, a, b));
            }
            decoded.push(Layer::new(gates));
        }

        let input_width = match self.inputs {
            Some(inputs) => inputs,
            None => decoded
                .first()
                .and_then(|layer| layer.gates.iter().map(|g| g.a.max(g.b)).max())
                .map(|max| max + 1)
                .unwrap_or(0),
        };

        let mut network = Network::new(input_width, decoded)?;
        network.fixed_input_layer = offset > 0;
        Ok(network)
    }
}

fn archive_error(err: impl std::fmt::Display) -> Error {
    Error::InvalidInput(format!("netlist archive: {err}"))
}

fn non_negative(value: i64, key: &str) -> Result<usize> {
    usize::try_from(value)
        .map_err(|_| Error::InvalidInput(format!("negative value {value} in '{key}'")))
}

fn declared_inputs(raw: &Array<i64, IxDyn>) -> Result<usize> {
    match (raw.ndim(), raw.len()) {
        (0, _) | (_, 1) => raw
            .iter()
            .next()
            .copied()
            .ok_or_else(|| Error::InvalidInput("empty 'inputs'".into()))
            .and_then(|v| non_negative(v, INPUTS)),
        _ => raw
            .shape()
            .last()
            .copied()
            .ok_or_else(|| Error::InvalidInput("empty 'inputs'".into())),
    }
}

/// Try an entry under its bare name and with numpy's `.npy` suffix.
fn lookup<R, T, D>(npz: &mut NpzReader<R>, key: &str) -> Option<Array<T, D>>
where
    R: Read + Seek,
    T: ReadableElement,
    D: Dimension,
{
    npz.by_name::<OwnedRepr<T>, D>(key)
        .or_else(|_| npz.by_name::<OwnedRepr<T>, D>(&format!("{key}.npy")))
        .ok()
}

fn read_ints<R: Read + Seek, D: Dimension>(
    npz: &mut NpzReader<R>,
    key: &str,
) -> Result<Array<i64, D>> {
    if let Some(array) = lookup::<_, i64, D>(npz, key) {
        return Ok(array);
    }
    if let Some(array) = lookup::<_, i32, D>(npz, key) {
        return Ok(array.mapv(i64::from));
    }
    if let Some(array) = lookup::<_, u8, D>(npz, key) {
        return Ok(array.mapv(i64::from));
    }
    if let Some(array) = lookup::<_, u64, D>(npz, key) {
        return Ok(array.mapv(|v| i64::try_from(v).unwrap_or(i64::MAX)));
    }
    Err(Error::InvalidInput(format!(
        "'{key}' is not an integer array of rank {}",
        D::NDIM.map(|n| n.to_string()).unwrap_or_else(|| "any".into())
    )))
}

fn read_bits<R: Read + Seek>(npz: &mut NpzReader<R>, key: &str) -> Result<Array2<u8>> {
    if let Ok(array) = read_ints::<_, ndarray::Ix2>(npz, key) {
        return Ok(array.mapv(|v| u8::from(v != 0)));
    }
    if let Some(array) = lookup::<_, f32, ndarray::Ix2>(npz, key) {
        return Ok(array.mapv(|v| u8::from(v != 0.0)));
    }
    if let Some(array) = lookup::<_, bool, ndarray::Ix2>(npz, key) {
        return Ok(array.mapv(u8::from));
    }
    Err(Error::InvalidInput(format!(
        "'{key}' is not a 2-D array of bits"
    )))
}

//! Safetensors checkpoint loader.

use gateforge_netlist::{Error, Result};
use ndarray::Array2;
use safetensors::{Dtype, SafeTensors};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;
use tracing::{debug, info};

/// Header metadata key holding a free-form description of the network.
pub const ARCHITECTURE_KEY: &str = "net_architecture";

#[derive(Debug, Clone, PartialEq)]
pub enum TensorData {
    Float(Vec<f64>),
    Int(Vec<i64>),
}

/// A checkpoint tensor decoded into host memory.
#[derive(Debug, Clone, PartialEq)]
pub struct RawTensor {
    pub shape: Vec<usize>,
    pub data: TensorData,
}

impl RawTensor {
    pub fn float(shape: Vec<usize>, values: Vec<f64>) -> Self {
        Self {
            shape,
            data: TensorData::Float(values),
        }
    }

    pub fn int(shape: Vec<usize>, values: Vec<i64>) -> Self {
        Self {
            shape,
            data: TensorData::Int(values),
        }
    }

    pub fn len(&self) -> usize {
        match &self.data {
            TensorData::Float(values) => values.len(),
            TensorData::Int(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn values_f64(&self) -> Vec<f64> {
        match &self.data {
            TensorData::Float(values) => values.clone(),
            TensorData::Int(values) => values.iter().map(|v| *v as f64).collect(),
        }
    }

    /// View as a matrix; a 1-D tensor becomes a single row.
    pub fn to_matrix(&self, name: &str) -> Result<Array2<f64>> {
        let (rows, cols) = match self.shape.as_slice() {
            [cols] => (1, *cols),
            [rows, cols] => (*rows, *cols),
            shape => {
                return Err(Error::InvalidCheckpoint(format!(
                    "'{name}' must be 1-D or 2-D, found shape {shape:?}"
                )))
            }
        };
        Array2::from_shape_vec((rows, cols), self.values_f64())
            .map_err(|err| Error::InvalidCheckpoint(format!("'{name}': {err}")))
    }

    /// Flattened integer contents; float tensors must hold whole numbers.
    pub fn to_indices(&self, name: &str) -> Result<Vec<i64>> {
        match &self.data {
            TensorData::Int(values) => Ok(values.clone()),
            TensorData::Float(values) => values
                .iter()
                .map(|v| {
                    if v.fract() == 0.0 && v.is_finite() {
                        Ok(*v as i64)
                    } else {
                        Err(Error::InvalidCheckpoint(format!(
                            "'{name}' holds non-integral index {v}"
                        )))
                    }
                })
                .collect(),
        }
    }

    /// Matrix of bits, any non-zero value counting as 1.
    pub fn to_bits(&self, name: &str) -> Result<Array2<u8>> {
        Ok(self.to_matrix(name)?.mapv(|v| u8::from(v != 0.0)))
    }
}

#[derive(Debug, Clone, Default)]
pub struct Checkpoint {
    tensors: BTreeMap<String, RawTensor>,
    metadata: HashMap<String, String>,
}

impl Checkpoint {
    pub fn new(tensors: BTreeMap<String, RawTensor>, metadata: HashMap<String, String>) -> Self {
        Self { tensors, metadata }
    }

    pub fn load_safetensors(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if path.extension().and_then(|ext| ext.to_str()) != Some("safetensors") {
            return Err(Error::InvalidInput(format!(
                "'{}' is not a .safetensors file",
                path.display()
            )));
        }
        if !path.is_file() {
            return Err(Error::InvalidInput(format!(
                "'{}' does not exist",
                path.display()
            )));
        }
        let data = fs::read(path)?;
        let checkpoint = Self::from_bytes(&data)?;
        info!(
            path = %path.display(),
            tensors = checkpoint.tensors.len(),
            "loaded checkpoint"
        );
        Ok(checkpoint)
    }

    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let tensors = SafeTensors::deserialize(data).map_err(|err| {
            Error::InvalidCheckpoint(format!("failed to parse safetensors: {err}"))
        })?;
        let (_, header) = SafeTensors::read_metadata(data).map_err(|err| {
            Error::InvalidCheckpoint(format!("failed to read safetensors header: {err}"))
        })?;

        let mut decoded = BTreeMap::new();
        for (name, view) in tensors.tensors() {
            let tensor = decode_view(&name, view.dtype(), view.shape(), view.data())?;
            debug!(tensor = %name, shape = ?tensor.shape, "checkpoint tensor");
            decoded.insert(name, tensor);
        }

        Ok(Self {
            tensors: decoded,
            metadata: header.metadata().clone().unwrap_or_default(),
        })
    }

    pub fn get(&self, name: &str) -> Option<&RawTensor> {
        self.tensors.get(name)
    }

    pub fn require(&self, name: &str) -> Result<&RawTensor> {
        self.get(name)
            .ok_or_else(|| Error::InvalidCheckpoint(format!("missing tensor '{name}'")))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tensors.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.tensors.keys().map(String::as_str)
    }

    pub fn architecture(&self) -> Option<&str> {
        self.metadata.get(ARCHITECTURE_KEY).map(String::as_str)
    }
}

fn decode_view(name: &str, dtype: Dtype, shape: &[usize], bytes: &[u8]) -> Result<RawTensor> {
    let shape = shape.to_vec();
    let tensor = match dtype {
        Dtype::F32 => RawTensor::float(
            shape,
            bytes
                .chunks_exact(4)
                .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]) as f64)
                .collect(),
        ),
        Dtype::F64 => RawTensor::float(
            shape,
            bytes
                .chunks_exact(8)
                .map(|c| f64::from_le_bytes([c[0], c[1], c[2], c[3], c[4], c[5], c[6], c[7]]))
                .collect(),
        ),
        Dtype::I64 => RawTensor::int(
            shape,
            bytes
                .chunks_exact(8)
                .map(|c| i64::from_le_bytes([c[0], c[1], c[2], c[3], c[4], c[5], c[6], c[7]]))
                .collect(),
        ),
        Dtype::I32 => RawTensor::int(
            shape,
            bytes
                .chunks_exact(4)
                .map(|c| i32::from_le_bytes([c[0], c[1], c[2], c[3]]) as i64)
                .collect(),
        ),
        Dtype::U8 | Dtype::BOOL => {
            RawTensor::int(shape, bytes.iter().map(|b| i64::from(*b)).collect())
        }
        other => {
            return Err(Error::InvalidCheckpoint(format!(
                "tensor '{name}' has unsupported dtype {other:?}"
            )))
        }
    };
    let expected: usize = tensor.shape.iter().product();
    if tensor.len() != expected {
        return Err(Error::InvalidCheckpoint(format!(
            "tensor '{name}' holds {} values for shape {:?}",
            tensor.len(),
            tensor.shape
        )));
    }
    Ok(tensor)
}

//! Emission settings.

use serde::{Deserialize, Serialize};

pub const DEFAULT_RELAY_CELL: &str = "sky130_fd_sc_hd__inv_1";
pub const DEFAULT_MODULE_NAME: &str = "net";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmitStyle {
    /// One `assign` per gate.
    #[default]
    Inline,
    /// One `logic_gate` instance per gate, opcode passed as a 4-bit constant.
    Expanded,
}

impl EmitStyle {
    pub fn as_str(&self) -> &'static str {
        match self {
            EmitStyle::Inline => "inline",
            EmitStyle::Expanded => "expanded",
        }
    }
}

/// How the final layer's outputs are regrouped into classification buckets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryLayout {
    pub count: usize,
    pub bits_per_category: usize,
    /// Gather evenly strided output slices instead of one contiguous range.
    #[serde(default)]
    pub strided: bool,
}

impl CategoryLayout {
    pub fn new(count: usize, bits_per_category: usize) -> Self {
        Self {
            count,
            bits_per_category,
            strided: false,
        }
    }

    pub fn strided(mut self, strided: bool) -> Self {
        self.strided = strided;
        self
    }

    /// Width of the `categories` port.
    pub fn port_width(&self) -> usize {
        self.count * self.bits_per_category
    }

    /// Output wires feeding each category under strided packing.
    pub fn stride(&self, output_width: usize) -> usize {
        output_width / self.count.max(1)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.count == 0 {
            return Err("category count must be > 0".into());
        }
        if self.bits_per_category == 0 {
            return Err("bits per category must be > 0".into());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmitConfig {
    pub style: EmitStyle,
    /// Relay granularity: a B connection of distance `d` passes through
    /// `d / relay` relay stages.
    pub relay: Option<usize>,
    /// Inverter cell instantiated twice by each relay stage.
    pub relay_cell: String,
    pub module_name: String,
    pub categories: Option<CategoryLayout>,
}

impl Default for EmitConfig {
    fn default() -> Self {
        Self {
            style: EmitStyle::Inline,
            relay: None,
            relay_cell: DEFAULT_RELAY_CELL.to_string(),
            module_name: DEFAULT_MODULE_NAME.to_string(),
            categories: None,
        }
    }
}

impl EmitConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.relay == Some(0) {
            return Err("relay granularity must be > 0".into());
        }
        for (what, name) in [("module name", &self.module_name), ("relay cell", &self.relay_cell)] {
            if !is_identifier(name) {
                return Err(format!("{what} '{name}' is not a Verilog identifier"));
            }
        }
        if let Some(layout) = &self.categories {
            layout.validate()?;
        }
        Ok(())
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
        }
        _ => false,
    }
}

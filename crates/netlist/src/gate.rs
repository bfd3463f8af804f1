//! The closed set of sixteen two-input Boolean functions.

use serde::{Deserialize, Serialize};

/// Two-input gate function, numbered by its 4-bit opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u8)]
pub enum GateOp {
    /// Constant 0.
    Zero = 0,
    And = 1,
    /// `A & ~B`
    ANotB = 2,
    A = 3,
    /// `B & ~A`
    BNotA = 4,
    B = 5,
    Xor = 6,
    Or = 7,
    Nor = 8,
    Xnor = 9,
    NotB = 10,
    /// `~B | (A & B)`, i.e. B implies A.
    AOrNotB = 11,
    NotA = 12,
    /// `~A | (A & B)`, i.e. A implies B.
    BOrNotA = 13,
    Nand = 14,
    /// Constant 1.
    One = 15,
}

impl GateOp {
    pub const COUNT: usize = 16;

    pub const ALL: [GateOp; GateOp::COUNT] = [
        GateOp::Zero,
        GateOp::And,
        GateOp::ANotB,
        GateOp::A,
        GateOp::BNotA,
        GateOp::B,
        GateOp::Xor,
        GateOp::Or,
        GateOp::Nor,
        GateOp::Xnor,
        GateOp::NotB,
        GateOp::AOrNotB,
        GateOp::NotA,
        GateOp::BOrNotA,
        GateOp::Nand,
        GateOp::One,
    ];

    pub fn from_code(code: u8) -> Option<GateOp> {
        GateOp::ALL.get(code as usize).copied()
    }

    pub fn code(self) -> u8 {
        self as u8
    }

    /// Truth table as a 4-bit mask: bit `(a << 1) | b` holds `f(a, b)`.
    pub fn truth_table(self) -> u8 {
        const TABLE: [u8; 16] = [
            0b0000, 0b1000, 0b0100, 0b1100, 0b0010, 0b1010, 0b0110, 0b1110, 0b0001, 0b1001,
            0b0101, 0b1101, 0b0011, 0b1011, 0b0111, 0b1111,
        ];
        TABLE[self as usize]
    }

    pub fn eval(self, a: bool, b: bool) -> bool {
        let row = ((a as u8) << 1) | b as u8;
        (self.truth_table() >> row) & 1 == 1
    }

    /// Glyph used in the diagnostics legend.
    pub fn legend_symbol(self) -> char {
        const SYMBOLS: [char; 16] = [
            '0', '&', '⇒', 'A', '⇐', 'B', '⊕', '|', '|', '⊕', 'B', '⇐', 'A', '⇒', '&', '1',
        ];
        SYMBOLS[self as usize]
    }

    /// Whether the legend draws a negation bar over [`GateOp::legend_symbol`].
    pub fn legend_negated(self) -> bool {
        matches!(
            self,
            GateOp::ANotB
                | GateOp::BNotA
                | GateOp::Nor
                | GateOp::Xnor
                | GateOp::NotB
                | GateOp::NotA
                | GateOp::Nand
        )
    }
}

impl TryFrom<i64> for GateOp {
    type Error = i64;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        u8::try_from(value)
            .ok()
            .and_then(GateOp::from_code)
            .ok_or(value)
    }
}

impl std::fmt::Display for GateOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "g{}", self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reference(op: GateOp, a: bool, b: bool) -> bool {
        match op {
            GateOp::Zero => false,
            GateOp::And => a & b,
            GateOp::ANotB => a & !b,
            GateOp::A => a,
            GateOp::BNotA => b & !a,
            GateOp::B => b,
            GateOp::Xor => a ^ b,
            GateOp::Or => a | b,
            GateOp::Nor => !(a | b),
            GateOp::Xnor => !(a ^ b),
            GateOp::NotB => !b,
            GateOp::AOrNotB => !b | (a & b),
            GateOp::NotA => !a,
            GateOp::BOrNotA => !a | (a & b),
            GateOp::Nand => !(a & b),
            GateOp::One => true,
        }
    }

    #[test]
    fn test_truth_table_matches_boolean_definitions() {
        for op in GateOp::ALL {
            for (a, b) in [(false, false), (false, true), (true, false), (true, true)] {
                assert_eq!(op.eval(a, b), reference(op, a, b), "{op} on ({a}, {b})");
            }
        }
    }

    #[test]
    fn test_codes_round_trip() {
        for code in 0..16u8 {
            assert_eq!(GateOp::from_code(code).map(GateOp::code), Some(code));
        }
        assert_eq!(GateOp::from_code(16), None);
        assert_eq!(GateOp::try_from(-1i64), Err(-1));
        assert_eq!(GateOp::try_from(7i64), Ok(GateOp::Or));
    }
}

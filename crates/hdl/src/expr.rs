//! Opcode to Verilog expression table.

use gateforge_netlist::GateOp;
use std::fmt::Write;

/// Combinational expression computing `op` over the nets `a` and `b`.
pub fn gate_expression(op: GateOp, a: &str, b: &str) -> String {
    match op {
        GateOp::Zero => "1'b0".to_string(),
        GateOp::And => format!("{a} & {b}"),
        GateOp::ANotB => format!("{a} & ~{b}"),
        GateOp::A => a.to_string(),
        GateOp::BNotA => format!("{b} & ~{a}"),
        GateOp::B => b.to_string(),
        GateOp::Xor => format!("{a} ^ {b}"),
        GateOp::Or => format!("{a} | {b}"),
        GateOp::Nor => format!("~({a} | {b})"),
        GateOp::Xnor => format!("~({a} ^ {b})"),
        GateOp::NotB => format!("~{b}"),
        GateOp::AOrNotB => format!("~{b} | ({a} & {b})"),
        GateOp::NotA => format!("~{a}"),
        GateOp::BOrNotA => format!("~{a} | ({a} & {b})"),
        GateOp::Nand => format!("~({a} & {b})"),
        GateOp::One => "1'b1".to_string(),
    }
}

/// The `logic_gate` primitive used by expanded emission: a case dispatch
/// over the same table as [`gate_expression`].
pub fn logic_gate_module() -> String {
    let mut text = String::new();
    text.push_str("module logic_gate (\n");
    text.push_str("    input wire A,\n");
    text.push_str("    input wire B,\n");
    text.push_str("    input wire [3:0] gate_type,\n");
    text.push_str("    output reg Y\n");
    text.push_str(");\n");
    text.push_str("    always @(*) begin\n");
    text.push_str("        case (gate_type)\n");
    for op in GateOp::ALL {
        let label = format!("4'd{}:", op.code());
        let _ = writeln!(
            text,
            "            {label:<6} Y = {};",
            gate_expression(op, "A", "B")
        );
    }
    text.push_str("            default: Y = 1'b0;\n");
    text.push_str("        endcase\n");
    text.push_str("    end\n");
    text.push_str("endmodule\n");
    text
}

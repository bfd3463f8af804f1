//! Just enough Verilog to check emitted modules in tests: bitwise
//! expressions over scalar nets, `assign`, `logic_gate` and `relay_conn`
//! instances in the last module of a file.

use gateforge_netlist::GateOp;
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Net(String),
    Const(bool),
    Not,
    And,
    Or,
    Xor,
    Open,
    Close,
}

fn tokenize(expr: &str) -> Result<Vec<Token>, String> {
    let chars: Vec<char> = expr.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        match c {
            ' ' => i += 1,
            '~' | '&' | '|' | '^' | '(' | ')' => {
                tokens.push(match c {
                    '~' => Token::Not,
                    '&' => Token::And,
                    '|' => Token::Or,
                    '^' => Token::Xor,
                    '(' => Token::Open,
                    _ => Token::Close,
                });
                i += 1;
            }
            c if c.is_ascii_digit() => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '\'') {
                    i += 1;
                }
                let literal: String = chars[start..i].iter().collect();
                tokens.push(Token::Const(literal.ends_with('1')));
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '_') {
                    i += 1;
                }
                if i < chars.len() && chars[i] == '[' {
                    while i < chars.len() && chars[i] != ']' {
                        i += 1;
                    }
                    i += 1;
                }
                tokens.push(Token::Net(chars[start..i].iter().collect()));
            }
            other => return Err(format!("unexpected '{other}' in `{expr}`")),
        }
    }
    Ok(tokens)
}

struct Parser<'a> {
    tokens: Vec<Token>,
    pos: usize,
    env: &'a HashMap<String, bool>,
}

impl Parser<'_> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn binary(
        &mut self,
        op: Token,
        next: fn(&mut Self) -> Result<bool, String>,
        f: fn(bool, bool) -> bool,
    ) -> Result<bool, String> {
        let mut value = next(self)?;
        while self.peek() == Some(&op) {
            self.pos += 1;
            value = f(value, next(self)?);
        }
        Ok(value)
    }

    fn or(&mut self) -> Result<bool, String> {
        self.binary(Token::Or, Self::xor, |a, b| a | b)
    }

    fn xor(&mut self) -> Result<bool, String> {
        self.binary(Token::Xor, Self::and, |a, b| a ^ b)
    }

    fn and(&mut self) -> Result<bool, String> {
        self.binary(Token::And, Self::unary, |a, b| a & b)
    }

    fn unary(&mut self) -> Result<bool, String> {
        let token = self.peek().cloned().ok_or("unexpected end of expression")?;
        self.pos += 1;
        match token {
            Token::Not => Ok(!self.unary()?),
            Token::Const(value) => Ok(value),
            Token::Net(name) => self
                .env
                .get(&name)
                .copied()
                .ok_or_else(|| format!("undriven net {name}")),
            Token::Open => {
                let value = self.or()?;
                if self.peek() != Some(&Token::Close) {
                    return Err("missing ')'".into());
                }
                self.pos += 1;
                Ok(value)
            }
            other => Err(format!("unexpected {other:?}")),
        }
    }
}

pub fn eval_expression(expr: &str, env: &HashMap<String, bool>) -> Result<bool, String> {
    let mut parser = Parser {
        tokens: tokenize(expr)?,
        pos: 0,
        env,
    };
    let value = parser.or()?;
    if parser.pos != parser.tokens.len() {
        return Err(format!("trailing tokens in `{expr}`"));
    }
    Ok(value)
}

/// Parse `name[hi:lo]` into `(name, hi, lo)`.
fn range(net: &str) -> Option<(&str, usize, usize)> {
    let (name, rest) = net.split_once('[')?;
    let (hi, lo) = rest.strip_suffix(']')?.split_once(':')?;
    Some((name, hi.parse().ok()?, lo.parse().ok()?))
}

/// Port connection `.port(net)` inside an instance line.
fn pin<'a>(line: &'a str, port: &str) -> Option<&'a str> {
    let start = line.find(&format!(".{port}("))? + port.len() + 2;
    let end = start + line[start..].find(')')?;
    Some(&line[start..end])
}

/// Run the top (last) module of `verilog` on `inputs`; returns every driven net.
pub fn simulate(verilog: &str, inputs: &[bool]) -> Result<HashMap<String, bool>, String> {
    let mut env: HashMap<String, bool> = inputs
        .iter()
        .enumerate()
        .map(|(i, bit)| (format!("in[{i}]"), *bit))
        .collect();
    let lines: Vec<&str> = verilog.lines().collect();
    let top = lines
        .iter()
        .rposition(|line| line.starts_with("module "))
        .ok_or("no module")?;
    for line in lines[top + 1..].iter().map(|line| line.trim()) {
        if let Some(assign) = line.strip_prefix("assign ") {
            let (lhs, rhs) = assign
                .trim_end_matches(';')
                .split_once(" = ")
                .ok_or_else(|| format!("bad assign `{line}`"))?;
            match range(lhs) {
                Some((name, hi, lo)) => {
                    let source = range(rhs);
                    for (offset, bit) in (lo..=hi).enumerate() {
                        let value = match source {
                            Some((src, _, src_lo)) => env
                                .get(&format!("{src}[{}]", src_lo + offset))
                                .copied()
                                .ok_or_else(|| format!("undriven {src}[{}]", src_lo + offset))?,
                            None if rhs == "0" => false,
                            None => return Err(format!("bad range assign `{line}`")),
                        };
                        env.insert(format!("{name}[{bit}]"), value);
                    }
                }
                None => {
                    let value = eval_expression(rhs, &env)?;
                    env.insert(lhs.to_string(), value);
                }
            }
        } else if line.starts_with("relay_conn ") {
            let (src, dst) = pin(line, "in").zip(pin(line, "out")).ok_or("bad relay")?;
            let value = env.get(src).copied().ok_or_else(|| format!("undriven {src}"))?;
            env.insert(dst.to_string(), value);
        } else if line.starts_with("logic_gate ") {
            let code = pin(line, "gate_type")
                .and_then(|t| t.strip_prefix("4'd"))
                .and_then(|t| t.parse::<u8>().ok())
                .and_then(GateOp::from_code)
                .ok_or("bad gate_type")?;
            let a = pin(line, "A").and_then(|n| env.get(n).copied());
            let b = pin(line, "B").and_then(|n| env.get(n).copied());
            let (a, b) = a.zip(b).ok_or_else(|| format!("undriven gate input in `{line}`"))?;
            let y = pin(line, "Y").ok_or("missing Y")?;
            env.insert(y.to_string(), code.eval(a, b));
        }
    }
    Ok(env)
}

/// Collect `name[0..width]` from a simulation result.
pub fn bus(env: &HashMap<String, bool>, name: &str, width: usize) -> Vec<bool> {
    (0..width)
        .map(|i| env.get(&format!("{name}[{i}]")).copied().unwrap_or(false))
        .collect()
}

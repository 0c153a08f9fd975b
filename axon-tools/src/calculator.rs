// Copyright 2025 Axon Contributors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! The built-in `calculator` tool.
//!
//! Never looked up in [`crate::registry::ToolRegistry`] and never accrues
//! cost — it is handled entirely inline by the transcript
//! grounder.

use regex::Regex;
use std::sync::OnceLock;

fn arithmetic_shape() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[\d\s+\-*/().]+$").unwrap())
}

/// Evaluate `input` if it matches the arithmetic grammar, producing
/// `"The result of {input} is {value}."`; otherwise the
/// `(invalid expression)` marker.
pub fn evaluate(input: &str) -> String {
    if !arithmetic_shape().is_match(input) {
        return "(invalid expression)".to_string();
    }
    match eval_expr(input) {
        Some(value) => format!("The result of {} is {}.", input.trim(), format_number(value)),
        None => "(invalid expression)".to_string(),
    }
}

fn format_number(v: f64) -> String {
    if v.fract() == 0.0 && v.abs() < 1e15 {
        format!("{}", v as i64)
    } else {
        let s = format!("{}", v);
        s
    }
}

/// A small recursive-descent evaluator for `+ - * / ( )` over decimals.
/// Scoped deliberately to the arithmetic grammar the regex above already
/// constrains input to — no variables, no functions.
fn eval_expr(input: &str) -> Option<f64> {
    let tokens = tokenize(input)?;
    let mut pos = 0;
    let value = parse_sum(&tokens, &mut pos)?;
    if pos != tokens.len() {
        return None;
    }
    Some(value)
}

#[derive(Debug, Clone, PartialEq)]
enum Tok {
    Num(f64),
    Plus,
    Minus,
    Star,
    Slash,
    LParen,
    RParen,
}

fn tokenize(input: &str) -> Option<Vec<Tok>> {
    let mut tokens = Vec::new();
    let chars: Vec<char> = input.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        match c {
            ' ' | '\t' => i += 1,
            '+' => {
                tokens.push(Tok::Plus);
                i += 1;
            }
            '-' => {
                tokens.push(Tok::Minus);
                i += 1;
            }
            '*' => {
                tokens.push(Tok::Star);
                i += 1;
            }
            '/' => {
                tokens.push(Tok::Slash);
                i += 1;
            }
            '(' => {
                tokens.push(Tok::LParen);
                i += 1;
            }
            ')' => {
                tokens.push(Tok::RParen);
                i += 1;
            }
            c if c.is_ascii_digit() || c == '.' => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                    i += 1;
                }
                let slice: String = chars[start..i].iter().collect();
                let n: f64 = slice.parse().ok()?;
                tokens.push(Tok::Num(n));
            }
            _ => return None,
        }
    }
    Some(tokens)
}

fn parse_sum(tokens: &[Tok], pos: &mut usize) -> Option<f64> {
    let mut value = parse_product(tokens, pos)?;
    loop {
        match tokens.get(*pos) {
            Some(Tok::Plus) => {
                *pos += 1;
                value += parse_product(tokens, pos)?;
            }
            Some(Tok::Minus) => {
                *pos += 1;
                value -= parse_product(tokens, pos)?;
            }
            _ => break,
        }
    }
    Some(value)
}

fn parse_product(tokens: &[Tok], pos: &mut usize) -> Option<f64> {
    let mut value = parse_unary(tokens, pos)?;
    loop {
        match tokens.get(*pos) {
            Some(Tok::Star) => {
                *pos += 1;
                value *= parse_unary(tokens, pos)?;
            }
            Some(Tok::Slash) => {
                *pos += 1;
                let rhs = parse_unary(tokens, pos)?;
                if rhs == 0.0 {
                    return None;
                }
                value /= rhs;
            }
            _ => break,
        }
    }
    Some(value)
}

fn parse_unary(tokens: &[Tok], pos: &mut usize) -> Option<f64> {
    if let Some(Tok::Minus) = tokens.get(*pos) {
        *pos += 1;
        return Some(-parse_unary(tokens, pos)?);
    }
    if let Some(Tok::Plus) = tokens.get(*pos) {
        *pos += 1;
        return parse_unary(tokens, pos);
    }
    parse_atom(tokens, pos)
}

fn parse_atom(tokens: &[Tok], pos: &mut usize) -> Option<f64> {
    match tokens.get(*pos) {
        Some(Tok::Num(n)) => {
            *pos += 1;
            Some(*n)
        }
        Some(Tok::LParen) => {
            *pos += 1;
            let value = parse_sum(tokens, pos)?;
            match tokens.get(*pos) {
                Some(Tok::RParen) => {
                    *pos += 1;
                    Some(value)
                }
                _ => None,
            }
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn evaluates_simple_addition() {
        assert_eq!(evaluate("2+2"), "The result of 2+2 is 4.");
    }

    #[test]
    fn evaluates_with_parens_and_precedence() {
        assert_eq!(evaluate("2 + 3 * (4 - 1)"), "The result of 2 + 3 * (4 - 1) is 11.");
    }

    #[test]
    fn rejects_non_arithmetic_input() {
        assert_eq!(evaluate("2 + import os"), "(invalid expression)");
    }

    #[test]
    fn rejects_division_by_zero() {
        assert_eq!(evaluate("1/0"), "(invalid expression)");
    }
}

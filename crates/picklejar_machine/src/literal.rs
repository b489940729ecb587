//! Decoding of literal operands: text numbers, quoted strings, escapes.

#![allow(clippy::cast_possible_truncation)]

use num_bigint::BigInt;
use picklejar_foundation::{Error, Result, Value};

fn line_text<'a>(line: &'a [u8], what: &str) -> Result<&'a str> {
    std::str::from_utf8(line)
        .map(str::trim)
        .map_err(|_| Error::malformed(format!("{what} operand is not ASCII text")))
}

fn parse_decimal(text: &str, what: &str) -> Result<Value> {
    if let Ok(n) = text.parse::<i64>() {
        return Ok(Value::Int(n));
    }
    BigInt::parse_bytes(text.as_bytes(), 10)
        .map(Value::from_bigint)
        .ok_or_else(|| Error::malformed(format!("invalid {what} literal {text:?}")))
}

/// INT: decimal text, where `00` and `01` encode `False` and `True`.
pub(crate) fn parse_int(line: &[u8]) -> Result<Value> {
    match line {
        b"00" => Ok(Value::Bool(false)),
        b"01" => Ok(Value::Bool(true)),
        _ => parse_decimal(line_text(line, "INT")?, "INT"),
    }
}

/// LONG: decimal text with an optional trailing `L`.
pub(crate) fn parse_long(line: &[u8]) -> Result<Value> {
    let text = line_text(line, "LONG")?;
    parse_decimal(text.strip_suffix('L').unwrap_or(text), "LONG")
}

/// FLOAT: decimal text, including `nan` and `inf` spellings.
pub(crate) fn parse_float(line: &[u8]) -> Result<Value> {
    let text = line_text(line, "FLOAT")?;
    text.parse::<f64>()
        .map(Value::Float)
        .map_err(|_| Error::malformed(format!("invalid FLOAT literal {text:?}")))
}

/// LONG1/LONG4 payload: little-endian two's complement, empty meaning zero.
pub(crate) fn decode_long_bytes(bytes: &[u8]) -> Value {
    if bytes.is_empty() {
        return Value::Int(0);
    }
    Value::from_bigint(BigInt::from_signed_bytes_le(bytes))
}

/// Text if the bytes are valid UTF-8, bytes otherwise.
pub(crate) fn str_or_bytes(bytes: &[u8]) -> Value {
    match std::str::from_utf8(bytes) {
        Ok(text) => Value::from(text),
        Err(_) => Value::from(bytes),
    }
}

/// UTF-8 payload of the binary text opcodes.
pub(crate) fn utf8_text(bytes: &[u8]) -> Result<Value> {
    std::str::from_utf8(bytes)
        .map(Value::from)
        .map_err(|e| Error::malformed(format!("text operand is not valid UTF-8 ({e})")))
}

/// STRING: a quoted literal with backslash escapes.
pub(crate) fn parse_quoted_string(line: &[u8]) -> Result<Value> {
    let inner = match line {
        [q @ (b'\'' | b'"'), inner @ .., last] if last == q => inner,
        _ => return Err(Error::malformed("STRING operand must be quoted")),
    };
    Ok(str_or_bytes(&unescape_bytes(inner)?))
}

fn hex_digit(b: u8) -> Option<u32> {
    char::from(b).to_digit(16)
}

/// Backslash escapes of a quoted byte-string literal.
fn unescape_bytes(src: &[u8]) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(src.len());
    let mut i = 0;
    while i < src.len() {
        let b = src[i];
        i += 1;
        if b != b'\\' {
            out.push(b);
            continue;
        }
        let Some(&esc) = src.get(i) else {
            return Err(Error::malformed("trailing backslash in STRING operand"));
        };
        i += 1;
        match esc {
            b'\n' => {}
            b'\\' | b'\'' | b'"' => out.push(esc),
            b'a' => out.push(0x07),
            b'b' => out.push(0x08),
            b'f' => out.push(0x0c),
            b'n' => out.push(b'\n'),
            b'r' => out.push(b'\r'),
            b't' => out.push(b'\t'),
            b'v' => out.push(0x0b),
            b'0'..=b'7' => {
                let mut value = u32::from(esc - b'0');
                for _ in 0..2 {
                    match src.get(i) {
                        Some(&d @ b'0'..=b'7') => {
                            value = value * 8 + u32::from(d - b'0');
                            i += 1;
                        }
                        _ => break,
                    }
                }
                out.push((value & 0xff) as u8);
            }
            b'x' => {
                let hi = src.get(i).copied().and_then(hex_digit);
                let lo = src.get(i + 1).copied().and_then(hex_digit);
                let (Some(hi), Some(lo)) = (hi, lo) else {
                    return Err(Error::malformed("invalid \\x escape in STRING operand"));
                };
                out.push((hi * 16 + lo) as u8);
                i += 2;
            }
            other => {
                out.push(b'\\');
                out.push(other);
            }
        }
    }
    Ok(out)
}

/// UNICODE: latin-1 text where `\uXXXX` and `\UXXXXXXXX` escape other code points.
pub(crate) fn parse_raw_unicode(line: &[u8]) -> Result<Value> {
    let mut out = String::with_capacity(line.len());
    let mut i = 0;
    let mut run = 0usize;
    while i < line.len() {
        let b = line[i];
        let width = match line.get(i + 1) {
            Some(b'u') if b == b'\\' && run % 2 == 0 => 4,
            Some(b'U') if b == b'\\' && run % 2 == 0 => 8,
            _ => 0,
        };
        if width == 0 {
            run = if b == b'\\' { run + 1 } else { 0 };
            out.push(char::from(b));
            i += 1;
            continue;
        }
        let digits = line
            .get(i + 2..i + 2 + width)
            .ok_or_else(|| Error::malformed("truncated \\u escape in UNICODE operand"))?;
        let code = digits
            .iter()
            .try_fold(0u32, |acc, &d| hex_digit(d).map(|v| acc * 16 + v))
            .ok_or_else(|| Error::malformed("invalid \\u escape in UNICODE operand"))?;
        out.push(char::from_u32(code).unwrap_or(char::REPLACEMENT_CHARACTER));
        run = 0;
        i += 2 + width;
    }
    Ok(Value::from(out))
}

//! Human-readable listing of a pickle stream.
//!
//! One instruction per line with its byte offset, indented by mark depth.
//! Nothing is executed; the listing stops at STOP or at the first decode error.

use std::fmt::{self, Write};

use picklejar_foundation::{Error, Result};

use crate::opcode::Opcode;
use crate::reader::{OpcodeReader, Positioned};

/// Longest operand rendered before it is elided.
const MAX_OPERAND_CHARS: usize = 60;

fn quoted(bytes: &[u8], prefix: &str) -> String {
    let mut out = String::from(prefix);
    out.push('\'');
    for &b in bytes.iter().take(MAX_OPERAND_CHARS) {
        match b {
            b'\'' => out.push_str("\\'"),
            b'\\' => out.push_str("\\\\"),
            0x20..=0x7e => out.push(char::from(b)),
            b'\n' => out.push_str("\\n"),
            _ => {
                let _ = write!(out, "\\x{b:02x}");
            }
        }
    }
    out.push('\'');
    if bytes.len() > MAX_OPERAND_CHARS {
        let _ = write!(out, "... ({} bytes)", bytes.len());
    }
    out
}

fn text(bytes: &[u8]) -> String {
    let text = String::from_utf8_lossy(bytes);
    let mut shown: String = text.chars().take(MAX_OPERAND_CHARS).collect();
    shown = format!("{shown:?}");
    if text.chars().count() > MAX_OPERAND_CHARS {
        let _ = write!(shown, "... ({} bytes)", bytes.len());
    }
    shown
}

/// Operand column of one instruction (empty when it has none).
#[must_use]
pub fn render_operand(op: &Opcode<'_>) -> String {
    match *op {
        Opcode::Float(line) | Opcode::Int(line) | Opcode::Long(line) | Opcode::String(line) | Opcode::PersId(line) => {
            String::from_utf8_lossy(line).into_owned()
        }
        Opcode::Unicode(line) => quoted(line, ""),
        Opcode::BinInt(n) | Opcode::Ext4(n) => n.to_string(),
        Opcode::BinInt1(n) | Opcode::BinGet(n) | Opcode::BinPut(n) | Opcode::Ext1(n) | Opcode::Proto(n) => {
            n.to_string()
        }
        Opcode::BinInt2(n) | Opcode::Ext2(n) => n.to_string(),
        Opcode::LongBinGet(n) | Opcode::LongBinPut(n) => n.to_string(),
        Opcode::Get(n) | Opcode::Put(n) | Opcode::Frame(n) => n.to_string(),
        Opcode::BinFloat(f) => format!("{f:?}"),
        Opcode::Long1(bytes) | Opcode::Long4(bytes) => crate::literal::decode_long_bytes(bytes)
            .as_int()
            .map_or_else(|| format!("<{} byte integer>", bytes.len()), |n| n.to_string()),
        Opcode::BinString(bytes) | Opcode::ShortBinString(bytes) => quoted(bytes, ""),
        Opcode::BinUnicode(bytes) | Opcode::ShortBinUnicode(bytes) | Opcode::BinUnicode8(bytes) => text(bytes),
        Opcode::BinBytes(bytes) | Opcode::ShortBinBytes(bytes) | Opcode::BinBytes8(bytes) => quoted(bytes, "b"),
        Opcode::ByteArray8(bytes) => format!("bytearray({})", quoted(bytes, "b")),
        Opcode::Global { module, name } | Opcode::Inst { module, name } => {
            format!("{} {}", String::from_utf8_lossy(module), String::from_utf8_lossy(name))
        }
        _ => String::new(),
    }
}

/// Change in mark depth caused by an instruction.
fn mark_delta(op: &Opcode<'_>) -> isize {
    match op {
        Opcode::Mark => 1,
        Opcode::PopMark
        | Opcode::List
        | Opcode::Tuple
        | Opcode::Dict
        | Opcode::FrozenSet
        | Opcode::Appends
        | Opcode::SetItems
        | Opcode::AddItems
        | Opcode::Obj
        | Opcode::Inst { .. } => -1,
        _ => 0,
    }
}

/// Writes the listing of `data` to `out`.
///
/// # Errors
/// Returns the decode error that ended the listing early, after the
/// instructions before it have been written.
pub fn disassemble<W: Write>(data: &[u8], out: &mut W) -> Result<()> {
    let mut depth: isize = 0;
    let mut reader = OpcodeReader::new(data);
    loop {
        let Positioned { offset, op } = reader.next_op()?;
        let delta = mark_delta(&op);
        if delta < 0 {
            depth = (depth + delta).max(0);
        }
        write_line(out, offset, depth, &op).map_err(|_| Error::malformed("listing output failed"))?;
        if delta > 0 {
            depth += delta;
        }
        if op == Opcode::Stop {
            if !reader.is_at_end() {
                writeln!(out, "{} trailing bytes after STOP", reader.remaining())
                    .map_err(|_| Error::malformed("listing output failed"))?;
            }
            return Ok(());
        }
    }
}

fn write_line<W: Write>(out: &mut W, offset: usize, depth: isize, op: &Opcode<'_>) -> fmt::Result {
    let indent = "  ".repeat(usize::try_from(depth).unwrap_or(0));
    let operand = render_operand(op);
    if operand.is_empty() {
        writeln!(out, "{offset:>6}: {indent}{}", op.name())
    } else {
        writeln!(out, "{offset:>6}: {indent}{:<16} {operand}", op.name())
    }
}

/// Returns the listing of `data` as a string, with a final line describing
/// the decode error if there was one.
#[must_use]
pub fn disassemble_to_string(data: &[u8]) -> String {
    let mut out = String::new();
    if let Err(e) = disassemble(data, &mut out) {
        let at = e.offset().map(|o| format!(" at byte {o}")).unwrap_or_default();
        let _ = writeln!(out, "error{at}: {e}");
    }
    out
}

//! Bounded opcode reader.
//!
//! The reader decodes one instruction at a time from an in-memory buffer.
//! Every declared length is checked against the bytes that actually remain
//! before anything is sliced or allocated.

#![allow(clippy::cast_possible_truncation)]

use picklejar_foundation::{Error, ErrorContext, Result};

use crate::opcode::{Opcode, codes, opcode_name};

/// A decoded instruction together with the offset of its opcode byte.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Positioned<'a> {
    /// Byte offset of the opcode byte.
    pub offset: usize,
    /// The decoded instruction.
    pub op: Opcode<'a>,
}

/// Reader over a pickle byte stream.
pub struct OpcodeReader<'a> {
    /// Complete input.
    data: &'a [u8],
    /// Current byte offset.
    position: usize,
    /// Set after an error so iteration stops.
    failed: bool,
}

impl<'a> OpcodeReader<'a> {
    /// Creates a reader positioned at the start of `data`.
    #[must_use]
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            position: 0,
            failed: false,
        }
    }

    /// Current byte offset.
    #[must_use]
    pub fn position(&self) -> usize {
        self.position
    }

    /// Returns true when every byte has been consumed.
    #[must_use]
    pub fn is_at_end(&self) -> bool {
        self.position >= self.data.len()
    }

    /// Bytes not yet consumed.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.position)
    }

    /// Decodes the next instruction.
    ///
    /// # Errors
    /// - `TruncatedInput` if the stream ends inside the opcode or its operand
    /// - `UnsupportedOpcode` for a byte outside the instruction set
    /// - `MalformedStream` for an unparseable text memo id
    ///
    /// Errors carry the offset of the opcode byte.
    pub fn next_op(&mut self) -> Result<Positioned<'a>> {
        let offset = self.position;
        self.decode().map(|op| Positioned { offset, op }).map_err(|e| {
            self.failed = true;
            let mut ctx = ErrorContext::new().with_offset(offset);
            if let Some(name) = self.data.get(offset).copied().and_then(opcode_name) {
                ctx = ctx.with_opcode(name);
            }
            e.with_context(ctx)
        })
    }

    fn decode(&mut self) -> Result<Opcode<'a>> {
        use codes::*;

        let code = self.read_u8()?;
        let op = match code {
            MARK => Opcode::Mark,
            STOP => Opcode::Stop,
            POP => Opcode::Pop,
            POP_MARK => Opcode::PopMark,
            DUP => Opcode::Dup,
            FLOAT => Opcode::Float(self.read_line()?),
            INT => Opcode::Int(self.read_line()?),
            BININT => Opcode::BinInt(i32::from_le_bytes(self.read_array()?)),
            BININT1 => Opcode::BinInt1(self.read_u8()?),
            LONG => Opcode::Long(self.read_line()?),
            BININT2 => Opcode::BinInt2(u16::from_le_bytes(self.read_array()?)),
            NONE => Opcode::None,
            PERSID => Opcode::PersId(self.read_line()?),
            BINPERSID => Opcode::BinPersId,
            REDUCE => Opcode::Reduce,
            STRING => Opcode::String(self.read_line()?),
            BINSTRING => {
                let len = self.read_signed_len()?;
                Opcode::BinString(self.take(len)?)
            }
            SHORT_BINSTRING => {
                let len = self.read_u8()?;
                Opcode::ShortBinString(self.take(u64::from(len))?)
            }
            UNICODE => Opcode::Unicode(self.read_line()?),
            BINUNICODE => {
                let len = u32::from_le_bytes(self.read_array()?);
                Opcode::BinUnicode(self.take(u64::from(len))?)
            }
            APPEND => Opcode::Append,
            BUILD => Opcode::Build,
            GLOBAL => {
                let module = self.read_line()?;
                let name = self.read_line()?;
                Opcode::Global { module, name }
            }
            DICT => Opcode::Dict,
            EMPTY_DICT => Opcode::EmptyDict,
            APPENDS => Opcode::Appends,
            GET => Opcode::Get(self.read_decimal_id()?),
            BINGET => Opcode::BinGet(self.read_u8()?),
            INST => {
                let module = self.read_line()?;
                let name = self.read_line()?;
                Opcode::Inst { module, name }
            }
            LONG_BINGET => Opcode::LongBinGet(u32::from_le_bytes(self.read_array()?)),
            LIST => Opcode::List,
            EMPTY_LIST => Opcode::EmptyList,
            OBJ => Opcode::Obj,
            PUT => Opcode::Put(self.read_decimal_id()?),
            BINPUT => Opcode::BinPut(self.read_u8()?),
            LONG_BINPUT => Opcode::LongBinPut(u32::from_le_bytes(self.read_array()?)),
            SETITEM => Opcode::SetItem,
            TUPLE => Opcode::Tuple,
            EMPTY_TUPLE => Opcode::EmptyTuple,
            SETITEMS => Opcode::SetItems,
            BINFLOAT => Opcode::BinFloat(f64::from_be_bytes(self.read_array()?)),
            PROTO => Opcode::Proto(self.read_u8()?),
            NEWOBJ => Opcode::NewObj,
            EXT1 => Opcode::Ext1(self.read_u8()?),
            EXT2 => Opcode::Ext2(u16::from_le_bytes(self.read_array()?)),
            EXT4 => Opcode::Ext4(i32::from_le_bytes(self.read_array()?)),
            TUPLE1 => Opcode::Tuple1,
            TUPLE2 => Opcode::Tuple2,
            TUPLE3 => Opcode::Tuple3,
            NEWTRUE => Opcode::NewTrue,
            NEWFALSE => Opcode::NewFalse,
            LONG1 => {
                let len = self.read_u8()?;
                Opcode::Long1(self.take(u64::from(len))?)
            }
            LONG4 => {
                let len = self.read_signed_len()?;
                Opcode::Long4(self.take(len)?)
            }
            BINBYTES => {
                let len = u32::from_le_bytes(self.read_array()?);
                Opcode::BinBytes(self.take(u64::from(len))?)
            }
            SHORT_BINBYTES => {
                let len = self.read_u8()?;
                Opcode::ShortBinBytes(self.take(u64::from(len))?)
            }
            SHORT_BINUNICODE => {
                let len = self.read_u8()?;
                Opcode::ShortBinUnicode(self.take(u64::from(len))?)
            }
            BINUNICODE8 => {
                let len = u64::from_le_bytes(self.read_array()?);
                Opcode::BinUnicode8(self.take(len)?)
            }
            BINBYTES8 => {
                let len = u64::from_le_bytes(self.read_array()?);
                Opcode::BinBytes8(self.take(len)?)
            }
            EMPTY_SET => Opcode::EmptySet,
            ADDITEMS => Opcode::AddItems,
            FROZENSET => Opcode::FrozenSet,
            NEWOBJ_EX => Opcode::NewObjEx,
            STACK_GLOBAL => Opcode::StackGlobal,
            MEMOIZE => Opcode::Memoize,
            FRAME => Opcode::Frame(u64::from_le_bytes(self.read_array()?)),
            BYTEARRAY8 => {
                let len = u64::from_le_bytes(self.read_array()?);
                Opcode::ByteArray8(self.take(len)?)
            }
            NEXT_BUFFER => Opcode::NextBuffer,
            READONLY_BUFFER => Opcode::ReadonlyBuffer,
            other => return Err(Error::unsupported_opcode(other, None)),
        };
        Ok(op)
    }

    /// Consumes exactly `len` bytes.
    fn take(&mut self, len: u64) -> Result<&'a [u8]> {
        let available = self.remaining();
        if len > available as u64 {
            return Err(Error::truncated(len, available));
        }
        let start = self.position;
        self.position += len as usize;
        Ok(&self.data[start..self.position])
    }

    fn read_u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    fn read_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N as u64)?);
        Ok(out)
    }

    /// 4-byte signed length as used by BINSTRING and LONG4.
    fn read_signed_len(&mut self) -> Result<u64> {
        let len = i32::from_le_bytes(self.read_array()?);
        u64::try_from(len).map_err(|_| Error::malformed(format!("negative operand length {len}")))
    }

    /// Consumes a newline-terminated line, returning it without the newline.
    fn read_line(&mut self) -> Result<&'a [u8]> {
        let rest = &self.data[self.position.min(self.data.len())..];
        match rest.iter().position(|&b| b == b'\n') {
            Some(end) => {
                self.position += end + 1;
                Ok(&rest[..end])
            }
            None => Err(Error::truncated(rest.len() as u64 + 1, rest.len())),
        }
    }

    fn read_decimal_id(&mut self) -> Result<u64> {
        let line = self.read_line()?;
        std::str::from_utf8(line)
            .ok()
            .and_then(|text| text.trim().parse().ok())
            .ok_or_else(|| {
                Error::malformed(format!(
                    "invalid memo id {:?}",
                    String::from_utf8_lossy(line)
                ))
            })
    }
}

impl<'a> Iterator for OpcodeReader<'a> {
    type Item = Result<Positioned<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.is_at_end() {
            return None;
        }
        Some(self.next_op())
    }
}

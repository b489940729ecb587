//! Instruction set of the pickle wire format, protocols 0 through 5.
//!
//! The machine is stack-based. Operands borrow from the input buffer, so a
//! decoded [`Opcode`] never owns heap memory.

#![allow(clippy::doc_markdown)]
#![allow(clippy::cast_possible_truncation)]

/// Opcode byte values.
pub mod codes {
    #![allow(missing_docs)]

    pub const MARK: u8 = b'(';
    pub const STOP: u8 = b'.';
    pub const POP: u8 = b'0';
    pub const POP_MARK: u8 = b'1';
    pub const DUP: u8 = b'2';
    pub const FLOAT: u8 = b'F';
    pub const INT: u8 = b'I';
    pub const BININT: u8 = b'J';
    pub const BININT1: u8 = b'K';
    pub const LONG: u8 = b'L';
    pub const BININT2: u8 = b'M';
    pub const NONE: u8 = b'N';
    pub const PERSID: u8 = b'P';
    pub const BINPERSID: u8 = b'Q';
    pub const REDUCE: u8 = b'R';
    pub const STRING: u8 = b'S';
    pub const BINSTRING: u8 = b'T';
    pub const SHORT_BINSTRING: u8 = b'U';
    pub const UNICODE: u8 = b'V';
    pub const BINUNICODE: u8 = b'X';
    pub const APPEND: u8 = b'a';
    pub const BUILD: u8 = b'b';
    pub const GLOBAL: u8 = b'c';
    pub const DICT: u8 = b'd';
    pub const EMPTY_DICT: u8 = b'}';
    pub const APPENDS: u8 = b'e';
    pub const GET: u8 = b'g';
    pub const BINGET: u8 = b'h';
    pub const INST: u8 = b'i';
    pub const LONG_BINGET: u8 = b'j';
    pub const LIST: u8 = b'l';
    pub const EMPTY_LIST: u8 = b']';
    pub const OBJ: u8 = b'o';
    pub const PUT: u8 = b'p';
    pub const BINPUT: u8 = b'q';
    pub const LONG_BINPUT: u8 = b'r';
    pub const SETITEM: u8 = b's';
    pub const TUPLE: u8 = b't';
    pub const EMPTY_TUPLE: u8 = b')';
    pub const SETITEMS: u8 = b'u';
    pub const BINFLOAT: u8 = b'G';
    pub const PROTO: u8 = 0x80;
    pub const NEWOBJ: u8 = 0x81;
    pub const EXT1: u8 = 0x82;
    pub const EXT2: u8 = 0x83;
    pub const EXT4: u8 = 0x84;
    pub const TUPLE1: u8 = 0x85;
    pub const TUPLE2: u8 = 0x86;
    pub const TUPLE3: u8 = 0x87;
    pub const NEWTRUE: u8 = 0x88;
    pub const NEWFALSE: u8 = 0x89;
    pub const LONG1: u8 = 0x8a;
    pub const LONG4: u8 = 0x8b;
    pub const BINBYTES: u8 = b'B';
    pub const SHORT_BINBYTES: u8 = b'C';
    pub const SHORT_BINUNICODE: u8 = 0x8c;
    pub const BINUNICODE8: u8 = 0x8d;
    pub const BINBYTES8: u8 = 0x8e;
    pub const EMPTY_SET: u8 = 0x8f;
    pub const ADDITEMS: u8 = 0x90;
    pub const FROZENSET: u8 = 0x91;
    pub const NEWOBJ_EX: u8 = 0x92;
    pub const STACK_GLOBAL: u8 = 0x93;
    pub const MEMOIZE: u8 = 0x94;
    pub const FRAME: u8 = 0x95;
    pub const BYTEARRAY8: u8 = 0x96;
    pub const NEXT_BUFFER: u8 = 0x97;
    pub const READONLY_BUFFER: u8 = 0x98;
}

/// Highest protocol version the machine understands.
pub const HIGHEST_PROTOCOL: u8 = 5;

/// A single decoded instruction.
///
/// Text operands (protocol 0) hold the line without its trailing newline.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Opcode<'a> {
    // === Stack Structure ===
    /// Push a mark sentinel.
    Mark,
    /// End of stream: `[root] -> []`
    Stop,
    /// Discard the top item.
    Pop,
    /// Discard items down to and including the nearest mark.
    PopMark,
    /// Duplicate the top item.
    Dup,

    // === Scalars ===
    /// Float as decimal text.
    Float(&'a [u8]),
    /// Integer as decimal text (`00`/`01` are `False`/`True`).
    Int(&'a [u8]),
    /// 4-byte signed little-endian integer.
    BinInt(i32),
    /// 1-byte unsigned integer.
    BinInt1(u8),
    /// Arbitrary integer as decimal text with an `L` suffix.
    Long(&'a [u8]),
    /// 2-byte unsigned little-endian integer.
    BinInt2(u16),
    /// Push `None`.
    None,
    /// 8-byte big-endian IEEE 754 double.
    BinFloat(f64),
    /// Push `True`.
    NewTrue,
    /// Push `False`.
    NewFalse,
    /// Two's-complement little-endian integer, 1-byte length.
    Long1(&'a [u8]),
    /// Two's-complement little-endian integer, 4-byte length.
    Long4(&'a [u8]),

    // === Strings and Bytes ===
    /// Quoted, escaped byte string as text.
    String(&'a [u8]),
    /// Byte string, 4-byte length.
    BinString(&'a [u8]),
    /// Byte string, 1-byte length.
    ShortBinString(&'a [u8]),
    /// Raw-unicode-escaped text line.
    Unicode(&'a [u8]),
    /// UTF-8 text, 4-byte length.
    BinUnicode(&'a [u8]),
    /// UTF-8 text, 1-byte length.
    ShortBinUnicode(&'a [u8]),
    /// UTF-8 text, 8-byte length.
    BinUnicode8(&'a [u8]),
    /// Bytes, 4-byte length.
    BinBytes(&'a [u8]),
    /// Bytes, 1-byte length.
    ShortBinBytes(&'a [u8]),
    /// Bytes, 8-byte length.
    BinBytes8(&'a [u8]),
    /// Bytearray, 8-byte length.
    ByteArray8(&'a [u8]),

    // === Containers ===
    /// Push an empty list.
    EmptyList,
    /// Push an empty dict.
    EmptyDict,
    /// Push an empty tuple.
    EmptyTuple,
    /// Push an empty set.
    EmptySet,
    /// Build a list from items above the mark.
    List,
    /// Build a tuple from items above the mark.
    Tuple,
    /// Build a dict from key/value pairs above the mark.
    Dict,
    /// Build a frozenset from items above the mark.
    FrozenSet,
    /// `[a] -> [(a,)]`
    Tuple1,
    /// `[a, b] -> [(a, b)]`
    Tuple2,
    /// `[a, b, c] -> [(a, b, c)]`
    Tuple3,
    /// `[list, x] -> [list]` with `x` appended.
    Append,
    /// `[list, mark, xs...] -> [list]` with `xs` appended.
    Appends,
    /// `[dict, k, v] -> [dict]` with `dict[k] = v`.
    SetItem,
    /// `[dict, mark, k, v, ...] -> [dict]` with every pair stored.
    SetItems,
    /// `[set, mark, xs...] -> [set]` with `xs` added.
    AddItems,

    // === Memo ===
    /// Push the memo entry with a decimal text id.
    Get(u64),
    /// Push the memo entry with a 1-byte id.
    BinGet(u8),
    /// Push the memo entry with a 4-byte id.
    LongBinGet(u32),
    /// Store the top item under a decimal text id.
    Put(u64),
    /// Store the top item under a 1-byte id.
    BinPut(u8),
    /// Store the top item under a 4-byte id.
    LongBinPut(u32),
    /// Store the top item under the next sequential id.
    Memoize,

    // === Names and Construction ===
    /// Resolve `module\nname\n`.
    Global {
        /// Module line.
        module: &'a [u8],
        /// Attribute line.
        name: &'a [u8],
    },
    /// `[module, name] -> [global]`
    StackGlobal,
    /// Resolve a class and call it with the items above the mark.
    Inst {
        /// Module line.
        module: &'a [u8],
        /// Attribute line.
        name: &'a [u8],
    },
    /// `[mark, cls, args...] -> [cls(*args)]`
    Obj,
    /// `[callable, args] -> [callable(*args)]`
    Reduce,
    /// `[cls, args] -> [cls.__new__(cls, *args)]`
    NewObj,
    /// `[cls, args, kwargs] -> [cls.__new__(cls, *args, **kwargs)]`
    NewObjEx,
    /// `[obj, state] -> [obj]` with state applied.
    Build,

    // === External References ===
    /// Persistent id as text.
    PersId(&'a [u8]),
    /// Persistent id from the stack.
    BinPersId,
    /// Extension registry code, 1 byte.
    Ext1(u8),
    /// Extension registry code, 2 bytes.
    Ext2(u16),
    /// Extension registry code, 4 bytes.
    Ext4(i32),
    /// Next out-of-band buffer.
    NextBuffer,
    /// Make the top buffer read-only.
    ReadonlyBuffer,

    // === Framing ===
    /// Protocol version header.
    Proto(u8),
    /// Frame length hint.
    Frame(u64),
}

impl Opcode<'_> {
    /// Returns the opcode byte.
    #[must_use]
    pub const fn code(&self) -> u8 {
        use codes::*;
        match self {
            Self::Mark => MARK,
            Self::Stop => STOP,
            Self::Pop => POP,
            Self::PopMark => POP_MARK,
            Self::Dup => DUP,
            Self::Float(_) => FLOAT,
            Self::Int(_) => INT,
            Self::BinInt(_) => BININT,
            Self::BinInt1(_) => BININT1,
            Self::Long(_) => LONG,
            Self::BinInt2(_) => BININT2,
            Self::None => NONE,
            Self::BinFloat(_) => BINFLOAT,
            Self::NewTrue => NEWTRUE,
            Self::NewFalse => NEWFALSE,
            Self::Long1(_) => LONG1,
            Self::Long4(_) => LONG4,
            Self::String(_) => STRING,
            Self::BinString(_) => BINSTRING,
            Self::ShortBinString(_) => SHORT_BINSTRING,
            Self::Unicode(_) => UNICODE,
            Self::BinUnicode(_) => BINUNICODE,
            Self::ShortBinUnicode(_) => SHORT_BINUNICODE,
            Self::BinUnicode8(_) => BINUNICODE8,
            Self::BinBytes(_) => BINBYTES,
            Self::ShortBinBytes(_) => SHORT_BINBYTES,
            Self::BinBytes8(_) => BINBYTES8,
            Self::ByteArray8(_) => BYTEARRAY8,
            Self::EmptyList => EMPTY_LIST,
            Self::EmptyDict => EMPTY_DICT,
            Self::EmptyTuple => EMPTY_TUPLE,
            Self::EmptySet => EMPTY_SET,
            Self::List => LIST,
            Self::Tuple => TUPLE,
            Self::Dict => DICT,
            Self::FrozenSet => FROZENSET,
            Self::Tuple1 => TUPLE1,
            Self::Tuple2 => TUPLE2,
            Self::Tuple3 => TUPLE3,
            Self::Append => APPEND,
            Self::Appends => APPENDS,
            Self::SetItem => SETITEM,
            Self::SetItems => SETITEMS,
            Self::AddItems => ADDITEMS,
            Self::Get(_) => GET,
            Self::BinGet(_) => BINGET,
            Self::LongBinGet(_) => LONG_BINGET,
            Self::Put(_) => PUT,
            Self::BinPut(_) => BINPUT,
            Self::LongBinPut(_) => LONG_BINPUT,
            Self::Memoize => MEMOIZE,
            Self::Global { .. } => GLOBAL,
            Self::StackGlobal => STACK_GLOBAL,
            Self::Inst { .. } => INST,
            Self::Obj => OBJ,
            Self::Reduce => REDUCE,
            Self::NewObj => NEWOBJ,
            Self::NewObjEx => NEWOBJ_EX,
            Self::Build => BUILD,
            Self::PersId(_) => PERSID,
            Self::BinPersId => BINPERSID,
            Self::Ext1(_) => EXT1,
            Self::Ext2(_) => EXT2,
            Self::Ext4(_) => EXT4,
            Self::NextBuffer => NEXT_BUFFER,
            Self::ReadonlyBuffer => READONLY_BUFFER,
            Self::Proto(_) => PROTO,
            Self::Frame(_) => FRAME,
        }
    }

    /// Returns the protocol name, e.g. `SHORT_BINUNICODE`.
    #[must_use]
    pub fn name(&self) -> &'static str {
        opcode_name(self.code()).unwrap_or("?")
    }

    /// Appends the encoded instruction to `out`.
    ///
    /// Operands longer than the opcode's length field can express are
    /// clamped to the field's maximum length.
    pub fn write_to(&self, out: &mut Vec<u8>) {
        out.push(self.code());
        match *self {
            Self::Float(line)
            | Self::Int(line)
            | Self::Long(line)
            | Self::String(line)
            | Self::Unicode(line)
            | Self::PersId(line) => {
                out.extend_from_slice(line);
                out.push(b'\n');
            }
            Self::Get(id) | Self::Put(id) => {
                out.extend_from_slice(id.to_string().as_bytes());
                out.push(b'\n');
            }
            Self::Global { module, name } | Self::Inst { module, name } => {
                out.extend_from_slice(module);
                out.push(b'\n');
                out.extend_from_slice(name);
                out.push(b'\n');
            }
            Self::BinInt(n) | Self::Ext4(n) => out.extend_from_slice(&n.to_le_bytes()),
            Self::BinInt1(n) | Self::BinGet(n) | Self::BinPut(n) | Self::Ext1(n) | Self::Proto(n) => {
                out.push(n);
            }
            Self::BinInt2(n) | Self::Ext2(n) => out.extend_from_slice(&n.to_le_bytes()),
            Self::LongBinGet(n) | Self::LongBinPut(n) => out.extend_from_slice(&n.to_le_bytes()),
            Self::BinFloat(f) => out.extend_from_slice(&f.to_be_bytes()),
            Self::Frame(n) => out.extend_from_slice(&n.to_le_bytes()),
            Self::Long1(data) | Self::ShortBinString(data) | Self::ShortBinUnicode(data) | Self::ShortBinBytes(data) => {
                let data = &data[..data.len().min(usize::from(u8::MAX))];
                out.push(data.len() as u8);
                out.extend_from_slice(data);
            }
            Self::Long4(data) | Self::BinString(data) => {
                let data = &data[..data.len().min(i32::MAX as usize)];
                out.extend_from_slice(&(data.len() as i32).to_le_bytes());
                out.extend_from_slice(data);
            }
            Self::BinUnicode(data) | Self::BinBytes(data) => {
                let data = &data[..data.len().min(u32::MAX as usize)];
                out.extend_from_slice(&(data.len() as u32).to_le_bytes());
                out.extend_from_slice(data);
            }
            Self::BinUnicode8(data) | Self::BinBytes8(data) | Self::ByteArray8(data) => {
                out.extend_from_slice(&(data.len() as u64).to_le_bytes());
                out.extend_from_slice(data);
            }
            _ => {}
        }
    }
}

/// Encodes a sequence of instructions into a pickle byte stream.
#[must_use]
pub fn assemble(ops: &[Opcode<'_>]) -> Vec<u8> {
    let mut out = Vec::new();
    for op in ops {
        op.write_to(&mut out);
    }
    out
}

/// Returns the protocol name of an opcode byte, or `None` if unassigned.
#[must_use]
pub fn opcode_name(byte: u8) -> Option<&'static str> {
    use codes::*;
    let name = match byte {
        MARK => "MARK",
        STOP => "STOP",
        POP => "POP",
        POP_MARK => "POP_MARK",
        DUP => "DUP",
        FLOAT => "FLOAT",
        INT => "INT",
        BININT => "BININT",
        BININT1 => "BININT1",
        LONG => "LONG",
        BININT2 => "BININT2",
        NONE => "NONE",
        PERSID => "PERSID",
        BINPERSID => "BINPERSID",
        REDUCE => "REDUCE",
        STRING => "STRING",
        BINSTRING => "BINSTRING",
        SHORT_BINSTRING => "SHORT_BINSTRING",
        UNICODE => "UNICODE",
        BINUNICODE => "BINUNICODE",
        APPEND => "APPEND",
        BUILD => "BUILD",
        GLOBAL => "GLOBAL",
        DICT => "DICT",
        EMPTY_DICT => "EMPTY_DICT",
        APPENDS => "APPENDS",
        GET => "GET",
        BINGET => "BINGET",
        INST => "INST",
        LONG_BINGET => "LONG_BINGET",
        LIST => "LIST",
        EMPTY_LIST => "EMPTY_LIST",
        OBJ => "OBJ",
        PUT => "PUT",
        BINPUT => "BINPUT",
        LONG_BINPUT => "LONG_BINPUT",
        SETITEM => "SETITEM",
        TUPLE => "TUPLE",
        EMPTY_TUPLE => "EMPTY_TUPLE",
        SETITEMS => "SETITEMS",
        BINFLOAT => "BINFLOAT",
        PROTO => "PROTO",
        NEWOBJ => "NEWOBJ",
        EXT1 => "EXT1",
        EXT2 => "EXT2",
        EXT4 => "EXT4",
        TUPLE1 => "TUPLE1",
        TUPLE2 => "TUPLE2",
        TUPLE3 => "TUPLE3",
        NEWTRUE => "NEWTRUE",
        NEWFALSE => "NEWFALSE",
        LONG1 => "LONG1",
        LONG4 => "LONG4",
        BINBYTES => "BINBYTES",
        SHORT_BINBYTES => "SHORT_BINBYTES",
        SHORT_BINUNICODE => "SHORT_BINUNICODE",
        BINUNICODE8 => "BINUNICODE8",
        BINBYTES8 => "BINBYTES8",
        EMPTY_SET => "EMPTY_SET",
        ADDITEMS => "ADDITEMS",
        FROZENSET => "FROZENSET",
        NEWOBJ_EX => "NEWOBJ_EX",
        STACK_GLOBAL => "STACK_GLOBAL",
        MEMOIZE => "MEMOIZE",
        FRAME => "FRAME",
        BYTEARRAY8 => "BYTEARRAY8",
        NEXT_BUFFER => "NEXT_BUFFER",
        READONLY_BUFFER => "READONLY_BUFFER",
        _ => return None,
    };
    Some(name)
}

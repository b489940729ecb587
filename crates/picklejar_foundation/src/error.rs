//! Error types for picklejar.
//!
//! Uses `thiserror` for ergonomic error definition with rich context. Every
//! kind is terminal for the parse that raised it.

use std::fmt;

use thiserror::Error;

/// The main error type for picklejar operations.
#[derive(Debug, Error)]
#[error("{kind}")]
pub struct Error {
    /// The kind of error that occurred.
    pub kind: ErrorKind,
    /// Optional context about where the error occurred.
    pub context: Option<ErrorContext>,
}

impl Error {
    /// Creates a new error with the given kind.
    #[must_use]
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            context: None,
        }
    }

    /// Adds context to this error.
    #[must_use]
    pub fn with_context(mut self, context: ErrorContext) -> Self {
        self.context = Some(context);
        self
    }

    /// Creates a truncated input error.
    #[must_use]
    pub fn truncated(needed: u64, available: usize) -> Self {
        Self::new(ErrorKind::TruncatedInput { needed, available })
    }

    /// Creates an unsupported opcode error.
    #[must_use]
    pub fn unsupported_opcode(byte: u8, name: Option<&'static str>) -> Self {
        Self::new(ErrorKind::UnsupportedOpcode { byte, name })
    }

    /// Creates a blocked symbol error for a gate denial.
    #[must_use]
    pub fn blocked_symbol(namespace: impl Into<String>, symbol: impl Into<String>) -> Self {
        Self::new(ErrorKind::BlockedSymbol {
            namespace: namespace.into(),
            symbol: symbol.into(),
        })
    }

    /// Creates an invalid backreference error.
    #[must_use]
    pub fn invalid_backreference(id: u64) -> Self {
        Self::new(ErrorKind::InvalidBackreference(id))
    }

    /// Creates a malformed stream error.
    #[must_use]
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::MalformedStream(message.into()))
    }

    /// Creates an unsupported build error.
    #[must_use]
    pub fn unsupported_build(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::UnsupportedBuild(message.into()))
    }

    /// Creates a resource limit error.
    #[must_use]
    pub fn limit_exceeded(limit: ResourceLimit) -> Self {
        Self::new(ErrorKind::ResourceLimitExceeded(limit))
    }

    /// Creates a shape mismatch error. `expected_bytes` is `None` when the
    /// shape product overflowed.
    #[must_use]
    pub fn shape_mismatch(shape: Vec<usize>, expected_bytes: Option<usize>, actual_bytes: usize) -> Self {
        Self::new(ErrorKind::ShapeMismatch {
            shape,
            expected_bytes,
            actual_bytes,
        })
    }

    /// Creates a cancellation error.
    #[must_use]
    pub fn cancelled() -> Self {
        Self::new(ErrorKind::Cancelled)
    }

    /// Byte offset of the failing opcode, when known.
    #[must_use]
    pub fn offset(&self) -> Option<usize> {
        self.context.as_ref().and_then(|ctx| ctx.offset)
    }
}

/// Categorized error kinds for pattern matching.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ErrorKind {
    /// The stream ended in the middle of an opcode or operand.
    #[error("truncated input: operand needs {needed} bytes, {available} remain")]
    TruncatedInput {
        /// Bytes the operand declared or required.
        needed: u64,
        /// Bytes left in the buffer.
        available: usize,
    },

    /// Opcode outside the implemented subset (a format gap, not a security block).
    #[error("unsupported opcode 0x{byte:02x}{}", describe_opcode(.name))]
    UnsupportedOpcode {
        /// The opcode byte.
        byte: u8,
        /// Protocol name of the opcode when it is known but not executable.
        name: Option<&'static str>,
    },

    /// The allow-list gate denied a name resolution or call.
    #[error("blocked symbol: {namespace}.{symbol}")]
    BlockedSymbol {
        /// Module part of the rejected reference.
        namespace: String,
        /// Attribute part of the rejected reference.
        symbol: String,
    },

    /// A memo get referenced an id that was never stored.
    #[error("invalid backreference: memo id {0} was never stored")]
    InvalidBackreference(u64),

    /// Stream integrity violation (bad stack shape, bad operand text, cycle...).
    #[error("malformed stream: {0}")]
    MalformedStream(String),

    /// BUILD applied to something other than an array or dtype awaiting state.
    #[error("unsupported build: {0}")]
    UnsupportedBuild(String),

    /// A configured ceiling was breached.
    #[error("resource limit exceeded: {0}")]
    ResourceLimitExceeded(ResourceLimit),

    /// Declared array shape does not match the buffer length.
    #[error(
        "shape mismatch: shape {shape:?} needs {} bytes, buffer holds {actual_bytes}",
        describe_bytes(.expected_bytes)
    )]
    ShapeMismatch {
        /// The declared shape.
        shape: Vec<usize>,
        /// Bytes the shape requires (`None` on overflow).
        expected_bytes: Option<usize>,
        /// Bytes actually supplied.
        actual_bytes: usize,
    },

    /// The caller cancelled the parse.
    #[error("parse cancelled")]
    Cancelled,
}

impl ErrorKind {
    /// Stable name used in the transport envelope.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::TruncatedInput { .. } => "TruncatedInput",
            Self::UnsupportedOpcode { .. } => "UnsupportedOpcode",
            Self::BlockedSymbol { .. } => "BlockedSymbol",
            Self::InvalidBackreference(_) => "InvalidBackreference",
            Self::MalformedStream(_) => "MalformedStream",
            Self::UnsupportedBuild(_) => "UnsupportedBuild",
            Self::ResourceLimitExceeded(_) => "ResourceLimitExceeded",
            Self::ShapeMismatch { .. } => "ShapeMismatch",
            Self::Cancelled => "Cancelled",
        }
    }
}

#[allow(clippy::ref_option)]
fn describe_opcode(name: &Option<&'static str>) -> String {
    name.map(|n| format!(" ({n})")).unwrap_or_default()
}

#[allow(clippy::ref_option)]
fn describe_bytes(bytes: &Option<usize>) -> String {
    bytes.map_or_else(|| "more than usize::MAX".to_string(), |b| b.to_string())
}

/// Resource ceilings that can be exceeded during a parse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceLimit {
    /// Input buffer larger than allowed.
    MaxInputBytes {
        /// The configured limit.
        limit: usize,
        /// The actual input size.
        actual: usize,
    },
    /// Too many opcodes dispatched.
    MaxOpcodes {
        /// The configured limit.
        limit: u64,
    },
    /// Operand stack grew too deep.
    MaxStackDepth {
        /// The configured limit.
        limit: usize,
    },
    /// Object graph nested too deeply.
    MaxNestingDepth {
        /// The configured limit.
        limit: usize,
    },
    /// Expanded output tree too large.
    MaxOutputNodes {
        /// The configured limit.
        limit: usize,
    },
    /// Permitted calls allocated too many items.
    MaxAllocatedItems {
        /// The configured limit.
        limit: usize,
    },
}

impl ResourceLimit {
    /// Configuration key of the breached limit.
    #[must_use]
    pub const fn key(&self) -> &'static str {
        match self {
            Self::MaxInputBytes { .. } => "max_input_bytes",
            Self::MaxOpcodes { .. } => "max_opcodes",
            Self::MaxStackDepth { .. } => "max_stack_depth",
            Self::MaxNestingDepth { .. } => "max_nesting_depth",
            Self::MaxOutputNodes { .. } => "max_output_nodes",
            Self::MaxAllocatedItems { .. } => "max_allocated_items",
        }
    }
}

impl fmt::Display for ResourceLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MaxInputBytes { limit, actual } => {
                write!(f, "input of {actual} bytes exceeds max input bytes ({limit})")
            }
            Self::MaxOpcodes { limit } => write!(f, "max opcodes ({limit}) exceeded"),
            Self::MaxStackDepth { limit } => write!(f, "max stack depth ({limit}) exceeded"),
            Self::MaxNestingDepth { limit } => write!(f, "max nesting depth ({limit}) exceeded"),
            Self::MaxOutputNodes { limit } => write!(f, "max output nodes ({limit}) exceeded"),
            Self::MaxAllocatedItems { limit } => write!(f, "max allocated items ({limit}) exceeded"),
        }
    }
}

/// Context about where an error occurred.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorContext {
    /// Byte offset of the opcode being executed.
    pub offset: Option<usize>,
    /// Protocol name of that opcode.
    pub opcode: Option<&'static str>,
}

impl ErrorContext {
    /// Creates a new empty context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the byte offset.
    #[must_use]
    pub fn with_offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Sets the opcode name.
    #[must_use]
    pub fn with_opcode(mut self, opcode: &'static str) -> Self {
        self.opcode = Some(opcode);
        self
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.offset, self.opcode) {
            (Some(offset), Some(op)) => write!(f, "at byte {offset} ({op})"),
            (Some(offset), None) => write!(f, "at byte {offset}"),
            (None, Some(op)) => write!(f, "in {op}"),
            (None, None) => Ok(()),
        }
    }
}

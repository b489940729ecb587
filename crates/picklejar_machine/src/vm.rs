//! Stack-based interpreter for pickle streams.
//!
//! The interpreter executes one opcode at a time against an operand stack, a
//! memo table and a construction arena, and produces the root [`Value`] once
//! the stream stops.
//!
//! # Safety Model
//!
//! The only way a stream can reach outside the machine is by naming a global.
//! Every GLOBAL, STACK_GLOBAL and INST consults the [allow-list](crate::gate)
//! before anything else happens, and every permitted name is implemented
//! natively. Calls never dispatch to foreign code.
//!
//! # Limits
//!
//! Opcodes dispatched, stack depth and input size are checked while the
//! stream runs. Nesting depth and expanded output size are checked when the
//! arena is frozen after STOP, so whatever comes out is bounded.

#![allow(clippy::too_many_lines)]

mod arena;
mod call;

use std::collections::HashMap;

use indexmap::IndexMap;
use picklejar_foundation::{Error, ErrorContext, GlobalRef, ParseConfig, ResourceLimit, Result, Value};
use tracing::{debug, trace, warn};

use arena::{Arena, Callable, FreezeMode, Node, NodeId, Obj};

use crate::cancel::CancelToken;
use crate::gate;
use crate::literal;
use crate::opcode::{HIGHEST_PROTOCOL, Opcode, codes};
use crate::reader::{OpcodeReader, Positioned};

/// An operand stack slot.
#[derive(Clone, Debug)]
enum StackItem {
    Mark,
    Obj(Obj),
}

/// What the dispatch loop does after an opcode.
enum Flow {
    Continue,
    Stop(Obj),
}

/// Pickle stream interpreter.
///
/// A `Vm` can be reused; all per-stream state is cleared at the start of
/// every [`run`](Self::run).
pub struct Vm {
    /// Limits and output shaping.
    config: ParseConfig,
    /// Polled once per dispatched opcode.
    cancel: CancelToken,
    /// Operand stack.
    stack: Vec<StackItem>,
    /// Backreference table.
    memo: HashMap<u64, Obj>,
    /// Containers under construction.
    arena: Arena,
    /// Opcodes dispatched in the current run.
    dispatched: u64,
    /// Items allocated by permitted calls in the current run.
    allocated: usize,
    /// Protocol announced by PROTO (0 if absent).
    protocol: u8,
}

impl Default for Vm {
    fn default() -> Self {
        Self::new(ParseConfig::default())
    }
}

impl Vm {
    /// Creates an interpreter with the given limits.
    #[must_use]
    pub fn new(config: ParseConfig) -> Self {
        Self {
            config,
            cancel: CancelToken::new(),
            stack: Vec::with_capacity(64),
            memo: HashMap::new(),
            arena: Arena::default(),
            dispatched: 0,
            allocated: 0,
            protocol: 0,
        }
    }

    /// Attaches a cancellation token.
    #[must_use]
    pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// The configuration this interpreter enforces.
    #[must_use]
    pub fn config(&self) -> &ParseConfig {
        &self.config
    }

    /// Opcodes dispatched by the most recent run.
    #[must_use]
    pub fn dispatched(&self) -> u64 {
        self.dispatched
    }

    /// Container items, array elements and bytes allocated by permitted
    /// calls during the most recent run.
    #[must_use]
    pub fn allocated(&self) -> usize {
        self.allocated
    }

    /// Protocol announced by the most recent stream (0 when it had no header).
    #[must_use]
    pub fn protocol(&self) -> u8 {
        self.protocol
    }

    /// Clears all per-stream state.
    pub fn reset(&mut self) {
        self.stack.clear();
        self.memo.clear();
        self.arena.clear();
        self.dispatched = 0;
        self.allocated = 0;
        self.protocol = 0;
    }

    /// Interprets a complete stream and returns its root value.
    ///
    /// # Errors
    /// Any [`ErrorKind`](picklejar_foundation::ErrorKind); errors raised while
    /// executing an opcode carry its byte offset.
    pub fn run(&mut self, data: &[u8]) -> Result<Value> {
        self.reset();
        if data.len() > self.config.max_input_bytes {
            return Err(Error::limit_exceeded(ResourceLimit::MaxInputBytes {
                limit: self.config.max_input_bytes,
                actual: data.len(),
            }));
        }
        debug!(bytes = data.len(), "interpreting pickle stream");

        let mut reader = OpcodeReader::new(data);
        let (root, stop_offset) = loop {
            let Positioned { offset, op } = reader.next_op()?;
            match self.dispatch(offset, op) {
                Ok(Flow::Continue) => {}
                Ok(Flow::Stop(root)) => break (root, offset),
                Err(e) => return Err(locate(e, offset, op.name())),
            }
        };

        let value = self
            .arena
            .freeze(&root, FreezeMode::Final, &self.config)
            .map_err(|e| locate(e, stop_offset, "STOP"))?;
        debug!(
            protocol = self.protocol,
            opcodes = self.dispatched,
            nodes = self.arena.len(),
            trailing = reader.remaining(),
            "pickle stream interpreted"
        );
        Ok(value)
    }

    fn dispatch(&mut self, offset: usize, op: Opcode<'_>) -> Result<Flow> {
        if self.cancel.is_cancelled() {
            return Err(Error::cancelled());
        }
        self.dispatched += 1;
        if self.dispatched > self.config.max_opcodes {
            return Err(Error::limit_exceeded(ResourceLimit::MaxOpcodes {
                limit: self.config.max_opcodes,
            }));
        }
        trace!(offset, op = op.name(), depth = self.stack.len(), "dispatch");

        match op {
            // === Stack Structure ===
            Opcode::Mark => self.push_item(StackItem::Mark)?,
            Opcode::Stop => {
                let root = self.pop()?;
                if !self.stack.is_empty() {
                    return Err(Error::malformed(format!(
                        "{} items left on the stack at STOP",
                        self.stack.len()
                    )));
                }
                return Ok(Flow::Stop(root));
            }
            Opcode::Pop => {
                self.stack.pop().ok_or_else(underflow)?;
            }
            Opcode::PopMark => {
                self.pop_mark()?;
            }
            Opcode::Dup => {
                let top = self.peek()?.clone();
                self.push(top)?;
            }

            // === Scalars ===
            Opcode::None => self.push_value(Value::None)?,
            Opcode::NewTrue => self.push_value(Value::Bool(true))?,
            Opcode::NewFalse => self.push_value(Value::Bool(false))?,
            Opcode::Int(line) => self.push_value(literal::parse_int(line)?)?,
            Opcode::Long(line) => self.push_value(literal::parse_long(line)?)?,
            Opcode::Float(line) => self.push_value(literal::parse_float(line)?)?,
            Opcode::BinInt(n) => self.push_value(Value::Int(i64::from(n)))?,
            Opcode::BinInt1(n) => self.push_value(Value::Int(i64::from(n)))?,
            Opcode::BinInt2(n) => self.push_value(Value::Int(i64::from(n)))?,
            Opcode::BinFloat(f) => self.push_value(Value::Float(f))?,
            Opcode::Long1(bytes) | Opcode::Long4(bytes) => self.push_value(literal::decode_long_bytes(bytes))?,

            // === Strings and Bytes ===
            Opcode::String(line) => self.push_value(literal::parse_quoted_string(line)?)?,
            Opcode::BinString(bytes) | Opcode::ShortBinString(bytes) => {
                self.push_value(literal::str_or_bytes(bytes))?;
            }
            Opcode::Unicode(line) => self.push_value(literal::parse_raw_unicode(line)?)?,
            Opcode::BinUnicode(bytes) | Opcode::ShortBinUnicode(bytes) | Opcode::BinUnicode8(bytes) => {
                self.push_value(literal::utf8_text(bytes)?)?;
            }
            Opcode::BinBytes(bytes) | Opcode::ShortBinBytes(bytes) | Opcode::BinBytes8(bytes) | Opcode::ByteArray8(bytes) => {
                self.push_value(Value::from(bytes))?;
            }

            // === Containers ===
            Opcode::EmptyList => self.push_node(Node::List(Vec::new()))?,
            Opcode::EmptyTuple => self.push_node(Node::Tuple(Vec::new()))?,
            Opcode::EmptyDict => self.push_node(Node::Dict(IndexMap::new()))?,
            Opcode::EmptySet => self.push_node(Node::Set {
                members: IndexMap::new(),
                frozen: false,
            })?,
            Opcode::List => {
                let items = self.pop_mark()?;
                self.push_node(Node::List(items))?;
            }
            Opcode::Tuple => {
                let items = self.pop_mark()?;
                self.push_node(Node::Tuple(items))?;
            }
            Opcode::Tuple1 | Opcode::Tuple2 | Opcode::Tuple3 => {
                let n = usize::from(op.code() - codes::TUPLE1) + 1;
                let items = self.pop_n(n)?;
                self.push_node(Node::Tuple(items))?;
            }
            Opcode::Dict => {
                let items = self.pop_mark()?;
                let pairs = pairs(items)?;
                let id = self.arena.alloc(Node::Dict(IndexMap::new()));
                self.insert_pairs(id, pairs)?;
                self.push(Obj::Node(id))?;
            }
            Opcode::FrozenSet => {
                let items = self.pop_mark()?;
                let id = self.arena.alloc(Node::Set {
                    members: IndexMap::new(),
                    frozen: false,
                });
                self.add_members(id, items)?;
                if let Node::Set { frozen, .. } = self.arena.get_mut(id) {
                    *frozen = true;
                }
                self.push(Obj::Node(id))?;
            }
            Opcode::Append => {
                let item = self.pop()?;
                let list = self.top_node("APPEND")?;
                self.extend_list(list, vec![item])?;
            }
            Opcode::Appends => {
                let items = self.pop_mark()?;
                let list = self.top_node("APPENDS")?;
                self.extend_list(list, items)?;
            }
            Opcode::SetItem => {
                let value = self.pop()?;
                let key = self.pop()?;
                let dict = self.top_node("SETITEM")?;
                self.insert_pairs(dict, vec![(key, value)])?;
            }
            Opcode::SetItems => {
                let items = self.pop_mark()?;
                let pairs = pairs(items)?;
                let dict = self.top_node("SETITEMS")?;
                self.insert_pairs(dict, pairs)?;
            }
            Opcode::AddItems => {
                let items = self.pop_mark()?;
                let set = self.top_node("ADDITEMS")?;
                self.add_members(set, items)?;
            }

            // === Memo ===
            Opcode::Get(id) => self.memo_get(id)?,
            Opcode::BinGet(id) => self.memo_get(u64::from(id))?,
            Opcode::LongBinGet(id) => self.memo_get(u64::from(id))?,
            Opcode::Put(id) => self.memo_put(id)?,
            Opcode::BinPut(id) => self.memo_put(u64::from(id))?,
            Opcode::LongBinPut(id) => self.memo_put(u64::from(id))?,
            Opcode::Memoize => self.memo_put(self.memo.len() as u64)?,

            // === Names and Construction ===
            Opcode::Global { module, name } => {
                let callable = resolve_lines(module, name)?;
                self.push(Obj::Global(callable))?;
            }
            Opcode::StackGlobal => {
                let name = self.pop()?;
                let module = self.pop()?;
                let (Obj::Scalar(Value::Str(module)), Obj::Scalar(Value::Str(name))) = (&module, &name) else {
                    return Err(Error::malformed("STACK_GLOBAL operands must be strings"));
                };
                let callable = resolve(module, name)?;
                self.push(Obj::Global(callable))?;
            }
            Opcode::Inst { module, name } => {
                let callable = resolve_lines(module, name)?;
                let args = self.pop_mark()?;
                let result = self.call(&callable, args)?;
                self.push(result)?;
            }
            Opcode::Obj => {
                let mut items = self.pop_mark()?.into_iter();
                let callable = match items.next() {
                    Some(Obj::Global(callable)) => callable,
                    _ => return Err(Error::malformed("OBJ needs a class after the mark")),
                };
                let result = self.call(&callable, items.collect())?;
                self.push(result)?;
            }
            Opcode::Reduce | Opcode::NewObj => {
                let args = self.pop()?;
                let target = self.pop()?;
                let callable = as_callable(target, op.name())?;
                let args = self.tuple_items(&args, "argument list")?;
                let result = self.call(&callable, args)?;
                self.push(result)?;
            }
            Opcode::NewObjEx => {
                let kwargs = self.pop()?;
                let args = self.pop()?;
                let target = self.pop()?;
                let callable = as_callable(target, "NEWOBJ_EX")?;
                let no_kwargs = matches!(&kwargs, Obj::Node(id) if matches!(self.arena.get(*id), Node::Dict(map) if map.is_empty()));
                if !no_kwargs {
                    return Err(Error::malformed(format!(
                        "{} does not accept keyword arguments",
                        callable.reference
                    )));
                }
                let args = self.tuple_items(&args, "argument list")?;
                let result = self.call(&callable, args)?;
                self.push(result)?;
            }
            Opcode::Build => {
                let state = self.pop()?;
                let target = self.peek()?.clone();
                self.build(&target, &state)?;
            }

            // === External References ===
            Opcode::PersId(_)
            | Opcode::BinPersId
            | Opcode::Ext1(_)
            | Opcode::Ext2(_)
            | Opcode::Ext4(_)
            | Opcode::NextBuffer => {
                return Err(Error::unsupported_opcode(op.code(), Some(op.name())));
            }
            Opcode::ReadonlyBuffer => {}

            // === Framing ===
            Opcode::Proto(version) => {
                if version > HIGHEST_PROTOCOL {
                    debug!(version, "stream announces an unknown protocol");
                    return Err(Error::unsupported_opcode(codes::PROTO, Some("PROTO")));
                }
                self.protocol = version;
            }
            Opcode::Frame(_) => {}
        }
        Ok(Flow::Continue)
    }

    // =========================================================================
    // Stack Helpers
    // =========================================================================

    fn push_item(&mut self, item: StackItem) -> Result<()> {
        if self.stack.len() >= self.config.max_stack_depth {
            return Err(Error::limit_exceeded(ResourceLimit::MaxStackDepth {
                limit: self.config.max_stack_depth,
            }));
        }
        self.stack.push(item);
        Ok(())
    }

    fn push(&mut self, obj: Obj) -> Result<()> {
        self.push_item(StackItem::Obj(obj))
    }

    fn push_value(&mut self, value: Value) -> Result<()> {
        self.push(Obj::Scalar(value))
    }

    fn push_node(&mut self, node: Node) -> Result<()> {
        let id = self.arena.alloc(node);
        self.push(Obj::Node(id))
    }

    fn pop(&mut self) -> Result<Obj> {
        match self.stack.pop() {
            Some(StackItem::Obj(obj)) => Ok(obj),
            Some(StackItem::Mark) => Err(Error::malformed("unexpected mark on the stack")),
            None => Err(underflow()),
        }
    }

    fn peek(&self) -> Result<&Obj> {
        match self.stack.last() {
            Some(StackItem::Obj(obj)) => Ok(obj),
            Some(StackItem::Mark) => Err(Error::malformed("unexpected mark on the stack")),
            None => Err(underflow()),
        }
    }

    /// Pops `n` objects, returned in stack order.
    fn pop_n(&mut self, n: usize) -> Result<Vec<Obj>> {
        if self.stack.len() < n {
            return Err(underflow());
        }
        self.stack
            .split_off(self.stack.len() - n)
            .into_iter()
            .map(|item| match item {
                StackItem::Obj(obj) => Ok(obj),
                StackItem::Mark => Err(Error::malformed("unexpected mark on the stack")),
            })
            .collect()
    }

    /// Pops everything above the nearest mark, and the mark itself.
    fn pop_mark(&mut self) -> Result<Vec<Obj>> {
        let mark = self
            .stack
            .iter()
            .rposition(|item| matches!(item, StackItem::Mark))
            .ok_or_else(|| Error::malformed("no mark on the stack"))?;
        let items = self
            .stack
            .split_off(mark + 1)
            .into_iter()
            .filter_map(|item| match item {
                StackItem::Obj(obj) => Some(obj),
                StackItem::Mark => None,
            })
            .collect();
        self.stack.truncate(mark);
        Ok(items)
    }

    /// The node on top of the stack, which the opcode mutates in place.
    fn top_node(&self, opcode: &str) -> Result<NodeId> {
        match self.peek()? {
            Obj::Node(id) => Ok(*id),
            other => Err(Error::malformed(format!(
                "{opcode} target must be a container, got '{}'",
                match other {
                    Obj::Scalar(value) => value.type_name(),
                    _ => "global",
                }
            ))),
        }
    }

    fn extend_list(&mut self, list: NodeId, items: Vec<Obj>) -> Result<()> {
        match self.arena.get_mut(list) {
            Node::List(existing) => {
                existing.extend(items);
                Ok(())
            }
            other => Err(Error::malformed(format!("cannot append to '{}'", other.type_name()))),
        }
    }

    // =========================================================================
    // Memo Helpers
    // =========================================================================

    fn memo_get(&mut self, id: u64) -> Result<()> {
        let obj = self.memo.get(&id).cloned().ok_or_else(|| Error::invalid_backreference(id))?;
        self.push(obj)
    }

    fn memo_put(&mut self, id: u64) -> Result<()> {
        let top = self.peek()?.clone();
        self.memo.insert(id, top);
        Ok(())
    }
}

/// Interprets a stream with a fresh interpreter.
///
/// # Errors
/// See [`Vm::run`].
pub fn interpret(data: &[u8], config: &ParseConfig) -> Result<Value> {
    Vm::new(config.clone()).run(data)
}

fn underflow() -> Error {
    Error::malformed("stack underflow")
}

/// Attaches the failing opcode's position unless the error already has one.
fn locate(error: Error, offset: usize, opcode: &'static str) -> Error {
    if error.context.is_some() {
        error
    } else {
        error.with_context(ErrorContext::new().with_offset(offset).with_opcode(opcode))
    }
}

/// Splits alternating key/value items into pairs.
fn pairs(items: Vec<Obj>) -> Result<Vec<(Obj, Obj)>> {
    if items.len() % 2 != 0 {
        return Err(Error::malformed("odd number of items for a mapping"));
    }
    let mut pairs = Vec::with_capacity(items.len() / 2);
    let mut iter = items.into_iter();
    while let (Some(key), Some(value)) = (iter.next(), iter.next()) {
        pairs.push((key, value));
    }
    Ok(pairs)
}

fn as_callable(obj: Obj, opcode: &str) -> Result<Callable> {
    match obj {
        Obj::Global(callable) => Ok(callable),
        _ => Err(Error::malformed(format!("{opcode} target is not a callable global"))),
    }
}

/// Resolves a name through the allow-list gate.
fn resolve(namespace: &str, symbol: &str) -> Result<Callable> {
    match gate::permitted_call_shape(namespace, symbol) {
        Some(shape) => Ok(Callable {
            reference: GlobalRef::new(namespace, symbol),
            shape,
        }),
        None => {
            warn!(namespace, symbol, "blocked global reference");
            Err(Error::blocked_symbol(namespace, symbol))
        }
    }
}

fn resolve_lines(module: &[u8], name: &[u8]) -> Result<Callable> {
    match (std::str::from_utf8(module), std::str::from_utf8(name)) {
        (Ok(module), Ok(name)) => resolve(module, name),
        _ => {
            let (module, name) = (String::from_utf8_lossy(module), String::from_utf8_lossy(name));
            warn!(namespace = %module, symbol = %name, "blocked global reference");
            Err(Error::blocked_symbol(module, name))
        }
    }
}

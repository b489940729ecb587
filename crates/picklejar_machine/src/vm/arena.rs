//! Construction arena and the freeze walk.
//!
//! Containers live here, addressed by [`NodeId`], while the stream runs. The
//! stack and memo hold ids, so filling a container after it was memoized is
//! visible through every reference. Freezing turns a node into an immutable
//! [`Value`] with an explicit work stack.

use std::collections::HashSet;
use std::sync::Arc;

use indexmap::IndexMap;
use picklejar_foundation::{Dtype, Error, GlobalRef, NumericArray, ParseConfig, ResourceLimit, Result, Value};

use crate::gate::CallShape;

/// Index of a node in the arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub(crate) struct NodeId(usize);

/// A resolved, permitted global.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct Callable {
    pub reference: GlobalRef,
    pub shape: CallShape,
}

/// An object on the stack or in the memo.
#[derive(Clone, Debug, PartialEq)]
pub(crate) enum Obj {
    /// Immutable leaf.
    Scalar(Value),
    /// Arena-resident container.
    Node(NodeId),
    /// Permitted global, callable through REDUCE and friends.
    Global(Callable),
}

impl From<Value> for Obj {
    fn from(value: Value) -> Self {
        Self::Scalar(value)
    }
}

/// A container under construction.
#[derive(Debug)]
pub(crate) enum Node {
    List(Vec<Obj>),
    Tuple(Vec<Obj>),
    /// Hashed key to (original key object, value).
    Dict(IndexMap<Value, (Obj, Obj)>),
    /// Hashed member to original member object.
    Set { members: IndexMap<Value, Obj>, frozen: bool },
    /// Allocated by the array reconstructor, waiting for BUILD.
    PendingArray,
    Array(Arc<NumericArray>),
    Dtype { dtype: Dtype, built: bool },
}

impl Node {
    pub(crate) fn type_name(&self) -> &'static str {
        match self {
            Self::List(_) => "list",
            Self::Tuple(_) => "tuple",
            Self::Dict(_) => "dict",
            Self::Set { frozen: false, .. } => "set",
            Self::Set { frozen: true, .. } => "frozenset",
            Self::PendingArray | Self::Array(_) => "ndarray",
            Self::Dtype { .. } => "dtype",
        }
    }

    /// Immutable nodes may be dict keys and set members.
    fn is_hashable(&self) -> bool {
        matches!(
            self,
            Self::Tuple(_) | Self::Set { frozen: true, .. } | Self::Dtype { built: true, .. }
        )
    }

    fn children(&self) -> Vec<NodeId> {
        match self {
            Self::List(items) | Self::Tuple(items) => node_ids(items.iter()),
            Self::Dict(map) => node_ids(map.values().flat_map(|(k, v)| [k, v])),
            Self::Set { members, .. } => node_ids(members.values()),
            Self::PendingArray | Self::Array(_) | Self::Dtype { .. } => Vec::new(),
        }
    }
}

fn node_ids<'a>(objs: impl Iterator<Item = &'a Obj>) -> Vec<NodeId> {
    objs.filter_map(|o| match o {
        Obj::Node(id) => Some(*id),
        _ => None,
    })
    .collect()
}

/// How a freeze treats mutable containers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum FreezeMode {
    /// After STOP: every node may be frozen.
    Final,
    /// Dict key or set member: only immutable nodes are accepted.
    Hashable,
}

/// Cached result of freezing a node.
#[derive(Clone, Debug)]
struct Frozen {
    value: Value,
    /// Node count of the expanded output tree.
    weight: usize,
    /// Container nesting depth below and including this node.
    height: usize,
}

enum Task {
    Enter(NodeId, usize),
    Exit(NodeId),
}

/// Node store for one parse.
#[derive(Debug, Default)]
pub(crate) struct Arena {
    nodes: Vec<Node>,
    frozen: Vec<Option<Frozen>>,
}

impl Arena {
    pub(crate) fn alloc(&mut self, node: Node) -> NodeId {
        self.nodes.push(node);
        self.frozen.push(None);
        NodeId(self.nodes.len() - 1)
    }

    pub(crate) fn get(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub(crate) fn get_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0]
    }

    pub(crate) fn len(&self) -> usize {
        self.nodes.len()
    }

    pub(crate) fn clear(&mut self) {
        self.nodes.clear();
        self.frozen.clear();
    }

    /// Freezes an object into a value, enforcing nesting and output limits.
    ///
    /// Results for immutable nodes are cached across calls, so hashing the
    /// same tuple key repeatedly costs one walk.
    pub(crate) fn freeze(&mut self, obj: &Obj, mode: FreezeMode, config: &ParseConfig) -> Result<Value> {
        match obj {
            Obj::Scalar(value) => Ok(value.clone()),
            Obj::Global(callable) => Ok(Value::Global(callable.reference.clone())),
            Obj::Node(root) => {
                self.freeze_node(*root, mode, config)?;
                Ok(self.frozen_entry(*root)?.value.clone())
            }
        }
    }

    fn freeze_node(&mut self, root: NodeId, mode: FreezeMode, config: &ParseConfig) -> Result<()> {
        let max_depth = config.max_nesting_depth;
        let mut on_path: HashSet<NodeId> = HashSet::new();
        let mut tasks = vec![Task::Enter(root, 1)];

        while let Some(task) = tasks.pop() {
            match task {
                Task::Enter(id, depth) => {
                    if let Some(done) = &self.frozen[id.0] {
                        if depth + done.height - 1 > max_depth {
                            return Err(Error::limit_exceeded(ResourceLimit::MaxNestingDepth { limit: max_depth }));
                        }
                        continue;
                    }
                    if on_path.contains(&id) {
                        return Err(Error::malformed("cycle"));
                    }
                    if depth > max_depth {
                        return Err(Error::limit_exceeded(ResourceLimit::MaxNestingDepth { limit: max_depth }));
                    }
                    let node = self.get(id);
                    if mode == FreezeMode::Hashable && !node.is_hashable() {
                        return Err(Error::malformed(format!("unhashable type: '{}'", node.type_name())));
                    }
                    on_path.insert(id);
                    tasks.push(Task::Exit(id));
                    for child in node.children().into_iter().rev() {
                        tasks.push(Task::Enter(child, depth + 1));
                    }
                }
                Task::Exit(id) => {
                    on_path.remove(&id);
                    let frozen = self.assemble(id, config)?;
                    if frozen.weight > config.max_output_nodes {
                        return Err(Error::limit_exceeded(ResourceLimit::MaxOutputNodes {
                            limit: config.max_output_nodes,
                        }));
                    }
                    self.frozen[id.0] = Some(frozen);
                }
            }
        }
        Ok(())
    }

    fn frozen_entry(&self, id: NodeId) -> Result<&Frozen> {
        self.frozen[id.0]
            .as_ref()
            .ok_or_else(|| Error::malformed("reference to an unfinished container"))
    }

    /// Value, weight and height of a child whose nodes are already frozen.
    fn child(&self, obj: &Obj) -> Result<(Value, usize, usize)> {
        match obj {
            Obj::Scalar(value) => Ok((value.clone(), 1, 0)),
            Obj::Global(callable) => Ok((Value::Global(callable.reference.clone()), 1, 0)),
            Obj::Node(id) => {
                let f = self.frozen_entry(*id)?;
                Ok((f.value.clone(), f.weight, f.height))
            }
        }
    }

    /// Builds the frozen form of a node from its frozen children.
    fn assemble(&self, id: NodeId, config: &ParseConfig) -> Result<Frozen> {
        let mut weight = 1usize;
        let mut height = 0usize;
        let mut take = |(value, w, h): (Value, usize, usize)| {
            weight = weight.saturating_add(w);
            height = height.max(h);
            value
        };

        let value = match self.get(id) {
            Node::List(items) => Value::List(items.iter().map(|o| self.child(o).map(&mut take)).collect::<Result<_>>()?),
            Node::Tuple(items) => {
                Value::Tuple(items.iter().map(|o| self.child(o).map(&mut take)).collect::<Result<_>>()?)
            }
            Node::Dict(map) => {
                let mut entries = Vec::with_capacity(map.len());
                for (key, (key_obj, value_obj)) in map {
                    take(self.child(key_obj)?);
                    entries.push((key.clone(), take(self.child(value_obj)?)));
                }
                Value::Dict(entries.into_iter().collect())
            }
            Node::Set { members, .. } => {
                for member in members.values() {
                    take(self.child(member)?);
                }
                Value::Set(members.keys().cloned().collect())
            }
            Node::PendingArray => {
                return Err(Error::malformed("array was allocated but never received its state"));
            }
            Node::Array(array) => {
                return Ok(Frozen {
                    value: Value::Array(Arc::clone(array)),
                    weight: config.array_weight(array.shape()),
                    height: array.shape().len().max(1),
                });
            }
            Node::Dtype { dtype, .. } => {
                return Ok(Frozen {
                    value: Value::Dtype(*dtype),
                    weight: 1,
                    height: 0,
                });
            }
        };
        Ok(Frozen {
            value,
            weight,
            height: height + 1,
        })
    }
}

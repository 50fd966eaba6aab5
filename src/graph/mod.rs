//! Render graph: named nodes, dependency-ordered construction and
//! execution.
//!
//! ```text
//!     add_node("camera")        add_node("forward")
//!            |                          |
//!            v                          v
//!   +---------------------------------------------+
//!   | RenderGraph       declaration order: [c, f] |
//!   +---------------------------------------------+
//!            | construct(registry, slot)
//!            v
//!   camera: publish "camera:buffer"
//!   forward: get_buffer("camera", "buffer")  --> edge (forward, camera)
//!            |
//!            v
//!   resolved order: [camera, forward]   (Kahn, ties by declaration order)
//!            |
//!            v
//!   execute(ctx, slot, &mut CommandList) in resolved order
//! ```
//!
//! Dependency edges are discovered during construction, so the edges
//! recorded while constructing generation *n* order the execution of that
//! generation and the construction of generation *n + 1*. The first pass
//! has no prior edges and runs in declaration order. A dependency cycle is
//! a hard error at construct time, never a silent arbitrary order.

mod node;

pub use node::{ExecuteFn, RenderNode};

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap, HashSet};

use crate::command::CommandList;
use crate::error::RenderError;
use crate::pipeline::FrameContext;
use crate::registry::Registry;

struct NodeEntry {
    node: Box<dyn RenderNode>,
    /// Most recent execute closure per frame slot.
    execute: Vec<Option<ExecuteFn>>,
}

/// Ordered collection of [`RenderNode`]s with per-slot construction output.
pub struct RenderGraph {
    /// Entries in declaration order; declaration order is the tie-break
    /// for topological sorting and the full order for the first pass.
    nodes: Vec<NodeEntry>,
    /// Resolved execution order as indices into `nodes`.
    order: Vec<usize>,
    slot_count: usize,
}

impl RenderGraph {
    /// Create an empty graph for `slot_count` frames in flight.
    pub fn new(slot_count: usize) -> Self {
        assert!(slot_count > 0, "render graph requires at least one frame slot");
        Self {
            nodes: Vec::new(),
            order: Vec::new(),
            slot_count,
        }
    }

    /// Register a node. The node set is fixed after application setup.
    ///
    /// # Panics
    ///
    /// Panics if a node with the same name is already registered.
    pub fn add_node(&mut self, node: impl RenderNode + 'static) {
        let name = node.name();
        assert!(
            !self.nodes.iter().any(|e| e.node.name() == name),
            "duplicate render graph node '{name}'"
        );
        log::info!("render graph: added node '{name}'");
        self.order.push(self.nodes.len());
        self.nodes.push(NodeEntry {
            node: Box::new(node),
            execute: (0..self.slot_count).map(|_| None).collect(),
        });
    }

    /// Number of registered nodes.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of frame slots each node holds construction output for.
    pub fn slot_count(&self) -> usize {
        self.slot_count
    }

    /// True if any node's predicate requests a fresh construction pass.
    pub fn needs_reconstruction(&self, ctx: &FrameContext) -> bool {
        self.nodes.iter().any(|e| e.node.needs_construction(ctx))
    }

    /// Run every node's construct phase against the fresh registry
    /// generation and store the produced closures for `slot`.
    ///
    /// Commit is atomic: if any node fails, no closure is installed and
    /// every slot keeps its previous construction output. On success, the
    /// dependency edges recorded in `registry` replace the resolved order.
    pub fn construct(
        &mut self,
        registry: &mut Registry,
        slot: usize,
    ) -> Result<(), RenderError> {
        assert!(slot < self.slot_count, "frame slot {slot} out of range");

        let mut built: Vec<(usize, ExecuteFn)> = Vec::with_capacity(self.nodes.len());
        let order = self.order.clone();
        for index in order {
            let entry = &mut self.nodes[index];
            let name = entry.node.name().to_string();
            log::trace!("constructing node '{name}' for slot {slot}");

            registry.begin_node(&name);
            entry.node.construct_node(registry);
            let result = entry.node.construct_frame(registry);
            registry.finish_node();

            match result {
                Ok(execute) => built.push((index, execute)),
                Err(e) => {
                    log::error!("construction of node '{name}' failed: {e}");
                    return Err(e);
                }
            }
        }

        let order = self.resolve_order(registry.dependencies())?;
        for (index, execute) in built {
            self.nodes[index].execute[slot] = Some(execute);
        }
        self.order = order;
        Ok(())
    }

    /// Invoke each node's closure for `slot` in resolved order.
    ///
    /// # Panics
    ///
    /// Panics if any node was never constructed for this slot.
    pub fn execute(&mut self, ctx: &FrameContext, slot: usize, list: &mut CommandList) {
        assert!(slot < self.slot_count, "frame slot {slot} out of range");
        for &index in &self.order {
            let entry = &mut self.nodes[index];
            let name = entry.node.name();
            match entry.execute[slot].as_mut() {
                Some(execute) => execute(ctx, list),
                None => {
                    panic!("execute of node '{name}' before construction for frame slot {slot}")
                }
            }
        }
    }

    /// The resolved execution order by node name.
    pub fn execution_order(&self) -> Vec<&str> {
        self.order
            .iter()
            .map(|&i| self.nodes[i].node.name())
            .collect()
    }

    /// Kahn topological sort over `(consumer, producer)` edges, producers
    /// first, ties broken by declaration order. Edges naming scopes that
    /// are not graph nodes (static publications) impose no ordering.
    fn resolve_order(
        &self,
        edges: &HashSet<(String, String)>,
    ) -> Result<Vec<usize>, RenderError> {
        let index_of: HashMap<&str, usize> = self
            .nodes
            .iter()
            .enumerate()
            .map(|(i, e)| (e.node.name(), i))
            .collect();

        let count = self.nodes.len();
        let mut indegree = vec![0usize; count];
        let mut successors: Vec<Vec<usize>> = vec![Vec::new(); count];
        for (consumer, producer) in edges {
            if let (Some(&c), Some(&p)) = (
                index_of.get(consumer.as_str()),
                index_of.get(producer.as_str()),
            ) {
                successors[p].push(c);
                indegree[c] += 1;
            }
        }

        let mut ready: BinaryHeap<Reverse<usize>> = (0..count)
            .filter(|&i| indegree[i] == 0)
            .map(Reverse)
            .collect();
        let mut order = Vec::with_capacity(count);
        while let Some(Reverse(next)) = ready.pop() {
            order.push(next);
            for &succ in &successors[next] {
                indegree[succ] -= 1;
                if indegree[succ] == 0 {
                    ready.push(Reverse(succ));
                }
            }
        }

        if order.len() != count {
            let mut nodes: Vec<String> = (0..count)
                .filter(|&i| indegree[i] > 0)
                .map(|i| self.nodes[i].node.name().to_string())
                .collect();
            nodes.sort();
            return Err(RenderError::CyclicDependency { nodes });
        }
        Ok(order)
    }
}

impl std::fmt::Debug for RenderGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderGraph")
            .field("nodes", &self.execution_order())
            .field("slot_count", &self.slot_count)
            .finish()
    }
}

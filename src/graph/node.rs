use crate::command::CommandList;
use crate::error::RenderError;
use crate::pipeline::FrameContext;
use crate::registry::Registry;

/// Per-frame command recording closure produced by a node's construct phase.
///
/// Execute closures must only use handles captured during the construct
/// pass that produced them; the pipeline guarantees a closure is never
/// invoked after its registry generation has been replaced.
pub type ExecuteFn = Box<dyn FnMut(&FrameContext, &mut CommandList)>;

/// A named unit of per-frame GPU work.
///
/// A node lives through two phases. The **construct** phase runs against a
/// fresh [`Registry`] whenever reconstruction is required (first frame,
/// window resize, or a node-specific trigger): the node allocates and
/// describes its resources, publishes what other nodes may consume, looks
/// up what it consumes, and returns the closure for the **execute** phase.
/// Execute runs every frame and only appends commands; it never creates
/// resources.
///
/// # Example
///
/// ```ignore
/// struct ClearNode {
///     target: Option<Handle<RenderTarget>>,
/// }
///
/// impl RenderNode for ClearNode {
///     fn name(&self) -> &str {
///         "clear"
///     }
///
///     fn construct_frame(&mut self, registry: &mut Registry) -> Result<ExecuteFn, RenderError> {
///         let target = registry.create_render_target(RenderTargetDescriptor::window())?;
///         registry.publish("target", target);
///         Ok(Box::new(move |_ctx, _list| {
///             // record clear commands against `target`
///         }))
///     }
/// }
/// ```
pub trait RenderNode {
    /// Unique node name, used for qualified publishes and diagnostics.
    fn name(&self) -> &str;

    /// Node-level construct step, run before [`construct_frame`] on every
    /// construction pass. Most nodes do all their work in
    /// [`construct_frame`]; override this for setup that is independent of
    /// frame content.
    ///
    /// [`construct_frame`]: RenderNode::construct_frame
    fn construct_node(&mut self, _registry: &mut Registry) {}

    /// Allocate and describe this node's resources against the fresh
    /// registry generation, returning the execute closure for the frame
    /// slot being constructed.
    fn construct_frame(&mut self, registry: &mut Registry) -> Result<ExecuteFn, RenderError>;

    /// Whether this node requires a fresh construction pass.
    ///
    /// Default policy: reconstruct on the very first frame and whenever
    /// the window size changed. A single `true` from any node triggers
    /// reconstruction of the whole graph.
    fn needs_construction(&self, ctx: &FrameContext) -> bool {
        ctx.frame_index == 0 || ctx.window_size_changed
    }
}

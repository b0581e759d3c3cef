//! Centralized limits for IR accepted by the generator.
//!
//! Every pass and the emitter recurse over the IR tree, so the structural check rejects trees
//! nested deeper than these bounds before any rewriting starts.

/// Maximum nesting depth of statements and expressions combined.
///
/// Real shaders rarely exceed a few dozen levels; generated code (unrolled loops, deeply chained
/// arithmetic from node graphs) stays well below this.
pub(crate) const MAX_IR_NESTING_DEPTH: usize = 512;

/// Maximum number of components a swizzle mask may select.
pub(crate) const MAX_SWIZZLE_COMPONENTS: usize = 4;

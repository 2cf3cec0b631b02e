//! Centralized limits and thresholds for the type-constant engine.
//!
//! Recursion limits for the engine's guards are expressed as
//! `RecursionProfile`s in `xtc_types::recursion`; the values they use come
//! from here so that tuning happens in one place.

// =============================================================================
// TypeInfo construction
// =============================================================================

/// Maximum number of deferred-completion rounds for one external
/// `ensure_type_info` request.
///
/// A build that touched types whose own builds deferred back onto it gets
/// those dependents rebuilt once it is available. Legitimate mutual
/// recursion settles within two rounds; anything deeper is an algorithmic
/// defect and is treated as fatal.
pub const MAX_TYPE_INFO_RETRY_DEPTH: u32 = 2;

/// Maximum nesting of TypeInfo builds on one thread.
///
/// Each contribution (extends, incorporates, annotation, ...) nests one build.
/// Real class hierarchies stay far below this.
pub const MAX_TYPE_INFO_BUILD_DEPTH: u32 = 256;

// =============================================================================
// Relation and usage computation
// =============================================================================

/// Maximum nesting of `is_a` computations on one thread.
///
/// Relations recurse through type parameters, contribution edges and
/// duck-typed member signatures.
pub const MAX_RELATION_DEPTH: u32 = 200;

/// Total relation steps allowed under one guard before giving up.
pub const MAX_RELATION_ITERATIONS: u32 = 200_000;

/// Maximum nesting of formal-type usage computations.
pub const MAX_USAGE_DEPTH: u32 = 100;

// =============================================================================
// Type graph transformations
// =============================================================================

/// Maximum typedef indirections followed before a typedef is reported as
/// cyclical.
pub const MAX_TYPEDEF_DEPTH: u32 = 64;

/// Maximum depth of generic substitution and auto-narrowing rewrites.
pub const MAX_GENERIC_RESOLUTION_DEPTH: u32 = 100;

/// Maximum number of steps when walking contribution edges structurally
/// (cycle detection for extends and other compositions).
pub const MAX_CONTRIBUTION_WALK: u32 = 10_000;

/// Maximum number of cap redirections followed when resolving a call chain.
pub const MAX_CAP_REDIRECTS: u32 = 32;

// =============================================================================
// Stack growth
// =============================================================================

/// Remaining stack below which deep recursive entry points grow the stack.
pub const STACK_RED_ZONE: usize = 128 * 1024;

/// Size of each stack segment allocated when growing.
pub const STACK_GROWTH_SIZE: usize = 4 * 1024 * 1024;

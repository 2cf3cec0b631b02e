//! Recursion guards for the engine's recursive computations.
//!
//! Typedef resolution, generic substitution, relation checks, usage queries
//! and contribution walks all recurse over a graph that may contain cycles.
//! [`RecursionGuard`] bundles the three protections they need:
//!
//! 1. **Cycle detection** via a visiting set (`FxHashSet<K>`)
//! 2. **Depth limiting** to keep the native stack bounded
//! 3. **Iteration bounding** to stop runaway searches
//!
//! [`RecursionProfile`] names the limit preset at the call site; the numbers
//! themselves live in `xtc_common::limits`.
//!
//! Debug builds panic when a guard is dropped with active entries or when a
//! key is left twice.

use rustc_hash::FxHashSet;
use std::hash::Hash;
use xtc_common::limits;

// ---------------------------------------------------------------------------
// RecursionProfile
// ---------------------------------------------------------------------------

/// Named recursion limit presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecursionProfile {
    /// Nested TypeInfo builds on one thread.
    TypeInfoBuild,

    /// `is_a` computations: type parameters, contributions and duck-typed
    /// member signatures all recurse.
    RelationCheck,

    /// Typedef indirections. Exceeding it means the typedef is cyclical.
    TypedefResolution,

    /// Generic substitution and auto-narrowing rewrites.
    GenericResolution,

    /// Formal-type usage (consumes / produces).
    Usage,

    /// Structural walks over contribution edges.
    ContributionWalk,

    /// Custom limits for one-off or test scenarios.
    Custom { max_depth: u32, max_iterations: u32 },
}

impl RecursionProfile {
    /// Maximum recursion depth for this profile.
    pub const fn max_depth(self) -> u32 {
        match self {
            Self::TypeInfoBuild => limits::MAX_TYPE_INFO_BUILD_DEPTH,
            Self::RelationCheck => limits::MAX_RELATION_DEPTH,
            Self::TypedefResolution => limits::MAX_TYPEDEF_DEPTH,
            Self::GenericResolution => limits::MAX_GENERIC_RESOLUTION_DEPTH,
            Self::Usage => limits::MAX_USAGE_DEPTH,
            Self::ContributionWalk => limits::MAX_CONTRIBUTION_WALK,
            Self::Custom { max_depth, .. } => max_depth,
        }
    }

    /// Maximum iteration count for this profile.
    pub const fn max_iterations(self) -> u32 {
        match self {
            Self::RelationCheck => limits::MAX_RELATION_ITERATIONS,
            Self::TypeInfoBuild
            | Self::TypedefResolution
            | Self::GenericResolution
            | Self::Usage
            | Self::ContributionWalk => 100_000,
            Self::Custom { max_iterations, .. } => max_iterations,
        }
    }
}

// ---------------------------------------------------------------------------
// RecursionResult
// ---------------------------------------------------------------------------

/// Result of attempting to enter a recursive computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecursionResult {
    /// Proceed with the computation.
    Entered,
    /// This key is already being visited.
    Cycle,
    DepthExceeded,
    IterationExceeded,
}

impl RecursionResult {
    #[inline]
    pub fn is_entered(self) -> bool {
        matches!(self, Self::Entered)
    }

    #[inline]
    pub fn is_cycle(self) -> bool {
        matches!(self, Self::Cycle)
    }

    /// Returns `true` if any limit was exceeded (depth or iterations).
    #[inline]
    pub fn is_exceeded(self) -> bool {
        matches!(self, Self::DepthExceeded | Self::IterationExceeded)
    }

    #[inline]
    pub fn is_denied(self) -> bool {
        !self.is_entered()
    }
}

// ---------------------------------------------------------------------------
// RecursionGuard
// ---------------------------------------------------------------------------

/// Tracks recursion state for cycle detection, depth limiting and iteration
/// bounding.
///
/// ```ignore
/// let mut guard = RecursionGuard::with_profile(RecursionProfile::TypedefResolution);
/// match guard.enter(typedef) {
///     RecursionResult::Entered => {
///         let result = resolve(target);
///         guard.leave(typedef);
///         result
///     }
///     RecursionResult::Cycle => report_cycle(),
///     _ => give_up(),
/// }
/// ```
pub struct RecursionGuard<K: Hash + Eq + Copy> {
    visiting: FxHashSet<K>,
    depth: u32,
    iterations: u32,
    max_depth: u32,
    max_iterations: u32,
    exceeded: bool,
}

impl<K: Hash + Eq + Copy> RecursionGuard<K> {
    /// Prefer [`with_profile`](Self::with_profile) for standard use cases.
    pub fn new(max_depth: u32, max_iterations: u32) -> Self {
        Self {
            visiting: FxHashSet::default(),
            depth: 0,
            iterations: 0,
            max_depth,
            max_iterations,
            exceeded: false,
        }
    }

    pub fn with_profile(profile: RecursionProfile) -> Self {
        Self::new(profile.max_depth(), profile.max_iterations())
    }

    /// Try to enter a recursive computation for `key`.
    ///
    /// On [`RecursionResult::Entered`] the caller must call
    /// [`leave`](Self::leave) with the same key when done.
    pub fn enter(&mut self, key: K) -> RecursionResult {
        self.iterations = self.iterations.saturating_add(1);

        if self.iterations > self.max_iterations {
            self.exceeded = true;
            return RecursionResult::IterationExceeded;
        }
        if self.depth >= self.max_depth {
            self.exceeded = true;
            return RecursionResult::DepthExceeded;
        }
        if !self.visiting.insert(key) {
            return RecursionResult::Cycle;
        }
        self.depth += 1;
        RecursionResult::Entered
    }

    /// Leave a recursive computation for `key`.
    ///
    /// # Debug panics
    ///
    /// Panics if `key` is not in the visiting set.
    pub fn leave(&mut self, key: K) {
        let was_present = self.visiting.remove(&key);
        debug_assert!(
            was_present,
            "RecursionGuard::leave() called with a key that is not in the visiting set"
        );
        self.depth = self.depth.saturating_sub(1);
    }

    /// Run `f` inside a guarded scope, or answer why entry was denied.
    ///
    /// If `f` panics the entry leaks; the debug drop check is suppressed
    /// while unwinding.
    pub fn scope<T>(&mut self, key: K, f: impl FnOnce(&mut Self) -> T) -> Result<T, RecursionResult> {
        match self.enter(key) {
            RecursionResult::Entered => {
                let result = f(self);
                self.leave(key);
                Ok(result)
            }
            denied => Err(denied),
        }
    }

    #[inline]
    pub fn is_visiting(&self, key: &K) -> bool {
        self.visiting.contains(key)
    }

    #[inline]
    pub fn depth(&self) -> u32 {
        self.depth
    }

    #[inline]
    pub fn iterations(&self) -> u32 {
        self.iterations
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        self.depth > 0
    }

    /// Sticky: stays set until [`reset`](Self::reset).
    #[inline]
    pub fn is_exceeded(&self) -> bool {
        self.exceeded
    }

    pub fn reset(&mut self) {
        self.visiting.clear();
        self.depth = 0;
        self.iterations = 0;
        self.exceeded = false;
    }
}

#[cfg(debug_assertions)]
impl<K: Hash + Eq + Copy> Drop for RecursionGuard<K> {
    fn drop(&mut self) {
        if !std::thread::panicking() && !self.visiting.is_empty() {
            panic!(
                "RecursionGuard dropped with {} active entries still in the visiting set",
                self.visiting.len(),
            );
        }
    }
}

// ---------------------------------------------------------------------------
// DepthCounter
// ---------------------------------------------------------------------------

/// Depth-only guard for computations that legitimately revisit the same key,
/// such as nested TypeInfo builds that retry a type after deferral.
pub struct DepthCounter {
    depth: u32,
    max_depth: u32,
    exceeded: bool,
}

impl DepthCounter {
    pub fn new(max_depth: u32) -> Self {
        Self {
            depth: 0,
            max_depth,
            exceeded: false,
        }
    }

    pub fn with_profile(profile: RecursionProfile) -> Self {
        Self::new(profile.max_depth())
    }

    /// Returns `false` (without incrementing) once the limit is reached; do
    /// not call [`leave`](Self::leave) in that case.
    #[inline]
    pub fn enter(&mut self) -> bool {
        if self.depth >= self.max_depth {
            self.exceeded = true;
            return false;
        }
        self.depth += 1;
        true
    }

    #[inline]
    pub fn leave(&mut self) {
        debug_assert!(self.depth > 0, "DepthCounter::leave() called at depth 0");
        self.depth = self.depth.saturating_sub(1);
    }

    #[inline]
    pub fn depth(&self) -> u32 {
        self.depth
    }

    #[inline]
    pub fn is_exceeded(&self) -> bool {
        self.exceeded
    }
}

#[cfg(debug_assertions)]
impl Drop for DepthCounter {
    fn drop(&mut self) {
        if !std::thread::panicking() && self.depth > 0 {
            panic!("DepthCounter dropped with depth {}", self.depth);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn profiles_read_central_limits() {
        assert_eq!(
            RecursionProfile::TypedefResolution.max_depth(),
            limits::MAX_TYPEDEF_DEPTH
        );
        assert_eq!(
            RecursionProfile::RelationCheck.max_iterations(),
            limits::MAX_RELATION_ITERATIONS
        );
        let custom = RecursionProfile::Custom {
            max_depth: 7,
            max_iterations: 42,
        };
        assert_eq!(custom.max_depth(), 7);
        assert_eq!(custom.max_iterations(), 42);
    }

    #[test]
    fn enter_leave_tracks_depth() {
        let mut guard = RecursionGuard::new(10, 100);
        assert_eq!(guard.enter(1u32), RecursionResult::Entered);
        assert_eq!(guard.enter(2u32), RecursionResult::Entered);
        assert_eq!(guard.depth(), 2);
        assert!(guard.is_visiting(&1));
        guard.leave(2);
        guard.leave(1);
        assert!(!guard.is_active());
        assert_eq!(guard.iterations(), 2);
    }

    #[test]
    fn same_key_is_a_cycle() {
        let mut guard = RecursionGuard::new(10, 100);
        assert_eq!(guard.enter(1u32), RecursionResult::Entered);
        assert_eq!(guard.enter(1u32), RecursionResult::Cycle);
        assert_eq!(guard.depth(), 1);
        assert!(!guard.is_exceeded());
        guard.leave(1);
    }

    #[test]
    fn depth_limit_is_sticky() {
        let mut guard = RecursionGuard::new(1, 100);
        assert_eq!(guard.enter(1u32), RecursionResult::Entered);
        assert_eq!(guard.enter(2u32), RecursionResult::DepthExceeded);
        guard.leave(1);
        assert!(guard.is_exceeded());
        guard.reset();
        assert!(!guard.is_exceeded());
    }

    #[test]
    fn iteration_limit_counts_denied_attempts() {
        let mut guard = RecursionGuard::new(10, 2);
        assert_eq!(guard.enter(1u32), RecursionResult::Entered);
        assert_eq!(guard.enter(1u32), RecursionResult::Cycle);
        assert_eq!(guard.enter(3u32), RecursionResult::IterationExceeded);
        guard.leave(1);
    }

    #[test]
    fn scope_leaves_on_success() {
        let mut guard = RecursionGuard::new(10, 100);
        let inner = guard.scope(5u32, |g| g.enter(5u32));
        assert_eq!(inner, Ok(RecursionResult::Cycle));
        assert!(!guard.is_active());
    }

    #[test]
    fn depth_counter_refuses_past_limit() {
        let mut counter = DepthCounter::new(1);
        assert!(counter.enter());
        assert!(!counter.enter());
        assert!(counter.is_exceeded());
        counter.leave();
        assert_eq!(counter.depth(), 0);
    }
}

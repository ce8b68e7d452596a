//! Stack growth for deep recursion.
//!
//! Script recursion maps onto native recursion through `evaluate`, so a
//! deep call chain would otherwise overflow the thread's stack before the
//! call-depth limit is reached.

/// Run `f`, first growing the stack if less than the red zone is left.
#[inline]
pub fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    /// Minimum stack space to keep available (100KB red zone).
    const RED_ZONE: usize = 100 * 1024;

    /// Stack space to allocate when growing (1MB).
    const STACK_PER_RECURSION: usize = 1024 * 1024;

    stacker::maybe_grow(RED_ZONE, STACK_PER_RECURSION, f)
}

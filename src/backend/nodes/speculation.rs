//! Speculation primitives shared by all nodes
//!
//! - [`Speculated`]: return type of the typed entry points. `Unexpected`
//!   carries the generic result when it does not fit the speculated channel.
//!   It is a control-flow signal, not an error, and is always resolved by the
//!   caller.
//! - [`SpeculationState`]: per-node observed value kind. Only ever widens
//!   (`Uninitialized < Int < Double < Generic`), via compare-and-set, so
//!   concurrent executors can race on it safely.
//! - [`LazyChild`]: a helper node published at most once. Threads racing on
//!   first use each build a candidate; one is published and the others are
//!   dropped. Readers only ever see a fully constructed helper.
//! - [`transfer_to_interpreter_and_invalidate`]: the safe point taken before
//!   any respecialization.

use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::{Arc, OnceLock};

use tracing::{debug, trace};

use crate::backend::models::Value;

/// Result of a typed entry point
#[derive(Debug, Clone, PartialEq)]
pub enum Speculated<T> {
    /// The result fits the speculated channel
    Exact(T),
    /// The result does not fit; this is the already-computed generic result
    Unexpected(Value),
}

impl<T> Speculated<T> {
    #[inline]
    pub fn is_exact(&self) -> bool {
        matches!(self, Speculated::Exact(_))
    }
}

impl<T: Into<Value>> Speculated<T> {
    /// Resolve to a generic value
    #[inline]
    pub fn into_value(self) -> Value {
        match self {
            Speculated::Exact(v) => v.into(),
            Speculated::Unexpected(v) => v,
        }
    }
}

impl Speculated<i32> {
    /// Fit a generic value into the int channel
    #[inline]
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Int(i) => Speculated::Exact(i),
            other => Speculated::Unexpected(other),
        }
    }
}

impl Speculated<f64> {
    /// Fit a generic value into the double channel (ints widen)
    #[inline]
    pub fn from_value(value: Value) -> Self {
        match value.as_double() {
            Some(d) => Speculated::Exact(d),
            None => Speculated::Unexpected(value),
        }
    }
}

/// Observed value kind, ordered from most to least specialized
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum ValueKind {
    Uninitialized = 0,
    Int = 1,
    Double = 2,
    Generic = 3,
}

impl ValueKind {
    pub fn of(value: &Value) -> Self {
        match value {
            Value::Int(_) => ValueKind::Int,
            Value::Double(_) => ValueKind::Double,
            _ => ValueKind::Generic,
        }
    }
}

impl From<u8> for ValueKind {
    fn from(v: u8) -> Self {
        match v {
            0 => ValueKind::Uninitialized,
            1 => ValueKind::Int,
            2 => ValueKind::Double,
            _ => ValueKind::Generic,
        }
    }
}

/// Monotonic speculation state of one node
#[derive(Debug)]
pub struct SpeculationState {
    kind: AtomicU8,
}

impl SpeculationState {
    pub const fn new() -> Self {
        SpeculationState {
            kind: AtomicU8::new(ValueKind::Uninitialized as u8),
        }
    }

    #[inline]
    pub fn kind(&self) -> ValueKind {
        ValueKind::from(self.kind.load(Ordering::Acquire))
    }

    /// The int channel is still worth trying
    #[inline]
    pub fn allows_int(&self) -> bool {
        self.kind() <= ValueKind::Int
    }

    /// The double channel is still worth trying
    #[inline]
    pub fn allows_double(&self) -> bool {
        self.kind() <= ValueKind::Double
    }

    /// Record an observed value
    #[inline]
    pub fn observe(&self, value: &Value) {
        self.widen(ValueKind::of(value));
    }

    /// Widen to at least `to`; returns true if this call changed the state
    ///
    /// Leaving `Uninitialized` is the first specialization and needs no
    /// invalidation; any later widening goes through the safe point.
    pub fn widen(&self, to: ValueKind) -> bool {
        let mut current = self.kind.load(Ordering::Acquire);
        loop {
            if current >= to as u8 {
                return false;
            }
            match self.kind.compare_exchange_weak(
                current,
                to as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => {
                    let from = ValueKind::from(current);
                    if from != ValueKind::Uninitialized {
                        transfer_to_interpreter_and_invalidate("speculation widened");
                    }
                    debug!(target: "spectree::speculation", ?from, ?to, "respecialized");
                    return true;
                }
                Err(actual) => current = actual,
            }
        }
    }
}

impl Default for SpeculationState {
    fn default() -> Self {
        Self::new()
    }
}

/// A lazily created helper node, published at most once
#[derive(Debug)]
pub struct LazyChild<T> {
    cell: OnceLock<Arc<T>>,
}

impl<T> LazyChild<T> {
    pub const fn new() -> Self {
        LazyChild {
            cell: OnceLock::new(),
        }
    }

    /// The published helper, if any
    #[inline]
    pub fn get(&self) -> Option<&Arc<T>> {
        self.cell.get()
    }

    #[inline]
    pub fn is_initialized(&self) -> bool {
        self.cell.get().is_some()
    }

    /// Return the published helper, creating and publishing one on first use
    ///
    /// `make` must be free of side effects: when several threads race here
    /// every one of them may call it, and all but one result are dropped.
    #[inline]
    pub fn get_or_publish(&self, make: impl FnOnce() -> T) -> &Arc<T> {
        if let Some(published) = self.cell.get() {
            return published;
        }
        self.publish(make)
    }

    #[cold]
    fn publish(&self, make: impl FnOnce() -> T) -> &Arc<T> {
        transfer_to_interpreter_and_invalidate("lazy child instantiation");
        let candidate = Arc::new(make());
        let published = self.cell.get_or_init(|| Arc::clone(&candidate));
        if Arc::ptr_eq(published, &candidate) {
            trace!(target: "spectree::speculation", "published lazy child");
        } else {
            trace!(target: "spectree::speculation", "lost publication race, candidate dropped");
        }
        published
    }
}

impl<T> Default for LazyChild<T> {
    fn default() -> Self {
        Self::new()
    }
}

static INVALIDATIONS: AtomicU64 = AtomicU64::new(0);

/// Safe point taken before a node rewrites its own specialization
///
/// Bumps the global invalidation epoch. Nothing is compiled ahead of the
/// tree, so the epoch is an observable counter only: [`CallTarget`] records
/// it per call and traces calls during which it moved.
///
/// [`CallTarget`]: super::CallTarget
pub fn transfer_to_interpreter_and_invalidate(reason: &'static str) {
    let epoch = INVALIDATIONS.fetch_add(1, Ordering::AcqRel) + 1;
    trace!(target: "spectree::speculation", reason, epoch, "transfer to interpreter");
}

/// Current invalidation epoch
pub fn invalidation_epoch() -> u64 {
    INVALIDATIONS.load(Ordering::Acquire)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Barrier;

    #[test]
    fn test_speculated_from_value() {
        assert_eq!(Speculated::<i32>::from_value(Value::Int(3)), Speculated::Exact(3));
        assert!(!Speculated::<i32>::from_value(Value::Double(2.5)).is_exact());
        assert_eq!(Speculated::<f64>::from_value(Value::Int(3)), Speculated::Exact(3.0));
        assert!(!Speculated::<f64>::from_value(Value::string("x")).is_exact());
        assert_eq!(Speculated::Exact(4).into_value(), Value::Int(4));
    }

    #[test]
    fn test_widen_is_monotonic() {
        let state = SpeculationState::new();
        assert!(state.allows_int());

        assert!(state.widen(ValueKind::Int));
        assert!(state.widen(ValueKind::Double));
        assert!(!state.widen(ValueKind::Int));
        assert_eq!(state.kind(), ValueKind::Double);
        assert!(!state.allows_int());
        assert!(state.allows_double());

        state.observe(&Value::string("x"));
        assert_eq!(state.kind(), ValueKind::Generic);
        assert!(!state.allows_double());
    }

    #[test]
    fn test_widening_takes_safe_point() {
        let state = SpeculationState::new();
        state.widen(ValueKind::Int);
        let before = invalidation_epoch();
        state.widen(ValueKind::Generic);
        assert!(invalidation_epoch() > before);
    }

    #[test]
    fn test_lazy_child_publishes_once() {
        let child: LazyChild<u32> = LazyChild::new();
        assert!(!child.is_initialized());

        let first = Arc::clone(child.get_or_publish(|| 1));
        let second = Arc::clone(child.get_or_publish(|| 2));
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(*second, 1);
    }

    #[test]
    fn test_lazy_child_race() {
        const THREADS: usize = 8;
        let child: LazyChild<usize> = LazyChild::new();
        let barrier = Barrier::new(THREADS);
        let built = AtomicUsize::new(0);

        let seen: Vec<Arc<usize>> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..THREADS)
                .map(|i| {
                    let child = &child;
                    let barrier = &barrier;
                    let built = &built;
                    s.spawn(move || {
                        barrier.wait();
                        Arc::clone(child.get_or_publish(|| {
                            built.fetch_add(1, Ordering::SeqCst);
                            i
                        }))
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert!(built.load(Ordering::SeqCst) >= 1);
        let winner = child.get().unwrap();
        assert!(seen.iter().all(|s| Arc::ptr_eq(s, winner)));
    }
}

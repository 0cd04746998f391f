//! Method tables for the SQLite client types.
//!
//! Every public operation of `Connection` and `Statement` dispatches through a
//! `MethodSlot` that lives in a process-wide table (`Prototype`). Swapping the
//! `Method` held by a slot changes the behavior of every receiver at once,
//! which is what the instrumentation does when it patches an operation.
//!
//! Slots are read lock-free on each call (`ArcSwap`); they are only written
//! while instrumentation is being enabled or disabled.

use std::fmt;
use std::sync::Arc;

use arc_swap::ArcSwap;

use crate::types::Result;

type MethodFn<R, A, O> = dyn Fn(&R, &A) -> Result<O> + Send + Sync;

/// One implementation of an operation taking a receiver and its arguments.
pub struct Method<R: ?Sized, A: ?Sized, O> {
    f: Box<MethodFn<R, A, O>>,
}

impl<R: ?Sized, A: ?Sized, O> Method<R, A, O> {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&R, &A) -> Result<O> + Send + Sync + 'static,
    {
        Self { f: Box::new(f) }
    }

    /// Run the implementation with `receiver` as its context.
    pub fn invoke(&self, receiver: &R, args: &A) -> Result<O> {
        (self.f)(receiver, args)
    }
}

impl<R: ?Sized, A: ?Sized, O> fmt::Debug for Method<R, A, O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Method").finish_non_exhaustive()
    }
}

/// Named, swappable holder of the current implementation of one operation.
pub struct MethodSlot<R: ?Sized, A: ?Sized, O> {
    name: &'static str,
    current: ArcSwap<Method<R, A, O>>,
}

impl<R: ?Sized, A: ?Sized, O> MethodSlot<R, A, O> {
    pub fn new(name: &'static str, method: Method<R, A, O>) -> Self {
        Self {
            name,
            current: ArcSwap::from_pointee(method),
        }
    }

    /// Operation name, also used as the span name when traced.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Dispatch to whatever implementation the slot currently holds.
    pub fn call(&self, receiver: &R, args: &A) -> Result<O> {
        self.current.load().invoke(receiver, args)
    }

    /// Current implementation.
    pub fn current(&self) -> Arc<Method<R, A, O>> {
        self.current.load_full()
    }

    /// Install `method`, returning the implementation it displaced.
    pub fn replace(&self, method: Arc<Method<R, A, O>>) -> Arc<Method<R, A, O>> {
        self.current.swap(method)
    }
}

impl<R: ?Sized, A: ?Sized, O> fmt::Debug for MethodSlot<R, A, O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodSlot")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// A process-wide method table for one receiver type.
///
/// All methods of a prototype share the receiver and argument types; their
/// outputs differ, so slots are reached through a `SlotVisitor` that is
/// generic over the output type.
pub trait Prototype: Send + Sync + 'static {
    type Receiver: ?Sized + 'static;
    type Args: ?Sized + 'static;

    /// Type name used in patch records and log lines.
    const NAME: &'static str;

    /// Every method name `visit` resolves.
    const METHODS: &'static [&'static str];

    /// Hand the slot named `method` to `visitor`; `None` if there is no such method.
    fn visit<V>(&self, method: &str, visitor: V) -> Option<V::Output>
    where
        V: SlotVisitor<Self::Receiver, Self::Args>;
}

/// Operation applied to a slot whose output type is only known at the call site.
pub trait SlotVisitor<R: ?Sized, A: ?Sized> {
    type Output;

    fn visit<O: 'static>(self, slot: &MethodSlot<R, A, O>) -> Self::Output;
}

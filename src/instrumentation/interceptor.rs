//! Method interception with an explicit patch record.
//!
//! `Interceptor::wrap` swaps the implementation held by a prototype slot for
//! a decorated one and remembers the original under (prototype, method).
//! `Interceptor::unwrap` puts that exact original back.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::dispatch::{Method, MethodSlot, Prototype, SlotVisitor};
use crate::types::InstrumentationError;

/// Builds the replacement for a method from its original implementation.
///
/// Generic over the output type so one decorator can wrap every method of a
/// prototype.
pub trait Decorator<R: ?Sized, A: ?Sized> {
    fn decorate<O: 'static>(
        &self,
        method: &'static str,
        original: Arc<Method<R, A, O>>,
    ) -> Method<R, A, O>;
}

/// Identifies one patched method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PatchKey {
    pub target: &'static str,
    pub method: &'static str,
}

type PatchRecord = HashMap<PatchKey, Box<dyn Any + Send + Sync>>;

/// Owner of the patch record.
///
/// A method is never wrapped twice without being unwrapped in between.
#[derive(Default)]
pub struct Interceptor {
    patches: PatchRecord,
}

impl Interceptor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace `target.method` with `decorator`'s wrapper around it.
    pub fn wrap<P, D>(
        &mut self,
        target: &P,
        method: &str,
        decorator: &D,
    ) -> Result<(), InstrumentationError>
    where
        P: Prototype,
        D: Decorator<P::Receiver, P::Args>,
    {
        let visitor = Wrap {
            patches: &mut self.patches,
            target: P::NAME,
            decorator,
        };
        target
            .visit(method, visitor)
            .unwrap_or_else(|| Err(unknown_method::<P>(method)))
    }

    pub fn wrap_many<P, D>(
        &mut self,
        target: &P,
        methods: &[&str],
        decorator: &D,
    ) -> Result<(), InstrumentationError>
    where
        P: Prototype,
        D: Decorator<P::Receiver, P::Args>,
    {
        for method in methods {
            self.wrap(target, method, decorator)?;
        }
        Ok(())
    }

    /// Restore the original of `target.method`. No-op if it is not wrapped.
    pub fn unwrap<P>(&mut self, target: &P, method: &str) -> Result<(), InstrumentationError>
    where
        P: Prototype,
    {
        let visitor = Unwrap {
            patches: &mut self.patches,
            target: P::NAME,
        };
        target
            .visit(method, visitor)
            .unwrap_or_else(|| Err(unknown_method::<P>(method)))
    }

    pub fn unwrap_many<P>(&mut self, target: &P, methods: &[&str]) -> Result<(), InstrumentationError>
    where
        P: Prototype,
    {
        for method in methods {
            self.unwrap(target, method)?;
        }
        Ok(())
    }

    pub fn is_wrapped(&self, target: &'static str, method: &'static str) -> bool {
        self.patches.contains_key(&PatchKey { target, method })
    }

    /// Keys of every wrapped method, in no particular order.
    pub fn wrapped(&self) -> impl Iterator<Item = PatchKey> + '_ {
        self.patches.keys().copied()
    }

    /// Number of methods currently wrapped.
    pub fn len(&self) -> usize {
        self.patches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patches.is_empty()
    }
}

impl fmt::Debug for Interceptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Interceptor")
            .field("patched", &self.patches.keys().collect::<Vec<_>>())
            .finish()
    }
}

fn unknown_method<P: Prototype>(method: &str) -> InstrumentationError {
    InstrumentationError::UnknownMethod {
        target: P::NAME,
        method: method.to_owned(),
    }
}

struct Wrap<'a, D> {
    patches: &'a mut PatchRecord,
    target: &'static str,
    decorator: &'a D,
}

impl<R, A, D> SlotVisitor<R, A> for Wrap<'_, D>
where
    R: ?Sized + 'static,
    A: ?Sized + 'static,
    D: Decorator<R, A>,
{
    type Output = Result<(), InstrumentationError>;

    fn visit<O: 'static>(self, slot: &MethodSlot<R, A, O>) -> Self::Output {
        let key = PatchKey {
            target: self.target,
            method: slot.name(),
        };
        if self.patches.contains_key(&key) {
            return Err(InstrumentationError::AlreadyWrapped {
                target: key.target,
                method: key.method.to_owned(),
            });
        }

        let original = slot.current();
        let wrapped = self.decorator.decorate(key.method, Arc::clone(&original));
        slot.replace(Arc::new(wrapped));
        self.patches.insert(key, Box::new(original));

        debug!(prototype = key.target, method = key.method, "wrapped method");
        Ok(())
    }
}

struct Unwrap<'a> {
    patches: &'a mut PatchRecord,
    target: &'static str,
}

impl<R, A> SlotVisitor<R, A> for Unwrap<'_>
where
    R: ?Sized + 'static,
    A: ?Sized + 'static,
{
    type Output = Result<(), InstrumentationError>;

    fn visit<O: 'static>(self, slot: &MethodSlot<R, A, O>) -> Self::Output {
        let key = PatchKey {
            target: self.target,
            method: slot.name(),
        };
        let Some(original) = self.patches.remove(&key) else {
            return Ok(());
        };

        let original = original
            .downcast::<Arc<Method<R, A, O>>>()
            .map_err(|_| InstrumentationError::PatchMismatch {
                target: key.target,
                method: key.method.to_owned(),
            })?;
        slot.replace(*original);

        debug!(prototype = key.target, method = key.method, "unwrapped method");
        Ok(())
    }
}

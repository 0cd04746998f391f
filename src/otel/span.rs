//! Span lifecycle around a single database call.

use std::fmt::{self, Write};

use opentelemetry::trace::{Span, Status};

/// The two span operations a traced call needs.
pub trait SpanHandle {
    fn set_status(&mut self, status: Status);
    fn end(&mut self);
}

trait ErasedSpan {
    fn set_status(&mut self, status: Status);
    fn end(&mut self);
}

impl<S: Span> ErasedSpan for S {
    fn set_status(&mut self, status: Status) {
        Span::set_status(self, status);
    }

    fn end(&mut self) {
        Span::end(self);
    }
}

/// A started client span whose concrete tracer type has been erased.
pub struct DbSpan {
    inner: Box<dyn ErasedSpan + Send + Sync>,
}

impl DbSpan {
    pub(crate) fn new<S>(span: S) -> Self
    where
        S: Span + Send + Sync + 'static,
    {
        Self {
            inner: Box::new(span),
        }
    }
}

impl SpanHandle for DbSpan {
    fn set_status(&mut self, status: Status) {
        self.inner.set_status(status);
    }

    fn end(&mut self) {
        self.inner.end();
    }
}

impl fmt::Debug for DbSpan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DbSpan").finish_non_exhaustive()
    }
}

/// Ends the span when dropped, whichever way the call exits.
struct EndOnDrop<S: SpanHandle> {
    span: S,
    status_set: bool,
}

impl<S: SpanHandle> EndOnDrop<S> {
    fn set_status(&mut self, status: Status) {
        self.span.set_status(status);
        self.status_set = true;
    }
}

impl<S: SpanHandle> Drop for EndOnDrop<S> {
    fn drop(&mut self) {
        if !self.status_set && std::thread::panicking() {
            self.span.set_status(Status::error("panicked"));
        }
        self.span.end();
    }
}

/// Run `operation` inside an already started `span`.
///
/// The operation runs exactly once. `Ok` marks the span OK, `Err` marks it
/// ERROR with the error's message. Either way the outcome is returned as is
/// and the span is ended exactly once, also when the operation panics.
///
/// # Example
///
/// ```rust,ignore
/// let span = tracer.start_client_span("exec", vec![system_attribute()]);
/// run_traced(span, || original.invoke(conn, sql))
/// ```
pub fn run_traced<S, T, E, F>(span: S, operation: F) -> Result<T, E>
where
    S: SpanHandle,
    E: fmt::Display,
    F: FnOnce() -> Result<T, E>,
{
    let mut guard = EndOnDrop {
        span,
        status_set: false,
    };

    let outcome = operation();
    match &outcome {
        Ok(_) => guard.set_status(Status::Ok),
        Err(err) => guard.set_status(Status::error(error_message(err))),
    }
    outcome
}

fn error_message(err: &dyn fmt::Display) -> String {
    let mut message = String::new();
    // A failing Display impl leaves the message partial or empty.
    let _ = write!(message, "{err}");
    message
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::{Cell, RefCell};
    use std::panic::{self, AssertUnwindSafe};
    use std::rc::Rc;

    #[derive(Default)]
    struct Recorded {
        statuses: RefCell<Vec<Status>>,
        ends: Cell<usize>,
    }

    struct RecordingSpan(Rc<Recorded>);

    impl SpanHandle for RecordingSpan {
        fn set_status(&mut self, status: Status) {
            self.0.statuses.borrow_mut().push(status);
        }

        fn end(&mut self) {
            self.0.ends.set(self.0.ends.get() + 1);
        }
    }

    fn recording() -> (RecordingSpan, Rc<Recorded>) {
        let recorded = Rc::new(Recorded::default());
        (RecordingSpan(Rc::clone(&recorded)), recorded)
    }

    #[derive(Debug, PartialEq)]
    struct QueryFailed(u32);

    impl fmt::Display for QueryFailed {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "query {} failed", self.0)
        }
    }

    struct Unprintable;

    impl fmt::Display for Unprintable {
        fn fmt(&self, _: &mut fmt::Formatter<'_>) -> fmt::Result {
            Err(fmt::Error)
        }
    }

    #[test]
    fn test_success_sets_ok_and_ends_once() {
        let (span, recorded) = recording();
        let calls = Cell::new(0);

        let result: Result<Option<i32>, QueryFailed> = run_traced(span, || {
            calls.set(calls.get() + 1);
            Ok(None)
        });

        assert_eq!(result, Ok(None));
        assert_eq!(calls.get(), 1);
        assert_eq!(*recorded.statuses.borrow(), vec![Status::Ok]);
        assert_eq!(recorded.ends.get(), 1);
    }

    #[test]
    fn test_error_is_returned_unchanged() {
        let (span, recorded) = recording();

        let result: Result<(), QueryFailed> = run_traced(span, || Err(QueryFailed(7)));

        assert_eq!(result, Err(QueryFailed(7)));
        assert_eq!(
            *recorded.statuses.borrow(),
            vec![Status::error("query 7 failed")]
        );
        assert_eq!(recorded.ends.get(), 1);
    }

    #[test]
    fn test_error_without_message_is_tolerated() {
        let (span, recorded) = recording();

        let result: Result<(), Unprintable> = run_traced(span, || Err(Unprintable));

        assert!(result.is_err());
        assert_eq!(*recorded.statuses.borrow(), vec![Status::error("")]);
        assert_eq!(recorded.ends.get(), 1);
    }

    #[test]
    fn test_panic_still_ends_span() {
        let (span, recorded) = recording();

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            let _: Result<(), QueryFailed> = run_traced(span, || panic!("boom"));
        }));

        assert!(outcome.is_err());
        assert_eq!(*recorded.statuses.borrow(), vec![Status::error("panicked")]);
        assert_eq!(recorded.ends.get(), 1);
    }

    #[test]
    fn test_nested_calls_use_independent_spans() {
        let (outer, outer_recorded) = recording();
        let (inner, inner_recorded) = recording();

        let result: Result<u8, QueryFailed> = run_traced(outer, || {
            let nested: Result<u8, QueryFailed> = run_traced(inner, || Err(QueryFailed(1)));
            assert_eq!(inner_recorded.ends.get(), 1);
            assert_eq!(outer_recorded.ends.get(), 0);
            nested.or(Ok(2))
        });

        assert_eq!(result, Ok(2));
        assert_eq!(*outer_recorded.statuses.borrow(), vec![Status::Ok]);
        assert_eq!(outer_recorded.ends.get(), 1);
        assert_eq!(inner_recorded.ends.get(), 1);
    }
}

//! Per-kind payload handlers with isolated failures.
//!
//! Every handler registered for a kind runs for each payload of that kind,
//! even when an earlier handler fails. Failures are collected in the
//! returned [`DispatchReport`] instead of aborting the dispatch. Batches are
//! unpacked and their items dispatched individually.

use std::collections::HashMap;
use std::error::Error;

use crate::frame::{Envelope, Origin};
use crate::payload::{Payload, PayloadKind};

/// Error type handlers may return; anything convertible via `?` works.
pub type HandlerError = Box<dyn Error + Send + Sync>;

/// Result type for handlers.
pub type HandlerResult = Result<(), HandlerError>;

type Handler<C> = Box<dyn FnMut(&mut C, &Payload, &Origin) -> HandlerResult>;

/// One failing handler invocation.
#[derive(Debug)]
pub struct HandlerFailure {
    pub kind: PayloadKind,
    /// Registration position among the handlers for `kind`.
    pub handler: usize,
    pub error: HandlerError,
}

/// Outcome of dispatching one envelope.
#[derive(Debug, Default)]
pub struct DispatchReport {
    /// Handler invocations that returned `Ok`.
    pub delivered: usize,
    /// Kinds that had no handler.
    pub unhandled: Vec<PayloadKind>,
    pub failures: Vec<HandlerFailure>,
}

impl DispatchReport {
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    fn merge(&mut self, other: Self) {
        self.delivered += other.delivered;
        self.unhandled.extend(other.unhandled);
        self.failures.extend(other.failures);
    }
}

/// Routes payloads to handlers operating on a context `C`.
pub struct Dispatcher<C> {
    handlers: HashMap<PayloadKind, Vec<Handler<C>>>,
}

impl<C> Default for Dispatcher<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> Dispatcher<C> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Adds a handler for `kind`; handlers run in registration order.
    pub fn on<F>(&mut self, kind: PayloadKind, handler: F) -> &mut Self
    where
        F: FnMut(&mut C, &Payload, &Origin) -> HandlerResult + 'static,
    {
        self.handlers
            .entry(kind)
            .or_default()
            .push(Box::new(handler));
        self
    }

    #[must_use]
    pub fn handler_count(&self, kind: PayloadKind) -> usize {
        self.handlers.get(&kind).map_or(0, Vec::len)
    }

    pub fn dispatch(&mut self, ctx: &mut C, envelope: &Envelope) -> DispatchReport {
        self.dispatch_payload(ctx, &envelope.payload, &envelope.origin)
    }

    pub fn dispatch_payload(
        &mut self,
        ctx: &mut C,
        payload: &Payload,
        origin: &Origin,
    ) -> DispatchReport {
        if let Payload::Batch(batch) = payload {
            let mut report = DispatchReport::default();
            for item in &batch.items {
                report.merge(self.dispatch_payload(ctx, item, origin));
            }
            return report;
        }

        let kind = payload.kind();
        let mut report = DispatchReport::default();
        let Some(handlers) = self.handlers.get_mut(&kind).filter(|h| !h.is_empty()) else {
            report.unhandled.push(kind);
            return report;
        };
        for (index, handler) in handlers.iter_mut().enumerate() {
            match handler(ctx, payload, origin) {
                Ok(()) => report.delivered += 1,
                Err(error) => report.failures.push(HandlerFailure {
                    kind,
                    handler: index,
                    error,
                }),
            }
        }
        report
    }
}

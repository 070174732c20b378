//! Context propagation across cooperative tasks.
//!
//! The ambient task store lives in a thread local, which is correct for
//! straight-line code but makes sibling futures on one thread share state.
//! [`ContextPropagate::fork_context`] gives a future its own lineage: the
//! wrapper captures a fork of the ambient store when it is created and swaps
//! it in around every poll, so the future always resumes with its own
//! snapshots no matter how its polls interleave with siblings or which
//! runtime thread picks it up.
//!
//! Forked lineages are copy-on-write: they start from the snapshots current
//! at fork time, and writes inside the fork are invisible to siblings and to
//! the parent.

use std::future::Future;
use std::mem;
use std::pin::Pin;
use std::task::{Context as PollContext, Poll};

use crate::snapshot::{self, TaskStore};

/// Future running against its own forked task store.
pub struct WithContext<F> {
    inner: Pin<Box<F>>,
    store: TaskStore,
}

impl<F: Future> Future for WithContext<F> {
    type Output = F::Output;

    fn poll(self: Pin<&mut Self>, cx: &mut PollContext<'_>) -> Poll<F::Output> {
        // Boxing the inner future keeps this wrapper Unpin.
        let WithContext { inner, store } = self.get_mut();
        let parent = snapshot::swap_store(mem::take(store));
        let _restore = SwapBack {
            slot: store,
            parent: Some(parent),
        };
        inner.as_mut().poll(cx)
    }
}

/// Restores the parent store when the poll ends, panicking polls included.
struct SwapBack<'a> {
    slot: &'a mut TaskStore,
    parent: Option<TaskStore>,
}

impl Drop for SwapBack<'_> {
    fn drop(&mut self) {
        if let Some(parent) = self.parent.take() {
            *self.slot = snapshot::swap_store(parent);
        }
    }
}

/// Wrap a future so it runs in a fork of the ambient store captured now.
pub fn fork_context<F: Future>(future: F) -> WithContext<F> {
    WithContext {
        inner: Box::pin(future),
        store: snapshot::fork_store(),
    }
}

/// Extension trait: `future.fork_context().await`.
pub trait ContextPropagate: Future + Sized {
    fn fork_context(self) -> WithContext<Self> {
        fork_context(self)
    }
}

impl<F: Future + Sized> ContextPropagate for F {}

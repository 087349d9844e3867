//! A binary, latched signal raised from an interrupt handler and consumed by one task.
//!
//! The interrupt side calls [`Handoff::signal`], which never blocks. The task side claims the
//! single [`HandoffReceiver`] and awaits it, usually under a timeout.
//!
//! Example usage:
//!
//! ```rust
//! use freqsense_sync::Handoff;
//!
//! static DONE: Handoff = Handoff::new();
//!
//! // In the peripheral's interrupt handler:
//! fn on_measurement_done() {
//!     DONE.signal();
//! }
//!
//! async fn consumer() {
//!     let mut receiver = DONE.claim().ok().unwrap();
//!     receiver.wait().await;
//! }
//! ```

use core::future::poll_fn;
use core::sync::atomic::{fence, Ordering};
use core::task::Poll;

use portable_atomic::AtomicBool;
use rtic_common::waker_registration::CriticalSectionWakerRegistration;

/// Returned by [`Handoff::claim`] when a receiver for the handoff is already alive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AlreadyClaimed;

/// A single-permit "measurement ready" flag with one waiting consumer.
///
/// Signalling while the flag is already set is a no-op, so at most one "ready" is ever
/// outstanding.
pub struct Handoff {
    waker: CriticalSectionWakerRegistration,
    ready: AtomicBool,
    claimed: AtomicBool,
}

impl Default for Handoff {
    fn default() -> Self {
        Self::new()
    }
}

impl Handoff {
    /// Create a new, unsignaled handoff.
    pub const fn new() -> Self {
        Self {
            waker: CriticalSectionWakerRegistration::new(),
            ready: AtomicBool::new(false),
            claimed: AtomicBool::new(false),
        }
    }

    /// Mark the measurement as ready and wake the receiver.
    ///
    /// Safe to call from interrupt context: it never waits.
    pub fn signal(&self) {
        fence(Ordering::SeqCst);
        self.ready.store(true, Ordering::Release);
        self.waker.wake();
    }

    /// Whether a signal is latched and not yet consumed.
    pub fn is_signaled(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    /// Drop a latched signal, if any.
    pub fn clear(&self) {
        self.ready.store(false, Ordering::Release);
    }

    /// Take the receiving end of the handoff.
    ///
    /// Only one receiver may exist at a time; the claim is released when it is dropped.
    pub fn claim(&self) -> Result<HandoffReceiver<'_>, AlreadyClaimed> {
        if self.claimed.swap(true, Ordering::AcqRel) {
            Err(AlreadyClaimed)
        } else {
            Ok(HandoffReceiver { parent: self })
        }
    }

    /// Whether a receiver is currently alive.
    pub fn is_claimed(&self) -> bool {
        self.claimed.load(Ordering::Acquire)
    }
}

/// The consuming end of a [`Handoff`].
pub struct HandoffReceiver<'a> {
    parent: &'a Handoff,
}

impl HandoffReceiver<'_> {
    /// Consume a latched signal without waiting. Returns `true` if one was pending.
    pub fn try_take(&mut self) -> bool {
        let taken = self.parent.ready.swap(false, Ordering::AcqRel);
        if taken {
            fence(Ordering::SeqCst);
        }
        taken
    }

    /// Wait for the handoff to be signaled and consume it.
    ///
    /// If a signal is already latched this resolves on the first poll.
    pub async fn wait(&mut self) {
        poll_fn(|ctx| {
            if self.try_take() {
                return Poll::Ready(());
            }

            self.parent.waker.register(ctx.waker());

            // The interrupt may have fired between the check and the registration.
            if self.try_take() {
                Poll::Ready(())
            } else {
                Poll::Pending
            }
        })
        .await
    }

    /// Discard any latched signal, then wait for a new one.
    pub async fn wait_fresh(&mut self) {
        self.parent.clear();
        self.wait().await
    }

    /// The handoff this receiver belongs to.
    pub fn handoff(&self) -> &Handoff {
        self.parent
    }
}

impl Drop for HandoffReceiver<'_> {
    fn drop(&mut self) {
        self.parent.claimed.store(false, Ordering::Release);
    }
}

/// Convenience macro for creating a `'static` handoff and claiming its receiver.
///
/// Evaluates to `(&'static Handoff, HandoffReceiver<'static>)`.
#[macro_export]
macro_rules! make_handoff {
    () => {{
        static HANDOFF: $crate::Handoff = $crate::Handoff::new();

        match HANDOFF.claim() {
            Ok(receiver) => (&HANDOFF, receiver),
            Err(_) => panic!("handoff claimed twice"),
        }
    }};
}

//! Synchronization primitives for handing a completed measurement from interrupt context to a
//! waiting task.

#![no_std]
#![deny(missing_docs)]

pub mod handoff;

pub use handoff::{AlreadyClaimed, Handoff, HandoffReceiver};

#[cfg(test)]
#[macro_use]
extern crate std;

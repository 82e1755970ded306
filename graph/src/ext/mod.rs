/// Extension traits and cancellation primitives for futures.
pub mod futures;

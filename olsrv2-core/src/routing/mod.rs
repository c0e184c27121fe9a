//! Routing: per-domain SPF (spec §4.6) plus the FIB it feeds.

pub mod dijkstra;
pub mod fib;

pub use dijkstra::SpfResult;
pub use fib::{Fib, FibAdapter, FibDiff, Route};

//! Synchronous OLSRv2 (RFC 7181) engine: NHDP link/neighbor state, the
//! RFC 5444 wire codec, MPR selection, the topology database and the
//! Dijkstra routing engine.
//!
//! This crate has no I/O of its own and no async runtime dependency — every
//! external effect (sending a packet, arming a timer, programming a route)
//! goes through a trait in [`timer`], [`iface`] or [`routing::fib`] that an
//! embedder (the `olsrv2d` binary) implements against real sockets, a real
//! clock and a real kernel routing table. That split is what makes the run
//! loop in [`daemon`] unit-testable without spinning up a network.

pub mod address;
pub mod codec;
pub mod config;
pub mod daemon;
pub mod domain;
pub mod duplicate;
pub mod error;
pub mod iface;
pub mod mpr;
pub mod nhdp;
pub mod routing;
pub mod tc;
pub mod telemetry;
pub mod timer;

pub use address::{Address, AddressFamily, Prefix, RouteKey};
pub use daemon::Daemon;
pub use domain::{DomainId, Metric, Willingness};
pub use error::{OlsrError, Result};

//! buscribe - reverse-engineer an undocumented home-automation bus.
//!
//! This crate captures the command set of a wallpad control bus (RS-485
//! reachable through a TCP-to-serial bridge) without a protocol spec: the
//! operator physically triggers device actions while buscribe compares
//! stimulated traffic against a quiet baseline, isolates the frame the
//! action caused, and persists a validated command catalog.
//!
//! # Architecture
//!
//! Data flows leaf-first through small synchronous pieces:
//!
//! - **Transport** - timeout-bounded byte stream to the bridge
//! - **FrameExtractor** - chunk stream → complete `AA 55 .. 0D 0D` frames
//! - **DecodedFrame** - display-only field view (device class, room, ...)
//! - **Classifier** - baseline-vs-action differencing across trials
//! - **SessionRunner** - the baseline/action/verify state machine
//! - **CatalogStore** - atomic, versioned command persistence
//!
//! Exactly one capture session runs at a time; the whole tool is a single
//! human-paced actor over one exclusively-owned connection.

// Library modules
pub mod catalog;
pub mod classify;
pub mod commands;
pub mod config;
pub mod constants;
pub mod decode;
pub mod extractor;
pub mod frame;
pub mod operator;
pub mod session;
pub mod transport;

// Re-export commonly used types
pub use catalog::{CatalogEntry, CatalogStore};
pub use classify::{classify, Trial, Verdict};
pub use config::Config;
pub use decode::{DecodedFrame, DeviceClass};
pub use extractor::FrameExtractor;
pub use frame::Frame;
pub use operator::{ConsoleOperator, Operator};
pub use session::{SessionOutcome, SessionRunner, SessionSettings};
pub use transport::{TcpTransport, Transport};

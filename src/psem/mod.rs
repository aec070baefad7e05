//! # PSEM Session Plumbing
//!
//! The transport capability consumed from the session layer, the
//! open/write/close procedure orchestrator built on it, and an in-memory
//! meter simulator with JSON images for tests and the CLI.

pub mod image;
pub mod memory_transport;
pub mod procedure;
pub mod transport;

pub use image::{MeterImage, MeterProfile};
pub use memory_transport::{CallKind, MemoryTransport, TransportCall};
pub use procedure::{commit, execute, order_writes, CommitResult, DataResetFlags, TableWrite};
pub use transport::{ProcedureResponse, ProcedureResult, PsemResponse, Transport, TransportError};

//! Chunked upload handling.

pub mod assembler;
pub mod cleanup;
pub mod spool;
pub mod store;

pub use assembler::ChunkReassembler;
pub use cleanup::SessionSweeper;
pub use spool::ChunkSpool;
pub use store::SessionStore;

//! # slidehub-storage
//!
//! Local and remote storage for SlideHub: the per-session chunk spool, the
//! in-memory session store, the reassembler that merges a complete session
//! into one file, the idle-session sweep, and the object-store providers
//! used to publish generated pyramids.

pub mod chunked;
pub mod providers;

pub use chunked::{ChunkReassembler, ChunkSpool, SessionStore, SessionSweeper};
pub use providers::{ConfigStoreResolver, LocalObjectStore, StoreResolver};

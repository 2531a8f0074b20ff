//! Local ycloud backend.
//!
//! Answers command envelopes in-process: [`dispatch`] routes a request to a
//! [`Handler`], and [`StorageBackend`] persists uploaded files to disk.

pub mod handler;
pub mod storage;

pub use handler::{Handler, HandlerFuture, dispatch};
pub use storage::StorageBackend;

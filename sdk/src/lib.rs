//! dgen
//!
//! This crate provides runtime support for code generated from `.dg` schemas.
//!
//! - `wire`: byte buffers, the `Message` trait and `WireError`
//! - `rpc`: the `Registrar` seam generated `register_*` functions bind to,
//!   plus `Router`, an in-process dispatcher
//! - re-exports of `serde` and `serde_json` used by JSON-mode output

pub use dgen_wire as wire;
pub use dgen_wire::{ByteBuffer, ByteBufferMut, Message, WireError};

pub use serde;
pub use serde_json;

pub mod rpc;

pub use rpc::{MethodHandler, Registrar, Router, RpcError};

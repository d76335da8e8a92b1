//! Boundary contracts between the mirrorloop engine and the wire-level
//! client that talks to a remote network controller.
//!
//! This crate deliberately carries no transport code. The concrete REST
//! client lives outside the workspace and implements [`ResourceClient`];
//! the engine in `mirrorloop-core` consumes that trait and nothing else.
//!
//! - **[`ResourceKind`]** — type tags for every mirrored configuration
//!   object, including synthetic companion kinds that are never fetched
//!   directly.
//! - **[`RawRecord`]** — one untyped resource payload as returned by the
//!   remote controller, retained verbatim for pass-through updates.
//! - **[`FetchError`]** — the failure taxonomy the engine's recovery
//!   logic keys on: unsupported, transient, throttled, auth.

pub mod client;
pub mod error;
pub mod kind;
pub mod record;

pub use client::ResourceClient;
pub use error::FetchError;
pub use kind::ResourceKind;
pub use record::RawRecord;

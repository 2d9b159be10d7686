//! # lib_common
//!
//! Shared library behind the `room_subscriber` service. Each top-level module is gated
//! behind a Cargo feature of the same name so binaries only compile what they use;
//! `full` turns everything on.

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms, unused_qualifications)]

#[cfg(feature = "configs")]
pub mod configs;
#[cfg(feature = "core")]
pub mod core;
#[cfg(feature = "ingestors")]
pub mod ingestors;
#[cfg(feature = "loggers")]
pub mod loggers;
#[cfg(feature = "retrieve")]
pub mod retrieve;
#[cfg(feature = "rooms")]
pub mod rooms;

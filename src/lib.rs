//! Tapedeck - record-on-first-use, replay-forever HTTP fixtures
//!
//! Requests are matched against ordered rules, content-addressed by a digest of the
//! rule's key, and served from disk once recorded. Concurrent requests for the same
//! digest share a single live recording.

#![deny(unsafe_op_in_unsafe_fn)]
#![warn(missing_docs, clippy::all, clippy::pedantic, clippy::cargo)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::cast_possible_truncation,
    clippy::multiple_crate_versions
)]

pub mod body;
pub mod client;
pub mod config;
pub mod error;
pub mod fingerprint;
pub mod matcher;
pub mod message;
pub mod network;
pub mod recording;
pub mod replay;
pub mod stabilizer;
pub mod storage;

pub use body::{Body, ResponseType};
pub use client::{Client, Transport};
pub use config::{ClientConfig, Settings};
pub use error::{Result, TapedeckError};
pub use fingerprint::{digest, Digest};
pub use matcher::Rule;
pub use message::{HeaderList, LiveResponse, Request, Response};
pub use recording::{Decision, Recorder};
pub use stabilizer::{header_deleter, HeaderStabilizer};

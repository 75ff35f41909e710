//! Replay engine for serving recorded responses

mod engine;

pub use engine::{http_date, inject_date, replay};

// src/api/policy.rs

//! Best-effort read policy.
//!
//! Read paths never fail the HTTP response because of the backend: a failed
//! query, an unreadable document or a bad long-term snapshot is logged and
//! the handler carries on with whatever it already has. Callers therefore
//! cannot tell "not found" from "backend error" from "found but empty".
//! Keeping that rule behind one name lets the handlers state it explicitly
//! and lets the tests pin it down.

use std::fmt::Display;
use tracing::error;

pub trait BestEffort<T> {
    /// Keep the value, or log the failure with `context` and yield `None`
    fn best_effort(self, context: &str) -> Option<T>;
}

impl<T, E: Display> BestEffort<T> for Result<T, E> {
    fn best_effort(self, context: &str) -> Option<T> {
        match self {
            Ok(value) => Some(value),
            Err(e) => {
                error!("{}: {}", context, e);
                None
            }
        }
    }
}

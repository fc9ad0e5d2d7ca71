//! Property and contract tests for the measrig core library
//!
//! These exercise the device layer through its public API against the
//! scripted transport, so transport-call counts and ordering are exact.

// Allow common test patterns that Clippy warns about
#![allow(clippy::redundant_clone)]
#![allow(clippy::similar_names)]
#![allow(clippy::too_many_lines)]

mod properties;

//! Workspace-level integration tests for respool.
//!
//! The tests themselves live in `tests/`; this crate only anchors them.

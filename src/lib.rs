//! Workspace root crate.
//!
//! Exists to anchor workspace-wide tooling (cargo-husky git hooks); all
//! functionality lives in the `crates/*` members.

//! Integration tests for evidence-pack
//!
//! These tests drive the writer, loader and CLI together through real
//! directories on disk.

#[path = "../common/mod.rs"]
pub mod common;

pub mod cli;
pub mod legacy_packs;
pub mod pack_roundtrip;

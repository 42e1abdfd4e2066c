// src/commands/mod.rs
//! Command handlers for the mkvfx CLI

mod bake;

pub use bake::cmd_bake;

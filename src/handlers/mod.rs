// src/handlers/mod.rs
pub mod catalog;
pub mod generate;
pub mod pipeline; // 📡 Snapshot + WebSocket progress
pub mod sessions;
pub mod status;
pub mod voiceover;

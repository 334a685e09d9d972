// crates/docbridge-core/src/core/mod.rs
// ============================================================================
// Module: Docbridge Core Model
// Description: Core data model modules for the access point.
// Purpose: Group identifier, message, transmission, and helper modules.
// Dependencies: crate submodules
// ============================================================================

//! ## Overview
//! The core model groups the scheme-validated identifiers, the message and
//! receipt types, the transmission state machine, and the small helper
//! modules (hashing, timestamps, XML scanning) shared by the directory and
//! exchange crates.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod hashing;
pub mod identifiers;
pub mod message;
pub mod profile;
pub mod time;
pub mod transmission;
pub mod xmlscan;

//! Resort Check-in - QR check-in bridge
//!
//! Headless companion for the resort admin backend's check-in desk.
//!
//! This library provides:
//! - Camera ownership with at most one live stream and a leak watchdog
//! - QR decode sessions with a single, exactly-once outcome
//! - Booking lookup by `RM-`/`KMR-` and `FS-`/`FSL-` codes
//! - Status transition rules for bookings, orders and payments
//! - A local HTTP API with Server-Sent Events for toasts and scan progress

// =============================================================================
// Lints - Enforce code quality and consistency
// =============================================================================

#![deny(unsafe_code)]
#![deny(unused_must_use)]

pub mod api;
pub mod backend;
pub mod bus;
pub mod camera;
pub mod config;
pub mod desk;
pub mod lookup;
pub mod scanner;
pub mod transitions;

//! Tracker use-case services.
//!
//! # Responsibility
//! - Orchestrate store, dirty tracking, persistence and exchange into the
//!   operations a UI calls (toggle, save, save all, export, import).
//! - Keep UI/FFI layers decoupled from storage and codec details.

pub mod tracker_service;

//! Flutter bridge for the LAMIS tracker core.

pub mod api;

//! WebSocket handler for the web layer.
//!
//! This module contains only the Axum handler and the socket pump. The
//! connection registry, payload shaping and message types live in the
//! `realtime` crate.

pub(crate) mod handler;

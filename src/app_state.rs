use std::sync::Arc;

use crate::services::{gate::Gate, preview::PreviewBoard};

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub gate: Gate,
    pub board: Arc<PreviewBoard>,
}

impl AppState {
    pub fn new(gate: Gate, board: Arc<PreviewBoard>) -> Self {
        Self { gate, board }
    }
}

//! Application state shared across handlers

use std::sync::Arc;

use mdbadmin_core::connection_registry::ConnectionBackend;
use mdbadmin_core::gateway::ExecutionGateway;

pub struct AppState<B: ConnectionBackend> {
    gateway: Arc<ExecutionGateway<B>>,
}

impl<B: ConnectionBackend> AppState<B> {
    pub fn new(gateway: Arc<ExecutionGateway<B>>) -> Self {
        Self { gateway }
    }

    pub fn gateway(&self) -> &ExecutionGateway<B> {
        &self.gateway
    }
}

// Derived Clone would require `B: Clone`.
impl<B: ConnectionBackend> Clone for AppState<B> {
    fn clone(&self) -> Self {
        Self {
            gateway: Arc::clone(&self.gateway),
        }
    }
}

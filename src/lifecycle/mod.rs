//! Lifecycle management for rover components

use crate::error::Result;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

/// Trait for components that follow a lifecycle pattern
pub trait LifecycleNode: Send + Sync {
    /// Component name used in logs
    fn name(&self) -> &str;

    /// Configure the node
    fn on_configure(&mut self) -> Result<()>;

    /// Activate the node
    fn on_activate(&mut self) -> Result<()>;

    /// Deactivate the node
    fn on_deactivate(&mut self) -> Result<()>;

    /// Clean up the node
    fn on_cleanup(&mut self) -> Result<()>;
}

/// Base implementation for lifecycle nodes
#[derive(Debug)]
pub struct LifecycleNodeBase {
    pub name: String,
    state: State,
}

/// State of a lifecycle node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Unconfigured,
    Inactive,
    Active,
}

impl LifecycleNodeBase {
    /// Create a new lifecycle node base
    pub fn new(name: &str) -> Self {
        LifecycleNodeBase {
            name: name.to_string(),
            state: State::Unconfigured,
        }
    }

    /// Get the current state
    pub fn get_state(&self) -> State {
        self.state
    }

    /// Set the state
    pub fn set_state(&mut self, state: State) {
        log::debug!("{}: {:?} -> {:?}", self.name, self.state, state);
        self.state = state;
    }
}

/// Cooperative cancellation shared by a group of tasks.
///
/// Clones observe the same flag. Once cancelled it stays cancelled.
#[derive(Debug, Clone)]
pub struct CancellationToken {
    flag: Arc<watch::Sender<bool>>,
}

impl CancellationToken {
    /// Create a token that is not cancelled
    pub fn new() -> Self {
        CancellationToken {
            flag: Arc::new(watch::Sender::new(false)),
        }
    }

    /// Request cancellation of every task holding this token
    pub fn cancel(&self) {
        self.flag.send_replace(true);
    }

    /// Whether cancellation has been requested
    pub fn is_cancelled(&self) -> bool {
        *self.flag.borrow()
    }

    /// Resolve once cancellation has been requested
    pub async fn cancelled(&self) {
        let mut rx = self.flag.subscribe();
        // The sender lives in `self`, so the channel cannot close here.
        let _ = rx.wait_for(|cancelled| *cancelled).await;
    }

    /// Sleep for `duration` unless cancelled first.
    ///
    /// Returns `false` when the sleep was cut short by cancellation.
    pub async fn sleep(&self, duration: Duration) -> bool {
        if self.is_cancelled() {
            return false;
        }
        tokio::select! {
            _ = self.cancelled() => false,
            _ = tokio::time::sleep(duration) => !self.is_cancelled(),
        }
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

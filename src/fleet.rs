//! A registry of independent device sessions for multi-device scenarios.
//!
//! Each session sits behind its own mutex; nothing is shared between sessions.
//!
//! 多设备场景下独立设备会话的注册表。每个会话有自己的互斥锁，会话之间不共享状态。

use crate::{
    config::SessionConfig,
    device::{DeviceSession, DeviceState},
    error::{Error, Result},
    network::Connector,
};
use dashmap::{DashMap, mapref::entry::Entry};
use std::{sync::Arc, time::Duration};
use tokio::sync::Mutex;
use tracing::{debug, info};

/// A session that can be driven from several tasks, one at a time.
pub type SharedSession<C> = Arc<Mutex<DeviceSession<C>>>;

/// Sessions keyed by device id.
pub struct DeviceFleet<C> {
    sessions: DashMap<String, SharedSession<C>>,
    config: SessionConfig,
}

impl<C> std::fmt::Debug for DeviceFleet<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceFleet")
            .field("devices", &self.sessions.len())
            .field("config", &self.config)
            .finish()
    }
}

impl<C: Connector> DeviceFleet<C> {
    /// Every session added to the fleet gets a copy of `config`.
    pub fn new(config: SessionConfig) -> Self {
        Self {
            sessions: DashMap::new(),
            config,
        }
    }

    /// Creates a session for `device_id` backed by `connector`.
    pub fn add(&self, device_id: impl Into<String>, connector: C) -> Result<SharedSession<C>> {
        let device_id = device_id.into();
        match self.sessions.entry(device_id.clone()) {
            Entry::Occupied(_) => Err(Error::DuplicateDevice(device_id)),
            Entry::Vacant(entry) => {
                let session = Arc::new(Mutex::new(DeviceSession::new(
                    device_id.clone(),
                    self.config.clone(),
                    connector,
                )));
                entry.insert(session.clone());
                debug!(device_id = %device_id, "Device added to fleet");
                Ok(session)
            }
        }
    }

    pub fn get(&self, device_id: &str) -> Result<SharedSession<C>> {
        self.sessions
            .get(device_id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| Error::UnknownDevice(device_id.to_string()))
    }

    /// Drops the fleet's handle on a session and returns it.
    pub fn remove(&self, device_id: &str) -> Result<SharedSession<C>> {
        self.sessions
            .remove(device_id)
            .map(|(_, session)| session)
            .ok_or_else(|| Error::UnknownDevice(device_id.to_string()))
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Device ids in sorted order.
    pub fn device_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.sessions.iter().map(|e| e.key().clone()).collect();
        ids.sort();
        ids
    }

    /// Current state of every device, sorted by id.
    pub async fn states(&self) -> Vec<(String, DeviceState)> {
        let mut states = Vec::with_capacity(self.sessions.len());
        for (id, session) in self.snapshot() {
            let state = session.lock().await.state();
            states.push((id, state));
        }
        states
    }

    /// Shuts down every device, sorted by id, and reports each outcome.
    pub async fn shutdown_all(&self) -> Vec<(String, Result<()>)> {
        let mut outcomes = Vec::with_capacity(self.sessions.len());
        for (id, session) in self.snapshot() {
            let outcome = session.lock().await.shutdown();
            outcomes.push((id, outcome));
        }
        info!(devices = outcomes.len(), "Fleet shut down");
        outcomes
    }

    /// Signaling events across the whole fleet in the trailing `window`.
    pub async fn signaling_events_in(&self, window: Duration) -> usize {
        let mut total = 0;
        for (_, session) in self.snapshot() {
            total += session.lock().await.signaling_events_in(window);
        }
        total
    }

    /// Clones the handles out so no map guard is held across an await.
    fn snapshot(&self) -> Vec<(String, SharedSession<C>)> {
        let mut entries: Vec<_> = self
            .sessions
            .iter()
            .map(|e| (e.key().clone(), e.value().clone()))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        entries
    }
}

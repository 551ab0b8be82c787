//! Shared test doubles for the integration tests
#![allow(dead_code)]

use async_trait::async_trait;
use rover_core::common::{NotificationKind, NotificationSink};
use rover_core::config::RoverConfig;
use rover_core::control::{CommandDispatcher, DriveCommand};
use rover_core::error::SensorError;
use rover_core::perception::{DistanceSensor, Localizer};
use rover_core::{RoverCore, RoverIo};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Dispatcher that records every command in order
#[derive(Default)]
pub struct RecordingDispatcher {
    commands: Mutex<Vec<DriveCommand>>,
}

impl RecordingDispatcher {
    pub fn commands(&self) -> Vec<DriveCommand> {
        self.commands.lock().unwrap().clone()
    }

    pub fn count(&self, command: DriveCommand) -> usize {
        self.commands
            .lock()
            .unwrap()
            .iter()
            .filter(|c| **c == command)
            .count()
    }

    pub fn clear(&self) {
        self.commands.lock().unwrap().clear();
    }
}

impl CommandDispatcher for RecordingDispatcher {
    fn execute(&self, command: DriveCommand) {
        self.commands.lock().unwrap().push(command);
    }
}

/// Sink that records every notification
#[derive(Default)]
pub struct RecordingSink {
    entries: Mutex<Vec<(NotificationKind, String)>>,
}

impl RecordingSink {
    pub fn messages(&self) -> Vec<String> {
        self.entries
            .lock()
            .unwrap()
            .iter()
            .map(|(_, data)| data.clone())
            .collect()
    }

    pub fn of_kind(&self, kind: NotificationKind) -> Vec<String> {
        self.entries
            .lock()
            .unwrap()
            .iter()
            .filter(|(k, _)| *k == kind)
            .map(|(_, data)| data.clone())
            .collect()
    }

    pub fn count(&self, text: &str) -> usize {
        self.messages().iter().filter(|m| *m == text).count()
    }
}

impl NotificationSink for RecordingSink {
    fn notify(&self, kind: NotificationKind, _name: Option<&str>, data: &str) {
        self.entries.lock().unwrap().push((kind, data.to_string()));
    }
}

/// Range finder that replays queued readings, then a fixed fallback
pub struct ScriptedDistanceSensor {
    readings: Mutex<VecDeque<Result<f64, SensorError>>>,
    fallback: f64,
    reads: Mutex<usize>,
}

impl ScriptedDistanceSensor {
    pub fn new(readings: &[f64], fallback: f64) -> Self {
        ScriptedDistanceSensor {
            readings: Mutex::new(readings.iter().map(|d| Ok(*d)).collect()),
            fallback,
            reads: Mutex::new(0),
        }
    }

    pub fn constant(distance_cm: f64) -> Self {
        Self::new(&[], distance_cm)
    }

    pub fn push(&self, reading: Result<f64, SensorError>) {
        self.readings.lock().unwrap().push_back(reading);
    }

    pub fn remaining(&self) -> usize {
        self.readings.lock().unwrap().len()
    }

    pub fn reads(&self) -> usize {
        *self.reads.lock().unwrap()
    }
}

#[async_trait]
impl DistanceSensor for ScriptedDistanceSensor {
    async fn measure_cm(&self, _timeout: Duration) -> Result<f64, SensorError> {
        *self.reads.lock().unwrap() += 1;
        let next = self.readings.lock().unwrap().pop_front();
        next.unwrap_or(Ok(self.fallback))
    }
}

/// Range finder that never answers
pub struct StalledDistanceSensor;

#[async_trait]
impl DistanceSensor for StalledDistanceSensor {
    async fn measure_cm(&self, _timeout: Duration) -> Result<f64, SensorError> {
        std::future::pending().await
    }
}

/// Configuration with every period shortened for tests
pub fn fast_config() -> RoverConfig {
    let mut config = RoverConfig::default();
    config.navigation.decision_period_ms = 10;
    config.navigation.advance_period_ms = 10;
    config.navigation.drive_period_ms = 10;
    config.navigation.completion_grace_ms = 20;
    config.obstacle.period_ms = 10;
    config.obstacle.read_timeout_ms = 30;
    config
}

pub struct Harness {
    pub core: RoverCore,
    pub localizer: Arc<Localizer>,
    pub dispatcher: Arc<RecordingDispatcher>,
    pub sink: Arc<RecordingSink>,
}

/// Build and initialize a core around recording doubles
pub fn harness(distance: Arc<dyn DistanceSensor>) -> Harness {
    let localizer = Arc::new(Localizer::new());
    let dispatcher = Arc::new(RecordingDispatcher::default());
    let sink = Arc::new(RecordingSink::default());
    let io = RoverIo {
        position: localizer.clone(),
        heading: localizer.clone(),
        distance,
        dispatcher: dispatcher.clone(),
        notifier: sink.clone(),
    };
    let mut core = RoverCore::new(fast_config(), io).unwrap();
    core.init().unwrap();
    Harness {
        core,
        localizer,
        dispatcher,
        sink,
    }
}

/// Poll `condition` until it holds or two seconds pass
pub async fn eventually(mut condition: impl FnMut() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    condition()
}

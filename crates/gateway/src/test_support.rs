//! Shared fakes for gateway unit tests

use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};

use parking_lot::Mutex;

use relay_core::clock::Clock;
use relay_core::config::{ConfigLoader, GatewayConfig};
use relay_core::event::OutboundEvent;
use relay_core::{Error, Result};

use crate::sink::{BroadcastOptions, Broadcaster, SessionSender};

pub struct ManualClock {
    now: AtomicI64,
}

impl ManualClock {
    pub fn new(now: i64) -> Self {
        Self {
            now: AtomicI64::new(now),
        }
    }

    pub fn advance(&self, ms: i64) {
        self.now.fetch_add(ms, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}

#[derive(Default)]
pub struct CountingConfigLoader {
    config: Mutex<GatewayConfig>,
    calls: AtomicUsize,
    failing: AtomicBool,
}

impl CountingConfigLoader {
    pub fn from_json(value: serde_json::Value) -> Self {
        let loader = Self::default();
        *loader.config.lock() = serde_json::from_value(value).unwrap();
        loader
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl ConfigLoader for CountingConfigLoader {
    fn load(&self) -> Result<GatewayConfig> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(Error::ConfigLoad("invalid config".to_string()));
        }
        Ok(self.config.lock().clone())
    }
}

/// Records every frame sent through either channel
#[derive(Default)]
pub struct RecordingSink {
    broadcasts: Mutex<Vec<(OutboundEvent, BroadcastOptions)>>,
    deliveries: Mutex<Vec<(String, OutboundEvent)>>,
}

impl RecordingSink {
    pub fn broadcasts(&self) -> Vec<(OutboundEvent, BroadcastOptions)> {
        self.broadcasts.lock().clone()
    }

    pub fn deliveries(&self) -> Vec<(String, OutboundEvent)> {
        self.deliveries.lock().clone()
    }

    pub fn broadcast_named(&self, name: &str) -> Vec<OutboundEvent> {
        self.broadcasts
            .lock()
            .iter()
            .filter(|(event, _)| event.name() == name)
            .map(|(event, _)| event.clone())
            .collect()
    }

    pub fn delivered_named(&self, name: &str) -> Vec<OutboundEvent> {
        self.deliveries
            .lock()
            .iter()
            .filter(|(_, event)| event.name() == name)
            .map(|(_, event)| event.clone())
            .collect()
    }
}

impl Broadcaster for RecordingSink {
    fn broadcast(&self, event: &OutboundEvent, options: BroadcastOptions) {
        self.broadcasts.lock().push((event.clone(), options));
    }
}

impl SessionSender for RecordingSink {
    fn send_to_session(&self, session_key: &str, event: &OutboundEvent) {
        self.deliveries
            .lock()
            .push((session_key.to_string(), event.clone()));
    }
}

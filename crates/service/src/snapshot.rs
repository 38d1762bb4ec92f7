use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use parking_lot::Mutex;
use partnerdesk_core::{synthetic_events, AgentEvent};

pub const SNAPSHOT_TTL: Duration = Duration::from_secs(60);
pub const SNAPSHOT_EVENTS: usize = 100;

pub struct MetricsSnapshot {
    ttl: Duration,
    events: usize,
    cached: Mutex<Option<(Instant, Arc<Vec<AgentEvent>>)>>,
}

impl MetricsSnapshot {
    pub fn new(ttl: Duration, events: usize) -> Self {
        Self {
            ttl,
            events,
            cached: Mutex::new(None),
        }
    }

    pub fn events(&self) -> Arc<Vec<AgentEvent>> {
        let mut cached = self.cached.lock();
        if let Some((generated, events)) = cached.as_ref() {
            if generated.elapsed() < self.ttl {
                return events.clone();
            }
        }
        let events = Arc::new(synthetic_events(
            self.events,
            Utc::now(),
            &mut rand::thread_rng(),
        ));
        *cached = Some((Instant::now(), events.clone()));
        events
    }
}

impl Default for MetricsSnapshot {
    fn default() -> Self {
        Self::new(SNAPSHOT_TTL, SNAPSHOT_EVENTS)
    }
}

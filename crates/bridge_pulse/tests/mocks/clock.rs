use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use bridge_pulse::clock::Clock;

#[derive(Clone, Default)]
pub struct MockClock {
    pub sleeps: Arc<Mutex<Vec<Duration>>>,
}

impl Clock for MockClock {
    async fn sleep(&self, duration: Duration) {
        self.sleeps.lock().unwrap().push(duration);
    }
}

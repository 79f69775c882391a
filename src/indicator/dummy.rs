use crate::indicator::{Indicator, Status};
use async_trait::async_trait;

/// Records what it was told instead of driving real pins, for tests.
pub struct DummyIndicator {
    status: Status,
    heartbeat_count: u32,
    flash_count: u32,
}

impl DummyIndicator {
    pub fn new() -> Self {
        DummyIndicator {
            status: Status::Off,
            heartbeat_count: 0,
            flash_count: 0,
        }
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn heartbeat_count(&self) -> u32 {
        self.heartbeat_count
    }

    pub fn flash_count(&self) -> u32 {
        self.flash_count
    }
}

impl Default for DummyIndicator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Indicator for DummyIndicator {
    fn set_status(&mut self, status: Status) {
        self.status = status;
    }

    async fn blink_heartbeat(&mut self) {
        self.heartbeat_count += 1;
    }

    async fn flash_ack(&mut self) {
        self.flash_count += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn tracks_status_and_counts() {
        let mut ind = DummyIndicator::new();
        ind.set_status(Status::RedBlink);
        ind.blink_heartbeat().await;
        ind.blink_heartbeat().await;
        ind.flash_ack().await;

        assert_eq!(ind.status(), Status::RedBlink);
        assert_eq!(ind.heartbeat_count(), 2);
        assert_eq!(ind.flash_count(), 1);
    }
}

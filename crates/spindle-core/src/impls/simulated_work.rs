//! SimulatedWork - アルゴリズムの代わりに 1 tick ごとに sleep する

use std::time::Duration;

use async_trait::async_trait;

use crate::domain::{TaskId, WorkError};
use crate::ports::UnitOfWork;

/// Sleeps for a fixed duration per tick.
#[derive(Debug, Clone, Copy)]
pub struct SimulatedWork {
    per_tick: Duration,
}

impl SimulatedWork {
    pub fn new(per_tick: Duration) -> Self {
        Self { per_tick }
    }

    pub fn per_tick(&self) -> Duration {
        self.per_tick
    }
}

#[async_trait]
impl UnitOfWork for SimulatedWork {
    async fn run_tick(&self, task_id: &TaskId, tick: u32) -> Result<(), WorkError> {
        tracing::trace!(task_id = %task_id, tick, "simulated tick");
        tokio::time::sleep(self.per_tick).await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::Instant;

    #[tokio::test(start_paused = true)]
    async fn each_tick_takes_the_configured_time() {
        let work = SimulatedWork::new(Duration::from_secs(3));
        let start = Instant::now();
        work.run_tick(&TaskId::new("t"), 1).await.unwrap();
        work.run_tick(&TaskId::new("t"), 2).await.unwrap();
        assert_eq!(start.elapsed(), Duration::from_secs(6));
    }
}

use async_trait::async_trait;
use std::time::Duration;
use tokio::time::{Instant, sleep_until};

use crate::radar::RadarError;

// Even when no task is due for a long time, wake up this often
pub const MAX_IDLE: Duration = Duration::from_secs(10);

///
/// A periodic duty. `run` is called each time the task is due, on the
/// scheduler's single thread, and must not wait on anything but its own sends.
///
#[async_trait]
pub trait PeriodicTask: Send {
    fn name(&self) -> &str;

    async fn run(&mut self) -> Result<(), RadarError>;
}

struct ScheduledTask {
    task: Box<dyn PeriodicTask>,
    interval: Duration,
    next_due: Instant,
}

///
/// Runs a fixed list of periodic tasks at their own cadence from one thread.
///
/// Every tick reads the clock once, runs each task that is due in
/// registration order and reschedules it relative to that reading. It then
/// sleeps until the earliest next due time.
///
pub struct Scheduler {
    tasks: Vec<ScheduledTask>,
    max_idle: Duration,
}

impl Scheduler {
    pub fn new() -> Self {
        Scheduler {
            tasks: Vec::new(),
            max_idle: MAX_IDLE,
        }
    }

    pub fn with_max_idle(mut self, max_idle: Duration) -> Self {
        self.max_idle = max_idle;
        self
    }

    /// Adds a task, due immediately and then every `interval`.
    pub fn register(
        &mut self,
        task: Box<dyn PeriodicTask>,
        interval: Duration,
    ) -> Result<(), RadarError> {
        if interval.is_zero() {
            return Err(RadarError::InvalidInterval(task.name().to_owned(), 0.));
        }
        log::debug!("Registered {} every {:?}", task.name(), interval);
        self.tasks.push(ScheduledTask {
            task,
            interval,
            next_due: Instant::now(),
        });
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn task_names(&self) -> impl Iterator<Item = &str> {
        self.tasks.iter().map(|t| t.task.name())
    }

    /// Runs every task that is due and returns when the scheduler should wake up
    /// next. A task error is returned as-is; the failing task keeps its old due time.
    pub async fn tick(&mut self) -> Result<Instant, RadarError> {
        let now = Instant::now();
        let mut next_wake = now + self.max_idle;

        for scheduled in self.tasks.iter_mut() {
            if scheduled.next_due <= now {
                log::trace!("Running {}...", scheduled.task.name());
                scheduled.task.run().await?;
                scheduled.next_due = now + scheduled.interval;
            }
            next_wake = next_wake.min(scheduled.next_due);
        }

        Ok(next_wake)
    }

    /// Loops forever, or until a task fails.
    pub async fn run(&mut self) -> Result<(), RadarError> {
        loop {
            let next_wake = self.tick().await?;
            if next_wake > Instant::now() {
                sleep_until(next_wake).await;
            }
        }
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    type RunLog = Arc<Mutex<Vec<(Instant, usize)>>>;

    struct Recorder {
        name: String,
        id: usize,
        log: RunLog,
    }

    #[async_trait]
    impl PeriodicTask for Recorder {
        fn name(&self) -> &str {
            &self.name
        }

        async fn run(&mut self) -> Result<(), RadarError> {
            self.log.lock().unwrap().push((Instant::now(), self.id));
            Ok(())
        }
    }

    struct Failing;

    #[async_trait]
    impl PeriodicTask for Failing {
        fn name(&self) -> &str {
            "failing"
        }

        async fn run(&mut self) -> Result<(), RadarError> {
            Err(RadarError::Config("boom".to_owned()))
        }
    }

    fn recorder(id: usize, log: &RunLog) -> Box<dyn PeriodicTask> {
        Box::new(Recorder {
            name: format!("task{}", id),
            id,
            log: log.clone(),
        })
    }

    async fn run_for(scheduler: &mut Scheduler, window: Duration) {
        let end = Instant::now() + window;
        while Instant::now() < end {
            let next_wake = scheduler.tick().await.unwrap();
            sleep_until(next_wake).await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn tasks_run_at_their_own_cadence() {
        let log = RunLog::default();
        let mut scheduler = Scheduler::new();
        scheduler.register(recorder(0, &log), Duration::from_millis(100)).unwrap();
        scheduler.register(recorder(1, &log), Duration::from_millis(100)).unwrap();
        scheduler.register(recorder(2, &log), Duration::from_millis(15)).unwrap();

        run_for(&mut scheduler, Duration::from_secs(1)).await;

        let log = log.lock().unwrap();
        let count = |id: usize| log.iter().filter(|(_, i)| *i == id).count() as f64;
        for (id, interval) in [(0, 0.1), (1, 0.1), (2, 0.015)] {
            let expected = 1.0 / interval;
            assert!(
                (count(id) - expected).abs() <= 1.0,
                "task{} ran {} times, expected about {}",
                id,
                count(id),
                expected
            );
        }
    }

    #[tokio::test(start_paused = true)]
    async fn simultaneous_tasks_run_in_registration_order() {
        let log = RunLog::default();
        let mut scheduler = Scheduler::new();
        scheduler.register(recorder(0, &log), Duration::from_millis(100)).unwrap();
        scheduler.register(recorder(1, &log), Duration::from_millis(100)).unwrap();
        scheduler.register(recorder(2, &log), Duration::from_millis(15)).unwrap();

        run_for(&mut scheduler, Duration::from_secs(1)).await;

        let log = log.lock().unwrap();
        assert_eq!(
            log.iter().take(3).map(|(_, id)| *id).collect::<Vec<_>>(),
            vec![0, 1, 2]
        );
        for pair in log.windows(2) {
            if pair[0].0 == pair[1].0 {
                assert!(pair[0].1 < pair[1].1, "out of order: {:?}", pair);
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn task_is_not_run_twice_for_the_same_due_time() {
        let log = RunLog::default();
        let mut scheduler = Scheduler::new();
        scheduler.register(recorder(0, &log), Duration::from_millis(100)).unwrap();

        let start = Instant::now();
        let next_wake = scheduler.tick().await.unwrap();
        assert_eq!(next_wake, start + Duration::from_millis(100));
        scheduler.tick().await.unwrap();
        assert_eq!(log.lock().unwrap().len(), 1);

        tokio::time::advance(Duration::from_millis(100)).await;
        scheduler.tick().await.unwrap();
        assert_eq!(log.lock().unwrap().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn idle_wakeup_is_capped() {
        let log = RunLog::default();
        let mut scheduler = Scheduler::new().with_max_idle(Duration::from_secs(2));
        scheduler.register(recorder(0, &log), Duration::from_secs(3600)).unwrap();

        let start = Instant::now();
        let next_wake = scheduler.tick().await.unwrap();
        assert_eq!(next_wake, start + Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn task_error_stops_the_loop() {
        let log = RunLog::default();
        let mut scheduler = Scheduler::new();
        scheduler.register(recorder(0, &log), Duration::from_millis(10)).unwrap();
        scheduler.register(Box::new(Failing), Duration::from_millis(10)).unwrap();

        assert!(matches!(scheduler.run().await, Err(RadarError::Config(_))));
        assert_eq!(log.lock().unwrap().len(), 1);
    }

    #[test]
    fn zero_interval_is_rejected() {
        let log = RunLog::default();
        let mut scheduler = Scheduler::new();
        assert!(matches!(
            scheduler.register(recorder(0, &log), Duration::ZERO),
            Err(RadarError::InvalidInterval(..))
        ));
        assert!(scheduler.is_empty());
    }
}

//! In-process scheduler firing jobs at fixed times of day.
//!
//! Tasks are registered on a [`Scheduler`] at start-up. [`Scheduler::start`]
//! spawns one tokio task per registration, each sleeping until its next
//! wall-clock fire time in the configured timezone. Each run is spawned on
//! its own, so a panicking job is logged and fires again next time.
//! Shutdown is observed between runs: a job that already started is never
//! interrupted.

use std::{future::Future, pin::Pin, sync::Arc};

use chrono::{DateTime, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use engine::{Engine, NotificationSink};
use tokio::{sync::watch, task::JoinSet};

pub use jobs::{recurring_payments, reminders};
pub use sink::TracingSink;

mod jobs;
mod sink;

pub type JobFuture = Pin<Box<dyn Future<Output = ()> + Send>>;
pub type JobHandler = Arc<dyn Fn() -> JobFuture + Send + Sync>;

#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    #[error("invalid timezone: {0}")]
    InvalidTimezone(String),
    #[error("invalid time of day: {0}")]
    InvalidTime(String),
    #[error("task already registered: {0}")]
    DuplicateTask(String),
}

/// When the built-in jobs fire.
#[derive(Clone, Debug, PartialEq)]
pub struct ScheduleSettings {
    pub timezone: Tz,
    pub recurring_at: Vec<NaiveTime>,
    pub reminders_at: Vec<NaiveTime>,
}

impl Default for ScheduleSettings {
    fn default() -> Self {
        Self {
            timezone: Tz::UTC,
            recurring_at: vec![NaiveTime::MIN],
            reminders_at: vec![hour(9), hour(18)],
        }
    }
}

fn hour(h: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, 0, 0).unwrap_or(NaiveTime::MIN)
}

impl ScheduleSettings {
    /// Builds settings from their textual form (`Europe/Rome`, `"09:00"`).
    pub fn parse<S: AsRef<str>>(
        timezone: &str,
        recurring_at: &[S],
        reminders_at: &[S],
    ) -> Result<Self, SchedulerError> {
        let timezone = timezone
            .parse::<Tz>()
            .map_err(|_| SchedulerError::InvalidTimezone(timezone.to_string()))?;
        let times = |raw: &[S]| {
            raw.iter()
                .map(|s| parse_time(s.as_ref()))
                .collect::<Result<Vec<_>, _>>()
        };
        Ok(Self {
            timezone,
            recurring_at: times(recurring_at)?,
            reminders_at: times(reminders_at)?,
        })
    }
}

/// Parses `HH:MM` or `HH:MM:SS`.
pub fn parse_time(raw: &str) -> Result<NaiveTime, SchedulerError> {
    let raw = raw.trim();
    NaiveTime::parse_from_str(raw, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M:%S"))
        .map_err(|_| SchedulerError::InvalidTime(raw.to_string()))
}

/// First instant strictly after `now` whose local time in `tz` is `at`.
///
/// A local time skipped by a DST gap is skipped for that day; an ambiguous
/// one fires at its earliest occurrence.
pub fn next_fire(now: DateTime<Utc>, at: NaiveTime, tz: Tz) -> Option<DateTime<Utc>> {
    now.with_timezone(&tz)
        .date_naive()
        .iter_days()
        .take(3)
        .filter_map(|day| tz.from_local_datetime(&day.and_time(at)).earliest())
        .map(|fire| fire.with_timezone(&Utc))
        .find(|fire| *fire > now)
}

#[derive(Clone)]
pub struct TaskDescriptor {
    pub name: String,
    pub at: NaiveTime,
    pub handler: JobHandler,
}

impl TaskDescriptor {
    pub fn new<F, Fut>(name: impl Into<String>, at: NaiveTime, job: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        Self {
            name: name.into(),
            at,
            handler: Arc::new(move || Box::pin(job()) as JobFuture),
        }
    }
}

impl std::fmt::Debug for TaskDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskDescriptor")
            .field("name", &self.name)
            .field("at", &self.at)
            .finish_non_exhaustive()
    }
}

/// Registry of timed tasks.
#[derive(Debug)]
pub struct Scheduler {
    timezone: Tz,
    tasks: Vec<TaskDescriptor>,
}

impl Scheduler {
    pub fn new(timezone: Tz) -> Self {
        Self {
            timezone,
            tasks: Vec::new(),
        }
    }

    /// Registers the recurring-payments and reminder jobs at the configured
    /// times.
    pub fn with_default_jobs(
        engine: Arc<Engine>,
        sink: Arc<dyn NotificationSink>,
        settings: &ScheduleSettings,
    ) -> Result<Self, SchedulerError> {
        let mut scheduler = Self::new(settings.timezone);

        for at in &settings.recurring_at {
            let engine = engine.clone();
            scheduler.register(TaskDescriptor::new(
                format!("recurring-payments@{}", at.format("%H:%M")),
                *at,
                move || {
                    let engine = engine.clone();
                    async move {
                        recurring_payments(&engine).await;
                    }
                },
            ))?;
        }

        for at in &settings.reminders_at {
            let engine = engine.clone();
            let sink = sink.clone();
            scheduler.register(TaskDescriptor::new(
                format!("reminders@{}", at.format("%H:%M")),
                *at,
                move || {
                    let engine = engine.clone();
                    let sink = sink.clone();
                    async move {
                        reminders(&engine, sink.as_ref()).await;
                    }
                },
            ))?;
        }

        Ok(scheduler)
    }

    /// Names must be unique.
    pub fn register(&mut self, task: TaskDescriptor) -> Result<(), SchedulerError> {
        if self.tasks.iter().any(|t| t.name == task.name) {
            return Err(SchedulerError::DuplicateTask(task.name));
        }
        tracing::debug!(task = %task.name, at = %task.at, "task registered");
        self.tasks.push(task);
        Ok(())
    }

    pub fn tasks(&self) -> &[TaskDescriptor] {
        &self.tasks
    }

    /// Spawns every registered task. Must be called inside a tokio runtime.
    pub fn start(self) -> SchedulerHandle {
        let (shutdown, _) = watch::channel(false);
        let mut tasks = JoinSet::new();

        for task in self.tasks {
            tasks.spawn(run_task(task, self.timezone, shutdown.subscribe()));
        }
        tracing::info!(timezone = %self.timezone, tasks = tasks.len(), "scheduler started");

        SchedulerHandle { shutdown, tasks }
    }
}

async fn run_task(task: TaskDescriptor, timezone: Tz, mut shutdown: watch::Receiver<bool>) {
    while !*shutdown.borrow() {
        let now = Utc::now();
        let Some(fire_at) = next_fire(now, task.at, timezone) else {
            tracing::error!(task = %task.name, "no next fire time, stopping task");
            return;
        };
        let wait = (fire_at - now).to_std().unwrap_or_default();
        tracing::debug!(task = %task.name, %fire_at, "next run scheduled");

        tokio::select! {
            _ = tokio::time::sleep(wait) => {}
            _ = shutdown.changed() => break,
        }

        tracing::info!(task = %task.name, "running task");
        if let Err(err) = tokio::spawn((task.handler)()).await {
            if err.is_panic() {
                tracing::error!(task = %task.name, "task panicked: {err}");
            } else {
                tracing::warn!(task = %task.name, "task cancelled: {err}");
            }
        }
    }
    tracing::debug!(task = %task.name, "task stopped");
}

/// Running scheduler. Dropping it without calling
/// [`SchedulerHandle::shutdown`] aborts the tasks.
pub struct SchedulerHandle {
    shutdown: watch::Sender<bool>,
    tasks: JoinSet<()>,
}

impl SchedulerHandle {
    /// Signals every task and waits for the running jobs to finish.
    pub async fn shutdown(mut self) {
        let _ = self.shutdown.send(true);
        while let Some(res) = self.tasks.join_next().await {
            if let Err(err) = res {
                tracing::warn!("scheduler task failed: {err}");
            }
        }
        tracing::info!("scheduler stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utc(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
    }

    fn time(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn fires_later_today_or_tomorrow() {
        let now = utc(2026, 3, 10, 8, 30);
        assert_eq!(next_fire(now, time(9, 0), Tz::UTC), Some(utc(2026, 3, 10, 9, 0)));
        assert_eq!(next_fire(now, time(8, 0), Tz::UTC), Some(utc(2026, 3, 11, 8, 0)));
        // exactly now is not "after now"
        assert_eq!(next_fire(now, time(8, 30), Tz::UTC), Some(utc(2026, 3, 11, 8, 30)));
    }

    #[test]
    fn honours_timezone() {
        let rome: Tz = "Europe/Rome".parse().unwrap();
        // 23:30 UTC on Jan 10 is already Jan 11 in Rome (UTC+1).
        let now = utc(2026, 1, 10, 23, 30);
        assert_eq!(next_fire(now, NaiveTime::MIN, rome), Some(utc(2026, 1, 11, 23, 0)));
        assert_eq!(next_fire(now, time(9, 0), rome), Some(utc(2026, 1, 11, 8, 0)));
    }

    #[test]
    fn dst_gap_moves_to_next_day() {
        let rome: Tz = "Europe/Rome".parse().unwrap();
        // 02:30 does not exist in Rome on 2026-03-29.
        let now = utc(2026, 3, 28, 23, 0);
        assert_eq!(next_fire(now, time(2, 30), rome), Some(utc(2026, 3, 30, 0, 30)));
    }

    #[test]
    fn parse_settings() {
        let settings =
            ScheduleSettings::parse::<&str>("Europe/Rome", &["00:00"], &["09:00", "18:30:00"])
                .unwrap();
        assert_eq!(settings.reminders_at, vec![time(9, 0), time(18, 30)]);
        assert!(ScheduleSettings::parse::<&str>("Mars/Olympus", &["00:00"], &["09:00"]).is_err());
        assert!(matches!(parse_time("25:00"), Err(SchedulerError::InvalidTime(_))));
    }

    #[test]
    fn defaults() {
        let settings = ScheduleSettings::default();
        assert_eq!(settings.timezone, Tz::UTC);
        assert_eq!(settings.recurring_at, vec![NaiveTime::MIN]);
        assert_eq!(settings.reminders_at, vec![time(9, 0), time(18, 0)]);
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let mut scheduler = Scheduler::new(Tz::UTC);
        scheduler
            .register(TaskDescriptor::new("job", NaiveTime::MIN, || async {}))
            .unwrap();
        let err = scheduler
            .register(TaskDescriptor::new("job", time(1, 0), || async {}))
            .unwrap_err();
        assert!(matches!(err, SchedulerError::DuplicateTask(name) if name == "job"));
        assert_eq!(scheduler.tasks().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn started_task_runs_and_stops() {
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let mut scheduler = Scheduler::new(Tz::UTC);
        scheduler
            .register(TaskDescriptor::new("ping", NaiveTime::MIN, move || {
                let tx = tx.clone();
                async move {
                    let _ = tx.send(());
                }
            }))
            .unwrap();

        let handle = scheduler.start();
        assert!(rx.recv().await.is_some());
        handle.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn panicking_run_does_not_stop_the_task() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let runs = Arc::new(AtomicUsize::new(0));
        let mut scheduler = Scheduler::new(Tz::UTC);
        scheduler
            .register(TaskDescriptor::new("flaky", NaiveTime::MIN, move || {
                let tx = tx.clone();
                let run = runs.fetch_add(1, Ordering::SeqCst);
                async move {
                    if run == 0 {
                        panic!("first run fails");
                    }
                    let _ = tx.send(run);
                }
            }))
            .unwrap();

        let handle = scheduler.start();
        assert_eq!(rx.recv().await, Some(1));
        handle.shutdown().await;
    }
}

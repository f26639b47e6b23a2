use crate::AppState;
use async_trait::async_trait;
use clap::Parser;
use domain::error::{DomainErrorKind, Error, ExternalErrorKind};
use domain::reading::ReadingSource;
use domain::Reading;
use realtime::{Debouncer, Dispatcher, Manager};
use service::config::Config;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

#[derive(Default)]
pub(crate) struct StaticSource {
    pub(crate) readings: Vec<Reading>,
    pub(crate) failing: AtomicBool,
    /// Held before every fetch returns.
    pub(crate) delay: Option<Duration>,
}

impl StaticSource {
    pub(crate) fn failing() -> Self {
        let source = Self::default();
        source.failing.store(true, Ordering::SeqCst);
        source
    }
}

#[async_trait]
impl ReadingSource for StaticSource {
    async fn fetch_latest(&self, _max_depth: u32) -> Result<Vec<Reading>, Error> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(Error {
                source: None,
                error_kind: DomainErrorKind::External(ExternalErrorKind::DataSource),
            });
        }
        Ok(self.readings.clone())
    }
}

pub(crate) fn reading(room_id: i64, temperature_c: f64) -> Reading {
    Reading {
        room_id,
        room_type: "office".to_string(),
        temperature_c: Some(temperature_c),
        humidity_pct: Some(40.0),
        differential_pressure_pa: Some(5.0),
    }
}

/// App state wired to `source` with a running debouncer.
pub(crate) fn app_state(source: StaticSource) -> (AppState, JoinHandle<()>) {
    let config = Config::parse_from(["telemetry_relay"]);
    let dispatcher = Arc::new(Dispatcher::new(Arc::new(source), Arc::new(Manager::new())));
    let shutdown = CancellationToken::new();
    let (debouncer, task) = Debouncer::spawn(dispatcher.clone(), shutdown.clone());
    (
        AppState::new(config, dispatcher, debouncer, shutdown),
        task,
    )
}

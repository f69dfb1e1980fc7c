//! The polling loop.
//!
//! One timer drives every monitor. Within a cycle the monitors run
//! concurrently, each publishing its own facts in a fixed order; the next
//! tick waits until the whole cycle is done.

use std::future::Future;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use mqttbot_adapters::cityflitzer::CityflitzerProbe;
use mqttbot_adapters::nextbike::NextbikeProbe;
use mqttbot_adapters::probe::AvailabilityProbe;
use mqttbot_adapters::raid::{FileCollector, RaidMonitor};
use mqttbot_sdk::{MonitorHandle, Output, PublishError, Reporter};

use crate::settings::Settings;

/// Storage health monitor bound to its topic namespace.
#[derive(Debug, Clone)]
pub struct RaidTask {
    monitor: RaidMonitor,
    handle: MonitorHandle,
    per_array: bool,
}

impl RaidTask {
    pub fn new(monitor: RaidMonitor, handle: MonitorHandle, per_array: bool) -> Self {
        Self {
            monitor,
            handle,
            per_array,
        }
    }

    /// Check the arrays and publish the outcome.
    pub async fn run(&self) -> Result<(), PublishError> {
        let result = self.monitor.check().await;
        if let Err(e) = &result {
            warn!(source = self.monitor.description(), error = %e, "RAID check failed");
        }
        self.handle.report_raid(&result, self.per_array).await
    }
}

/// Availability probe bound to its topic namespace.
#[derive(Debug, Clone)]
pub struct ProbeTask<P> {
    probe: P,
    handle: MonitorHandle,
}

impl<P: AvailabilityProbe> ProbeTask<P> {
    pub fn new(probe: P, handle: MonitorHandle) -> Self {
        Self { probe, handle }
    }

    /// Register the probe under its own topic prefix.
    pub fn register(probe: P, reporter: &Reporter) -> Self {
        let handle = reporter.register(probe.topic_prefix());
        Self::new(probe, handle)
    }

    /// Evaluate the probe and publish the flag plus heartbeat.
    pub async fn run(&self) -> Result<(), PublishError> {
        let value = self.probe.check().await;
        debug!(probe = self.probe.flag_suffix(), value, "probe evaluated");
        self.handle.report_flag(self.probe.flag_suffix(), value).await
    }
}

async fn run_optional<Fut>(run: Option<Fut>, name: &str) -> bool
where
    Fut: Future<Output = Result<(), PublishError>>,
{
    let Some(run) = run else {
        return true;
    };
    match run.await {
        Ok(()) => true,
        Err(e) => {
            warn!(monitor = name, error = %e, "publishing failed, rest of cycle skipped");
            false
        }
    }
}

/// Drives the monitors on a fixed interval.
#[derive(Debug)]
pub struct Runner {
    interval: Duration,
    raid: Option<RaidTask>,
    nextbike: Option<ProbeTask<NextbikeProbe>>,
    cityflitzer: Option<ProbeTask<CityflitzerProbe>>,
}

impl Runner {
    /// Create a runner without monitors.
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            raid: None,
            nextbike: None,
            cityflitzer: None,
        }
    }

    pub fn with_raid(mut self, task: RaidTask) -> Self {
        self.raid = Some(task);
        self
    }

    pub fn with_nextbike(mut self, task: ProbeTask<NextbikeProbe>) -> Self {
        self.nextbike = Some(task);
        self
    }

    pub fn with_cityflitzer(mut self, task: ProbeTask<CityflitzerProbe>) -> Self {
        self.cityflitzer = Some(task);
        self
    }

    /// Build the enabled monitors from settings.
    pub fn from_settings(settings: &Settings, reporter: &Reporter) -> Result<Self> {
        let mut runner = Runner::new(settings.general.refresh_interval());

        let raid = &settings.raid;
        if raid.enabled {
            let monitor = match &raid.replay_file {
                Some(path) => RaidMonitor::with_collector(FileCollector::new(path)),
                None => RaidMonitor::builder()
                    .command(raid.command.clone())
                    .args(raid.args.iter().cloned())
                    .timeout(raid.timeout())
                    .build(),
            };
            info!(source = monitor.description(), prefix = %raid.topic_prefix, "RAID monitor enabled");
            runner = runner.with_raid(RaidTask::new(
                monitor,
                reporter.register(&raid.topic_prefix),
                raid.per_array_topics,
            ));
        }

        let nb = &settings.nextbike;
        if nb.enabled {
            let probe = NextbikeProbe::builder()
                .endpoint(nb.endpoint.clone())
                .country(nb.country.clone())
                .city(nb.city.clone())
                .station(nb.station)
                .bike_numbers(nb.bike_numbers.iter().cloned())
                .topic_prefix(nb.topic_prefix.clone())
                .timeout(Duration::from_millis(nb.http_timeout_ms))
                .build()
                .context("failed to set up nextbike probe")?;
            info!(station = nb.station, prefix = %nb.topic_prefix, "nextbike probe enabled");
            runner = runner.with_nextbike(ProbeTask::register(probe, reporter));
        }

        let cf = &settings.cityflitzer;
        if cf.enabled {
            let probe = CityflitzerProbe::builder()
                .base_url(cf.base_url.clone())
                .api_key(cf.api_key.clone())
                .location(cf.latitude, cf.longitude)
                .range(cf.range)
                .max_distance(cf.max_distance)
                .topic_prefix(cf.topic_prefix.clone())
                .timeout(Duration::from_millis(cf.http_timeout_ms))
                .build()
                .context("failed to set up cityflitzer probe")?;
            info!(prefix = %cf.topic_prefix, "cityflitzer probe enabled");
            runner = runner.with_cityflitzer(ProbeTask::register(probe, reporter));
        }

        Ok(runner)
    }

    /// Number of enabled monitors.
    pub fn monitor_count(&self) -> usize {
        usize::from(self.raid.is_some())
            + usize::from(self.nextbike.is_some())
            + usize::from(self.cityflitzer.is_some())
    }

    /// Run every monitor once. Returns false if any of them failed to publish.
    pub async fn run_cycle(&self) -> bool {
        let (raid, nextbike, cityflitzer) = tokio::join!(
            run_optional(self.raid.as_ref().map(|t| t.run()), "raid"),
            run_optional(self.nextbike.as_ref().map(|t| t.run()), "nextbike"),
            run_optional(self.cityflitzer.as_ref().map(|t| t.run()), "cityflitzer"),
        );
        raid && nextbike && cityflitzer
    }

    /// Run cycles until `shutdown` resolves. The first cycle starts
    /// immediately. A shutdown request during a cycle drops the cycle at its
    /// next await point; facts already published stay published.
    pub async fn run<S: Future<Output = ()>>(&self, shutdown: S) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("shutting down");
                    break;
                }
                _ = ticker.tick() => {}
            }

            debug!("cycle started");
            tokio::select! {
                _ = &mut shutdown => {
                    warn!("shutting down, current cycle abandoned");
                    break;
                }
                ok = self.run_cycle() => {
                    if ok {
                        debug!("cycle finished");
                    }
                }
            }
        }
    }
}

/// Assemble the outputs: the broker (unless `dry_run`), the log when not
/// publishing to a broker, and the state file if configured.
pub async fn reporter_from_settings(settings: &Settings, dry_run: bool) -> Result<Reporter> {
    let mut builder = Reporter::builder();

    if dry_run {
        info!("dry run, facts are only logged");
        builder = builder.output(Output::Log);
    } else {
        builder = broker_output(settings, builder).await?;
    }

    if let Some(path) = &settings.state_file {
        info!(path = %path.display(), "writing retained state file");
        builder = builder.output(Output::file(path));
    }

    Ok(builder.build())
}

#[cfg(feature = "mqtt")]
async fn broker_output(
    settings: &Settings,
    builder: mqttbot_sdk::ReporterBuilder,
) -> Result<mqttbot_sdk::ReporterBuilder> {
    let client = mqttbot_sdk::mqtt::MqttOutput::connect(&settings.mqtt.client_config())
        .await
        .with_context(|| format!("failed to connect to MQTT broker {}", settings.mqtt.host))?;
    Ok(builder.output(Output::mqtt(client)))
}

#[cfg(not(feature = "mqtt"))]
async fn broker_output(
    settings: &Settings,
    builder: mqttbot_sdk::ReporterBuilder,
) -> Result<mqttbot_sdk::ReporterBuilder> {
    warn!(broker = %settings.mqtt.host, "built without MQTT support, facts are only logged");
    Ok(builder.output(Output::Log))
}

//! The scrape loop: for every machine of the inventory, scrape the configured paths,
//! relabel what came back together with a liveness gauge, and deliver the result.
use crate::{
    config::CollectorConfig,
    error::Result,
    inventory::{
        self,
        Master,
    },
    parse_exposition,
    push::{
        self,
        Sink,
    },
    relabel,
    source,
    InputSource,
    MetricFamilies,
    TargetUp,
};
use reqwest::Client;
use tracing::{
    debug,
    error,
    info,
    warn,
};

/// Counters of a single cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub machines: usize,
    /// Machines without any tunnel to scrape.
    pub skipped: usize,
    pub targets_up: usize,
    pub targets_down: usize,
    pub delivered: usize,
    pub failed: usize,
}

pub struct Collector {
    client: Client,
    config: CollectorConfig,
}

impl Collector {
    pub fn new(config: CollectorConfig) -> Result<Self> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &CollectorConfig {
        &self.config
    }

    /// Run one cycle over the whole inventory.
    ///
    /// Fails only when the inventory or the file based sources can't be loaded; the
    /// failure of a single machine is logged and counted, and the cycle goes on.
    pub async fn run_cycle(&self) -> Result<CycleReport> {
        let machines = inventory::load_inventory(&self.config.inventory)?;
        // File sources are the same for every machine of the cycle.
        let static_sources = source::load(self.config.rules.source())?;
        let mut report = CycleReport::default();

        for machine in &machines {
            let master = &machine.master;
            report.machines += 1;
            if master.http_port().is_none() {
                warn!(machine = %master.name, "Machine has no tunnel, skipping");
                report.skipped += 1;
                continue;
            }
            match self
                .collect_machine(master, static_sources.clone(), &mut report)
                .await
            {
                Ok(()) => report.delivered += 1,
                Err(e) => {
                    error!(machine = %master.name, error = %e, "Failed to deliver metrics");
                    report.failed += 1;
                }
            }
        }

        info!(
            machines = report.machines,
            skipped = report.skipped,
            up = report.targets_up,
            down = report.targets_down,
            delivered = report.delivered,
            failed = report.failed,
            "Cycle finished"
        );
        Ok(report)
    }

    async fn collect_machine(
        &self,
        master: &Master,
        mut collections: Vec<MetricFamilies>,
        report: &mut CycleReport,
    ) -> Result<()> {
        let push_url = self.config.push.url_for(&master.name);
        if self.config.push.delete_old && self.config.sink == Sink::Push {
            if let Err(e) = push::delete(&self.client, &push_url).await {
                warn!(url = %push_url, error = %e, "Failed to delete previous push");
            }
        }

        let mut up = TargetUp::default();
        for path in &self.config.read_paths {
            let Some(url) = master.target_url(path) else {
                continue;
            };
            let body = match self.scrape(&url).await {
                Ok(body) => body,
                Err(e) => {
                    warn!(url = %url, error = %e, "Target is down");
                    up.record(path, false);
                    report.targets_down += 1;
                    continue;
                }
            };
            up.record(path, true);
            report.targets_up += 1;
            if *self.config.rules.source() != InputSource::Stream {
                continue;
            }
            match parse_exposition(&url, &body) {
                Ok(families) => collections.push(families),
                Err(e) => warn!(url = %url, error = %e, "Skipping unparsable scrape"),
            }
        }

        collections.push([up.into_family()].into_iter().collect());
        let payload = relabel(collections, &self.config.rules).to_bytes();
        self.deliver(&master.name, &push_url, payload).await
    }

    async fn scrape(&self, url: &str) -> Result<String> {
        let response = self.client.get(url).send().await?.error_for_status()?;
        let body = response.text().await?;
        debug!(url, size = body.len(), "Scraped target");
        Ok(body)
    }

    async fn deliver(&self, machine: &str, push_url: &str, payload: Vec<u8>) -> Result<()> {
        match &self.config.sink {
            Sink::Push => push::push(&self.client, push_url, payload).await,
            Sink::File(template) => {
                let path = Sink::file_path(template, machine);
                push::write_file(&path, &payload).await
            }
        }
    }
}

//! The validated, immutable configuration of a collector.
use crate::{
    cli::Args,
    error::{
        Error,
        Result,
    },
    parse_key_value,
    push::{
        PushConfig,
        Sink,
    },
    RelabelRules,
};
use std::{
    path::PathBuf,
    time::Duration,
};

#[derive(Debug, Clone)]
pub struct CollectorConfig {
    /// JSON inventory, re-read on every cycle.
    pub inventory: PathBuf,
    pub push: PushConfig,
    /// Paths scraped on every machine, in order.
    pub read_paths: Vec<String>,
    pub rules: RelabelRules,
    pub sink: Sink,
    /// Timeout of every HTTP request.
    pub timeout: Duration,
    /// Time between cycles; `None` runs a single cycle.
    pub interval: Option<Duration>,
}

impl CollectorConfig {
    fn validate(&self) -> Result<()> {
        if self.push.base_url.is_empty() {
            return Err(Error::InvalidConfig("push URL is empty".into()));
        }
        if self.push.machine_label.is_empty() {
            return Err(Error::InvalidConfig("machine label is empty".into()));
        }
        if self.read_paths.is_empty() {
            return Err(Error::InvalidConfig("no read path given".into()));
        }
        if let Some(path) = self.read_paths.iter().find(|path| !path.starts_with('/')) {
            return Err(Error::InvalidConfig(format!(
                "read path '{path}' must start with '/'"
            )));
        }
        if self.timeout.is_zero() {
            return Err(Error::InvalidConfig("timeout must be positive".into()));
        }
        if self.interval.is_some_and(|interval| interval.is_zero()) {
            return Err(Error::InvalidConfig("interval must be positive".into()));
        }
        Ok(())
    }
}

impl TryFrom<Args> for CollectorConfig {
    type Error = Error;

    fn try_from(args: Args) -> Result<Self> {
        let mut rules = RelabelRules::builder().drop_default(args.drop_default);
        for pair in &args.add_labels {
            rules = rules.add_label_pair(pair)?;
        }
        for name in args.drop_metrics {
            rules = rules.drop_metric(name);
        }
        if let Some(file) = args.in_file {
            rules = rules.in_file(file);
        }
        if let Some(dir) = args.in_dir {
            rules = rules.in_dir(dir);
        }

        let grouping = args
            .push_labels
            .iter()
            .map(|pair| {
                parse_key_value(pair)
                    .map(|(name, value)| (name.to_string(), value.to_string()))
                    .ok_or_else(|| {
                        Error::InvalidConfig(format!("expected KEY=VALUE got '{pair}'"))
                    })
            })
            .collect::<Result<Vec<_>>>()?;

        let config = CollectorConfig {
            inventory: args.inventory,
            push: PushConfig {
                base_url: args.push_url,
                grouping,
                machine_label: args.machine_label,
                delete_old: args.delete_old,
            },
            read_paths: args.read_paths,
            rules: rules.build()?,
            sink: args.out.map(Sink::File).unwrap_or_default(),
            timeout: Duration::from_secs(args.timeout_secs),
            interval: args.interval_secs.map(Duration::from_secs),
        };
        config.validate()?;
        Ok(config)
    }
}

use crate::{
    Labels,
    MetricFamily,
    Sample,
    Type,
};

/// Name of the liveness gauge of scraped targets.
pub const TARGET_UP_NAME: &str = "metricscollector_target_up";
pub const TARGET_UP_HELP: &str = "1 if device is up, 0 if it is not.";
/// Label holding the scraped path in liveness samples.
pub const PATH_LABEL: &str = "path";

/// A gauge family with one `path` labeled sample per scraped path: `1` when the target
/// answered, `0` otherwise.
///
/// Recording is append-only: recording the same path twice yields two samples.
#[derive(Debug, Clone, PartialEq, derive_more::Deref, derive_more::Into)]
pub struct TargetUp(MetricFamily);

impl TargetUp {
    pub fn new(name: impl Into<String>, help: impl Into<String>) -> Self {
        Self(
            MetricFamily::new(name)
                .with_help(help)
                .with_kind(Type::Gauge),
        )
    }

    pub fn record(&mut self, path: &str, is_up: bool) {
        let mut labels = Labels::default();
        labels.set(PATH_LABEL, path);
        let value = if is_up { 1.0 } else { 0.0 };
        self.0
            .samples
            .push(Sample::new(self.0.name.clone(), labels, value, None));
    }

    pub fn into_family(self) -> MetricFamily {
        self.0
    }
}

impl Default for TargetUp {
    fn default() -> Self {
        Self::new(TARGET_UP_NAME, TARGET_UP_HELP)
    }
}

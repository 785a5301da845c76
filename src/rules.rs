use crate::{
    error::{
        Error,
        Result,
    },
    parser::is_label_name,
    Labels,
};
use std::{
    collections::HashSet,
    path::PathBuf,
};

/// Name prefixes of the process and runtime self-instrumentation families that
/// `drop_default` removes.
pub const DEFAULT_METRIC_PREFIXES: &[&str] = &["go_", "process_", "promhttp_"];

/// Where the exposition documents of a cycle come from.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum InputSource {
    /// A single exposition file.
    File(PathBuf),
    /// Every regular file of a directory, in filename order.
    Directory(PathBuf),
    /// Documents handed over by the caller, e.g. scraped response bodies.
    #[default]
    Stream,
}

/// Split a `<name>=<value>` pair at the first `=`. The name must not be empty.
pub fn parse_key_value(pair: &str) -> Option<(&str, &str)> {
    pair.split_once('=').filter(|(name, _)| !name.is_empty())
}

/// The immutable set of rules applied by [`crate::relabel`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelabelRules {
    add_labels: Labels,
    drop_metrics: HashSet<String>,
    drop_default: bool,
    default_prefixes: Vec<String>,
    source: InputSource,
}

impl Default for RelabelRules {
    fn default() -> Self {
        Self {
            add_labels: Labels::default(),
            drop_metrics: HashSet::new(),
            drop_default: false,
            default_prefixes: default_prefixes(),
            source: InputSource::Stream,
        }
    }
}

fn default_prefixes() -> Vec<String> {
    DEFAULT_METRIC_PREFIXES.iter().map(|p| p.to_string()).collect()
}

impl RelabelRules {
    pub fn builder() -> RelabelRulesBuilder {
        RelabelRulesBuilder::default()
    }

    /// Labels injected into every sample, in injection order.
    pub fn add_labels(&self) -> &Labels {
        &self.add_labels
    }

    pub fn drop_metrics(&self) -> &HashSet<String> {
        &self.drop_metrics
    }

    pub fn drop_default(&self) -> bool {
        self.drop_default
    }

    pub fn default_prefixes(&self) -> &[String] {
        &self.default_prefixes
    }

    pub fn source(&self) -> &InputSource {
        &self.source
    }

    /// Whether the family named `family` must be removed from the output.
    pub fn is_dropped(&self, family: &str) -> bool {
        self.drop_metrics.contains(family)
            || (self.drop_default
                && self
                    .default_prefixes
                    .iter()
                    .any(|prefix| family.starts_with(prefix.as_str())))
    }
}

/// Builder for [`RelabelRules`]. Validation happens in [`RelabelRulesBuilder::build`].
#[derive(Debug, Clone, Default)]
pub struct RelabelRulesBuilder {
    add_labels: Labels,
    drop_metrics: HashSet<String>,
    drop_default: bool,
    default_prefixes: Option<Vec<String>>,
    in_file: Option<PathBuf>,
    in_dir: Option<PathBuf>,
}

impl RelabelRulesBuilder {
    /// Inject `name="value"` into every sample. A later value for the same name wins.
    /// The name must match `[a-zA-Z_][a-zA-Z0-9_]*`, which [`Self::build`] checks.
    pub fn add_label(mut self, name: &str, value: &str) -> Self {
        self.add_labels.set(name, value);
        self
    }

    /// Like [`Self::add_label`], from a `<name>=<value>` pair.
    pub fn add_label_pair(self, pair: &str) -> Result<Self> {
        let (name, value) = parse_key_value(pair).ok_or_else(|| {
            Error::InvalidRuleSet(format!("expected <label>=<value>, got '{pair}'"))
        })?;
        Ok(self.add_label(name, value))
    }

    /// Drop the family with exactly this name.
    pub fn drop_metric(mut self, name: impl Into<String>) -> Self {
        self.drop_metrics.insert(name.into());
        self
    }

    pub fn drop_default(mut self, drop_default: bool) -> Self {
        self.drop_default = drop_default;
        self
    }

    /// Replace [`DEFAULT_METRIC_PREFIXES`] as the prefixes matched by `drop_default`.
    pub fn default_prefixes<I, S>(mut self, prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.default_prefixes = Some(prefixes.into_iter().map(Into::into).collect());
        self
    }

    pub fn in_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.in_file = Some(path.into());
        self
    }

    pub fn in_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.in_dir = Some(path.into());
        self
    }

    pub fn build(self) -> Result<RelabelRules> {
        let source = match (self.in_file, self.in_dir) {
            (Some(file), Some(dir)) => {
                return Err(Error::InvalidRuleSet(format!(
                    "both an input file ({}) and an input directory ({}) are set",
                    file.display(),
                    dir.display()
                )))
            }
            (Some(file), None) => InputSource::File(file),
            (None, Some(dir)) => InputSource::Directory(dir),
            (None, None) => InputSource::Stream,
        };
        if let Some(label) = self.add_labels.iter().find(|label| !is_label_name(&label.name)) {
            return Err(Error::InvalidRuleSet(format!(
                "'{}' is not a valid label name",
                label.name
            )));
        }
        Ok(RelabelRules {
            add_labels: self.add_labels,
            drop_metrics: self.drop_metrics,
            drop_default: self.drop_default,
            default_prefixes: self.default_prefixes.unwrap_or_else(default_prefixes),
            source,
        })
    }
}

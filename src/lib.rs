#![forbid(unsafe_code)]
//! Parse, relabel and re-serialize the Prometheus exposition text format, and push the
//! result to an aggregation endpoint.
//!
//! The exposition format is taken from here:
//! <https://prometheus.io/docs/instrumenting/exposition_formats/>
//!
//! The relabeling pipeline is pure and synchronous:
//! parse ([`parse_exposition`]) → merge, filter, inject ([`relabel`]) → serialize
//! ([`MetricFamilies::to_bytes`]). The [`collector`] module drives it for a fleet of
//! machines described by an [`inventory`].
use derive_more::Constructor;
pub use error::{
    Error,
    Result,
};
pub use parser::{
    parse_exposition,
    parse_lines,
};
pub use relabel::relabel;
pub use rules::{
    parse_key_value,
    InputSource,
    RelabelRules,
    RelabelRulesBuilder,
    DEFAULT_METRIC_PREFIXES,
};
pub use target::{
    TargetUp,
    PATH_LABEL,
    TARGET_UP_HELP,
    TARGET_UP_NAME,
};
use std::{
    collections::HashMap,
    fmt::{
        Display,
        Write as _,
    },
};

pub mod cli;
pub mod collector;
pub mod config;
mod error;
pub mod inventory;
mod parser;
pub mod push;
mod relabel;
mod rules;
pub mod source;
mod target;

/// The possible types of Prometheus metrics.
///
/// Type tokens we don't know are kept verbatim in `Unknown`, so newer exposition
/// formats pass through untouched.
#[derive(Debug, Clone, PartialEq, Eq, strum::EnumString)]
#[strum(ascii_case_insensitive)]
#[strum(serialize_all = "snake_case")]
pub enum Type {
    Counter,
    Gauge,
    Untyped,
    Summary,
    Histogram,
    #[strum(default)]
    Unknown(String),
}

impl Type {
    pub fn as_str(&self) -> &str {
        match self {
            Type::Counter => "counter",
            Type::Gauge => "gauge",
            Type::Untyped => "untyped",
            Type::Summary => "summary",
            Type::Histogram => "histogram",
            Type::Unknown(token) => token.as_str(),
        }
    }
}

impl Display for Type {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single label in a sample.
///
/// Example:
/// ```text
/// name="a"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Constructor)]
pub struct Label {
    /// Label name
    pub name: String,
    /// Label value, unescaped (without the quotes)
    pub value: String,
}

/// A set of labels identifying a sample, in the order they were first set.
///
/// Example:
/// ```text
/// {name="a",id="1",type="x"}
/// ```
#[derive(
    Debug,
    Clone,
    PartialEq,
    Eq,
    Default,
    derive_more::Deref,
    derive_more::DerefMut,
    derive_more::From,
)]
#[repr(transparent)]
pub struct Labels(Vec<Label>);

impl Labels {
    /// The value of the label `name`, if present.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|label| label.name == name)
            .map(|label| label.value.as_str())
    }

    /// Set `name` to `value`. An existing label keeps its position and gets the new
    /// value, otherwise the label is appended.
    pub fn set(&mut self, name: &str, value: &str) {
        match self.0.iter_mut().find(|label| label.name == name) {
            Some(label) => label.value = value.into(),
            None => self.0.push(Label::new(name.into(), value.into())),
        }
    }
}

/// Write a label value (`quotes` set) or a HELP text with `\`, new lines and, for label
/// values, `"` escaped.
fn write_escaped(f: &mut std::fmt::Formatter<'_>, value: &str, quotes: bool) -> std::fmt::Result {
    for ch in value.chars() {
        match ch {
            '\\' => f.write_str(r"\\")?,
            '"' if quotes => f.write_str(r#"\""#)?,
            '\n' => f.write_str(r"\n")?,
            ch => f.write_char(ch)?,
        }
    }
    Ok(())
}

impl Display for Labels {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.0.is_empty() {
            return Ok(());
        }
        let last_idx = self.0.len() - 1;
        f.write_str("{")?;
        for (idx, label) in self.0.iter().enumerate() {
            f.write_str(&label.name)?;
            f.write_str("=\"")?;
            write_escaped(f, &label.value, true)?;
            f.write_str("\"")?;
            if idx != last_idx {
                f.write_str(",")?;
            }
        }
        f.write_str("}")?;
        Ok(())
    }
}

/// Write a float in its shortest round-tripping form.
///
/// `NaN`, `+Inf` and `-Inf` are spelled the way Prometheus spells them. Magnitudes
/// outside of `[1e-6, 1e21)` use exponent notation, so huge or tiny values don't turn
/// into long runs of zeros.
fn write_float(f: &mut std::fmt::Formatter<'_>, value: f64) -> std::fmt::Result {
    if value.is_nan() {
        return f.write_str("NaN");
    }
    if value.is_infinite() {
        return f.write_str(if value > 0.0 { "+Inf" } else { "-Inf" });
    }
    let abs = value.abs();
    if abs == 0.0 || (1e-6..1e21).contains(&abs) {
        write!(f, "{value}")
    } else {
        write!(f, "{value:e}")
    }
}

/// A single sample line: the full sample name, the labels, the value and an optional
/// timestamp.
///
/// The name may carry a suffix of its family name (`_bucket`, `_sum`, `_count`).
#[derive(Debug, Clone, PartialEq, Constructor)]
pub struct Sample {
    pub name: String,
    pub labels: Labels,
    pub value: f64,
    /// Milliseconds since epoch.
    pub timestamp: Option<i64>,
}

impl Display for Sample {
    /// Print the sample line.
    /// Example:
    /// ```text
    /// http_requests_total{method="post",code="200"} 1027 1395066363000
    /// ```
    ///
    /// NOTE: New line is not added.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{} ", self.name, self.labels)?;
        write_float(f, self.value)?;
        if let Some(ts) = self.timestamp {
            write!(f, " {ts}")?;
        }
        Ok(())
    }
}

/// A metric family.
///
/// An example:
/// ```text
/// # HELP http_requests_total The total number of HTTP requests.
/// # TYPE http_requests_total counter
/// http_requests_total{method="post",code="200"} 1027 1395066363000
/// http_requests_total{method="post",code="400"}    3 1395066363000
/// ```
/// Or
/// ```text
/// # HELP rpc_duration_seconds A summary of the RPC duration in seconds.
/// # TYPE rpc_duration_seconds summary
/// rpc_duration_seconds{quantile="0.01"} 3102
/// rpc_duration_seconds{quantile="0.05"} 3272
/// rpc_duration_seconds_sum 1.7560473e+07
/// rpc_duration_seconds_count 2693
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct MetricFamily {
    /// The name of the family, without any sample suffix.
    pub name: String,
    /// The text of the `# HELP` line
    pub help: Option<String>,
    /// The token of the `# TYPE` line
    pub kind: Option<Type>,
    /// The data
    pub samples: Vec<Sample>,
}

impl MetricFamily {
    /// An empty family, without metadata.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            help: None,
            kind: None,
            samples: Vec::new(),
        }
    }

    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    pub fn with_kind(mut self, kind: Type) -> Self {
        self.kind = Some(kind);
        self
    }

    /// Whether a sample named `sample_name` is part of this family.
    ///
    /// Histograms own `<name>_bucket`, histograms and summaries own `<name>_sum` and
    /// `<name>_count`.
    pub fn owns_sample_name(&self, sample_name: &str) -> bool {
        let Some(suffix) = sample_name.strip_prefix(self.name.as_str()) else {
            return false;
        };
        match (suffix, &self.kind) {
            ("", _) => true,
            ("_bucket", Some(Type::Histogram)) => true,
            ("_sum" | "_count", Some(Type::Histogram | Type::Summary)) => true,
            _ => false,
        }
    }

    /// Set a label on all the samples in the family, overwriting a label of the same
    /// name.
    pub fn add_label(&mut self, name: &str, value: &str) {
        for sample in &mut self.samples {
            sample.labels.set(name, value);
        }
    }

    /// Fold `other` (a family of the same name) into this one. Samples are appended,
    /// metadata already present here is kept.
    fn absorb(&mut self, other: MetricFamily) {
        if self.help.is_none() {
            self.help = other.help;
        }
        if self.kind.is_none() {
            self.kind = other.kind;
        }
        self.samples.extend(other.samples);
    }
}

impl Display for MetricFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(help) = self.help.as_deref() {
            write!(f, "# HELP {} ", self.name)?;
            write_escaped(f, help, false)?;
            writeln!(f)?;
        }
        if let Some(kind) = self.kind.as_ref() {
            writeln!(f, "# TYPE {} {kind}", self.name)?;
        }
        for sample in self.samples.iter() {
            writeln!(f, "{sample}")?;
        }
        Ok(())
    }
}

/// An ordered collection of metric families with unique names.
/// Implements `Display` to print the families in the Prometheus exposition text format.
///
/// NOTES:
/// The parsing is not lossless. Comments (excluding TYPE, HELP comments) and empty lines
/// are discarded.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetricFamilies {
    families: Vec<MetricFamily>,
    /// Family name to position in `families`
    index: HashMap<String, usize>,
}

impl MetricFamilies {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse an exposition document that didn't come from a named source.
    pub fn parse(data: &str) -> Result<Self> {
        parse_exposition(parser::STREAM_ORIGIN, data)
    }

    pub fn len(&self) -> usize {
        self.families.len()
    }

    pub fn is_empty(&self) -> bool {
        self.families.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, MetricFamily> {
        self.families.iter()
    }

    pub fn get(&self, name: &str) -> Option<&MetricFamily> {
        self.index.get(name).map(|&idx| &self.families[idx])
    }

    /// The family named `name`, created empty at the end of the collection if absent.
    pub fn family_mut(&mut self, name: &str) -> &mut MetricFamily {
        let idx = match self.index.get(name) {
            Some(&idx) => idx,
            None => {
                self.families.push(MetricFamily::new(name));
                self.index.insert(name.into(), self.families.len() - 1);
                self.families.len() - 1
            }
        };
        &mut self.families[idx]
    }

    /// Add a family. If a family of the same name exists, samples are concatenated
    /// and the existing HELP/TYPE win.
    pub fn merge(&mut self, family: MetricFamily) {
        match self.index.get(&family.name) {
            Some(&idx) => self.families[idx].absorb(family),
            None => {
                self.index.insert(family.name.clone(), self.families.len());
                self.families.push(family);
            }
        }
    }

    /// Keep only the families for which `keep` returns true, preserving order.
    pub fn retain(&mut self, keep: impl FnMut(&MetricFamily) -> bool) {
        self.families.retain(keep);
        self.index = self
            .families
            .iter()
            .enumerate()
            .map(|(idx, family)| (family.name.clone(), idx))
            .collect();
    }

    /// Set a label on all the samples of all the families.
    pub fn add_label(&mut self, name: &str, value: &str) {
        for family in &mut self.families {
            family.add_label(name, value);
        }
    }

    /// The exposition text of the collection, ready to be pushed.
    pub fn to_bytes(&self) -> Vec<u8> {
        self.to_string().into_bytes()
    }
}

impl Extend<MetricFamily> for MetricFamilies {
    fn extend<T: IntoIterator<Item = MetricFamily>>(&mut self, iter: T) {
        for family in iter {
            self.merge(family);
        }
    }
}

impl FromIterator<MetricFamily> for MetricFamilies {
    fn from_iter<T: IntoIterator<Item = MetricFamily>>(iter: T) -> Self {
        let mut families = Self::new();
        families.extend(iter);
        families
    }
}

impl IntoIterator for MetricFamilies {
    type Item = MetricFamily;
    type IntoIter = std::vec::IntoIter<MetricFamily>;

    fn into_iter(self) -> Self::IntoIter {
        self.families.into_iter()
    }
}

impl<'a> IntoIterator for &'a MetricFamilies {
    type Item = &'a MetricFamily;
    type IntoIter = std::slice::Iter<'a, MetricFamily>;

    fn into_iter(self) -> Self::IntoIter {
        self.families.iter()
    }
}

impl Display for MetricFamilies {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for family in self.families.iter() {
            write!(f, "{family}")?;
        }
        Ok(())
    }
}

use crate::{
    MetricFamilies,
    RelabelRules,
};
use tracing::debug;

/// Merge `collections` into one, then drop and relabel families according to `rules`.
///
/// * Families of the same name are merged: samples are concatenated in collection order,
///   HELP/TYPE come from the first collection that defines them.
/// * Families named in the drop set, or matching a default prefix when `drop_default` is
///   set, are removed together with their metadata.
/// * Every injected label is set on every remaining sample, overwriting a label of the
///   same name.
///
/// Surviving families keep their merge order.
pub fn relabel<I>(collections: I, rules: &RelabelRules) -> MetricFamilies
where
    I: IntoIterator<Item = MetricFamilies>,
{
    let mut merged = MetricFamilies::new();
    for collection in collections {
        merged.extend(collection);
    }

    let total = merged.len();
    merged.retain(|family| {
        let dropped = rules.is_dropped(&family.name);
        if dropped {
            debug!(family = %family.name, samples = family.samples.len(), "Dropping family");
        }
        !dropped
    });

    for label in rules.add_labels().iter() {
        merged.add_label(&label.name, &label.value);
    }
    debug!(
        families = merged.len(),
        dropped = total - merged.len(),
        injected = rules.add_labels().len(),
        "Relabeled metric families"
    );
    merged
}

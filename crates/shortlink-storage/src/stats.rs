//! Click-stats helpers shared by the backends.

use shortlink_core::{normalize, ClickStats, Link, Result, StorageError};
use std::collections::{BTreeMap, HashMap};

/// Folds caller-supplied deltas onto normalized keys.
///
/// Display names that normalize to the same key are summed. Counts are
/// returned as `i64`, the integer type both SQLite and JSON carry.
pub(crate) fn deltas_by_key(deltas: &ClickStats) -> Result<BTreeMap<String, i64>> {
    let mut merged = BTreeMap::new();
    for (short, &clicks) in deltas {
        let clicks = i64::try_from(clicks).map_err(|_| {
            StorageError::Validation(format!("click delta for '{short}' is too large: {clicks}"))
        })?;
        let total: &mut i64 = merged.entry(normalize(short)).or_default();
        *total = total.checked_add(clicks).ok_or_else(|| {
            StorageError::Validation(format!("click delta for '{short}' overflows"))
        })?;
    }
    Ok(merged)
}

/// Maps per-key totals back to the display names of `links`.
///
/// Totals whose key has no link are dropped.
pub(crate) fn attribute_totals<I>(links: &[Link], totals: I) -> ClickStats
where
    I: IntoIterator<Item = (String, u64)>,
{
    let shorts: HashMap<String, &str> = links
        .iter()
        .map(|link| (link.key(), link.short.as_str()))
        .collect();

    totals
        .into_iter()
        .filter_map(|(key, clicks)| shorts.get(&key).map(|short| (short.to_string(), clicks)))
        .collect()
}

//! Counting helpers shared by the imputers.
//!
//! Ratios and shares are taken over the total row count. Medians, means
//! and deviations come straight from polars.

use std::collections::HashMap;

/// Missing cells divided by total rows; 0 for an empty column.
pub fn missing_ratio(missing: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        missing as f64 / total as f64
    }
}

/// Present labels ranked by frequency, most frequent first. Ties keep the
/// order in which the labels first appear.
pub fn frequency_ranking(values: &[Option<String>]) -> Vec<(String, usize)> {
    let mut counts: HashMap<&str, (usize, usize)> = HashMap::new();
    for (position, value) in values.iter().enumerate() {
        if let Some(label) = value {
            counts.entry(label.as_str()).or_insert((0, position)).0 += 1;
        }
    }

    let mut ranking: Vec<(&str, usize, usize)> = counts
        .into_iter()
        .map(|(label, (count, first_seen))| (label, count, first_seen))
        .collect();
    ranking.sort_by(|a, b| b.1.cmp(&a.1).then(a.2.cmp(&b.2)));

    ranking
        .into_iter()
        .map(|(label, count, _)| (label.to_string(), count))
        .collect()
}

//! Audio/text sync maps
//!
//! A sync map estimates where each summary section starts in the audio
//! narration. The estimate is linear: section `i` starts at
//! `duration * chars_before_i / total_chars`, counting non-whitespace
//! characters so layout does not skew the result.

use serde::{Deserialize, Serialize};

/// Start of one section in the narration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncEntry {
    pub timestamp_ms: i64,
    pub section_index: i64,
}

/// Text length used for alignment
pub fn text_weight(text: &str) -> usize {
    text.chars().filter(|c| !c.is_whitespace()).count()
}

/// Build a sync map from section weights (in reading order) and the
/// narration length.
///
/// Empty input or a non-positive duration yields an empty map. When every
/// section is empty the sections are spaced evenly.
///
/// # Examples
///
/// ```
/// use resumo_common::sync_map::generate;
///
/// let map = generate(&[100, 300], 60_000);
/// assert_eq!(map[0].timestamp_ms, 0);
/// assert_eq!(map[1].timestamp_ms, 15_000);
/// ```
pub fn generate(section_weights: &[usize], duration_ms: i64) -> Vec<SyncEntry> {
    if section_weights.is_empty() || duration_ms <= 0 {
        return Vec::new();
    }

    let total: u128 = section_weights.iter().map(|w| *w as u128).sum();
    let weights: Vec<u128> = if total == 0 {
        vec![1; section_weights.len()]
    } else {
        section_weights.iter().map(|w| *w as u128).collect()
    };
    let total: u128 = weights.iter().sum();

    let mut cumulative: u128 = 0;
    weights
        .iter()
        .enumerate()
        .map(|(index, weight)| {
            let timestamp_ms = (duration_ms as u128 * cumulative / total) as i64;
            cumulative += weight;
            SyncEntry {
                timestamp_ms,
                section_index: index as i64,
            }
        })
        .collect()
}

/// Section being narrated at `position_ms`.
///
/// Positions before the first entry map to the first section.
pub fn section_at(entries: &[SyncEntry], position_ms: i64) -> Option<i64> {
    let first = entries.first()?;
    let idx = entries.partition_point(|e| e.timestamp_ms <= position_ms);
    if idx == 0 {
        Some(first.section_index)
    } else {
        Some(entries[idx - 1].section_index)
    }
}

/// Narration offset where `section_index` starts
pub fn timestamp_for(entries: &[SyncEntry], section_index: i64) -> Option<i64> {
    entries
        .iter()
        .find(|e| e.section_index == section_index)
        .map(|e| e.timestamp_ms)
}

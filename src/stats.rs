use crate::models::{AggregatedStats, Record};

/// Tallies frequencies and genres and collects the free-text entries, in
/// input order. Never fails; absent fields simply contribute nothing.
pub fn aggregate(records: &[Record]) -> AggregatedStats {
    let mut stats = AggregatedStats::default();

    for record in records {
        if let Some(frequency) = &record.frequency {
            let count = stats.frequency_counts.entry(frequency.clone()).or_insert(0);
            *count = count.saturating_add(1);
        }

        for genre in &record.genres {
            stats.genre_counts.increment(genre);
        }
        // "Other" shares the count space with the named genres.
        if let Some(other) = &record.other_genre {
            stats.genre_counts.increment(other);
        }

        if let Some(reason) = &record.listen_reason {
            let reason = reason.trim();
            if !reason.is_empty() {
                stats.listen_reasons.push(reason.to_string());
            }
        }

        if let Some(rec) = &record.recommendation {
            if !rec.is_empty() {
                stats.recommendations.push(rec.clone());
            }
        }
    }

    stats
}

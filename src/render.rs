//! Turns [`AggregatedStats`] into chart specs and HTML fragments.
//!
//! Every piece of user-supplied text goes through [`escape_html`] before it
//! reaches markup.

use crate::models::{AggregatedStats, ChartKind, ChartSpec, Recommendation, RenderedView};

pub const PALETTE: &[&str] = &[
    "#3B82F6", "#60A5FA", "#93C5FD", "#BFDBFE", "#E0F2FE", "#10B981", "#6EE7B7", "#A7F3D0",
];

pub const NO_REASONS_YET: &str = "No entries yet.";
pub const NO_RECOMMENDATIONS_YET: &str = "No recommendations yet.";

pub fn render(stats: &AggregatedStats) -> RenderedView {
    RenderedView {
        frequency_chart: frequency_chart(stats),
        genre_chart: genre_chart(stats),
        listen_reasons: listen_reason_items(&stats.listen_reasons),
        recommendations: recommendation_items(&stats.recommendations),
        total_responses: stats.frequency_counts.values().sum(),
        updated_at: None,
    }
}

pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}

/// `"4 = Every day"` displays as `"Every day"`. A bucket that is only a
/// number keeps its digits.
pub fn frequency_label(bucket: &str) -> String {
    let rest = bucket.trim_start_matches(|c: char| c.is_ascii_digit());
    let rest = rest.trim_start_matches(|c: char| c.is_whitespace() || "=.:)-".contains(c));
    if rest.is_empty() {
        bucket.to_string()
    } else {
        rest.to_string()
    }
}

/// Share of `total` in percent. A zero total counts as one so the result is
/// always a number.
pub fn percentage(count: u64, total: u64) -> f64 {
    count as f64 / total.max(1) as f64 * 100.0
}

fn colors(count: usize) -> Vec<String> {
    PALETTE
        .iter()
        .cycle()
        .take(count)
        .map(|c| c.to_string())
        .collect()
}

fn chart(kind: ChartKind, title: &str, entries: Vec<(String, u64)>) -> ChartSpec {
    let total: u64 = entries.iter().map(|(_, count)| count).sum();
    let percentages: Vec<f64> = entries
        .iter()
        .map(|(_, count)| percentage(*count, total))
        .collect();
    let tooltips = entries
        .iter()
        .zip(&percentages)
        .map(|((label, count), pct)| format!("{label}: {count} ({pct:.1}%)"))
        .collect();

    ChartSpec {
        kind,
        title: title.to_string(),
        colors: colors(entries.len()),
        percentages,
        tooltips,
        values: entries.iter().map(|(_, count)| *count).collect(),
        labels: entries.into_iter().map(|(label, _)| label).collect(),
    }
}

pub fn frequency_chart(stats: &AggregatedStats) -> ChartSpec {
    let entries = stats
        .frequency_counts
        .iter()
        .map(|(bucket, count)| (frequency_label(bucket), *count))
        .collect();
    chart(ChartKind::Pie, "Listening frequency", entries)
}

/// Bars sorted by count, most popular first.
pub fn genre_chart(stats: &AggregatedStats) -> ChartSpec {
    let entries = stats
        .genre_counts
        .ranked()
        .into_iter()
        .map(|(genre, count)| (genre.to_string(), count))
        .collect();
    chart(ChartKind::Bar, "Responses per genre", entries)
}

pub fn placeholder(message: &str) -> String {
    format!(r#"<p class="loading-message">{}</p>"#, escape_html(message))
}

pub fn error_placeholder(message: &str) -> String {
    format!(
        r#"<p class="loading-message error">{}</p>"#,
        escape_html(message)
    )
}

/// Newest first.
pub fn listen_reason_items(reasons: &[String]) -> Vec<String> {
    let items: Vec<String> = reasons
        .iter()
        .rev()
        .map(|reason| reason.trim())
        .filter(|reason| !reason.is_empty())
        .map(|reason| {
            format!(
                r#"<div class="record-item-small">💬 "{}"</div>"#,
                escape_html(reason)
            )
        })
        .collect();

    if items.is_empty() {
        vec![placeholder(NO_REASONS_YET)]
    } else {
        items
    }
}

/// Newest first. Entries with neither an artist nor a song name are left out.
pub fn recommendation_items(recommendations: &[Recommendation]) -> Vec<String> {
    let items: Vec<String> = recommendations
        .iter()
        .rev()
        .filter_map(recommendation_item)
        .collect();

    if items.is_empty() {
        vec![placeholder(NO_RECOMMENDATIONS_YET)]
    } else {
        items
    }
}

fn recommendation_item(rec: &Recommendation) -> Option<String> {
    let mut blocks = Vec::with_capacity(2);
    if !rec.artist.trim().is_empty() {
        blocks.push(format!(
            "<p><strong>🎤 Recommended artist: {}</strong><em>{}</em></p>",
            escape_html(&rec.artist),
            escape_html(&rec.artist_reason)
        ));
    }
    if !rec.song.trim().is_empty() {
        blocks.push(format!(
            "<p><strong>🎶 Recommended song: {}</strong><em>{}</em></p>",
            escape_html(&rec.song),
            escape_html(&rec.song_reason)
        ));
    }

    if blocks.is_empty() {
        return None;
    }
    Some(format!(
        r#"<div class="record-item">{}</div>"#,
        blocks.join(r#"<hr class="record-divider">"#)
    ))
}

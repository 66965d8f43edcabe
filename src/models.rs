use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};

/// Listening-frequency buckets offered by the form. The leading digit is the
/// ordinal and is stripped for display.
pub const FREQUENCY_CHOICES: &[&str] = &[
    "4 = Every day",
    "3 = A few times a week",
    "2 = Now and then",
    "1 = Rarely",
];

pub const GENRE_CHOICES: &[&str] = &[
    "Ballad", "K-pop", "Hiphop", "R&B", "Indie", "Rock", "Jazz", "Classical",
];

/// One survey response. Free-text fields are trimmed and empty strings are
/// stored as `None`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Record {
    pub frequency: Option<String>,
    pub genres: Vec<String>,
    pub other_genre: Option<String>,
    pub listen_reason: Option<String>,
    pub recommendation: Option<Recommendation>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Recommendation {
    pub artist: String,
    pub artist_reason: String,
    pub song: String,
    pub song_reason: String,
}

impl Recommendation {
    pub fn is_empty(&self) -> bool {
        self.artist.is_empty()
            && self.artist_reason.is_empty()
            && self.song.is_empty()
            && self.song_reason.is_empty()
    }
}

/// Form input as posted by the page.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SubmissionForm {
    pub frequency: Option<String>,
    #[serde(alias = "genre")]
    pub genres: Vec<String>,
    pub genre_other: Option<String>,
    pub listen_reason: Option<String>,
    pub rec_artist: Option<String>,
    pub rec_artist_reason: Option<String>,
    pub rec_song: Option<String>,
    pub rec_song_reason: Option<String>,
}

/// JSON body sent to the remote store. Uses the same keys the store returns
/// on read.
#[derive(Debug, Serialize)]
pub struct RecordPayload<'a> {
    pub frequency: &'a str,
    pub genres: &'a [String],
    pub genre_other: &'a str,
    pub listen_reason: &'a str,
    pub rec_artist: &'a str,
    pub rec_artist_reason: &'a str,
    pub rec_song: &'a str,
    pub rec_song_reason: &'a str,
}

/// Acknowledgment of a write. Variants of the store answer with either
/// `status` or `result`.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct WriteAck {
    pub status: Option<String>,
    pub result: Option<String>,
    pub message: Option<String>,
    pub error: Option<String>,
}

impl WriteAck {
    /// Reads the known keys from any JSON body. Numbers and booleans are kept
    /// as text, other shapes read as absent.
    pub fn from_value(body: &Value) -> Self {
        let text = |key: &str| match body.get(key)? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        };
        Self {
            status: text("status"),
            result: text("result"),
            message: text("message"),
            error: text("error"),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status.as_deref() == Some("success") || self.result.as_deref() == Some("success")
    }
}

/// Genre counts in first-seen order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenreTally {
    entries: Vec<(String, u64)>,
    index: HashMap<String, usize>,
}

impl GenreTally {
    pub fn increment(&mut self, genre: &str) {
        match self.index.get(genre) {
            Some(&slot) => {
                let count = &mut self.entries[slot].1;
                *count = count.saturating_add(1);
            }
            None => {
                self.index.insert(genre.to_string(), self.entries.len());
                self.entries.push((genre.to_string(), 1));
            }
        }
    }

    pub fn get(&self, genre: &str) -> u64 {
        self.index
            .get(genre)
            .map(|&slot| self.entries[slot].1)
            .unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn total(&self) -> u64 {
        self.entries.iter().map(|(_, count)| count).sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.entries.iter().map(|(genre, count)| (genre.as_str(), *count))
    }

    /// Descending by count; equal counts keep first-seen order.
    pub fn ranked(&self) -> Vec<(&str, u64)> {
        let mut ranked: Vec<_> = self.iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1));
        ranked
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AggregatedStats {
    pub frequency_counts: BTreeMap<String, u64>,
    pub genre_counts: GenreTally,
    /// Input order; the renderer reverses for display.
    pub listen_reasons: Vec<String>,
    pub recommendations: Vec<Recommendation>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartKind {
    Pie,
    Bar,
}

/// Data handed to the charting collaborator in the page.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSpec {
    pub kind: ChartKind,
    pub title: String,
    pub labels: Vec<String>,
    pub values: Vec<u64>,
    pub percentages: Vec<f64>,
    pub tooltips: Vec<String>,
    pub colors: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderedView {
    pub frequency_chart: ChartSpec,
    pub genre_chart: ChartSpec,
    pub listen_reasons: Vec<String>,
    pub recommendations: Vec<String>,
    pub total_responses: u64,
    pub updated_at: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    pub message: String,
    pub view: RenderedView,
}

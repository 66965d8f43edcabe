//! Building [`Record`]s from form input and from rows returned by the remote
//! store, and turning them back into transport payloads.

use crate::errors::SurveyError;
use crate::models::{Record, RecordPayload, Recommendation, SubmissionForm};
use serde_json::Value;
use tracing::warn;

impl Record {
    pub fn from_submission(form: &SubmissionForm) -> Self {
        let mut genres: Vec<String> = Vec::with_capacity(form.genres.len());
        for genre in form.genres.iter().filter_map(|g| clean(Some(g.as_str()))) {
            if !genres.contains(&genre) {
                genres.push(genre);
            }
        }

        Self {
            frequency: clean(form.frequency.as_deref()),
            genres,
            other_genre: clean(form.genre_other.as_deref()),
            listen_reason: clean(form.listen_reason.as_deref()),
            recommendation: recommendation(
                form.rec_artist.as_deref(),
                form.rec_artist_reason.as_deref(),
                form.rec_song.as_deref(),
                form.rec_song_reason.as_deref(),
            ),
        }
    }

    /// Rebuilds a record from one row of the read response. Missing keys,
    /// wrongly typed values and non-object rows read as absent.
    pub fn from_row(row: &Value) -> Self {
        let text = move |key: &str| row.get(key).and_then(Value::as_str);

        let genres = match row.get("genres") {
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(|item| clean(item.as_str()))
                .collect(),
            _ => Vec::new(),
        };

        Self {
            frequency: clean(text("frequency")),
            genres,
            other_genre: clean(text("genre_other")),
            listen_reason: clean(text("listen_reason")),
            recommendation: recommendation(
                text("rec_artist"),
                text("rec_artist_reason"),
                text("rec_song"),
                text("rec_song_reason"),
            ),
        }
    }

    pub fn has_genres(&self) -> bool {
        !self.genres.is_empty() || self.other_genre.is_some()
    }

    /// Required fields: a frequency and at least one genre.
    pub fn validate(&self) -> Result<(), SurveyError> {
        if self.frequency.is_none() {
            return Err(SurveyError::validation(
                "Please choose how often you listen to music.",
            ));
        }
        if !self.has_genres() {
            return Err(SurveyError::validation(
                "Please pick at least one genre.",
            ));
        }
        Ok(())
    }

    /// URL-encoded form fields; `genre` repeats once per selected genre.
    pub fn to_form_fields(&self) -> Vec<(&'static str, String)> {
        let rec = self.recommendation.clone().unwrap_or_default();
        let mut fields = vec![("frequency", self.frequency.clone().unwrap_or_default())];
        fields.extend(self.genres.iter().map(|genre| ("genre", genre.clone())));
        fields.extend([
            ("genre_other", self.other_genre.clone().unwrap_or_default()),
            ("listen_reason", self.listen_reason.clone().unwrap_or_default()),
            ("rec_artist", rec.artist),
            ("rec_artist_reason", rec.artist_reason),
            ("rec_song", rec.song),
            ("rec_song_reason", rec.song_reason),
        ]);
        fields
    }

    pub fn to_payload(&self) -> RecordPayload<'_> {
        let rec = self.recommendation.as_ref();
        RecordPayload {
            frequency: self.frequency.as_deref().unwrap_or_default(),
            genres: &self.genres,
            genre_other: self.other_genre.as_deref().unwrap_or_default(),
            listen_reason: self.listen_reason.as_deref().unwrap_or_default(),
            rec_artist: rec.map(|r| r.artist.as_str()).unwrap_or_default(),
            rec_artist_reason: rec.map(|r| r.artist_reason.as_str()).unwrap_or_default(),
            rec_song: rec.map(|r| r.song.as_str()).unwrap_or_default(),
            rec_song_reason: rec.map(|r| r.song_reason.as_str()).unwrap_or_default(),
        }
    }
}

/// Accepts `{ "data": [row, ..] }`, a bare `[row, ..]`, or `{ "error": ".." }`.
pub fn records_from_response(body: &Value) -> Result<Vec<Record>, SurveyError> {
    let rows = match body {
        Value::Array(rows) => rows.as_slice(),
        Value::Object(map) => {
            if let Some(message) = map.get("error").and_then(Value::as_str) {
                if !message.trim().is_empty() {
                    return Err(SurveyError::RemoteRejection(message.trim().to_string()));
                }
            }
            match map.get("data") {
                Some(Value::Array(rows)) => rows.as_slice(),
                _ => &[],
            }
        }
        other => {
            warn!(kind = value_kind(other), "unexpected read response shape");
            &[]
        }
    };

    Ok(rows.iter().map(Record::from_row).collect())
}

fn recommendation(
    artist: Option<&str>,
    artist_reason: Option<&str>,
    song: Option<&str>,
    song_reason: Option<&str>,
) -> Option<Recommendation> {
    let rec = Recommendation {
        artist: clean(artist).unwrap_or_default(),
        artist_reason: clean(artist_reason).unwrap_or_default(),
        song: clean(song).unwrap_or_default(),
        song_reason: clean(song_reason).unwrap_or_default(),
    };
    // A reason on its own is enough to keep the entry.
    (!rec.is_empty()).then_some(rec)
}

fn clean(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

use crate::errors::SurveyError;
use crate::models::{AggregatedStats, Record, RenderedView, SubmissionForm};
use crate::remote::RecordStore;
use crate::render::{error_placeholder, render};
use crate::stats::aggregate;
use chrono::{DateTime, Local};
use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

const LOAD_FAILED: &str = "Could not load the survey results.";

/// Records and stats for the lifetime of the process. Stats are always
/// rebuilt from the full record list.
#[derive(Debug, Default)]
pub struct SurveySession {
    pub records: Vec<Record>,
    pub stats: AggregatedStats,
    pub load_error: Option<String>,
    pub refreshed_at: Option<DateTime<Local>>,
    /// Records saved by this process, numbered in save order, that a load
    /// started before the save may not contain yet.
    saved: Vec<(u64, Record)>,
    next_saved: u64,
    next_load: u64,
    applied_load: u64,
}

/// Taken before a fetch starts; ties the fetched rows to what the session
/// knew at that moment.
#[derive(Debug, Clone, Copy)]
pub struct LoadTicket {
    id: u64,
    saved_before: u64,
}

impl SurveySession {
    pub fn begin_load(&mut self) -> LoadTicket {
        self.next_load += 1;
        LoadTicket {
            id: self.next_load,
            saved_before: self.next_saved,
        }
    }

    /// Replaces the records with a fetch result. Records saved while the fetch
    /// was running are kept unless the rows already hold them. A result older
    /// than one already applied is dropped.
    pub fn finish_load(&mut self, ticket: LoadTicket, mut records: Vec<Record>) -> bool {
        if ticket.id < self.applied_load {
            return false;
        }
        self.applied_load = ticket.id;
        self.saved.retain(|(seq, _)| *seq >= ticket.saved_before);
        for (_, record) in &self.saved {
            if !records.contains(record) {
                records.push(record.clone());
            }
        }
        self.replace_records(records);
        true
    }

    /// Keeps whatever was shown before; the page gets an error notice.
    pub fn fail_load(&mut self, ticket: LoadTicket, message: impl Into<String>) -> bool {
        if ticket.id < self.applied_load {
            return false;
        }
        self.applied_load = ticket.id;
        self.load_error = Some(message.into());
        true
    }

    fn replace_records(&mut self, records: Vec<Record>) {
        self.stats = aggregate(&records);
        self.records = records;
        self.load_error = None;
        self.refreshed_at = Some(Local::now());
    }

    /// Folds in a record the store accepted. The store is reachable again, so
    /// a previous load failure no longer applies.
    pub fn append_record(&mut self, record: Record) {
        self.saved.push((self.next_saved, record.clone()));
        self.next_saved += 1;
        self.records.push(record);
        self.stats = aggregate(&self.records);
        self.load_error = None;
        self.refreshed_at = Some(Local::now());
    }

    pub fn view(&self) -> RenderedView {
        let mut view = render(&self.stats);
        view.updated_at = self
            .refreshed_at
            .map(|at| at.format("%Y-%m-%d %H:%M").to_string());
        if self.load_error.is_some() {
            view.recommendations = vec![error_placeholder(LOAD_FAILED)];
        }
        view
    }
}

/// Held while a submission is in flight. Dropping it frees the slot on every
/// path, including early returns and errors.
pub struct SubmitGuard {
    busy: Arc<AtomicBool>,
}

impl SubmitGuard {
    pub fn try_acquire(busy: &Arc<AtomicBool>) -> Option<Self> {
        busy.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self {
                busy: Arc::clone(busy),
            })
    }
}

impl Drop for SubmitGuard {
    fn drop(&mut self) {
        self.busy.store(false, Ordering::Release);
    }
}

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn RecordStore>,
    pub session: Arc<Mutex<SurveySession>>,
    submitting: Arc<AtomicBool>,
}

impl AppState {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self {
            store,
            session: Arc::new(Mutex::new(SurveySession::default())),
            submitting: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Fetches every record and rebuilds the stats. A failed fetch is logged
    /// and reflected in the view, never returned.
    pub async fn load(&self) -> RenderedView {
        let ticket = self.session.lock().await.begin_load();
        let fetched = self.store.fetch_all_records().await;

        let mut session = self.session.lock().await;
        match fetched {
            Ok(records) => {
                let count = records.len();
                if session.finish_load(ticket, records) {
                    info!(count, "survey results loaded");
                } else {
                    debug!(count, "newer survey results already shown, dropping fetch");
                }
            }
            Err(err) => {
                error!("failed to load survey results: {err}");
                session.fail_load(ticket, err.to_string());
            }
        }
        session.view()
    }

    pub async fn current_view(&self) -> RenderedView {
        self.session.lock().await.view()
    }

    /// Validates, sends the record, and on success folds it into the session.
    pub async fn submit(&self, form: &SubmissionForm) -> Result<RenderedView, SurveyError> {
        let record = Record::from_submission(form);
        if let Err(err) = record.validate() {
            info!("submission rejected: {err}");
            return Err(err);
        }

        let Some(_guard) = SubmitGuard::try_acquire(&self.submitting) else {
            warn!("submission refused, another one is in flight");
            return Err(SurveyError::Busy);
        };

        if let Err(err) = self.store.submit_record(&record).await {
            error!("survey submission failed: {err}");
            return Err(err);
        }

        info!(frequency = ?record.frequency, genres = record.genres.len(), "survey response saved");
        let mut session = self.session.lock().await;
        session.append_record(record);
        Ok(session.view())
    }

    #[cfg(test)]
    pub(crate) fn is_submitting(&self) -> bool {
        self.submitting.load(Ordering::Acquire)
    }
}

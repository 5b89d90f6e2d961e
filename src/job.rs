//! Job orchestrator: the per-user state machine driving one translation
//! job from upload through language choice, mode choice, translation,
//! delivery and cleanup.
//! AwaitingUpload → AwaitingLanguage → AwaitingMode → Processing →
//! {Delivered, Failed}, with terminal cleanup running identically for
//! both outcomes.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;
use walkdir::WalkDir;

use crate::archive::{self, ArchiveError};
use crate::classify::{classify, FileCategory};
use crate::delivery::DeliverySink;
use crate::events::{self, CallbackPayload, InboundEvent};
use crate::lang::Language;
use crate::metrics::{metric_names, MetricsRegistry};
use crate::session::{SessionStore, UploadKind, UploadRecord, UserId};
use crate::translate::{TranslateError, TranslationService};

/// Lifecycle phase of one user's job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum JobPhase {
    AwaitingUpload,
    AwaitingLanguage,
    AwaitingMode,
    Processing,
    Delivered,
    Failed,
}

impl std::fmt::Display for JobPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            JobPhase::AwaitingUpload => "AwaitingUpload",
            JobPhase::AwaitingLanguage => "AwaitingLanguage",
            JobPhase::AwaitingMode => "AwaitingMode",
            JobPhase::Processing => "Processing",
            JobPhase::Delivered => "Delivered",
            JobPhase::Failed => "Failed",
        };
        f.write_str(name)
    }
}

impl JobPhase {
    /// Returns whether transitioning from `self` to `next` is valid.
    pub fn can_transition_to(self, next: JobPhase) -> bool {
        matches!(
            (self, next),
            (JobPhase::AwaitingUpload, JobPhase::AwaitingLanguage)
                | (JobPhase::AwaitingLanguage, JobPhase::AwaitingMode)
                | (JobPhase::AwaitingMode, JobPhase::Processing)
                | (JobPhase::Processing, JobPhase::Delivered)
                | (JobPhase::Processing, JobPhase::Failed)
                // stale or unsupported selections fail before Processing
                | (JobPhase::AwaitingUpload, JobPhase::Failed)
                | (JobPhase::AwaitingLanguage, JobPhase::Failed)
                | (JobPhase::AwaitingMode, JobPhase::Failed)
                // a new upload silently abandons an unfinished selection path
                | (JobPhase::AwaitingLanguage, JobPhase::AwaitingLanguage)
                | (JobPhase::AwaitingMode, JobPhase::AwaitingLanguage)
        )
    }
}

/// Content-safety policy applied during subtitle translation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum TranslateMode {
    Normal,
    AdultSafe,
}

impl TranslateMode {
    /// Short form carried in callback payloads.
    pub fn wire(self) -> &'static str {
        match self {
            TranslateMode::Normal => "normal",
            TranslateMode::AdultSafe => "adult",
        }
    }

    pub fn from_wire(wire: &str) -> Option<Self> {
        match wire {
            "normal" => Some(TranslateMode::Normal),
            "adult" => Some(TranslateMode::AdultSafe),
            _ => None,
        }
    }

    /// Menu button label.
    pub fn label(self) -> &'static str {
        match self {
            TranslateMode::Normal => "Normal Translation",
            TranslateMode::AdultSafe => "Adult-Safe Subtitles",
        }
    }
}

/// Fully-specified job, built from two sequential user selections
/// correlated against the current upload. Transient, never persisted.
#[derive(Debug, Clone, Copy)]
pub struct JobRequest {
    pub user_id: UserId,
    pub target: Language,
    pub mode: TranslateMode,
}

#[derive(Debug)]
pub enum JobError {
    /// A selection arrived with no corresponding upload record.
    NoUploadFound,
    /// Single-file upload whose extension is not translatable.
    UnsupportedFileType(String),
    Archive(ArchiveError),
    Translate(TranslateError),
    /// Catch-all for I/O and other failures during Processing.
    Unhandled(String),
}

impl std::fmt::Display for JobError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobError::NoUploadFound => f.write_str("no uploaded file found"),
            JobError::UnsupportedFileType(name) => write!(f, "unsupported file type: {name}"),
            JobError::Archive(e) => write!(f, "{e}"),
            JobError::Translate(e) => write!(f, "{e}"),
            JobError::Unhandled(msg) => write!(f, "{msg}"),
        }
    }
}

impl From<ArchiveError> for JobError {
    fn from(e: ArchiveError) -> Self {
        JobError::Archive(e)
    }
}

impl From<TranslateError> for JobError {
    fn from(e: TranslateError) -> Self {
        JobError::Translate(e)
    }
}

impl From<std::io::Error> for JobError {
    fn from(e: std::io::Error) -> Self {
        JobError::Unhandled(format!("IO error: {e}"))
    }
}

impl JobError {
    /// Text sent back to the user. Pre-emptive rejections get their own
    /// wording; anything raised during Processing carries the cause
    /// verbatim.
    pub fn user_message(&self) -> String {
        match self {
            JobError::NoUploadFound => {
                "No uploaded file found. Send a file or archive first.".to_string()
            }
            JobError::UnsupportedFileType(_) => {
                "Unsupported file type for single-file translation. Use an archive for batch."
                    .to_string()
            }
            other => format!("Error while processing: {other}"),
        }
    }
}

/// What a successful job hands to the delivery sink.
#[derive(Debug)]
pub struct JobOutcome {
    pub output_path: PathBuf,
    pub output_name: String,
    pub translated: usize,
    pub kind: UploadKind,
}

/// Drives jobs for all users. One instance per process; per-user state
/// lives in the session store and the phase ledger, both keyed by user
/// identity and touched only in single atomic operations.
pub struct Orchestrator {
    sessions: Arc<SessionStore>,
    service: TranslationService,
    delivery: Arc<dyn DeliverySink>,
    metrics: Arc<MetricsRegistry>,
    upload_root: PathBuf,
    work_root: PathBuf,
    phases: Mutex<HashMap<UserId, JobPhase>>,
}

impl Orchestrator {
    pub fn new(
        sessions: Arc<SessionStore>,
        service: TranslationService,
        delivery: Arc<dyn DeliverySink>,
        metrics: Arc<MetricsRegistry>,
        upload_root: PathBuf,
        work_root: PathBuf,
    ) -> Self {
        Self {
            sessions,
            service,
            delivery,
            metrics,
            upload_root,
            work_root,
            phases: Mutex::new(HashMap::new()),
        }
    }

    /// Entry point for every decoded chat event.
    pub async fn handle_event(&self, event: InboundEvent) {
        match event {
            InboundEvent::Document {
                user_id,
                file_name,
                content,
            } => self.on_document(user_id, file_name, content).await,
            InboundEvent::Callback { user_id, data } => self.on_callback(user_id, &data).await,
        }
    }

    /// Current phase for a user; users without a ledger entry are awaiting
    /// an upload.
    pub fn phase(&self, user_id: UserId) -> JobPhase {
        self.phases
            .lock()
            .get(&user_id)
            .copied()
            .unwrap_or(JobPhase::AwaitingUpload)
    }

    /// Working directory for a user's job, scoped by user identity.
    pub fn work_dir(&self, user_id: UserId) -> PathBuf {
        self.work_root.join(user_id.to_string())
    }

    fn transition(&self, user_id: UserId, next: JobPhase) {
        let mut phases = self.phases.lock();
        let current = phases
            .get(&user_id)
            .copied()
            .unwrap_or(JobPhase::AwaitingUpload);
        if !current.can_transition_to(next) {
            warn!(user_id, from = %current, to = %next, "invalid_phase_transition");
            return;
        }
        phases.insert(user_id, next);
        info!(user_id, from = %current, to = %next, "phase_transition");
    }

    async fn on_document(&self, user_id: UserId, file_name: String, content: Vec<u8>) {
        // Final path component only; the platform supplies user-chosen names.
        let safe_name = Path::new(&file_name)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());

        let staged = self
            .upload_root
            .join(format!("{}_{}", Uuid::new_v4(), safe_name));
        let stage_result = async {
            tokio::fs::create_dir_all(&self.upload_root).await?;
            tokio::fs::write(&staged, &content).await
        }
        .await;
        if let Err(e) = stage_result {
            warn!(user_id, error = %e, "upload_staging_failed");
            let _ = self
                .delivery
                .send_status(user_id, "Could not store the upload, please try again.")
                .await;
            return;
        }

        let kind = if classify(&safe_name) == FileCategory::Archive {
            UploadKind::Archive
        } else {
            UploadKind::SingleFile
        };
        let prev = self.sessions.put(
            user_id,
            UploadRecord {
                storage_path: staged,
                kind,
                original_name: safe_name.clone(),
            },
        );
        if let Some(prev) = prev {
            // The abandoned upload's staged copy would otherwise leak.
            remove_file_quiet(&prev.storage_path);
        }

        self.transition(user_id, JobPhase::AwaitingLanguage);
        info!(user_id, name = %safe_name, kind = ?kind, "upload_recorded");

        if let Err(e) = self
            .delivery
            .show_menu(user_id, "Choose a target language:", events::language_menu())
            .await
        {
            warn!(user_id, error = %e, "menu_delivery_failed");
        }
    }

    async fn on_callback(&self, user_id: UserId, data: &str) {
        let payload = match CallbackPayload::decode(data) {
            Ok(payload) => payload,
            Err(_) => {
                warn!(user_id, data, "invalid_callback_payload");
                let _ = self.delivery.send_status(user_id, "Invalid selection.").await;
                return;
            }
        };
        match payload {
            CallbackPayload::Language(lang) => self.on_language(user_id, lang).await,
            CallbackPayload::Mode(mode, lang) => self.on_mode(user_id, mode, lang).await,
        }
    }

    async fn on_language(&self, user_id: UserId, target: Language) {
        if self.sessions.get(user_id).is_none() {
            self.fail_before_processing(user_id, JobError::NoUploadFound)
                .await;
            return;
        }

        self.transition(user_id, JobPhase::AwaitingMode);
        let title = format!("Choose translation mode for: {}", target.name());
        if let Err(e) = self
            .delivery
            .show_menu(user_id, &title, events::mode_menu(target))
            .await
        {
            warn!(user_id, error = %e, "menu_delivery_failed");
        }
    }

    async fn on_mode(&self, user_id: UserId, mode: TranslateMode, target: Language) {
        let Some(record) = self.sessions.get(user_id) else {
            self.fail_before_processing(user_id, JobError::NoUploadFound)
                .await;
            return;
        };

        // Unsupported single files short-circuit before any filesystem
        // side effect of Processing.
        if record.kind == UploadKind::SingleFile
            && !classify(&record.original_name).is_translatable()
        {
            self.fail_before_processing(
                user_id,
                JobError::UnsupportedFileType(record.original_name.clone()),
            )
            .await;
            return;
        }

        let request = JobRequest {
            user_id,
            target,
            mode,
        };
        let _ = self
            .delivery
            .send_status(
                user_id,
                "Processing... This may take a while for large archives.",
            )
            .await;
        self.transition(user_id, JobPhase::Processing);
        info!(user_id, target = %target, mode = ?mode, kind = ?record.kind, "job_started");

        let result = match self.run_job(&request, &record).await {
            Ok(outcome) => match self
                .delivery
                .send_file(user_id, &outcome.output_path, &outcome.output_name)
                .await
            {
                Ok(()) => Ok(outcome),
                Err(e) => Err(JobError::Unhandled(e.to_string())),
            },
            Err(e) => Err(e),
        };

        match result {
            Ok(outcome) => {
                let status = match outcome.kind {
                    UploadKind::Archive => {
                        format!("Done. Translated files: {}", outcome.translated)
                    }
                    UploadKind::SingleFile => "Done.".to_string(),
                };
                let _ = self.delivery.send_status(user_id, &status).await;
                self.transition(user_id, JobPhase::Delivered);
                info!(user_id, translated = outcome.translated, "job_delivered");
            }
            Err(error) => {
                warn!(user_id, error = %error, "job_failed");
                let _ = self
                    .delivery
                    .send_status(user_id, &error.user_message())
                    .await;
                self.transition(user_id, JobPhase::Failed);
            }
        }

        // Terminal cleanup runs identically for Delivered and Failed.
        self.cleanup(user_id, Some(&record));
    }

    async fn fail_before_processing(&self, user_id: UserId, error: JobError) {
        warn!(user_id, error = %error, "job_rejected");
        self.transition(user_id, JobPhase::Failed);
        let _ = self
            .delivery
            .send_status(user_id, &error.user_message())
            .await;
        self.cleanup(user_id, None);
    }

    async fn run_job(
        &self,
        request: &JobRequest,
        record: &UploadRecord,
    ) -> Result<JobOutcome, JobError> {
        let job_span = self.metrics.span(metric_names::T_JOB_DONE);
        let work_dir = self.work_dir(request.user_id);
        // Stale output from a previous unfinished run must not leak in.
        if work_dir.exists() {
            fs::remove_dir_all(&work_dir)?;
        }
        fs::create_dir_all(&work_dir)?;

        let result = match record.kind {
            UploadKind::Archive => self.process_archive(request, record, &work_dir).await,
            UploadKind::SingleFile => self.process_single(request, record, &work_dir).await,
        };
        job_span.finish();
        result
    }

    async fn process_archive(
        &self,
        request: &JobRequest,
        record: &UploadRecord,
        work_dir: &Path,
    ) -> Result<JobOutcome, JobError> {
        let extract_dir = work_dir.join("extracted");
        let span = self.metrics.span(metric_names::T_EXTRACT_DONE);
        archive::extract(&record.storage_path, &extract_dir)?;
        span.finish();

        let mut members = Vec::new();
        for entry in WalkDir::new(&extract_dir).sort_by_file_name() {
            let entry = entry.map_err(|e| JobError::Unhandled(e.to_string()))?;
            if entry.file_type().is_file() {
                members.push(entry.path().to_path_buf());
            }
        }

        let mut translated = 0usize;
        // Strictly one member at a time: each gateway call fully resolves
        // before the next member starts.
        for path in members {
            let member_name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            let category = classify(&member_name);
            if !category.is_translatable() {
                continue;
            }

            let bytes = tokio::fs::read(&path).await?;
            let text = String::from_utf8_lossy(&bytes).into_owned();
            let span = self.metrics.span(metric_names::T_MEMBER_TRANSLATED);
            let output = self
                .service
                .translate_member(&member_name, category, request.mode, request.target, &text)
                .await?;
            tokio::fs::write(&path, output).await?;
            span.finish();
            translated += 1;
            info!(user_id = request.user_id, member = %member_name, "member_translated");
        }

        let output_name = format!("translated_{}", record.original_name);
        let output_path = work_dir.join(&output_name);
        let span = self.metrics.span(metric_names::T_REPACKAGE_DONE);
        archive::repackage(&extract_dir, &output_path)?;
        span.finish();

        Ok(JobOutcome {
            output_path,
            output_name,
            translated,
            kind: UploadKind::Archive,
        })
    }

    async fn process_single(
        &self,
        request: &JobRequest,
        record: &UploadRecord,
        work_dir: &Path,
    ) -> Result<JobOutcome, JobError> {
        let category = classify(&record.original_name);
        if !category.is_translatable() {
            // Guarded before Processing; kept total for direct callers.
            return Err(JobError::UnsupportedFileType(record.original_name.clone()));
        }

        let bytes = tokio::fs::read(&record.storage_path).await?;
        let text = String::from_utf8_lossy(&bytes).into_owned();
        let output = self
            .service
            .translate_member(
                &record.original_name,
                category,
                request.mode,
                request.target,
                &text,
            )
            .await?;

        let output_name = format!("translated_{}", record.original_name);
        let output_path = work_dir.join(&output_name);
        tokio::fs::write(&output_path, output).await?;

        Ok(JobOutcome {
            output_path,
            output_name,
            translated: 1,
            kind: UploadKind::SingleFile,
        })
    }

    /// Delete the staged upload, the working directory and the session
    /// entry. Failures here are logged and swallowed; the primary outcome
    /// was already reported.
    fn cleanup(&self, user_id: UserId, record: Option<&UploadRecord>) {
        if let Some(stored) = self.sessions.remove(user_id) {
            remove_file_quiet(&stored.storage_path);
        }
        if let Some(record) = record {
            remove_file_quiet(&record.storage_path);
        }

        let work_dir = self.work_dir(user_id);
        if work_dir.exists() {
            if let Err(e) = fs::remove_dir_all(&work_dir) {
                warn!(user_id, error = %e, "workdir_cleanup_failed");
            }
        }
        self.phases.lock().remove(&user_id);
    }
}

fn remove_file_quiet(path: &Path) {
    if path.exists() {
        if let Err(e) = fs::remove_file(path) {
            warn!(path = %path.display(), error = %e, "upload_cleanup_failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn happy_path_transitions_are_valid() {
        let path = [
            JobPhase::AwaitingUpload,
            JobPhase::AwaitingLanguage,
            JobPhase::AwaitingMode,
            JobPhase::Processing,
            JobPhase::Delivered,
        ];
        for pair in path.windows(2) {
            assert!(pair[0].can_transition_to(pair[1]), "{} -> {}", pair[0], pair[1]);
        }
        assert!(JobPhase::Processing.can_transition_to(JobPhase::Failed));
    }

    #[test]
    fn selection_phases_can_fail_early() {
        assert!(JobPhase::AwaitingUpload.can_transition_to(JobPhase::Failed));
        assert!(JobPhase::AwaitingLanguage.can_transition_to(JobPhase::Failed));
        assert!(JobPhase::AwaitingMode.can_transition_to(JobPhase::Failed));
    }

    #[test]
    fn new_upload_abandons_selection_path() {
        assert!(JobPhase::AwaitingLanguage.can_transition_to(JobPhase::AwaitingLanguage));
        assert!(JobPhase::AwaitingMode.can_transition_to(JobPhase::AwaitingLanguage));
    }

    #[test]
    fn terminal_phases_do_not_resume() {
        for terminal in [JobPhase::Delivered, JobPhase::Failed] {
            for next in [
                JobPhase::AwaitingLanguage,
                JobPhase::AwaitingMode,
                JobPhase::Processing,
                JobPhase::Delivered,
            ] {
                assert!(!terminal.can_transition_to(next), "{terminal} -> {next}");
            }
        }
    }

    #[test]
    fn skipping_menus_is_invalid() {
        assert!(!JobPhase::AwaitingUpload.can_transition_to(JobPhase::Processing));
        assert!(!JobPhase::AwaitingLanguage.can_transition_to(JobPhase::Processing));
        assert!(!JobPhase::AwaitingUpload.can_transition_to(JobPhase::AwaitingMode));
    }

    #[test]
    fn mode_wire_round_trip() {
        for mode in [TranslateMode::Normal, TranslateMode::AdultSafe] {
            assert_eq!(TranslateMode::from_wire(mode.wire()), Some(mode));
        }
        assert_eq!(TranslateMode::from_wire("spicy"), None);
    }

    #[test]
    fn user_messages_distinguish_preemptive_rejections() {
        assert!(JobError::NoUploadFound
            .user_message()
            .contains("No uploaded file found"));
        assert!(JobError::UnsupportedFileType("x.png".into())
            .user_message()
            .contains("Unsupported file type"));
        assert!(JobError::Unhandled("disk full".into())
            .user_message()
            .starts_with("Error while processing:"));
    }
}

//! # Report Persistence & Escalation
//!
//! End-of-session teardown. The [`Reporter`] closes the log with its
//! lifecycle notices, decides whether the digest leaves the building, and
//! writes the three report artifacts: the session TSV (overwritten every
//! run), the running history TSV (appended every run) and an HTML rendering
//! of the same table.
//!
//! Delivery failures never abort the teardown. They are recorded as ERROR
//! findings so the persisted report shows what happened, and the files are
//! written regardless.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;

use crate::config::{EmailConfig, ReportPaths};
use crate::incident::{Finding, IncidentLog, Severity};
use crate::notify::{Digest, Notifier};

/// Errors raised while persisting the session report
#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    /// A report file could not be created or written
    #[error("failed to write report file {path}: {source}")]
    Io {
        /// Offending path
        path: PathBuf,
        /// Underlying I/O error
        source: std::io::Error,
    },

    /// TSV serialization failure
    #[error("failed to serialize report rows: {0}")]
    Tsv(#[from] csv::Error),
}

/// Persists the session log and escalates it when policy says so.
pub struct Reporter {
    paths: ReportPaths,
    email: EmailConfig,
    notifier: Option<Box<dyn Notifier>>,
}

impl Reporter {
    /// Reporter that persists but never notifies.
    pub fn new(paths: ReportPaths) -> Self {
        Self {
            paths,
            email: EmailConfig::default(),
            notifier: None,
        }
    }

    /// Attach the delivery policy and a carrier for the digest.
    pub fn with_notifier(mut self, email: EmailConfig, notifier: Box<dyn Notifier>) -> Self {
        self.email = email;
        self.notifier = Some(notifier);
        self
    }

    /// Close out one session.
    ///
    /// Appends the closing notice, sends the digest when a finding reaches
    /// `min_severity` and delivery is enabled, records whether the mail went
    /// out, then writes the session TSV, the history TSV and the HTML table.
    /// `session_date` names the analyzed day in the subject line; without
    /// one, yesterday is assumed (the usual cron setup analyzes the day
    /// that just ended).
    pub fn finish(
        &self,
        log: &mut IncidentLog,
        session_date: Option<NaiveDate>,
    ) -> Result<(), ReportError> {
        log.push(Finding::new(Severity::Info, "Finishing logging session"));

        let wants_digest = self.email.enabled && log.any_at_or_above(self.email.min_severity);
        let mut delivered = false;
        if wants_digest {
            if let Some(notifier) = &self.notifier {
                let digest = build_digest(log, session_date);
                match notifier.send(&digest) {
                    Ok(()) => delivered = true,
                    Err(err) => {
                        log.push(Finding::new(
                            Severity::Error,
                            format!("E-mail delivery failed: {}", err),
                        ));
                    }
                }
            }
        }

        if delivered {
            log.push(Finding::new(
                Severity::Info,
                format!("E-mail sent to: {}", self.email.recipients.join(", ")),
            ));
        } else {
            log.push(Finding::new(Severity::Info, "E-mail not sent"));
        }

        if log.all_informational() {
            log::info!("all log entries are informational, nothing to escalate");
        }

        self.persist(log)
    }

    fn persist(&self, log: &IncidentLog) -> Result<(), ReportError> {
        std::fs::create_dir_all(&self.paths.dir).map_err(|source| ReportError::Io {
            path: self.paths.dir.clone(),
            source,
        })?;

        let session_path = self.paths.session_path();
        let session_file = File::create(&session_path).map_err(|source| ReportError::Io {
            path: session_path.clone(),
            source,
        })?;
        write_tsv(session_file, &session_path, log)?;

        let history_path = self.paths.history_path();
        let history_file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&history_path)
            .map_err(|source| ReportError::Io {
                path: history_path.clone(),
                source,
            })?;
        write_tsv(history_file, &history_path, log)?;

        let html_path = self.paths.html_path();
        std::fs::write(&html_path, log.to_html()).map_err(|source| ReportError::Io {
            path: html_path,
            source,
        })?;

        log::info!("session report written under {}", self.paths.dir.display());
        Ok(())
    }
}

/// Digest for the current log: the HTML table followed by one `cid:` image
/// tag per diagnostic chart, charts inlined in detection order.
fn build_digest(log: &IncidentLog, session_date: Option<NaiveDate>) -> Digest {
    let date = session_date
        .unwrap_or_else(|| chrono::Local::now().date_naive() - chrono::Duration::days(1));

    let mut images = Vec::new();
    let mut image_tags = String::new();
    for entry in log.entries() {
        if let Some(plot) = &entry.plot {
            let cid = uuid::Uuid::new_v4().simple().to_string();
            image_tags.push_str(&format!("<br><img src=\"cid:{}\"><br>", cid));
            images.push((cid, plot.clone()));
        }
    }

    Digest {
        subject: format!("Failure in meteo station : {}", date.format("%Y-%m-%d")),
        html_body: format!("{}{}", log.to_html(), image_tags),
        images,
    }
}

fn write_tsv<W: Write>(writer: W, path: &Path, log: &IncidentLog) -> Result<(), ReportError> {
    let mut tsv = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .from_writer(writer);
    for entry in log.entries() {
        tsv.write_record(entry.tsv_record())?;
    }
    tsv.flush().map_err(|source| ReportError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(())
}

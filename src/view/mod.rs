//! State behind the records table: one fetch, live search, fixed-size pages, exports and
//! short-lived notices. Time is passed in explicitly so notice expiry is a plain state
//! transition driven by [`TableView::tick`].

pub mod client;
pub mod notice;

use std::path::{Path, PathBuf};
use std::time::Instant;

use tracing::{error, info};

use crate::export::{self, ExportError};
use crate::files::UploadRecord;
use client::RecordsClient;
use notice::{Notice, NoticeKind};

pub const PAGE_SIZE: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadState {
    Idle,
    Loading,
    Loaded,
    NotLoggedIn,
    Failed(String),
}

#[derive(Debug)]
pub struct TableView {
    records: Vec<UploadRecord>,
    /// Indexes into `records` matching `query`, in fetch order.
    filtered: Vec<usize>,
    query: String,
    page: usize,
    state: LoadState,
    notice: Option<Notice>,
}

impl Default for TableView {
    fn default() -> Self {
        Self::new()
    }
}

impl TableView {
    pub fn new() -> Self {
        Self {
            records: Vec::new(),
            filtered: Vec::new(),
            query: String::new(),
            page: 1,
            state: LoadState::Idle,
            notice: None,
        }
    }

    /// Fetches the uploader's records once. Without a stored uploader id nothing is
    /// requested.
    pub async fn load(&mut self, client: &dyn RecordsClient, upload_users_id: Option<&str>) {
        let Some(uploader) = upload_users_id.map(str::trim).filter(|v| !v.is_empty()) else {
            self.state = LoadState::NotLoggedIn;
            return;
        };

        self.state = LoadState::Loading;
        match client.fetch_records(uploader).await {
            Ok(records) => {
                info!(uploader, count = records.len(), "records loaded");
                self.set_records(records);
                self.state = LoadState::Loaded;
            }
            Err(e) => {
                error!(error = %e, uploader, "fetching records failed");
                self.state = LoadState::Failed(format!("Error fetching data: {e}"));
            }
        }
    }

    pub fn set_records(&mut self, records: Vec<UploadRecord>) {
        self.records = records;
        self.refilter();
    }

    pub fn state(&self) -> &LoadState {
        &self.state
    }

    /// Replaces the search query, recomputes the filtered view and returns to page 1.
    pub fn set_query(&mut self, query: &str) {
        self.query = query.to_string();
        self.refilter();
    }

    fn refilter(&mut self) {
        self.filtered = self
            .records
            .iter()
            .enumerate()
            .filter(|(_, r)| r.matches(&self.query))
            .map(|(i, _)| i)
            .collect();
        self.page = 1;
    }

    pub fn filtered(&self) -> impl Iterator<Item = &UploadRecord> + '_ {
        self.filtered.iter().map(|&i| &self.records[i])
    }

    pub fn filtered_len(&self) -> usize {
        self.filtered.len()
    }

    pub fn page(&self) -> usize {
        self.page
    }

    /// Never less than 1, so an empty view reads "page 1 of 1".
    pub fn total_pages(&self) -> usize {
        self.filtered.len().div_ceil(PAGE_SIZE).max(1)
    }

    pub fn page_items(&self) -> Vec<&UploadRecord> {
        self.filtered
            .iter()
            .skip((self.page - 1) * PAGE_SIZE)
            .take(PAGE_SIZE)
            .map(|&i| &self.records[i])
            .collect()
    }

    pub fn has_next(&self) -> bool {
        self.page < self.total_pages()
    }

    pub fn has_prev(&self) -> bool {
        self.page > 1
    }

    pub fn next_page(&mut self) {
        if self.has_next() {
            self.page += 1;
        }
    }

    pub fn prev_page(&mut self) {
        if self.has_prev() {
            self.page -= 1;
        }
    }

    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    /// Clears the notice once its display time has passed.
    pub fn tick(&mut self, now: Instant) {
        if self.notice.as_ref().is_some_and(|n| n.is_expired(now)) {
            self.notice = None;
        }
    }

    /// Writes the whole filtered view to `UserData.xlsx` in `dir`.
    pub fn export_spreadsheet(&mut self, dir: &Path, now: Instant) -> Option<PathBuf> {
        self.export(dir, export::XLSX_FILE_NAME, "Excel", now, |records| {
            export::records_to_xlsx(records)
        })
    }

    /// Writes the whole filtered view to `UserData.pdf` in `dir`.
    pub fn export_pdf(&mut self, dir: &Path, now: Instant) -> Option<PathBuf> {
        self.export(dir, export::PDF_FILE_NAME, "PDF", now, |records| {
            export::records_to_pdf(records)
        })
    }

    fn export(
        &mut self,
        dir: &Path,
        file_name: &str,
        label: &str,
        now: Instant,
        render: impl FnOnce(Vec<&UploadRecord>) -> Result<Vec<u8>, ExportError>,
    ) -> Option<PathBuf> {
        if self.filtered.is_empty() {
            self.notice = Some(Notice::new(NoticeKind::Info, "Data not available", now));
            return None;
        }

        let path = dir.join(file_name);
        let written = render(self.filtered().collect())
            .map_err(anyhow::Error::from)
            .and_then(|bytes| std::fs::write(&path, bytes).map_err(anyhow::Error::from));

        match written {
            Ok(()) => {
                info!(path = %path.display(), rows = self.filtered.len(), "export written");
                self.notice = Some(Notice::new(
                    NoticeKind::Success,
                    format!("{label} file downloaded successfully"),
                    now,
                ));
                Some(path)
            }
            Err(e) => {
                error!(error = %e, path = %path.display(), "export failed");
                self.notice = Some(Notice::new(
                    NoticeKind::Failure,
                    format!("Failed to download {label} file"),
                    now,
                ));
                None
            }
        }
    }
}

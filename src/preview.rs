use serde_json::{Map, Value};

use crate::validate::ValidationIssue;

pub const ROWS_PER_PAGE: usize = 10;
pub const MAX_UPLOAD_BYTES: u64 = 2 * 1024 * 1024;

const MSG_BAD_TYPE: &str = "Only Excel files are allowed";
const MSG_TOO_LARGE: &str = "File size should be less than 2MB";
const MSG_NO_VALID_ROWS: &str = "No valid data to import";

/// Lifecycle of one loaded file. `Uploading` and `Importing` are held only
/// while the corresponding request is in flight; an upload failure drops
/// back to `FileSelected`, an import completion back to `Previewing`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    NoFile,
    FileSelected,
    Uploading,
    Previewing,
    Importing,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::NoFile => "noFile",
            Phase::FileSelected => "fileSelected",
            Phase::Uploading => "uploading",
            Phase::Previewing => "previewing",
            Phase::Importing => "importing",
        }
    }
}

/// One row of the working copy. `sheet_row` is the row's original 1-based
/// spreadsheet position (data starts at 2) and never changes, so error
/// attribution survives deletions above it. `errors` holds every issue for
/// the row, not just the last one reported.
#[derive(Debug, Clone)]
pub struct WorkingRow {
    pub sheet_row: usize,
    pub record: Map<String, Value>,
    pub errors: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct SheetState {
    pub name: String,
    pub rows: Vec<WorkingRow>,
}

impl SheetState {
    pub fn from_parsed(
        name: String,
        data: Vec<Map<String, Value>>,
        issues: &[ValidationIssue],
    ) -> SheetState {
        let rows = data
            .into_iter()
            .enumerate()
            .map(|(i, record)| {
                let sheet_row = i + 2;
                let errors = issues
                    .iter()
                    .filter(|issue| issue.row == sheet_row)
                    .map(|issue| issue.message.clone())
                    .collect();
                WorkingRow {
                    sheet_row,
                    record,
                    errors,
                }
            })
            .collect();
        SheetState { name, rows }
    }
}

/// Rows filtered down to the importable subset, paired with the sheet they
/// came from.
#[derive(Debug)]
pub struct ImportPayload {
    pub sheet_name: String,
    pub rows: Vec<Map<String, Value>>,
}

/// Single source of truth for the preview: active sheet, working rows with
/// their issues, and pagination. The shell renders what this model reports
/// and calls back in; it holds no sheet or error state of its own.
#[derive(Debug)]
pub struct PreviewModel {
    phase: Phase,
    file_name: Option<String>,
    validated_at: Option<String>,
    sheets: Vec<SheetState>,
    active: usize,
    page: usize,
}

impl PreviewModel {
    pub fn new() -> PreviewModel {
        PreviewModel {
            phase: Phase::NoFile,
            file_name: None,
            validated_at: None,
            sheets: Vec::new(),
            active: 0,
            page: 1,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn file_name(&self) -> Option<&str> {
        self.file_name.as_deref()
    }

    pub fn validated_at(&self) -> Option<&str> {
        self.validated_at.as_deref()
    }

    /// Gate a candidate file before anything is read: xlsx only, 2 MiB cap.
    /// Selecting a file discards any previous preview.
    pub fn select_file(&mut self, name: &str, size: u64) -> Result<(), String> {
        if !name.to_ascii_lowercase().ends_with(".xlsx") {
            return Err(MSG_BAD_TYPE.to_string());
        }
        if size > MAX_UPLOAD_BYTES {
            return Err(MSG_TOO_LARGE.to_string());
        }
        self.file_name = Some(name.to_string());
        self.validated_at = None;
        self.sheets.clear();
        self.active = 0;
        self.page = 1;
        self.phase = Phase::FileSelected;
        Ok(())
    }

    pub fn begin_upload(&mut self) -> anyhow::Result<()> {
        anyhow::ensure!(
            self.phase == Phase::FileSelected,
            "no file selected to upload"
        );
        self.phase = Phase::Uploading;
        Ok(())
    }

    pub fn upload_failed(&mut self) {
        if self.phase == Phase::Uploading {
            self.phase = Phase::FileSelected;
        }
    }

    /// Install the upload response: first sheet by workbook order becomes
    /// active, pagination resets to page 1.
    pub fn finish_upload(
        &mut self,
        sheets: Vec<SheetState>,
        validated_at: String,
    ) -> anyhow::Result<()> {
        anyhow::ensure!(self.phase == Phase::Uploading, "no upload in flight");
        self.sheets = sheets;
        self.validated_at = Some(validated_at);
        self.active = 0;
        self.page = 1;
        self.phase = Phase::Previewing;
        Ok(())
    }

    pub fn sheet_names(&self) -> Vec<&str> {
        self.sheets.iter().map(|s| s.name.as_str()).collect()
    }

    pub fn active_sheet(&self) -> Option<&SheetState> {
        self.sheets.get(self.active)
    }

    pub fn select_sheet(&mut self, name: &str) -> anyhow::Result<()> {
        anyhow::ensure!(self.phase == Phase::Previewing, "nothing is being previewed");
        let idx = self
            .sheets
            .iter()
            .position(|s| s.name == name)
            .ok_or_else(|| anyhow::anyhow!("unknown sheet: {name}"))?;
        self.active = idx;
        self.page = 1;
        Ok(())
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn page_count(&self) -> usize {
        let rows = self.active_sheet().map(|s| s.rows.len()).unwrap_or(0);
        rows.div_ceil(ROWS_PER_PAGE).max(1)
    }

    pub fn can_prev(&self) -> bool {
        self.page > 1
    }

    pub fn can_next(&self) -> bool {
        self.page < self.page_count()
    }

    pub fn prev_page(&mut self) {
        if self.can_prev() {
            self.page -= 1;
        }
    }

    pub fn next_page(&mut self) {
        if self.can_next() {
            self.page += 1;
        }
    }

    pub fn page_rows(&self) -> &[WorkingRow] {
        let Some(sheet) = self.active_sheet() else {
            return &[];
        };
        let start = (self.page - 1) * ROWS_PER_PAGE;
        let end = (start + ROWS_PER_PAGE).min(sheet.rows.len());
        if start >= sheet.rows.len() {
            return &[];
        }
        &sheet.rows[start..end]
    }

    /// Remove a row from the working copy by its original spreadsheet row
    /// number. Client-side only: nothing is told about it, and the row stays
    /// gone if the sheet is re-selected later.
    pub fn delete_row(&mut self, sheet_row: usize) -> anyhow::Result<()> {
        anyhow::ensure!(self.phase == Phase::Previewing, "nothing is being previewed");
        let sheet = self
            .sheets
            .get_mut(self.active)
            .ok_or_else(|| anyhow::anyhow!("no active sheet"))?;
        let idx = sheet
            .rows
            .iter()
            .position(|r| r.sheet_row == sheet_row)
            .ok_or_else(|| anyhow::anyhow!("row {sheet_row} not found"))?;
        sheet.rows.remove(idx);
        let pages = self.page_count();
        if self.page > pages {
            self.page = pages;
        }
        Ok(())
    }

    /// The importable subset of the active sheet: working rows that carry no
    /// validation issues. `Err` with the local toast message when nothing
    /// qualifies, in which case the backend is never called.
    pub fn import_payload(&self) -> Result<ImportPayload, String> {
        let Some(sheet) = self.active_sheet() else {
            return Err(MSG_NO_VALID_ROWS.to_string());
        };
        let rows: Vec<Map<String, Value>> = sheet
            .rows
            .iter()
            .filter(|r| r.errors.is_empty())
            .map(|r| r.record.clone())
            .collect();
        if rows.is_empty() {
            return Err(MSG_NO_VALID_ROWS.to_string());
        }
        Ok(ImportPayload {
            sheet_name: sheet.name.clone(),
            rows,
        })
    }

    pub fn begin_import(&mut self) -> anyhow::Result<()> {
        anyhow::ensure!(self.phase == Phase::Previewing, "nothing is being previewed");
        self.phase = Phase::Importing;
        Ok(())
    }

    pub fn finish_import(&mut self) {
        if self.phase == Phase::Importing {
            self.phase = Phase::Previewing;
        }
    }
}

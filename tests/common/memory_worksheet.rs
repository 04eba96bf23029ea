//! In-memory [`Worksheet`] with injectable failures.

use async_trait::async_trait;
use jobscout::sheets::{SheetsError, Worksheet};
use std::collections::VecDeque;
use std::sync::Mutex;

#[derive(Default)]
struct SheetState {
    rows: Vec<Vec<String>>,
    read_failures: VecDeque<SheetsError>,
    /// Failures keyed by the number of successful writes they wait for.
    write_failures: Vec<(usize, SheetsError)>,
    writes: usize,
    reads: usize,
    inserts: usize,
    appends: usize,
    updates: usize,
}

#[derive(Default)]
pub struct MemoryWorksheet {
    state: Mutex<SheetState>,
}

impl MemoryWorksheet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rows(rows: Vec<Vec<String>>) -> Self {
        let sheet = Self::default();
        sheet.state.lock().unwrap().rows = rows;
        sheet
    }

    pub fn rows(&self) -> Vec<Vec<String>> {
        self.state.lock().unwrap().rows.clone()
    }

    /// Overwrite one cell; `row_number` is 1-based, `column` 0-based.
    pub fn set_cell(&self, row_number: usize, column: usize, value: &str) {
        let mut state = self.state.lock().unwrap();
        let row = &mut state.rows[row_number - 1];
        if row.len() <= column {
            row.resize(column + 1, String::new());
        }
        row[column] = value.to_string();
    }

    /// The next read fails with `error`.
    pub fn fail_next_read(&self, error: SheetsError) {
        self.state.lock().unwrap().read_failures.push_back(error);
    }

    /// The next write (insert, append or update) fails with `error` and
    /// leaves the sheet untouched.
    pub fn fail_next_write(&self, error: SheetsError) {
        self.fail_write_after(0, error);
    }

    /// Let `successful` more writes through, then fail the one after.
    pub fn fail_write_after(&self, successful: usize, error: SheetsError) {
        let mut state = self.state.lock().unwrap();
        let at = state.writes + successful;
        state.write_failures.push((at, error));
    }

    pub fn reads(&self) -> usize {
        self.state.lock().unwrap().reads
    }

    pub fn appends(&self) -> usize {
        self.state.lock().unwrap().appends
    }

    pub fn updates(&self) -> usize {
        self.state.lock().unwrap().updates
    }

    pub fn inserts(&self) -> usize {
        self.state.lock().unwrap().inserts
    }

    /// Cell value by 1-based row and header name.
    pub fn cell(&self, row_number: usize, header: &str) -> Option<String> {
        let state = self.state.lock().unwrap();
        let column = state.rows.first()?.iter().position(|h| h == header)?;
        state.rows.get(row_number - 1)?.get(column).cloned()
    }

    /// 1-based row number of the row whose first cell is `job_id`.
    pub fn row_of(&self, job_id: &str) -> Option<usize> {
        let state = self.state.lock().unwrap();
        state
            .rows
            .iter()
            .position(|row| row.first().map(String::as_str) == Some(job_id))
            .map(|idx| idx + 1)
    }
}

impl SheetState {
    fn take_write_failure(&mut self) -> Option<SheetsError> {
        let writes = self.writes;
        let pos = self.write_failures.iter().position(|(at, _)| *at == writes)?;
        Some(self.write_failures.remove(pos).1)
    }
}

#[async_trait]
impl Worksheet for MemoryWorksheet {
    async fn read_all(&self) -> Result<Vec<Vec<String>>, SheetsError> {
        let mut state = self.state.lock().unwrap();
        if let Some(error) = state.read_failures.pop_front() {
            return Err(error);
        }
        state.reads += 1;
        Ok(state.rows.clone())
    }

    async fn insert_row(&self, row_number: usize, values: &[String]) -> Result<(), SheetsError> {
        let mut state = self.state.lock().unwrap();
        if let Some(error) = state.take_write_failure() {
            return Err(error);
        }
        state.inserts += 1;
        state.writes += 1;
        let at = (row_number - 1).min(state.rows.len());
        state.rows.insert(at, values.to_vec());
        Ok(())
    }

    async fn append_row(&self, values: &[String]) -> Result<(), SheetsError> {
        let mut state = self.state.lock().unwrap();
        if let Some(error) = state.take_write_failure() {
            return Err(error);
        }
        state.appends += 1;
        state.writes += 1;
        state.rows.push(values.to_vec());
        Ok(())
    }

    async fn update_row(&self, row_number: usize, values: &[String]) -> Result<(), SheetsError> {
        let mut state = self.state.lock().unwrap();
        if let Some(error) = state.take_write_failure() {
            return Err(error);
        }
        let Some(row) = state.rows.get_mut(row_number - 1) else {
            return Err(SheetsError::Api {
                status: 400,
                message: format!("row {} is out of range", row_number),
            });
        };
        if row.len() < values.len() {
            row.resize(values.len(), String::new());
        }
        row[..values.len()].clone_from_slice(values);
        state.updates += 1;
        state.writes += 1;
        Ok(())
    }
}

//! Tabular projection over the full sample stream.
//!
//! Unlike the chart series, the backing list keeps every sample of the session
//! unless `max_rows` is set. Filtering, sorting and paging are view concerns
//! and never alter what is retained.

use std::collections::VecDeque;
use std::io::Write;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ExportError;
use crate::sample::{Sample, SelectedPoint};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TableColumn {
    Id,
    Technique,
    X,
    Y,
    Timestamp,
}

impl TableColumn {
    pub const ALL: [TableColumn; 5] = [
        TableColumn::Id,
        TableColumn::Technique,
        TableColumn::X,
        TableColumn::Y,
        TableColumn::Timestamp,
    ];

    pub fn header(self) -> &'static str {
        match self {
            TableColumn::Id => "id",
            TableColumn::Technique => "technique",
            TableColumn::X => "x",
            TableColumn::Y => "y",
            TableColumn::Timestamp => "timestamp",
        }
    }

    /// Cell text exactly as displayed (and as searched by the filter).
    pub fn cell(self, sample: &Sample) -> String {
        match self {
            TableColumn::Id => sample.sequence.to_string(),
            TableColumn::Technique => sample.technique.to_string(),
            TableColumn::X => sample.x.to_string(),
            TableColumn::Y => sample.y.to_string(),
            TableColumn::Timestamp => sample.timestamp_text(),
        }
    }

    fn compare(self, a: &Sample, b: &Sample) -> std::cmp::Ordering {
        match self {
            TableColumn::Id => a.sequence.cmp(&b.sequence),
            TableColumn::Technique => a.technique.cmp(&b.technique),
            TableColumn::X => a.x.total_cmp(&b.x),
            TableColumn::Y => a.y.total_cmp(&b.y),
            TableColumn::Timestamp => a.received_at.cmp(&b.received_at),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortOrder {
    pub column: TableColumn,
    pub direction: SortDirection,
}

impl Default for SortOrder {
    fn default() -> Self {
        Self {
            column: TableColumn::Id,
            direction: SortDirection::Ascending,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "usize", into = "usize")]
pub enum PageSize {
    Ten,
    #[default]
    Twenty,
    Fifty,
    Hundred,
}

impl PageSize {
    pub const ALL: [PageSize; 4] = [
        PageSize::Ten,
        PageSize::Twenty,
        PageSize::Fifty,
        PageSize::Hundred,
    ];

    pub fn rows(self) -> usize {
        match self {
            PageSize::Ten => 10,
            PageSize::Twenty => 20,
            PageSize::Fifty => 50,
            PageSize::Hundred => 100,
        }
    }
}

impl TryFrom<usize> for PageSize {
    type Error = String;

    fn try_from(value: usize) -> Result<Self, Self::Error> {
        PageSize::ALL
            .into_iter()
            .find(|p| p.rows() == value)
            .ok_or_else(|| format!("page size must be one of 10, 20, 50, 100 (got {value})"))
    }
}

impl From<PageSize> for usize {
    fn from(p: PageSize) -> usize {
        p.rows()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableProjection {
    rows: VecDeque<Sample>,
    max_rows: Option<usize>,
    filter: String,
    sort: SortOrder,
    page_size: PageSize,
    page: usize,
    highlighted: Option<SelectedPoint>,
}

impl Default for TableProjection {
    fn default() -> Self {
        Self::new(PageSize::default(), None)
    }
}

impl TableProjection {
    pub fn new(page_size: PageSize, max_rows: Option<usize>) -> Self {
        Self {
            rows: VecDeque::new(),
            max_rows,
            filter: String::new(),
            sort: SortOrder::default(),
            page_size,
            page: 0,
            highlighted: None,
        }
    }

    /// Rows retained, ignoring the filter.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn max_rows(&self) -> Option<usize> {
        self.max_rows
    }

    pub fn push(&mut self, sample: Sample) {
        self.rows.push_back(sample);
        if let Some(cap) = self.max_rows {
            while self.rows.len() > cap {
                self.rows.pop_front();
            }
        }
    }

    /// Drops rows, the highlight and the page; keeps the user's filter, sort and page size.
    pub fn reset(&mut self) {
        self.rows.clear();
        self.page = 0;
        self.highlighted = None;
    }

    pub fn filter(&self) -> &str {
        &self.filter
    }

    pub fn set_filter(&mut self, filter: impl Into<String>) {
        self.filter = filter.into();
        self.page = 0;
    }

    pub fn sort(&self) -> SortOrder {
        self.sort
    }

    pub fn set_sort(&mut self, sort: SortOrder) {
        self.sort = sort;
    }

    /// Header click: same column flips direction, another column sorts ascending.
    pub fn toggle_sort(&mut self, column: TableColumn) {
        self.sort = if self.sort.column == column {
            SortOrder {
                column,
                direction: match self.sort.direction {
                    SortDirection::Ascending => SortDirection::Descending,
                    SortDirection::Descending => SortDirection::Ascending,
                },
            }
        } else {
            SortOrder {
                column,
                direction: SortDirection::Ascending,
            }
        };
    }

    pub fn page_size(&self) -> PageSize {
        self.page_size
    }

    pub fn set_page_size(&mut self, size: PageSize) {
        self.page_size = size;
        self.page = 0;
    }

    pub fn page(&self) -> usize {
        self.page
    }

    fn filter_matches(&self, needle: &str, sample: &Sample) -> bool {
        needle.is_empty()
            || TableColumn::ALL
                .iter()
                .any(|c| c.cell(sample).to_lowercase().contains(needle))
    }

    /// Filtered and sorted rows.
    pub fn view(&self) -> Vec<&Sample> {
        let needle = self.filter.to_lowercase();
        let mut rows: Vec<&Sample> = self
            .rows
            .iter()
            .filter(|s| self.filter_matches(&needle, s))
            .collect();
        let SortOrder { column, direction } = self.sort;
        // rows arrive in id order already
        if column != TableColumn::Id {
            rows.sort_by(|a, b| column.compare(a, b));
        }
        if direction == SortDirection::Descending {
            rows.reverse();
        }
        rows
    }

    pub fn page_count(&self) -> usize {
        self.view().len().div_ceil(self.page_size.rows()).max(1)
    }

    pub fn set_page(&mut self, page: usize) {
        self.page = page.min(self.page_count() - 1);
    }

    /// Rows on the current page. The page is clamped if rows were filtered away.
    pub fn page_rows(&self) -> Vec<&Sample> {
        let rows = self.view();
        let size = self.page_size.rows();
        let last_page = rows.len().saturating_sub(1) / size;
        let start = self.page.min(last_page) * size;
        rows.into_iter().skip(start).take(size).collect()
    }

    pub fn highlighted(&self) -> Option<&SelectedPoint> {
        self.highlighted.as_ref()
    }

    pub fn is_highlighted(&self, sample: &Sample) -> bool {
        self.highlighted.as_ref().is_some_and(|p| p.matches(sample))
    }

    /// Row click on the current page; returns the reference the chart highlights.
    pub fn click_row(&mut self, row: usize) -> Option<SelectedPoint> {
        let point = self.page_rows().get(row).map(|s| SelectedPoint::of(s))?;
        self.highlighted = Some(point.clone());
        Some(point)
    }

    /// Highlight a point picked elsewhere and page to it if it is visible.
    pub fn highlight(&mut self, point: Option<SelectedPoint>) {
        let pos = point
            .as_ref()
            .and_then(|p| self.view().iter().position(|s| p.matches(s)));
        if let Some(pos) = pos {
            self.page = pos / self.page_size.rows();
        }
        self.highlighted = point;
    }

    /// Write the current view as `id,technique,x,y,timestamp` lines, header first.
    pub fn write_csv<W: Write>(&self, mut w: W) -> std::io::Result<()> {
        let header: Vec<&str> = TableColumn::ALL.iter().map(|c| c.header()).collect();
        writeln!(w, "{}", header.join(","))?;
        for sample in self.view() {
            let cells: Vec<String> = TableColumn::ALL
                .iter()
                .map(|c| csv_field(&c.cell(sample)))
                .collect();
            writeln!(w, "{}", cells.join(","))?;
        }
        Ok(())
    }

    pub fn save_csv<P: AsRef<Path>>(&self, path: P) -> Result<(), ExportError> {
        let path = path.as_ref();
        let io_err = |source| ExportError::Io {
            path: path.to_path_buf(),
            source,
        };
        let f = std::fs::File::create(path).map_err(io_err)?;
        let mut w = std::io::BufWriter::new(f);
        self.write_csv(&mut w).map_err(io_err)?;
        w.flush().map_err(io_err)
    }
}

fn csv_field(s: &str) -> String {
    if s.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

//! HTML table extraction
//!
//! Turns an `id`-addressed `<table>` into labeled rows. Each cell keeps its
//! trimmed text plus the target of the first hyperlink it contains, so a link
//! and its text travel together.

use crate::{CharityError, Result};
use scraper::{ElementRef, Html, Selector};
use std::fmt;

/// Joins a cell's text and link target in its flat string form
pub const LINK_SEPARATOR: &str = ";";

/// Stable label given to the first column when `TableLayout::player_label` is set
pub const PLAYER_LABEL: &str = "Player";

/// Where the column labels live and how to name the first column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableLayout {
    /// Index of the row supplying labels; earlier rows are discarded
    pub header_row: usize,
    /// Rename the first label to "Player" (the site leaves it blank)
    pub player_label: bool,
}

impl TableLayout {
    pub const fn new(header_row: usize, player_label: bool) -> Self {
        TableLayout {
            header_row,
            player_label,
        }
    }
}

/// A single extracted cell
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Cell {
    pub text: String,
    pub link: Option<String>,
}

impl Cell {
    fn from_element(element: &ElementRef, link_selector: &Selector) -> Self {
        let text = element.text().collect::<String>().trim().to_string();
        let link = element
            .select(link_selector)
            .next()
            .and_then(|a| a.value().attr("href"))
            .map(str::to_string);
        Cell { text, link }
    }

    /// Flat form: `text`, or `text;href` when the cell holds a link
    pub fn value(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.link {
            Some(link) => write!(f, "{}{}{}", self.text, LINK_SEPARATOR, link),
            None => write!(f, "{}", self.text),
        }
    }
}

/// Ordered label -> cell mapping for one table row.
///
/// Labels may repeat (the schedule table has several blank headers); lookups
/// return the first column carrying the label.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableRow {
    columns: Vec<(String, Cell)>,
}

impl TableRow {
    pub fn cell(&self, label: &str) -> Option<&Cell> {
        self.columns
            .iter()
            .find(|(l, _)| l == label)
            .map(|(_, cell)| cell)
    }

    /// Text content of the column, without any link target
    pub fn text(&self, label: &str) -> Option<&str> {
        self.cell(label).map(|c| c.text.as_str())
    }

    pub fn link(&self, label: &str) -> Option<&str> {
        self.cell(label).and_then(|c| c.link.as_deref())
    }

    /// Flat `text;href` value of the column
    pub fn value(&self, label: &str) -> Option<String> {
        self.cell(label).map(Cell::value)
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|(l, _)| l.as_str())
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

/// Extract every row after the header row of `table#<table_id>`.
///
/// Rows shorter than the header are padded with empty cells; cells past the
/// last label are dropped. Rows without any cells are skipped.
pub fn extract_table(html: &str, table_id: &str, layout: TableLayout) -> Result<Vec<TableRow>> {
    let document = Html::parse_document(html);

    let table_selector = Selector::parse(&format!("table[id=\"{}\"]", table_id))
        .map_err(|e| CharityError::Parse(format!("Invalid table id {:?}: {}", table_id, e)))?;
    let row_selector = Selector::parse("tr").unwrap();
    let cell_selector = Selector::parse("th, td").unwrap();
    let link_selector = Selector::parse("a").unwrap();

    let table = document
        .select(&table_selector)
        .next()
        .ok_or_else(|| CharityError::TableNotFound(table_id.to_string()))?;

    let raw_rows: Vec<Vec<Cell>> = table
        .select(&row_selector)
        .map(|row| {
            row.select(&cell_selector)
                .map(|cell| Cell::from_element(&cell, &link_selector))
                .collect()
        })
        .collect();

    let header = raw_rows.get(layout.header_row).ok_or_else(|| {
        CharityError::Parse(format!(
            "Table #{} has {} rows, expected a header at row {}",
            table_id,
            raw_rows.len(),
            layout.header_row
        ))
    })?;

    let mut labels: Vec<String> = header.iter().map(|c| c.text.clone()).collect();
    if layout.player_label {
        if let Some(first) = labels.first_mut() {
            *first = PLAYER_LABEL.to_string();
        }
    }

    let mut records = Vec::new();
    for (i, cells) in raw_rows.into_iter().enumerate().skip(layout.header_row + 1) {
        if cells.is_empty() {
            continue;
        }
        if cells.len() > labels.len() {
            log::debug!(
                "Row {} of #{} has {} cells for {} labels; dropping the extra cells",
                i,
                table_id,
                cells.len(),
                labels.len()
            );
        }

        let mut cells = cells.into_iter();
        let columns = labels
            .iter()
            .map(|label| (label.clone(), cells.next().unwrap_or_default()))
            .collect();
        records.push(TableRow { columns });
    }

    log::debug!("Extracted {} rows from #{}", records.len(), table_id);
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOTALS: &str = r#"
        <html><body>
        <table id="other"><tr><th>Nope</th></tr></table>
        <table id="season-total_totals">
          <thead>
            <tr><th></th><th>G</th><th>FT</th><th>FTA</th></tr>
          </thead>
          <tbody>
            <tr><th><a href="/cbb/players/jane-doe-1.html">Jane Doe</a></th><td>30</td><td>88</td><td>110</td></tr>
            <tr><th>Team</th><td>31</td><td> 412 </td><td>571</td></tr>
            <tr><th>Opponents</th><td>31</td><td>380</td></tr>
          </tbody>
        </table>
        </body></html>
    "#;

    #[test]
    fn test_extracts_labeled_rows() {
        let rows = extract_table(TOTALS, "season-total_totals", TableLayout::new(0, true)).unwrap();
        assert_eq!(rows.len(), 3);

        let labels: Vec<&str> = rows[0].labels().collect();
        assert_eq!(labels, vec!["Player", "G", "FT", "FTA"]);

        assert_eq!(rows[1].text("Player"), Some("Team"));
        assert_eq!(rows[1].text("FT"), Some("412"));
        assert_eq!(rows[1].text("FTA"), Some("571"));
    }

    #[test]
    fn test_link_travels_with_text() {
        let rows = extract_table(TOTALS, "season-total_totals", TableLayout::new(0, true)).unwrap();
        assert_eq!(
            rows[0].value("Player").as_deref(),
            Some("Jane Doe;/cbb/players/jane-doe-1.html")
        );
        assert_eq!(rows[0].text("Player"), Some("Jane Doe"));
        assert_eq!(rows[0].link("Player"), Some("/cbb/players/jane-doe-1.html"));
        assert_eq!(rows[1].link("Player"), None);
    }

    #[test]
    fn test_short_rows_are_padded() {
        let rows = extract_table(TOTALS, "season-total_totals", TableLayout::new(0, true)).unwrap();
        let opponents = &rows[2];
        assert_eq!(opponents.len(), 4);
        assert_eq!(opponents.text("FT"), Some("380"));
        assert_eq!(opponents.text("FTA"), Some(""));
    }

    #[test]
    fn test_header_row_offset() {
        let html = r#"
            <table id="box-score-basic-cincinnati">
              <tr><th colspan="3">Basic Box Score Stats</th></tr>
              <tr><th>Starters</th><th>FT</th><th>FTA</th></tr>
              <tr><th>Jane Doe</th><td>4</td><td>6</td></tr>
              <tr><th>School Totals</th><td>14</td><td>20</td></tr>
            </table>
        "#;
        let rows =
            extract_table(html, "box-score-basic-cincinnati", TableLayout::new(1, true)).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].text("Player"), Some("School Totals"));
        assert_eq!(rows[1].text("FTA"), Some("20"));
    }

    #[test]
    fn test_missing_table() {
        let err = extract_table(TOTALS, "schedule", TableLayout::new(0, false)).unwrap_err();
        assert!(matches!(err, CharityError::TableNotFound(id) if id == "schedule"));
    }

    #[test]
    fn test_extraction_is_idempotent() {
        let layout = TableLayout::new(0, true);
        let first = extract_table(TOTALS, "season-total_totals", layout).unwrap();
        let second = extract_table(TOTALS, "season-total_totals", layout).unwrap();
        assert_eq!(first, second);
    }
}

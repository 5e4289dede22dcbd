//! Column lookup by existing header text.
//!
//! The online-sheet sink never rewrites the whole sheet. It reads the header
//! row already in the sheet, finds the column holding each configured label
//! (case-insensitive), and clears and rewrites only those columns, so manual
//! columns kept next to the export survive an update.

use crate::labels::ColumnSpec;
use crate::value::AttrValue;
use serde::Serialize;

/// Zero-based column index → A1 letters (`0` → `A`, `26` → `AA`).
pub fn column_letter(index: usize) -> String {
    let mut n = index + 1;
    let mut letters = Vec::new();
    while n > 0 {
        let rem = (n - 1) % 26;
        letters.push((b'A' + rem as u8) as char);
        n = (n - 1) / 26;
    }
    letters.iter().rev().collect()
}

/// Quotes a sheet name for use in an A1 range when it is not a bare word.
pub fn quote_sheet_name(sheet: &str) -> String {
    if !sheet.is_empty() && sheet.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        sheet.to_string()
    } else {
        format!("'{}'", sheet.replace('\'', "''"))
    }
}

fn normalize(text: &str) -> String {
    text.trim().to_lowercase()
}

/// Where one configured column lands in the sheet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnPlacement {
    pub attribute_id: String,
    pub column_index: usize,
    /// Header text written back: the existing cell text when matched, the label otherwise.
    pub header_text: String,
    pub matched: bool,
}

/// Matches every configured label against the sheet's header row.
///
/// Each header cell is claimed at most once. Labels without a match are
/// placed after the last non-empty header cell, in column-spec order.
pub fn match_columns(existing_header: &[String], columns: &ColumnSpec) -> Vec<ColumnPlacement> {
    let mut claimed = vec![false; existing_header.len()];
    let mut next_free = existing_header
        .iter()
        .rposition(|h| !h.trim().is_empty())
        .map(|i| i + 1)
        .unwrap_or(0);

    let mut placements = Vec::with_capacity(columns.len());
    for column in columns.columns() {
        let wanted = normalize(&column.label);
        let found = (0..existing_header.len()).find(|&i| {
            !claimed[i] && !wanted.is_empty() && normalize(&existing_header[i]) == wanted
        });
        match found {
            Some(index) => {
                claimed[index] = true;
                placements.push(ColumnPlacement {
                    attribute_id: column.attribute_id.clone(),
                    column_index: index,
                    header_text: existing_header[index].clone(),
                    matched: true,
                });
            }
            None => {
                tracing::info!(
                    label = %column.label,
                    column = %column_letter(next_free),
                    "label not found in sheet header; appending column"
                );
                placements.push(ColumnPlacement {
                    attribute_id: column.attribute_id.clone(),
                    column_index: next_free,
                    header_text: column.label.clone(),
                    matched: false,
                });
                next_free += 1;
            }
        }
    }
    placements
}

/// A clear-then-write update of one sheet column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnUpdate {
    /// Whole-column range to clear, e.g. `Sheet1!C:C`.
    pub clear_range: String,
    /// Range the values are written to, starting at row 1.
    pub range: String,
    /// Header text followed by one value per proposal row.
    pub values: Vec<AttrValue>,
}

/// Plans one update per configured column. `rows` are projections in
/// column-spec order.
pub fn plan_column_updates(
    sheet: &str,
    existing_header: &[String],
    columns: &ColumnSpec,
    rows: &[Vec<AttrValue>],
) -> Vec<ColumnUpdate> {
    let sheet = quote_sheet_name(sheet);
    let last_row = rows.len() + 1;
    match_columns(existing_header, columns)
        .into_iter()
        .enumerate()
        .map(|(position, placement)| {
            let letter = column_letter(placement.column_index);
            let mut values = Vec::with_capacity(last_row);
            values.push(AttrValue::Text(placement.header_text));
            values.extend(
                rows.iter()
                    .map(|row| row.get(position).cloned().unwrap_or_else(AttrValue::empty)),
            );
            ColumnUpdate {
                clear_range: format!("{sheet}!{letter}:{letter}"),
                range: format!("{sheet}!{letter}1:{letter}{last_row}"),
                values,
            }
        })
        .collect()
}

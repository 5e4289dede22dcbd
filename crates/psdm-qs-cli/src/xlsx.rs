//! Excel spreadsheet sink.

use anyhow::{anyhow, Context, Result};
use colored::Colorize;
use psdm_qs_core::{build_run_table, fetch_label_mapping, AttrValue, ColumnSpec, QuestionnaireBackend, RunTable};
use rust_xlsxwriter::{Workbook, Worksheet, XlsxError};
use std::path::Path;

pub fn cmd_excel<B: QuestionnaireBackend>(backend: &B, run: &str, path: &Path) -> Result<()> {
    let mapping = fetch_label_mapping(backend, run)?;
    let columns = ColumnSpec::from_mapping(&mapping);
    let table = build_run_table(backend, run, &columns)?;
    write_table_xlsx(&table, run, path)?;
    println!(
        "{} {} ({} proposals)",
        "Saved data into".green().bold(),
        path.display(),
        table.rows.len()
    );
    Ok(())
}

fn write_cell(sheet: &mut Worksheet, row: u32, col: u16, value: &AttrValue) -> Result<(), XlsxError> {
    match value {
        AttrValue::Null => {}
        AttrValue::Text(s) if s.is_empty() => {}
        AttrValue::Text(s) => {
            sheet.write_string(row, col, s)?;
        }
        AttrValue::Number(n) => match n.as_f64() {
            Some(f) => {
                sheet.write_number(row, col, f)?;
            }
            None => {
                sheet.write_string(row, col, n.to_string())?;
            }
        },
        AttrValue::Bool(b) => {
            sheet.write_boolean(row, col, *b)?;
        }
        AttrValue::Structured(v) => {
            sheet.write_string(row, col, v.to_string())?;
        }
    }
    Ok(())
}

/// Header in row 1, one row per proposal below, on a worksheet named `sheet_name`.
pub fn write_table_xlsx(table: &RunTable, sheet_name: &str, path: &Path) -> Result<()> {
    let col_index = |c: usize| u16::try_from(c).map_err(|_| anyhow!("too many columns ({c})"));
    let row_index = |r: usize| u32::try_from(r + 1).map_err(|_| anyhow!("too many rows ({r})"));

    let mut workbook = Workbook::new();
    {
        let sheet = workbook.add_worksheet();
        sheet
            .set_name(sheet_name)
            .with_context(|| format!("invalid worksheet name `{sheet_name}`"))?;
        for (c, label) in table.header.iter().enumerate() {
            sheet.write_string(0, col_index(c)?, label)?;
        }
        for (r, row) in table.rows.iter().enumerate() {
            for (c, value) in row.iter().enumerate() {
                write_cell(sheet, row_index(r)?, col_index(c)?, value)?;
            }
        }
    }
    workbook
        .save(path)
        .with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}

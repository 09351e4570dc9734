use calamine::{Data, Reader, open_workbook_auto};
use camino::Utf8Path;
use tracing::debug;

use crate::error::ClimateError;
use crate::table::Table;

/// Numeric cells are rendered with `Display`, so a header cell holding `2020.0` becomes `2020`.
pub fn read_sheet(source_id: &str, path: &Utf8Path, sheet: Option<&str>) -> Result<Table, ClimateError> {
    let mut workbook = open_workbook_auto(path)
        .map_err(|err| ClimateError::Excel(format!("{path}: {err}")))?;

    let sheet_name = match sheet {
        Some(name) => name.to_string(),
        None => workbook
            .sheet_names()
            .first()
            .cloned()
            .ok_or_else(|| ClimateError::Excel(format!("{path}: workbook has no sheets")))?,
    };

    let range = workbook
        .worksheet_range(&sheet_name)
        .map_err(|err| ClimateError::Excel(format!("{path} [{sheet_name}]: {err}")))?;

    let mut rows = range.rows().map(|row| row.iter().map(cell_text).collect::<Vec<_>>());
    let headers = rows.next().ok_or_else(|| ClimateError::Parse {
        source_id: source_id.to_string(),
        message: format!("sheet `{sheet_name}` is empty"),
    })?;
    let rows: Vec<Vec<String>> = rows.collect();
    debug!(source = source_id, sheet = %sheet_name, rows = rows.len(), "read worksheet");

    Ok(Table::new(source_id, headers, rows))
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        other => other.to_string().trim().to_string(),
    }
}

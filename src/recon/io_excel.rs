// Primitives for reading Excel datasets.

use log::debug;

use vote_tally::DatasetRow;

use snafu::prelude::*;

use calamine::{open_workbook, Reader, Xlsx};

use crate::recon::{
    io_common::{rows_from_table, simplify_file_name},
    *,
};

pub fn read_excel_dataset(path: &str, worksheet: Option<&str>) -> ReconResult<Vec<DatasetRow>> {
    let mut workbook: Xlsx<_> = open_workbook(path).context(OpeningExcelSnafu { path })?;
    let wrange = match worksheet {
        Some(name) => workbook
            .worksheet_range(name)
            .context(EmptyExcelSnafu { path })?
            .context(OpeningExcelSnafu { path })?,
        None => workbook
            .worksheet_range_at(0)
            .context(EmptyExcelSnafu { path })?
            .context(OpeningExcelSnafu { path })?,
    };

    let mut rows_iter = wrange.rows();
    let header_row = rows_iter.next().context(EmptyExcelSnafu { path })?;
    let mut header: Vec<String> = Vec::new();
    for cell in header_row {
        header.push(cell_text(cell, 1)?);
    }
    debug!("read_excel_dataset: header: {:?}", header);

    let mut table: Vec<Vec<String>> = Vec::new();
    for (idx, row) in rows_iter.enumerate() {
        let lineno = (idx + 2) as u64;
        let mut cells: Vec<String> = Vec::new();
        for cell in row {
            cells.push(cell_text(cell, lineno)?);
        }
        table.push(cells);
    }
    debug!(
        "read_excel_dataset: {}: {} data row(s)",
        simplify_file_name(path),
        table.len()
    );
    Ok(rows_from_table(&header, table))
}

/// The text form of a cell. Integral floats lose their decimal point, so a
/// document number column stays a plain digit string.
fn cell_text(cell: &calamine::DataType, lineno: u64) -> ReconResult<String> {
    match cell {
        calamine::DataType::String(s) => Ok(s.trim().to_string()),
        calamine::DataType::Float(f) if f.fract() == 0.0 => Ok(format!("{}", *f as i64)),
        calamine::DataType::Float(f) => Ok(f.to_string()),
        calamine::DataType::Int(i) => Ok(i.to_string()),
        calamine::DataType::Bool(b) => Ok(b.to_string()),
        calamine::DataType::Empty => Ok("".to_string()),
        _ => ExcelWrongCellTypeSnafu {
            lineno,
            content: format!("{:?}", cell),
        }
        .fail(),
    }
}

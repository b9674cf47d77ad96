// Primitives for reading CSV datasets.

use log::debug;

use vote_tally::DatasetRow;

use snafu::prelude::*;

use crate::recon::{
    io_common::{rows_from_table, simplify_file_name},
    *,
};

pub fn read_csv_dataset(path: &str) -> ReconResult<Vec<DatasetRow>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .flexible(true)
        .from_path(path)
        .context(CsvOpenSnafu { path })?;
    let header: Vec<String> = rdr
        .headers()
        .context(CsvLineParseSnafu)?
        .iter()
        .map(|s| s.to_string())
        .collect();
    debug!("read_csv_dataset: header: {:?}", header);

    let mut table: Vec<Vec<String>> = Vec::new();
    for line_r in rdr.records() {
        let line = line_r.context(CsvLineParseSnafu)?;
        table.push(line.iter().map(|s| s.to_string()).collect());
    }
    debug!(
        "read_csv_dataset: {}: {} data row(s)",
        simplify_file_name(path),
        table.len()
    );
    Ok(rows_from_table(&header, table))
}

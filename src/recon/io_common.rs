use std::path::Path;

use vote_tally::DatasetRow;

pub fn simplify_file_name(path: &str) -> String {
    Path::new(path)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(path)
        .to_string()
}

/// Pairs every body cell with its header name, in column order. Rows with no
/// content at all are skipped. Cells beyond the header width are dropped and
/// missing trailing cells are simply absent from the row.
pub fn rows_from_table(header: &[String], table: Vec<Vec<String>>) -> Vec<DatasetRow> {
    let mut rows: Vec<DatasetRow> = Vec::new();
    for cells in table {
        if cells.iter().all(|c| c.trim().is_empty()) {
            continue;
        }
        let row: DatasetRow = header
            .iter()
            .zip(cells)
            .map(|(name, value)| (name.clone(), value))
            .collect();
        rows.push(row);
    }
    rows
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn blank_rows_are_skipped() {
        let table = vec![
            vec!["1".to_string(), "a".to_string()],
            vec!["".to_string(), "  ".to_string()],
            vec!["2".to_string(), "b".to_string()],
        ];
        let rows = rows_from_table(&header(&["dni", "candidato"]), table);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1][0], ("dni".to_string(), "2".to_string()));
    }

    #[test]
    fn ragged_rows_keep_what_they_have() {
        let table = vec![
            vec!["1".to_string()],
            vec!["2".to_string(), "b".to_string(), "extra".to_string()],
        ];
        let rows = rows_from_table(&header(&["dni", "candidato"]), table);
        assert_eq!(rows[0], vec![("dni".to_string(), "1".to_string())]);
        assert_eq!(rows[1].len(), 2);
    }

    #[test]
    fn long_paths_are_shortened() {
        assert_eq!(simplify_file_name("/tmp/some/dir/votes.csv"), "votes.csv");
        assert_eq!(simplify_file_name("votes.csv"), "votes.csv");
    }
}

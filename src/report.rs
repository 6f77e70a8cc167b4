//! Plain-text tables for the data preview and the column summary.

use crate::data::{format_number, Dataset, Datum};
use crate::schema::Schema;

const NA: &str = "NA";

/// First `rows` rows of the dataset as an aligned text table
pub fn preview_table(dataset: &Dataset, rows: usize) -> String {
    let head = dataset.head(rows);
    let header: Vec<String> = head.names();

    let body: Vec<Vec<String>> = (0..head.row_count())
        .map(|row| {
            head.columns()
                .iter()
                .map(|col| match col.datum(row) {
                    Some(Datum::Number(v)) => format_number(v),
                    Some(Datum::Label(s)) => s,
                    None => NA.to_string(),
                })
                .collect()
        })
        .collect();

    let mut out = render_table(&header, &body);
    if dataset.row_count() > head.row_count() {
        out.push_str(&format!(
            "... {} of {} rows shown\n",
            head.row_count(),
            dataset.row_count()
        ));
    }
    out
}

/// One line per column: kind, missing count and numeric statistics.
/// Undefined statistics print as NaN.
pub fn summary_table(schema: &Schema) -> String {
    let header: Vec<String> = ["column", "kind", "missing", "missing%", "min", "max", "mean", "median", "sd"]
        .iter()
        .map(|s| s.to_string())
        .collect();

    let stat = |v: Option<f64>| v.map(|v| format!("{:.2}", v)).unwrap_or_else(|| "NaN".to_string());

    let body: Vec<Vec<String>> = schema
        .columns
        .iter()
        .map(|c| {
            let mut cells = vec![
                c.name.clone(),
                c.kind.label().to_string(),
                c.missing.to_string(),
                format!("{:.1}", c.missing_pct),
            ];
            match &c.stats {
                Some(s) => cells.extend([s.min, s.max, s.mean, s.median, s.sd].into_iter().map(stat)),
                None => cells.extend(std::iter::repeat("-".to_string()).take(5)),
            }
            cells
        })
        .collect();

    let mut out = format!("{} rows x {} columns\n", schema.row_count, schema.column_count());
    out.push_str(&render_table(&header, &body));
    out
}

/// Column names, one per line, with their inferred kind
pub fn schema_listing(schema: &Schema) -> String {
    schema
        .columns
        .iter()
        .map(|c| format!("{}\t{}\n", c.name, c.kind.label()))
        .collect()
}

fn render_table(header: &[String], body: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = header.iter().map(|h| h.chars().count()).collect();
    for row in body {
        for (w, cell) in widths.iter_mut().zip(row) {
            *w = (*w).max(cell.chars().count());
        }
    }

    let line = |cells: &[String]| -> String {
        let padded: Vec<String> = cells
            .iter()
            .zip(&widths)
            .map(|(c, w)| format!("{:<width$}", c, width = *w))
            .collect();
        format!("{}\n", padded.join("  ").trim_end())
    };

    let mut out = line(header);
    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    out.push_str(&line(&rule));
    for row in body {
        out.push_str(&line(row));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::parse_csv;
    use crate::schema::inspect;

    #[test]
    fn test_preview_marks_missing() {
        let ds = parse_csv(b"name,score\nann,1.5\n,2\nbob,NA\n").unwrap();
        let table = preview_table(&ds, 10);
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines[0], "name  score");
        assert_eq!(lines[2], "ann   1.5");
        assert_eq!(lines[3], "NA    2");
        assert_eq!(lines[4], "bob   NA");
        assert_eq!(lines.len(), 5);
    }

    #[test]
    fn test_preview_truncates() {
        let ds = parse_csv(b"v\n1\n2\n3\n").unwrap();
        let table = preview_table(&ds, 2);
        assert!(table.ends_with("... 2 of 3 rows shown\n"));
        assert!(!table.contains("\n3\n"));
    }

    #[test]
    fn test_summary_shows_nan_for_undefined() {
        let ds = parse_csv(b"v,t\nNA,x\nNA,y\n").unwrap();
        let table = summary_table(&inspect(&ds));
        assert!(table.starts_with("2 rows x 2 columns\n"));
        let v_line = table.lines().find(|l| l.starts_with("v ")).unwrap();
        assert!(v_line.contains("NaN"));
        assert!(v_line.contains("100.0"));
    }

    #[test]
    fn test_schema_listing() {
        let ds = parse_csv(b"a,b\nx,1\n").unwrap();
        assert_eq!(schema_listing(&inspect(&ds)), "a\ttext\nb\tnumeric\n");
    }
}

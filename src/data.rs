use crate::error::LoadError;
use serde::Serialize;
use std::collections::{HashMap, HashSet};

/// Tokens read as a missing value rather than as text
const MISSING_TOKENS: &[&str] = &["", "NA", "N/A", "NaN", "nan", "null", "NULL", "None", "#N/A"];

/// Semantic type of a column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnKind {
    Numeric,
    Text,
    Categorical,
}

impl ColumnKind {
    pub fn label(&self) -> &'static str {
        match self {
            ColumnKind::Numeric => "numeric",
            ColumnKind::Text => "text",
            ColumnKind::Categorical => "categorical",
        }
    }
}

/// Typed storage for one column. `None` marks a missing value.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnData {
    Numeric(Vec<Option<f64>>),
    Text(Vec<Option<String>>),
    Categorical(Vec<Option<String>>),
}

/// A single cell value as it appears on a chart axis
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Datum {
    Number(f64),
    Label(String),
}

impl Datum {
    pub fn as_label(&self) -> String {
        match self {
            Datum::Number(v) => format_number(*v),
            Datum::Label(s) => s.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub data: ColumnData,
}

impl Column {
    pub fn numeric(name: impl Into<String>, values: Vec<Option<f64>>) -> Self {
        Self { name: name.into(), data: ColumnData::Numeric(values) }
    }

    pub fn text(name: impl Into<String>, values: Vec<Option<String>>) -> Self {
        Self { name: name.into(), data: ColumnData::Text(values) }
    }

    pub fn categorical(name: impl Into<String>, values: Vec<Option<String>>) -> Self {
        Self { name: name.into(), data: ColumnData::Categorical(values) }
    }

    pub fn len(&self) -> usize {
        match &self.data {
            ColumnData::Numeric(v) => v.len(),
            ColumnData::Text(v) | ColumnData::Categorical(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn kind(&self) -> ColumnKind {
        match &self.data {
            ColumnData::Numeric(_) => ColumnKind::Numeric,
            ColumnData::Text(_) => ColumnKind::Text,
            ColumnData::Categorical(_) => ColumnKind::Categorical,
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self.data, ColumnData::Numeric(_))
    }

    /// Numeric values, or `None` for non-numeric columns
    pub fn as_numeric(&self) -> Option<&[Option<f64>]> {
        match &self.data {
            ColumnData::Numeric(v) => Some(v),
            _ => None,
        }
    }

    pub fn is_missing(&self, row: usize) -> bool {
        match &self.data {
            ColumnData::Numeric(v) => v.get(row).map_or(true, |c| c.is_none()),
            ColumnData::Text(v) | ColumnData::Categorical(v) => v.get(row).map_or(true, |c| c.is_none()),
        }
    }

    pub fn missing_count(&self) -> usize {
        (0..self.len()).filter(|&i| self.is_missing(i)).count()
    }

    /// Value at `row` as an axis datum; `None` when missing
    pub fn datum(&self, row: usize) -> Option<Datum> {
        match &self.data {
            ColumnData::Numeric(v) => v.get(row).copied().flatten().map(Datum::Number),
            ColumnData::Text(v) | ColumnData::Categorical(v) => {
                v.get(row).cloned().flatten().map(Datum::Label)
            }
        }
    }

    /// Value at `row` rendered as a category label; `None` when missing
    pub fn label(&self, row: usize) -> Option<String> {
        self.datum(row).map(|d| d.as_label())
    }

    /// Value at `row` as a number; `None` when missing or non-numeric
    pub fn number(&self, row: usize) -> Option<f64> {
        self.as_numeric().and_then(|v| v.get(row).copied().flatten())
    }

    /// Row indices grouped by label, groups in first-appearance order.
    /// Missing values form a `None` group.
    pub fn partition(&self) -> Vec<(Option<String>, Vec<usize>)> {
        let mut index: HashMap<Option<String>, usize> = HashMap::new();
        let mut groups: Vec<(Option<String>, Vec<usize>)> = Vec::new();
        for row in 0..self.len() {
            let key = self.label(row);
            let slot = *index.entry(key.clone()).or_insert_with(|| {
                groups.push((key, Vec::new()));
                groups.len() - 1
            });
            groups[slot].1.push(row);
        }
        groups
    }

    fn take(&self, n: usize) -> Column {
        let data = match &self.data {
            ColumnData::Numeric(v) => ColumnData::Numeric(v.iter().take(n).cloned().collect()),
            ColumnData::Text(v) => ColumnData::Text(v.iter().take(n).cloned().collect()),
            ColumnData::Categorical(v) => ColumnData::Categorical(v.iter().take(n).cloned().collect()),
        };
        Column { name: self.name.clone(), data }
    }
}

/// In-memory table: named, typed, equally long columns
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Dataset {
    columns: Vec<Column>,
    rows: usize,
}

impl Dataset {
    /// Build a dataset, enforcing unique names and equal column lengths
    pub fn new(columns: Vec<Column>) -> Result<Self, LoadError> {
        let mut seen = HashSet::new();
        for col in &columns {
            if col.name.is_empty() {
                return Err(LoadError::Parse("empty column name".to_string()));
            }
            if !seen.insert(col.name.as_str()) {
                return Err(LoadError::Parse(format!("duplicate column name '{}'", col.name)));
            }
        }

        let rows = columns.first().map(|c| c.len()).unwrap_or(0);
        if let Some(bad) = columns.iter().find(|c| c.len() != rows) {
            return Err(LoadError::Parse(format!(
                "column '{}' has {} values, expected {}",
                bad.name,
                bad.len(),
                rows
            )));
        }

        Ok(Self { columns, rows })
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    pub fn row_count(&self) -> usize {
        self.rows
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// First `n` rows
    pub fn head(&self, n: usize) -> Dataset {
        let columns: Vec<Column> = self.columns.iter().map(|c| c.take(n)).collect();
        Dataset { rows: self.rows.min(n), columns }
    }

    /// Serialize as CSV. Missing values become empty fields.
    pub fn to_csv_bytes(&self) -> csv::Result<Vec<u8>> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(self.columns.iter().map(|c| c.name.as_str()))?;
        for row in 0..self.rows {
            let record: Vec<String> = self
                .columns
                .iter()
                .map(|c| match &c.data {
                    ColumnData::Numeric(v) => v[row].map(|x| x.to_string()).unwrap_or_default(),
                    ColumnData::Text(v) | ColumnData::Categorical(v) => v[row].clone().unwrap_or_default(),
                })
                .collect();
            writer.write_record(&record)?;
        }
        writer
            .into_inner()
            .map_err(|e| csv::Error::from(e.into_error()))
    }
}

/// Parse CSV bytes into a Dataset, inferring numeric vs text per column
pub fn parse_csv(bytes: &[u8]) -> Result<Dataset, LoadError> {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF".as_slice()).unwrap_or(bytes);

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(bytes);

    let headers: Vec<String> = reader.headers()?.iter().map(|h| h.to_string()).collect();
    if headers.is_empty() || headers.iter().all(|h| h.is_empty()) {
        return Err(LoadError::Parse("CSV has no header row".to_string()));
    }

    let mut raw: Vec<Vec<Option<String>>> = vec![Vec::new(); headers.len()];
    for record in reader.records() {
        let record = record?;
        for (col, field) in raw.iter_mut().zip(record.iter()) {
            col.push(if is_missing_token(field) { None } else { Some(field.to_string()) });
        }
    }

    let columns = headers
        .into_iter()
        .zip(raw)
        .map(|(name, cells)| infer_column(name, cells))
        .collect();

    Dataset::new(columns)
}

fn is_missing_token(field: &str) -> bool {
    MISSING_TOKENS.contains(&field)
}

/// Numeric iff every non-missing cell parses as f64. Any spelling of NaN
/// is stored as missing.
fn infer_column(name: String, cells: Vec<Option<String>>) -> Column {
    let all_numeric = cells
        .iter()
        .flatten()
        .all(|s| s.parse::<f64>().is_ok());

    if all_numeric {
        let values = cells
            .iter()
            .map(|c| {
                c.as_ref()
                    .and_then(|s| s.parse::<f64>().ok())
                    .filter(|v| !v.is_nan())
            })
            .collect();
        Column::numeric(name, values)
    } else {
        Column::text(name, cells)
    }
}

/// Integers print without a decimal point so they group as clean labels
pub fn format_number(v: f64) -> String {
    if v.fract() == 0.0 && v.abs() < 1e15 {
        format!("{:.0}", v)
    } else {
        v.to_string()
    }
}

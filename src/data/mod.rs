// src/data/mod.rs
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ColumnType {
    #[default]
    Scale,
    Ordinal,
    Nominal,
    NominalText,
}

impl ColumnType {
    pub fn name(&self) -> &'static str {
        match self {
            ColumnType::Scale => "scale",
            ColumnType::Ordinal => "ordinal",
            ColumnType::Nominal => "nominal",
            ColumnType::NominalText => "nominalText",
        }
    }

    /// Numeric code the backend uses for the measurement type.
    pub fn code(&self) -> i32 {
        match self {
            ColumnType::Nominal => 1,
            ColumnType::NominalText => 2,
            ColumnType::Ordinal => 4,
            ColumnType::Scale => 8,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Column {
    pub name: String,
    pub column_type: ColumnType,
    values: Vec<String>,
    labels: Vec<String>,
}

impl Column {
    pub fn new(name: String, values: Vec<String>) -> Self {
        let column_type = if !values.is_empty()
            && values.iter().all(|v| v.is_empty() || v.parse::<f64>().is_ok())
        {
            ColumnType::Scale
        } else {
            ColumnType::NominalText
        };

        let mut seen: HashSet<&str> = HashSet::new();
        let mut labels: Vec<String> = Vec::new();
        for value in &values {
            if !value.is_empty() && seen.insert(value.as_str()) {
                labels.push(value.clone());
            }
        }

        Self {
            name,
            column_type,
            values,
            labels,
        }
    }

    pub fn value(&self, row: usize) -> Option<&str> {
        self.values.get(row).map(String::as_str)
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn max_width_in_characters(&self) -> usize {
        self.values
            .iter()
            .map(|v| v.chars().count())
            .chain(std::iter::once(self.name.chars().count()))
            .max()
            .unwrap_or(0)
            + 3
    }
}

/// The loaded data file. Analyses read from it but never own it.
#[derive(Debug, Clone, Default)]
pub struct DataSet {
    columns: Vec<Column>,
    row_count: usize,
}

impl DataSet {
    pub fn new(columns: Vec<Column>) -> Self {
        let row_count = columns.iter().map(Column::len).max().unwrap_or(0);
        Self { columns, row_count }
    }

    pub fn load_csv(path: &Path) -> Result<Self> {
        let mut reader = csv::Reader::from_path(path)
            .with_context(|| format!("Failed to open data file {}", path.display()))?;

        let headers: Vec<String> = reader
            .headers()
            .context("Failed to read column names")?
            .iter()
            .map(str::to_string)
            .collect();

        let mut values: Vec<Vec<String>> = vec![Vec::new(); headers.len()];
        for (index, record) in reader.records().enumerate() {
            let record = record.with_context(|| format!("Failed to read row {}", index + 1))?;
            if record.len() != headers.len() {
                return Err(anyhow!(
                    "Row {} has {} fields, expected {}",
                    index + 1,
                    record.len(),
                    headers.len()
                ));
            }
            for (col, field) in record.iter().enumerate() {
                values[col].push(field.to_string());
            }
        }

        let columns = headers
            .into_iter()
            .zip(values)
            .map(|(name, values)| Column::new(name, values))
            .collect();

        Ok(Self::new(columns))
    }

    pub fn row_count(&self) -> usize {
        self.row_count
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn load_csv_reads_columns_and_labels() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "group,score").unwrap();
        writeln!(file, "a,1.5").unwrap();
        writeln!(file, "b,2").unwrap();
        writeln!(file, "a,3").unwrap();

        let data = DataSet::load_csv(file.path()).unwrap();

        assert_eq!(data.row_count(), 3);
        assert_eq!(data.column_names(), vec!["group", "score"]);
        let group = data.column("group").unwrap();
        assert_eq!(group.labels(), &["a".to_string(), "b".to_string()]);
        assert_eq!(group.column_type, ColumnType::NominalText);
        assert_eq!(data.column("score").unwrap().column_type, ColumnType::Scale);
    }

    #[test]
    fn labels_keep_first_seen_order_over_many_rows() {
        let values: Vec<String> = (0..50_000).map(|i| format!("id{}", (i * 7) % 20_000)).collect();
        let column = Column::new("id".into(), values);

        assert_eq!(column.labels().len(), 20_000);
        assert_eq!(column.labels()[0], "id0");
        assert_eq!(column.labels()[1], "id7");
        assert_eq!(column.len(), 50_000);
    }

    #[test]
    fn ragged_rows_are_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "a,b").unwrap();
        writeln!(file, "1").unwrap();

        assert!(DataSet::load_csv(file.path()).is_err());
    }
}

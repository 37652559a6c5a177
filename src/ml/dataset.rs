use crate::error::{AppError, Result};
use ndarray::Array2;
use std::collections::BTreeSet;
use std::path::Path;

/// Identifier and leak columns removed before training.
const DROPPED_COLUMNS: &[&str] = &["UDI", "Product ID", "TWF", "HDF", "PWF", "OSF", "RNF"];

/// Categorical column expanded into dummy indicators.
const CATEGORICAL_COLUMN: &str = "Type";

/// Binary target column.
const TARGET_COLUMN: &str = "Machine failure";

/// Fully decoded training dataset
///
/// Numeric columns keep their CSV order; dummy columns for the categorical
/// level set (first level dropped) are appended after them. The resulting
/// `feature_names` order is the canonical column order for every downstream
/// consumer.
#[derive(Debug, Clone)]
pub struct RawDataset {
    /// Ordered feature names
    pub feature_names: Vec<String>,

    /// Feature matrix, rows = samples
    pub features: Array2<f64>,

    /// Binary target, aligned with `features` rows
    pub targets: Vec<usize>,
}

impl RawDataset {
    pub fn n_samples(&self) -> usize {
        self.features.nrows()
    }

    pub fn n_features(&self) -> usize {
        self.features.ncols()
    }
}

/// Load and preprocess the training CSV
///
/// Drops identifier/leak columns, one-hot encodes the equipment type column
/// (levels sorted, first level dropped to avoid collinearity), and splits the
/// remainder into a feature matrix and the binary target.
pub fn load_training_csv(path: &Path) -> Result<RawDataset> {
    let mut reader = csv::Reader::from_path(path).map_err(|e| {
        AppError::Dataset(format!("failed to open dataset {}: {}", path.display(), e))
    })?;

    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let target_idx = headers
        .iter()
        .position(|h| h == TARGET_COLUMN)
        .ok_or_else(|| {
            AppError::Dataset(format!("dataset has no '{}' column", TARGET_COLUMN))
        })?;
    let categorical_idx = headers.iter().position(|h| h == CATEGORICAL_COLUMN);

    // Numeric predictor columns, in CSV order.
    let numeric_indices: Vec<usize> = headers
        .iter()
        .enumerate()
        .filter(|(i, h)| {
            *i != target_idx
                && Some(*i) != categorical_idx
                && !DROPPED_COLUMNS.contains(&h.as_str())
        })
        .map(|(i, _)| i)
        .collect();

    let mut numeric_rows: Vec<Vec<f64>> = Vec::new();
    let mut categories: Vec<String> = Vec::new();
    let mut targets: Vec<usize> = Vec::new();

    for (row_no, record) in reader.records().enumerate() {
        let record = record?;

        let mut row = Vec::with_capacity(numeric_indices.len());
        for &idx in &numeric_indices {
            let raw = record.get(idx).unwrap_or("").trim();
            let value: f64 = raw.parse().map_err(|_| {
                AppError::Dataset(format!(
                    "row {}: column '{}' has non-numeric value '{}'",
                    row_no + 1,
                    headers[idx],
                    raw
                ))
            })?;
            row.push(value);
        }
        numeric_rows.push(row);

        if let Some(cat_idx) = categorical_idx {
            categories.push(record.get(cat_idx).unwrap_or("").trim().to_string());
        }

        let raw_target = record.get(target_idx).unwrap_or("").trim();
        let target: usize = raw_target.parse().map_err(|_| {
            AppError::Dataset(format!(
                "row {}: target value '{}' is not 0/1",
                row_no + 1,
                raw_target
            ))
        })?;
        if target > 1 {
            return Err(AppError::Dataset(format!(
                "row {}: target value {} is not binary",
                row_no + 1,
                target
            )));
        }
        targets.push(target);
    }

    if numeric_rows.is_empty() {
        return Err(AppError::Dataset("dataset has no data rows".to_string()));
    }

    // Dummy-encode the category levels, sorted, first level dropped.
    let dummy_levels: Vec<String> = if categorical_idx.is_some() {
        let levels: BTreeSet<&str> = categories.iter().map(|c| c.as_str()).collect();
        levels.into_iter().skip(1).map(|l| l.to_string()).collect()
    } else {
        Vec::new()
    };

    let mut feature_names: Vec<String> = numeric_indices
        .iter()
        .map(|&i| headers[i].clone())
        .collect();
    feature_names.extend(
        dummy_levels
            .iter()
            .map(|l| format!("{}_{}", CATEGORICAL_COLUMN, l)),
    );

    let n_samples = numeric_rows.len();
    let n_features = feature_names.len();
    let mut data = Vec::with_capacity(n_samples * n_features);
    for (i, row) in numeric_rows.iter().enumerate() {
        data.extend_from_slice(row);
        for level in &dummy_levels {
            data.push(if categories[i] == *level { 1.0 } else { 0.0 });
        }
    }

    let features = Array2::from_shape_vec((n_samples, n_features), data)
        .map_err(|e| AppError::Dataset(e.to_string()))?;

    Ok(RawDataset {
        feature_names,
        features,
        targets,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_csv(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn loads_and_encodes_equipment_csv() {
        let csv = "\
UDI,Product ID,Type,Air temperature [K],Process temperature [K],Rotational speed [rpm],Torque [Nm],Tool wear [min],Machine failure,TWF,HDF,PWF,OSF,RNF
1,M14860,M,298.1,308.6,1551,42.8,0,0,0,0,0,0,0
2,L47181,L,298.2,308.7,1408,46.3,3,0,0,0,0,0,0
3,H29424,H,298.3,308.5,1498,49.4,5,1,0,0,1,0,0
";
        let file = write_csv(csv);
        let dataset = load_training_csv(file.path()).unwrap();

        assert_eq!(
            dataset.feature_names,
            vec![
                "Air temperature [K]",
                "Process temperature [K]",
                "Rotational speed [rpm]",
                "Torque [Nm]",
                "Tool wear [min]",
                "Type_L",
                "Type_M",
            ]
        );
        assert_eq!(dataset.n_samples(), 3);
        assert_eq!(dataset.targets, vec![0, 0, 1]);

        // Row 0 is type M: Type_L = 0, Type_M = 1.
        assert_eq!(dataset.features[[0, 5]], 0.0);
        assert_eq!(dataset.features[[0, 6]], 1.0);
        // Row 2 is type H (the dropped level): both dummies zero.
        assert_eq!(dataset.features[[2, 5]], 0.0);
        assert_eq!(dataset.features[[2, 6]], 0.0);
    }

    #[test]
    fn rejects_missing_target_column() {
        let file = write_csv("Type,Torque [Nm]\nM,40.0\n");
        assert!(load_training_csv(file.path()).is_err());
    }

    #[test]
    fn rejects_non_numeric_feature() {
        let csv = "Type,Torque [Nm],Machine failure\nM,not-a-number,0\n";
        let file = write_csv(csv);
        let err = load_training_csv(file.path()).unwrap_err();
        assert!(err.to_string().contains("Torque [Nm]"));
    }

    #[test]
    fn missing_file_is_a_dataset_error() {
        let result = load_training_csv(Path::new("does/not/exist.csv"));
        assert!(result.is_err());
    }
}

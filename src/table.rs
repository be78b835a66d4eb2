use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ColumnType {
    /// A row matches a split when its value is greater than or equal to the threshold.
    Numerical,

    /// A row matches a split when its value equals the threshold.
    Categorical,
}

impl ColumnType {
    pub(crate) fn matches(self, value: f64, threshold: f64) -> bool {
        match self {
            Self::Numerical => value >= threshold,
            Self::Categorical => value == threshold,
        }
    }
}

/// Collects training rows column by column.
///
/// Feature columns must already be numeric; categorical values are expected to be
/// encoded upstream and marked with [`ColumnType::Categorical`].
#[derive(Debug, Default)]
pub struct TableBuilder {
    column_types: Vec<ColumnType>,
    columns: Vec<Vec<f64>>,
    targets: Vec<Vec<f64>>,
}

impl TableBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_feature_column_types(
        &mut self,
        column_types: &[ColumnType],
    ) -> Result<(), TableError> {
        if column_types.is_empty() {
            return Err(TableError::EmptyTable);
        }

        if !self.columns.is_empty() && self.columns.len() != column_types.len() {
            return Err(TableError::ColumnSizeMismatch);
        }

        self.column_types = column_types.to_owned();
        Ok(())
    }

    /// Adds a row with a single target value (a class label or a regression value).
    pub fn add_row(&mut self, features: &[f64], target: f64) -> Result<(), TableError> {
        self.add_multi_output_row(features, &[target])
    }

    /// Adds a row whose target is a vector (e.g., a multi-output regression target).
    pub fn add_multi_output_row(
        &mut self,
        features: &[f64],
        targets: &[f64],
    ) -> Result<(), TableError> {
        if features.is_empty() || targets.is_empty() {
            return Err(TableError::EmptyTable);
        }

        if self.columns.is_empty() {
            if !self.column_types.is_empty() && self.column_types.len() != features.len() {
                return Err(TableError::ColumnSizeMismatch);
            }
            self.columns = vec![Vec::new(); features.len()];
            self.targets = vec![Vec::new(); targets.len()];
        }

        if self.columns.len() != features.len() || self.targets.len() != targets.len() {
            return Err(TableError::ColumnSizeMismatch);
        }

        if targets.iter().any(|y| !y.is_finite()) {
            return Err(TableError::NonFiniteTarget);
        }

        if let Some(column) = features.iter().position(|x| !x.is_finite()) {
            return Err(TableError::NonFiniteFeature { column });
        }

        if self.column_types.is_empty() {
            self.column_types = vec![ColumnType::Numerical; features.len()];
        }

        for (column, &value) in self.columns.iter_mut().zip(features) {
            column.push(value);
        }
        for (column, &value) in self.targets.iter_mut().zip(targets) {
            column.push(value);
        }

        Ok(())
    }

    /// Adds a whole feature matrix together with its aligned target vector.
    pub fn extend<T: AsRef<[f64]>>(
        &mut self,
        features: &[T],
        target: &[f64],
    ) -> Result<(), TableError> {
        if features.len() != target.len() {
            return Err(TableError::RowCountMismatch {
                features: features.len(),
                target: target.len(),
            });
        }

        for (xs, &y) in features.iter().zip(target) {
            self.add_row(xs.as_ref(), y)?;
        }
        Ok(())
    }

    pub fn build(&self) -> Result<Table, TableError> {
        if self.columns.is_empty() || self.columns[0].is_empty() {
            return Err(TableError::EmptyTable);
        }

        Ok(Table::new(&self.column_types, &self.columns, &self.targets))
    }
}

/// A read-only view over a set of rows.
///
/// Subsets produced while growing a tree own their row indices and share the
/// underlying columns.
#[derive(Debug, Clone)]
pub struct Table<'a> {
    row_index: Vec<usize>,
    column_types: &'a [ColumnType],
    columns: &'a [Vec<f64>],
    targets: &'a [Vec<f64>],
}

impl<'a> Table<'a> {
    pub(crate) fn new(
        column_types: &'a [ColumnType],
        columns: &'a [Vec<f64>],
        targets: &'a [Vec<f64>],
    ) -> Self {
        let rows_len = targets.first().map_or(0, |t| t.len());
        Self {
            row_index: (0..rows_len).collect(),
            column_types,
            columns,
            targets,
        }
    }

    pub fn rows_len(&self) -> usize {
        self.row_index.len()
    }

    pub fn features_len(&self) -> usize {
        self.columns.len()
    }

    pub fn outputs_len(&self) -> usize {
        self.targets.len()
    }

    pub fn column_types(&self) -> &'a [ColumnType] {
        self.column_types
    }

    pub(crate) fn column_type(&self, column: usize) -> ColumnType {
        self.column_types[column]
    }

    pub(crate) fn rows(&self) -> &[usize] {
        &self.row_index
    }

    pub(crate) fn value(&self, row: usize, column: usize) -> f64 {
        self.columns[column][row]
    }

    pub(crate) fn column<'b>(
        &'b self,
        column_index: usize,
    ) -> impl 'b + Iterator<Item = f64> + Clone {
        let column = &self.columns[column_index];
        self.row_index.iter().map(move |&i| column[i])
    }

    /// Target values of the first output, i.e., the class labels in classification.
    pub(crate) fn target<'b>(&'b self) -> impl 'b + Iterator<Item = f64> + Clone {
        self.output(0)
    }

    pub(crate) fn output<'b>(&'b self, output: usize) -> impl 'b + Iterator<Item = f64> + Clone {
        let target = &self.targets[output];
        self.row_index.iter().map(move |&i| target[i])
    }

    pub(crate) fn labels_of(&self, rows: &[usize]) -> Vec<f64> {
        rows.iter().map(|&i| self.targets[0][i]).collect()
    }

    pub(crate) fn outputs_of(&self, rows: &[usize]) -> Vec<Vec<f64>> {
        self.targets
            .iter()
            .map(|target| rows.iter().map(|&i| target[i]).collect())
            .collect()
    }

    pub(crate) fn subset(&self, row_index: Vec<usize>) -> Self {
        Self {
            row_index,
            column_types: self.column_types,
            columns: self.columns,
            targets: self.targets,
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum TableError {
    #[error("table must have at least one column and one row")]
    EmptyTable,

    #[error("some of rows have a different column count from others")]
    ColumnSizeMismatch,

    #[error("feature matrix has {features} rows but target vector has {target}")]
    RowCountMismatch { features: usize, target: usize },

    #[error("target column contains non finite numbers")]
    NonFiniteTarget,

    #[error("feature column {column} contains non finite numbers")]
    NonFiniteFeature { column: usize },

    #[error("label {0} is not a non-negative integer")]
    InvalidLabel(f64),

    #[error("expected {expected} predictions, got {predicted}")]
    PredictionCountMismatch { expected: usize, predicted: usize },
}

use super::core::{DecisionTree, DecisionTreeError, DecisionTreeOptions};
use crate::criterion::Criterion;
use crate::fuzzify::FuzzificationOptions;
use crate::table::Table;

/// Decision tree regressor options.
#[derive(Debug, Clone)]
pub struct DecisionTreeRegressorOptions {
    inner: DecisionTreeOptions,
}

impl DecisionTreeRegressorOptions {
    /// Makes a `DecisionTreeRegressorOptions` instance with the default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the dispersion criterion (`Criterion::Variance` or `Criterion::StdDev`).
    ///
    /// The default value is `Criterion::Variance`.
    pub fn criterion(&mut self, criterion: Criterion) -> &mut Self {
        self.inner.criterion(criterion);
        self
    }

    /// Sets the maximum depth of the tree.
    ///
    /// A node at depth `max_depth` is always a leaf, so `0` gives a single leaf and
    /// a tree never holds more than `max_depth` splits on any path. This is one level
    /// shallower than stopping only once the depth exceeds `max_depth`.
    ///
    /// The default value is unbounded.
    pub fn max_depth(&mut self, max_depth: usize) -> &mut Self {
        self.inner.max_depth(max_depth);
        self
    }

    /// Sets the minimum number of rows a node needs to be split.
    ///
    /// The default value is `2`.
    pub fn min_samples_split(&mut self, min_samples_split: usize) -> &mut Self {
        self.inner.min_samples_split(min_samples_split);
        self
    }

    /// Sets the variance reduction a split must strictly exceed to be kept.
    ///
    /// The default value is `1e-7`.
    pub fn min_impurity_split(&mut self, min_impurity_split: f64) -> &mut Self {
        self.inner.min_impurity_split(min_impurity_split);
        self
    }

    /// Enables feature fuzzification.
    pub fn fuzzification(&mut self, fuzzification: FuzzificationOptions) -> &mut Self {
        self.inner.fuzzification(fuzzification);
        self
    }

    /// Grows the two subtrees of every node in parallel.
    ///
    /// This library use `rayon` for parallel execution.
    /// Please see [the rayon document](https://docs.rs/rayon) if you want to configure the behavior
    /// (e.g., the number of worker threads).
    pub fn parallel(&mut self) -> &mut Self {
        self.inner.parallel();
        self
    }

    /// Builds a regressor model fitting the given table.
    pub fn fit(&self, table: &Table) -> Result<DecisionTreeRegressor, DecisionTreeError> {
        let mut regressor = DecisionTreeRegressor::new(self.clone());
        regressor.fit(table)?;
        Ok(regressor)
    }
}

impl Default for DecisionTreeRegressorOptions {
    fn default() -> Self {
        Self {
            inner: DecisionTreeOptions::new(Criterion::Variance),
        }
    }
}

/// Decision tree regressor. Supports multi-output targets.
#[derive(Debug, Clone)]
pub struct DecisionTreeRegressor {
    options: DecisionTreeRegressorOptions,
    tree: Option<DecisionTree>,
}

impl DecisionTreeRegressor {
    /// Makes an unfitted regressor.
    pub fn new(options: DecisionTreeRegressorOptions) -> Self {
        Self {
            options,
            tree: None,
        }
    }

    /// Fits the regressor to the given table, replacing any previous tree.
    ///
    /// On error the regressor is left unfitted.
    pub fn fit(&mut self, table: &Table) -> Result<(), DecisionTreeError> {
        self.tree = None;
        self.tree = Some(self.options.inner.fit(true, table)?);
        Ok(())
    }

    pub fn is_fitted(&self) -> bool {
        self.tree.is_some()
    }

    pub fn tree(&self) -> Option<&DecisionTree> {
        self.tree.as_ref()
    }

    /// Predicts the first output of one row.
    pub fn predict_one(&self, features: &[f64]) -> Result<f64, DecisionTreeError> {
        Ok(self.predict_outputs_one(features)?[0])
    }

    /// Predicts every output of one row.
    pub fn predict_outputs_one(&self, features: &[f64]) -> Result<&[f64], DecisionTreeError> {
        let tree = self.tree.as_ref().ok_or(DecisionTreeError::NotFitted)?;
        Ok(tree.leaf(features)?.value())
    }

    pub fn predict<T: AsRef<[f64]>>(&self, rows: &[T]) -> Result<Vec<f64>, DecisionTreeError> {
        rows.iter().map(|row| self.predict_one(row.as_ref())).collect()
    }

    pub fn predict_outputs<T: AsRef<[f64]>>(
        &self,
        rows: &[T],
    ) -> Result<Vec<Vec<f64>>, DecisionTreeError> {
        rows.iter()
            .map(|row| self.predict_outputs_one(row.as_ref()).map(<[f64]>::to_vec))
            .collect()
    }

    pub fn render_tree(&self, indent: &str, delimiter: &str) -> Result<String, DecisionTreeError> {
        let tree = self.tree.as_ref().ok_or(DecisionTreeError::NotFitted)?;
        Ok(tree.render(indent, delimiter))
    }

    pub fn print_tree(&self, indent: &str, delimiter: &str) -> Result<(), DecisionTreeError> {
        print!("{}", self.render_tree(indent, delimiter)?);
        Ok(())
    }
}

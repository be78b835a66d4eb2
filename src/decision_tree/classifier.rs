use super::core::{DecisionTree, DecisionTreeError, DecisionTreeOptions};
use crate::criterion::Criterion;
use crate::fuzzify::FuzzificationOptions;
use crate::table::Table;

/// Decision tree classifier options.
#[derive(Debug, Clone)]
pub struct DecisionTreeClassifierOptions {
    inner: DecisionTreeOptions,
}

impl DecisionTreeClassifierOptions {
    /// Makes a `DecisionTreeClassifierOptions` instance with the default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the impurity criterion (`Criterion::Gini` or `Criterion::Entropy`).
    ///
    /// The default value is `Criterion::Gini`.
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

    /// Sets the gain a split must strictly exceed to be kept.
    ///
    /// The default value is `1e-7`.
    pub fn min_impurity_split(&mut self, min_impurity_split: f64) -> &mut Self {
        self.inner.min_impurity_split(min_impurity_split);
        self
    }

    /// Scores splits by gain ratio instead of plain impurity gain.
    pub fn gain_ratio(&mut self) -> &mut Self {
        self.inner.gain_ratio();
        self
    }

    /// Enables feature fuzzification.
    ///
    /// Every feature gets `conv_k` membership columns whose mass weights the
    /// impurity gain of the splits on that feature.
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

    /// Builds a classifier model fitting the given table.
    pub fn fit(&self, table: &Table) -> Result<DecisionTreeClassifier, DecisionTreeError> {
        let mut classifier = DecisionTreeClassifier::new(self.clone());
        classifier.fit(table)?;
        Ok(classifier)
    }
}

impl Default for DecisionTreeClassifierOptions {
    fn default() -> Self {
        Self {
            inner: DecisionTreeOptions::new(Criterion::Gini),
        }
    }
}

/// Decision tree classifier.
#[derive(Debug, Clone)]
pub struct DecisionTreeClassifier {
    options: DecisionTreeClassifierOptions,
    tree: Option<DecisionTree>,
}

impl DecisionTreeClassifier {
    /// Makes an unfitted classifier.
    pub fn new(options: DecisionTreeClassifierOptions) -> Self {
        Self {
            options,
            tree: None,
        }
    }

    /// Fits the classifier to the given table, replacing any previous tree.
    ///
    /// On error the classifier is left unfitted.
    pub fn fit(&mut self, table: &Table) -> Result<(), DecisionTreeError> {
        self.tree = None;
        self.tree = Some(self.options.inner.fit(false, table)?);
        Ok(())
    }

    pub fn is_fitted(&self) -> bool {
        self.tree.is_some()
    }

    pub fn tree(&self) -> Option<&DecisionTree> {
        self.tree.as_ref()
    }

    /// Sorted class labels; the order of every probability vector.
    pub fn classes(&self) -> Result<&[f64], DecisionTreeError> {
        Ok(self.fitted()?.classes())
    }

    /// Predicts the class of one row.
    pub fn predict_one(&self, features: &[f64]) -> Result<f64, DecisionTreeError> {
        let leaf = self.fitted()?.leaf(features)?;
        Ok(leaf.value()[0])
    }

    /// Predicts the class probabilities of one row.
    pub fn predict_proba_one(&self, features: &[f64]) -> Result<&[f64], DecisionTreeError> {
        let leaf = self.fitted()?.leaf(features)?;
        Ok(leaf.proba().unwrap_or(&[]))
    }

    pub fn predict<T: AsRef<[f64]>>(&self, rows: &[T]) -> Result<Vec<f64>, DecisionTreeError> {
        rows.iter().map(|row| self.predict_one(row.as_ref())).collect()
    }

    pub fn predict_proba<T: AsRef<[f64]>>(
        &self,
        rows: &[T],
    ) -> Result<Vec<Vec<f64>>, DecisionTreeError> {
        rows.iter()
            .map(|row| self.predict_proba_one(row.as_ref()).map(<[f64]>::to_vec))
            .collect()
    }

    /// Renders the tree: `feature:value?` per internal node, then its `True` and
    /// `False` branches indented by `indent` (doubling per level) after `delimiter`.
    pub fn render_tree(&self, indent: &str, delimiter: &str) -> Result<String, DecisionTreeError> {
        Ok(self.fitted()?.render(indent, delimiter))
    }

    /// Prints [`DecisionTreeClassifier::render_tree`] to standard output.
    pub fn print_tree(&self, indent: &str, delimiter: &str) -> Result<(), DecisionTreeError> {
        print!("{}", self.render_tree(indent, delimiter)?);
        Ok(())
    }

    fn fitted(&self) -> Result<&DecisionTree, DecisionTreeError> {
        self.tree.as_ref().ok_or(DecisionTreeError::NotFitted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::functions;
    use crate::table::{ColumnType, TableBuilder};

    #[test]
    fn classification_works() -> Result<(), anyhow::Error> {
        let features = [
            &[0.0, 1.0, 0.0][..],
            &[1.0, 1.0, 1.0][..],
            &[0.0, 0.0, 1.0][..],
            &[1.0, 0.0, 0.0][..],
            &[1.0, 0.0, 0.0][..],
            &[0.0, 1.0, 0.0][..],
            &[1.0, 0.0, 1.0][..],
        ];

        let target = [1.0, 0.0, 1.0, 0.0, 1.0, 1.0, 0.0];
        let train_len = target.len() - 1;

        let mut table_builder = TableBuilder::new();
        table_builder.set_feature_column_types(&[
            ColumnType::Categorical,
            ColumnType::Categorical,
            ColumnType::Categorical,
        ])?;

        for (xs, y) in features.iter().zip(target.iter()).take(train_len) {
            table_builder.add_row(xs, *y)?;
        }
        let table = table_builder.build()?;

        let classifier = DecisionTreeClassifierOptions::new().fit(&table)?;
        // Rows 3 and 4 share their features but not their label; the tie goes to 0.
        let predictions = classifier.predict(&features[..train_len])?;
        assert_eq!(predictions, [1.0, 0.0, 1.0, 0.0, 0.0, 1.0]);
        assert_eq!(classifier.predict_one(&features[train_len])?, 0.0);

        let classifier_parallel = DecisionTreeClassifierOptions::new().parallel().fit(&table)?;
        assert_eq!(classifier.tree(), classifier_parallel.tree());
        Ok(())
    }

    #[test]
    fn scenario_training_accuracy_is_perfect() -> Result<(), anyhow::Error> {
        let xs = [[1.0], [1.0], [2.0], [5.0], [6.0], [7.0]];
        let ys = [0.0, 0.0, 0.0, 1.0, 1.0, 1.0];
        let mut table_builder = TableBuilder::new();
        table_builder.extend(&xs, &ys)?;
        let table = table_builder.build()?;

        for criterion in &[Criterion::Gini, Criterion::Entropy] {
            let classifier = DecisionTreeClassifierOptions::new()
                .criterion(*criterion)
                .max_depth(5)
                .min_impurity_split(0.0)
                .fit(&table)?;
            let tree = classifier.tree().expect("fitted");
            assert_eq!(tree.nodes_len(), 3);
            assert_eq!(functions::accuracy(&ys, &classifier.predict(&xs)?)?, 1.0);
            assert_eq!(classifier.predict_proba_one(&[0.0])?, [1.0, 0.0]);
            assert_eq!(classifier.predict_proba(&[[9.0]])?, [vec![0.0, 1.0]]);
            assert_eq!(classifier.classes()?, [0.0, 1.0]);
        }
        Ok(())
    }

    #[test]
    fn prediction_is_idempotent() -> Result<(), anyhow::Error> {
        let mut table_builder = TableBuilder::new();
        for i in 0..40 {
            let x = i as f64;
            table_builder.add_row(&[x, (x * 0.37).sin()], (i % 3) as f64)?;
        }
        let table = table_builder.build()?;
        let mut fuzzification = FuzzificationOptions::new();
        fuzzification.conv_k(4).fuzzy_regulation(0.7).seed(3);
        let classifier = DecisionTreeClassifierOptions::new()
            .fuzzification(fuzzification)
            .fit(&table)?;

        let row = [17.5, 0.2];
        let first = classifier.predict_one(&row)?;
        let first_proba = classifier.predict_proba_one(&row)?.to_vec();
        for _ in 0..5 {
            assert_eq!(classifier.predict_one(&row)?, first);
            assert_eq!(classifier.predict_proba_one(&row)?, &first_proba[..]);
        }
        let proba_sum = first_proba.iter().sum::<f64>();
        assert!((proba_sum - 1.0).abs() < 1e-9);
        Ok(())
    }

    #[test]
    fn unfitted_and_failed_fits_refuse_to_predict() -> Result<(), anyhow::Error> {
        let mut classifier = DecisionTreeClassifier::new(DecisionTreeClassifierOptions::new());
        assert_eq!(
            classifier.predict_one(&[1.0]).err(),
            Some(DecisionTreeError::NotFitted)
        );
        assert!(classifier.print_tree("  ", "-->").is_err());

        let mut table_builder = TableBuilder::new();
        table_builder.extend(&[[1.0], [2.0]], &[0.0, 1.0])?;
        classifier.fit(&table_builder.build()?)?;
        assert!(classifier.is_fitted());

        let mut multi_output = TableBuilder::new();
        multi_output.add_multi_output_row(&[1.0], &[0.0, 1.0])?;
        let err = classifier.fit(&multi_output.build()?).err();
        assert_eq!(
            err,
            Some(DecisionTreeError::MultiOutputClassification { outputs: 2 })
        );
        assert!(!classifier.is_fitted());
        assert_eq!(
            classifier.predict(&[[1.0]]).err(),
            Some(DecisionTreeError::NotFitted)
        );
        Ok(())
    }

    #[test]
    fn regression_criterion_is_rejected() -> Result<(), anyhow::Error> {
        let mut table_builder = TableBuilder::new();
        table_builder.extend(&[[1.0], [2.0]], &[0.0, 1.0])?;
        let result = DecisionTreeClassifierOptions::new()
            .criterion("mse".parse()?)
            .fit(&table_builder.build()?);
        assert!(matches!(
            result,
            Err(DecisionTreeError::CriterionMismatch { .. })
        ));
        Ok(())
    }
}

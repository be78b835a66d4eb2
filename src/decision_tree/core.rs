use crate::criterion::{
    self, Criterion, CriterionError, CriterionFn, DispersionFn, ImpurityFn, MembershipSplit,
};
use crate::functions;
use crate::fuzzify::{FuzzificationOptions, FuzzifyError, FuzzySets};
use crate::table::{ColumnType, Table, TableError};
use log::{debug, info};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone)]
pub struct DecisionTreeOptions {
    criterion: Criterion,
    max_depth: usize,
    min_samples_split: usize,
    min_impurity_split: f64,
    gain_ratio: bool,
    fuzzification: Option<FuzzificationOptions>,
    parallel: bool,
}

impl DecisionTreeOptions {
    pub fn new(criterion: Criterion) -> Self {
        Self {
            criterion,
            max_depth: usize::MAX,
            min_samples_split: 2,
            min_impurity_split: 1e-7,
            gain_ratio: false,
            fuzzification: None,
            parallel: false,
        }
    }

    pub fn criterion(&mut self, criterion: Criterion) -> &mut Self {
        self.criterion = criterion;
        self
    }

    /// Nodes at depth `max_depth` become leaves.
    pub fn max_depth(&mut self, max_depth: usize) -> &mut Self {
        self.max_depth = max_depth;
        self
    }

    pub fn min_samples_split(&mut self, min_samples_split: usize) -> &mut Self {
        self.min_samples_split = min_samples_split;
        self
    }

    pub fn min_impurity_split(&mut self, min_impurity_split: f64) -> &mut Self {
        self.min_impurity_split = min_impurity_split;
        self
    }

    pub fn gain_ratio(&mut self) -> &mut Self {
        self.gain_ratio = true;
        self
    }

    pub fn fuzzification(&mut self, fuzzification: FuzzificationOptions) -> &mut Self {
        self.fuzzification = Some(fuzzification);
        self
    }

    pub fn parallel(&mut self) -> &mut Self {
        self.parallel = true;
        self
    }

    pub fn fit(&self, is_regression: bool, table: &Table) -> Result<DecisionTree, DecisionTreeError> {
        self.validate(is_regression, table)?;

        let column_types = table.column_types().to_owned();
        let classes = if is_regression {
            Vec::new()
        } else {
            functions::unique(table.target())
        };
        let builder = |memberships| NodeBuilder {
            options: self,
            function: self.criterion.function(),
            classes: &classes,
            raw_features: column_types.len(),
            memberships,
        };

        let (root, fuzzy_sets) = if let Some(fuzzification) = &self.fuzzification {
            let mut columns = (0..table.features_len())
                .map(|i| table.column(i).collect::<Vec<_>>())
                .collect::<Vec<_>>();
            let (memberships, fuzzy_sets) = FuzzySets::fit(&columns, fuzzification)?;
            columns.extend((0..memberships.columns_len()).map(|j| memberships.column(j).collect()));

            let mut augmented_types = column_types.clone();
            augmented_types.resize(columns.len(), ColumnType::Numerical);
            let targets = (0..table.outputs_len())
                .map(|o| table.output(o).collect::<Vec<_>>())
                .collect::<Vec<_>>();

            let augmented = Table::new(&augmented_types, &columns, &targets);
            let memberships =
                MembershipColumns::new(&augmented, column_types.len(), fuzzy_sets.conv_k());
            let root = builder(Some(memberships)).build(augmented, 0);
            (root, Some(fuzzy_sets))
        } else {
            (builder(None).build(table.clone(), 0), None)
        };

        let tree = DecisionTree {
            root,
            column_types,
            classes,
            fuzzy_sets,
        };
        info!(
            "fitted a decision tree ({}, fuzzy: {}) on {} rows x {} features: {} nodes, {} leaves, depth {}",
            self.criterion,
            tree.fuzzy_sets.is_some(),
            table.rows_len(),
            table.features_len(),
            tree.nodes_len(),
            tree.leaves_len(),
            tree.depth()
        );
        Ok(tree)
    }

    fn validate(&self, is_regression: bool, table: &Table) -> Result<(), DecisionTreeError> {
        if table.rows_len() == 0 {
            return Err(TableError::EmptyTable.into());
        }

        if self.criterion.is_regression() != is_regression {
            return Err(DecisionTreeError::CriterionMismatch {
                criterion: self.criterion,
                task: if is_regression {
                    "regression"
                } else {
                    "classification"
                },
            });
        }

        if !is_regression && table.outputs_len() != 1 {
            return Err(DecisionTreeError::MultiOutputClassification {
                outputs: table.outputs_len(),
            });
        }

        if let Some(fuzzification) = &self.fuzzification {
            fuzzification.validate()?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DecisionTree {
    root: Node,
    column_types: Vec<ColumnType>,
    classes: Vec<f64>,
    fuzzy_sets: Option<FuzzySets>,
}

impl DecisionTree {
    pub fn root(&self) -> &Node {
        &self.root
    }

    /// Sorted class labels seen during training; empty for regression trees.
    pub fn classes(&self) -> &[f64] {
        &self.classes
    }

    /// Fitted fuzzification, for replaying it on unseen rows.
    pub fn fuzzy_sets(&self) -> Option<&FuzzySets> {
        self.fuzzy_sets.as_ref()
    }

    pub fn depth(&self) -> usize {
        self.root.depth()
    }

    pub fn nodes_len(&self) -> usize {
        self.root.nodes_len()
    }

    pub fn leaves_len(&self) -> usize {
        self.root.leaves_len()
    }

    /// Finds the leaf `xs` falls into.
    ///
    /// `xs` is either a raw row or a raw row followed by its membership values.
    pub fn leaf(&self, xs: &[f64]) -> Result<&Leaf, DecisionTreeError> {
        let raw = self.column_types.len();
        let augmented = self
            .fuzzy_sets
            .as_ref()
            .map_or(raw, |sets| raw + raw * sets.conv_k());
        if xs.len() != raw && xs.len() != augmented {
            return Err(DecisionTreeError::FeatureCountMismatch {
                expected: raw,
                found: xs.len(),
            });
        }
        Ok(self.root.leaf(xs, &self.column_types))
    }

    /// Renders the tree with a custom indentation unit and branch delimiter.
    pub fn render(&self, indent: &str, delimiter: &str) -> String {
        let mut out = String::new();
        write_node(&mut out, &self.root, indent, delimiter)
            .expect("writing to a String never fails");
        out
    }
}

impl fmt::Display for DecisionTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_node(f, &self.root, "  ", "-->")
    }
}

fn write_node<W: fmt::Write>(
    w: &mut W,
    node: &Node,
    indent: &str,
    delimiter: &str,
) -> fmt::Result {
    match node {
        Node::Leaf(leaf) => writeln!(w, "{}", leaf),
        Node::Internal {
            rule,
            branch_true,
            branch_false,
        } => {
            writeln!(w, "{}:{}? ", rule.feature_idx, rule.split_value)?;
            let deeper = format!("{}{}", indent, indent);
            write!(w, "{}True{}", indent, delimiter)?;
            write_node(w, branch_true, &deeper, delimiter)?;
            write!(w, "{}False{}", indent, delimiter)?;
            write_node(w, branch_false, &deeper, delimiter)
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Leaf(Leaf),
    Internal {
        rule: SplitRule,
        branch_true: Box<Node>,
        branch_false: Box<Node>,
    },
}

impl Node {
    pub fn is_leaf(&self) -> bool {
        matches!(self, Self::Leaf(_))
    }

    fn leaf<'a>(&'a self, xs: &[f64], column_types: &[ColumnType]) -> &'a Leaf {
        let mut node = self;
        loop {
            match node {
                Self::Leaf(leaf) => return leaf,
                Self::Internal {
                    rule,
                    branch_true,
                    branch_false,
                } => {
                    node = if rule.matches(xs, column_types[rule.feature_idx]) {
                        &**branch_true
                    } else {
                        &**branch_false
                    };
                }
            }
        }
    }

    fn depth(&self) -> usize {
        match self {
            Self::Leaf(_) => 0,
            Self::Internal {
                branch_true,
                branch_false,
                ..
            } => 1 + std::cmp::max(branch_true.depth(), branch_false.depth()),
        }
    }

    fn nodes_len(&self) -> usize {
        match self {
            Self::Leaf(_) => 1,
            Self::Internal {
                branch_true,
                branch_false,
                ..
            } => 1 + branch_true.nodes_len() + branch_false.nodes_len(),
        }
    }

    fn leaves_len(&self) -> usize {
        match self {
            Self::Leaf(_) => 1,
            Self::Internal {
                branch_true,
                branch_false,
                ..
            } => branch_true.leaves_len() + branch_false.leaves_len(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Leaf {
    value: Vec<f64>,
    proba: Option<Vec<f64>>,
}

impl Leaf {
    /// The majority class (classification) or the mean of every output (regression).
    pub fn value(&self) -> &[f64] {
        &self.value
    }

    /// Class probabilities aligned with [`DecisionTree::classes`]; `None` for regression.
    pub fn proba(&self) -> Option<&[f64]> {
        self.proba.as_deref()
    }
}

impl fmt::Display for Leaf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let [value] = self.value[..] {
            write!(f, "{}", value)
        } else {
            write!(f, "{:?}", self.value)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SplitRule {
    pub feature_idx: usize,
    pub split_value: f64,
}

impl SplitRule {
    pub fn matches(&self, xs: &[f64], column_type: ColumnType) -> bool {
        column_type.matches(xs[self.feature_idx], self.split_value)
    }
}

#[derive(Debug)]
struct Split {
    gain: f64,
    rule: SplitRule,
    true_rows: Vec<usize>,
    false_rows: Vec<usize>,
}

/// Score of the unsplit rows of a node, shared by all of its candidate splits.
#[derive(Debug)]
enum NodeScore {
    Impurity(ImpurityFn, f64),
    Dispersion(DispersionFn, Vec<f64>),
}

/// Location of the membership columns in an augmented table.
#[derive(Debug)]
struct MembershipColumns {
    conv_k: usize,
    /// Total membership of every training row across all membership columns.
    row_mass: Vec<f64>,
}

impl MembershipColumns {
    fn new(table: &Table, raw_features: usize, conv_k: usize) -> Self {
        let columns = raw_features..table.features_len();
        let row_mass = table
            .rows()
            .iter()
            .map(|&row| columns.clone().map(|c| table.value(row, c)).sum())
            .collect();
        Self { conv_k, row_mass }
    }
}

#[derive(Debug)]
struct NodeBuilder<'a> {
    options: &'a DecisionTreeOptions,
    function: CriterionFn,
    classes: &'a [f64],
    raw_features: usize,
    memberships: Option<MembershipColumns>,
}

impl NodeBuilder<'_> {
    fn build(&self, table: Table, depth: usize) -> Node {
        if table.rows_len() < self.options.min_samples_split || depth >= self.options.max_depth {
            return Node::Leaf(self.leaf(&table));
        }

        match self.best_split(&table) {
            Some(split) if split.gain > self.options.min_impurity_split => {
                debug!(
                    "depth {}: split on feature {} at {} (gain {})",
                    depth, split.rule.feature_idx, split.rule.split_value, split.gain
                );
                let subset_true = table.subset(split.true_rows);
                let subset_false = table.subset(split.false_rows);
                let (branch_true, branch_false) = if self.options.parallel {
                    rayon::join(
                        || self.build(subset_true, depth + 1),
                        || self.build(subset_false, depth + 1),
                    )
                } else {
                    (
                        self.build(subset_true, depth + 1),
                        self.build(subset_false, depth + 1),
                    )
                };
                Node::Internal {
                    rule: split.rule,
                    branch_true: Box::new(branch_true),
                    branch_false: Box::new(branch_false),
                }
            }
            best => {
                debug!(
                    "depth {}: no split beats min_impurity_split {} (best gain {:?}), making a leaf of {} rows",
                    depth,
                    self.options.min_impurity_split,
                    best.map(|s| s.gain),
                    table.rows_len()
                );
                Node::Leaf(self.leaf(&table))
            }
        }
    }

    /// The first candidate with the strictly largest positive gain.
    fn best_split(&self, table: &Table) -> Option<Split> {
        let score = self.node_score(table);
        (0..self.raw_features)
            .flat_map(|column| {
                let split_information = self.split_information(table, column);
                functions::unique(table.column(column))
                    .into_iter()
                    .map(move |threshold| (column, threshold, split_information))
            })
            .filter_map(|(column, threshold, split_information)| {
                self.candidate(table, &score, column, threshold, split_information)
            })
            .fold(None, |best, candidate| {
                let best_gain = best.as_ref().map_or(0.0, |b: &Split| b.gain);
                if candidate.gain > best_gain {
                    Some(candidate)
                } else {
                    best
                }
            })
    }

    fn node_score(&self, table: &Table) -> NodeScore {
        match self.function {
            CriterionFn::Classification(f) => {
                NodeScore::Impurity(f, f(&table.labels_of(table.rows()), None))
            }
            CriterionFn::Regression(f) => {
                NodeScore::Dispersion(f, f(&table.outputs_of(table.rows())))
            }
        }
    }

    /// Impurity of the candidate feature's values at this node, when scoring by gain ratio.
    fn split_information(&self, table: &Table, column: usize) -> Option<f64> {
        match self.function {
            CriterionFn::Classification(f) if self.options.gain_ratio => {
                Some(f(&table.column(column).collect::<Vec<_>>(), None))
            }
            _ => None,
        }
    }

    /// Partitions the rows on `column >= threshold` (or `==` for categorical columns).
    /// `None` when either side would be empty.
    fn candidate(
        &self,
        table: &Table,
        score: &NodeScore,
        column: usize,
        threshold: f64,
        split_information: Option<f64>,
    ) -> Option<Split> {
        let column_type = table.column_type(column);
        let (true_rows, false_rows) = table
            .rows()
            .iter()
            .copied()
            .partition::<Vec<_>, _>(|&row| column_type.matches(table.value(row, column), threshold));
        if true_rows.is_empty() || false_rows.is_empty() {
            return None;
        }

        let mut gain = self.gain(table, score, column, &true_rows, &false_rows);
        if let Some(split_information) = split_information {
            gain = criterion::gain_ratio(gain, split_information);
        }
        Some(Split {
            gain,
            rule: SplitRule {
                feature_idx: column,
                split_value: threshold,
            },
            true_rows,
            false_rows,
        })
    }

    /// Gain of one candidate split.
    ///
    /// With fuzzification the side weights are each side's share of the candidate
    /// feature's membership mass, and the subsets are scored with every row weighted
    /// by its total membership across all features.
    fn gain(
        &self,
        table: &Table,
        score: &NodeScore,
        column: usize,
        true_rows: &[usize],
        false_rows: &[usize],
    ) -> f64 {
        let weights = self.memberships.as_ref().map(|memberships| {
            let feature_mass = |rows: &[usize]| {
                rows.iter()
                    .map(|&row| self.feature_mass(table, memberships.conv_k, column, row))
                    .sum::<f64>()
            };
            let row_mass = |rows: &[usize]| {
                rows.iter()
                    .map(|&row| memberships.row_mass[row])
                    .collect::<Vec<_>>()
            };
            (
                feature_mass(true_rows),
                feature_mass(false_rows),
                row_mass(true_rows),
                row_mass(false_rows),
            )
        });
        let fuzzy = weights
            .as_ref()
            .and_then(|(mass_true, mass_false, true_dm, false_dm)| {
                let total = mass_true + mass_false;
                if total > 0.0 {
                    Some(MembershipSplit {
                        p_true: mass_true / total,
                        p_false: mass_false / total,
                        true_dm,
                        false_dm,
                    })
                } else {
                    None
                }
            });

        match score {
            NodeScore::Impurity(f, impurity) => {
                criterion::split_impurity_gain(
                    *impurity,
                    &table.labels_of(true_rows),
                    &table.labels_of(false_rows),
                    *f,
                    fuzzy,
                )
            }
            NodeScore::Dispersion(f, dispersion) => {
                criterion::split_variance_reduction(
                    dispersion,
                    &table.outputs_of(true_rows),
                    &table.outputs_of(false_rows),
                    *f,
                    fuzzy,
                )
            }
        }
    }

    /// Total membership of `row` across the membership columns of raw feature `column`.
    fn feature_mass(&self, table: &Table, conv_k: usize, column: usize, row: usize) -> f64 {
        let start = self.raw_features + column * conv_k;
        (start..start + conv_k).map(|c| table.value(row, c)).sum()
    }

    fn leaf(&self, table: &Table) -> Leaf {
        match self.function {
            CriterionFn::Classification(_) => Leaf {
                value: vec![functions::majority_class(table.target())
                    .expect("a node always holds at least one row")],
                proba: Some(functions::class_distribution(table.target(), self.classes)),
            },
            CriterionFn::Regression(_) => Leaf {
                value: (0..table.outputs_len())
                    .map(|o| functions::mean(table.output(o)))
                    .collect(),
                proba: None,
            },
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum DecisionTreeError {
    #[error(transparent)]
    Table(#[from] TableError),

    #[error(transparent)]
    Fuzzify(#[from] FuzzifyError),

    #[error(transparent)]
    Criterion(#[from] CriterionError),

    #[error("criterion {criterion} cannot be used for {task}")]
    CriterionMismatch {
        criterion: Criterion,
        task: &'static str,
    },

    #[error("classification expects a single target column, got {outputs}")]
    MultiOutputClassification { outputs: usize },

    #[error("the estimator has not been fitted")]
    NotFitted,

    #[error("expected {expected} feature values, got {found}")]
    FeatureCountMismatch { expected: usize, found: usize },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::TableBuilder;

    fn scenario_table() -> Result<TableBuilder, anyhow::Error> {
        let mut builder = TableBuilder::new();
        let xs = [[1.0], [1.0], [2.0], [5.0], [6.0], [7.0]];
        builder.extend(&xs, &[0.0, 0.0, 0.0, 1.0, 1.0, 1.0])?;
        Ok(builder)
    }

    fn entropy_options() -> DecisionTreeOptions {
        let mut options = DecisionTreeOptions::new(Criterion::Entropy);
        options
            .min_samples_split(2)
            .max_depth(5)
            .min_impurity_split(0.0);
        options
    }

    #[test]
    fn single_pure_split() -> Result<(), anyhow::Error> {
        let builder = scenario_table()?;
        let tree = entropy_options().fit(false, &builder.build()?)?;

        match tree.root() {
            Node::Internal {
                rule,
                branch_true,
                branch_false,
            } => {
                assert_eq!(
                    *rule,
                    SplitRule {
                        feature_idx: 0,
                        split_value: 5.0
                    }
                );
                assert!(branch_true.is_leaf());
                assert!(branch_false.is_leaf());
            }
            Node::Leaf(_) => panic!("expected a split"),
        }
        assert_eq!(tree.classes(), [0.0, 1.0]);
        assert_eq!(tree.leaf(&[6.0])?.value(), [1.0]);
        assert_eq!(tree.leaf(&[2.0])?.value(), [0.0]);
        assert_eq!(tree.leaf(&[6.0])?.proba(), Some(&[0.0, 1.0][..]));
        assert_eq!(tree.render("  ", "-->"), "0:5? \n  True-->1\n  False-->0\n");
        assert_eq!(tree.to_string(), tree.render("  ", "-->"));
        Ok(())
    }

    #[test]
    fn zero_max_depth_gives_a_single_leaf() -> Result<(), anyhow::Error> {
        let mut builder = TableBuilder::new();
        builder.extend(&[[1.0], [2.0], [3.0]], &[1.0, 0.0, 1.0])?;
        let mut options = entropy_options();
        options.max_depth(0);
        let tree = options.fit(false, &builder.build()?)?;
        assert_eq!(tree.nodes_len(), 1);
        assert_eq!(tree.leaf(&[2.0])?.value(), [1.0]);

        options.max_depth(1);
        let tree = options.fit(false, &builder.build()?)?;
        assert_eq!(tree.depth(), 1);

        options.max_depth(2);
        let tree = options.fit(false, &builder.build()?)?;
        assert_eq!(tree.depth(), 2);
        Ok(())
    }

    #[test]
    fn min_samples_split_stops_growth() -> Result<(), anyhow::Error> {
        let builder = scenario_table()?;
        let mut options = entropy_options();
        options.min_samples_split(7);
        let tree = options.fit(false, &builder.build()?)?;
        assert!(tree.root().is_leaf());
        Ok(())
    }

    #[test]
    fn categorical_columns_split_by_equality() -> Result<(), anyhow::Error> {
        let mut builder = TableBuilder::new();
        builder.set_feature_column_types(&[ColumnType::Categorical])?;
        builder.extend(
            &[[0.0], [1.0], [2.0], [0.0], [1.0], [2.0]],
            &[0.0, 1.0, 0.0, 0.0, 1.0, 0.0],
        )?;
        let tree = entropy_options().fit(false, &builder.build()?)?;
        assert_eq!(tree.depth(), 1);
        assert_eq!(tree.leaf(&[1.0])?.value(), [1.0]);
        assert_eq!(tree.leaf(&[2.0])?.value(), [0.0]);
        Ok(())
    }

    #[test]
    fn fuzzy_split_only_on_raw_columns() -> Result<(), anyhow::Error> {
        let builder = scenario_table()?;
        let table = builder.build()?;
        let mut fuzzification = FuzzificationOptions::new();
        fuzzification.conv_k(2);
        let mut options = entropy_options();
        options.fuzzification(fuzzification);
        let tree = options.fit(false, &table)?;

        match tree.root() {
            Node::Internal { rule, .. } => assert_eq!(rule.feature_idx, 0),
            Node::Leaf(_) => panic!("expected a split"),
        }
        let sets = tree.fuzzy_sets().expect("fuzzified");
        assert_eq!(sets.conv_k(), 2);
        for (x, y) in [1.0, 2.0, 5.0, 7.0].iter().zip(&[0.0, 0.0, 1.0, 1.0]) {
            assert_eq!(tree.leaf(&[*x])?.value(), [*y]);
            assert_eq!(tree.leaf(&sets.augment_row(&[*x])?)?.value(), [*y]);
        }
        assert_eq!(
            tree.leaf(&[1.0, 2.0]).err(),
            Some(DecisionTreeError::FeatureCountMismatch {
                expected: 1,
                found: 2
            })
        );
        Ok(())
    }

    fn leaves(node: &Node) -> Vec<&Leaf> {
        match node {
            Node::Leaf(leaf) => vec![leaf],
            Node::Internal {
                branch_true,
                branch_false,
                ..
            } => {
                let mut leaves_true = leaves(branch_true);
                leaves_true.extend(leaves(branch_false));
                leaves_true
            }
        }
    }

    #[test]
    fn fuzzy_gain_uses_feature_shares_and_total_row_mass() -> Result<(), anyhow::Error> {
        // Two raw features with one membership column each.
        let column_types = [ColumnType::Numerical; 4];
        let columns = [
            vec![0.0, 1.0, 2.0, 3.0],
            vec![0.0, 0.0, 1.0, 1.0],
            vec![1.0, 1.0, 1.0, 3.0],
            vec![1.0, 1.0, 3.0, 0.0],
        ];
        let targets = [vec![0.0, 1.0, 0.0, 1.0]];
        let table = Table::new(&column_types, &columns, &targets);

        let options = DecisionTreeOptions::new(Criterion::Gini);
        let builder = NodeBuilder {
            options: &options,
            function: Criterion::Gini.function(),
            classes: &[0.0, 1.0],
            raw_features: 2,
            memberships: Some(MembershipColumns::new(&table, 2, 1)),
        };
        let score = builder.node_score(&table);

        // Feature 0 at 2: the sides hold 4/6 and 2/6 of its membership, and the
        // subsets are weighted by row masses [4, 3] and [2, 2].
        let split = builder
            .candidate(&table, &score, 0, 2.0, None)
            .expect("both sides hold rows");
        assert_eq!(split.true_rows, [2, 3]);
        assert!((split.gain - 1.0 / 147.0).abs() < 1e-12);

        // Same partition through feature 1, whose membership splits 3/5 and 2/5.
        let split = builder
            .candidate(&table, &score, 1, 1.0, None)
            .expect("both sides hold rows");
        assert_eq!(split.true_rows, [2, 3]);
        assert!((split.gain - 3.0 / 490.0).abs() < 1e-12);

        assert!(builder.candidate(&table, &score, 1, 0.0, None).is_none());
        Ok(())
    }

    #[test]
    fn membership_weights_move_the_chosen_threshold() {
        let column_types = [ColumnType::Numerical; 2];
        let columns = [
            vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0],
            vec![1.0, 1.0, 1.0, 0.0, 1.0, 1.0, 1.0],
        ];
        let targets = [vec![0.0, 0.0, 1.0, 0.0, 1.0, 1.0, 1.0]];
        let table = Table::new(&column_types, &columns, &targets);
        let options = DecisionTreeOptions::new(Criterion::Gini);
        let builder = |memberships| NodeBuilder {
            options: &options,
            function: Criterion::Gini.function(),
            classes: &[0.0, 1.0],
            raw_features: 1,
            memberships,
        };

        let crisp = builder(None).best_split(&table).expect("a split");
        assert_eq!(crisp.rule.split_value, 4.0);

        // Row 3 carries no membership, so the split at 2 looks pure on both sides.
        let fuzzy = builder(Some(MembershipColumns::new(&table, 1, 1)))
            .best_split(&table)
            .expect("a split");
        assert_eq!(fuzzy.rule.split_value, 2.0);
        assert!((fuzzy.gain - 24.0 / 49.0).abs() < 1e-12);
    }

    #[test]
    fn unbounded_growth_ends_in_pure_leaves() -> Result<(), anyhow::Error> {
        let xs = [[1.0], [2.0], [3.0], [4.0], [5.0], [6.0]];
        let ys = [0.0, 1.0, 0.0, 1.0, 0.0, 1.0];
        let mut builder = TableBuilder::new();
        builder.extend(&xs, &ys)?;
        let mut options = entropy_options();
        options.max_depth(usize::MAX).min_impurity_split(f64::NEG_INFINITY);
        let tree = options.fit(false, &builder.build()?)?;

        assert_eq!(tree.leaves_len(), 6);
        for (x, y) in xs.iter().zip(&ys) {
            assert_eq!(tree.leaf(x)?.value(), [*y]);
        }
        for leaf in leaves(tree.root()) {
            let proba = leaf.proba().expect("classification leaf");
            let class = proba
                .iter()
                .position(|&p| p == 1.0)
                .expect("a pure leaf");
            assert_eq!(leaf.value(), [tree.classes()[class]]);
            assert_eq!(proba.iter().sum::<f64>(), 1.0);
        }
        Ok(())
    }

    #[test]
    fn parallel_build_matches_sequential() -> Result<(), anyhow::Error> {
        let mut builder = TableBuilder::new();
        for i in 0..60 {
            let a = ((i * 7) % 13) as f64;
            let b = ((i * 5) % 11) as f64;
            let y = if a + b > 11.0 { 1.0 } else if a > 8.0 { 2.0 } else { 0.0 };
            builder.add_row(&[a, b], y)?;
        }
        let table = builder.build()?;

        let sequential = entropy_options().fit(false, &table)?;
        let parallel = entropy_options().parallel().fit(false, &table)?;
        assert_eq!(sequential, parallel);
        Ok(())
    }

    #[test]
    fn multi_output_regression_leaves_hold_means() -> Result<(), anyhow::Error> {
        let mut builder = TableBuilder::new();
        builder.add_multi_output_row(&[1.0], &[1.0, 10.0])?;
        builder.add_multi_output_row(&[2.0], &[3.0, 10.0])?;
        builder.add_multi_output_row(&[8.0], &[20.0, 0.0])?;
        builder.add_multi_output_row(&[9.0], &[20.0, 2.0])?;
        let mut options = DecisionTreeOptions::new(Criterion::Variance);
        options.max_depth(1);
        let tree = options.fit(true, &builder.build()?)?;
        assert_eq!(tree.leaf(&[0.0])?.value(), [2.0, 10.0]);
        assert_eq!(tree.leaf(&[10.0])?.value(), [20.0, 1.0]);
        assert_eq!(tree.leaf(&[10.0])?.proba(), None);
        assert!(tree.classes().is_empty());
        Ok(())
    }

    #[test]
    fn rejects_mismatched_configuration() -> Result<(), anyhow::Error> {
        let builder = scenario_table()?;
        let table = builder.build()?;
        assert_eq!(
            entropy_options().fit(true, &table).err(),
            Some(DecisionTreeError::CriterionMismatch {
                criterion: Criterion::Entropy,
                task: "regression"
            })
        );

        let mut fuzzification = FuzzificationOptions::new();
        fuzzification.fuzzy_regulation(-0.5);
        let mut options = entropy_options();
        options.fuzzification(fuzzification);
        assert_eq!(
            options.fit(false, &table).err(),
            Some(DecisionTreeError::Fuzzify(FuzzifyError::InvalidRegulation(-0.5)))
        );
        Ok(())
    }
}

//! Decision tree classifier and regressor whose split selection can be weighted
//! by fuzzy membership degrees.
//!
//! # Examples
//!
//! ```
//! use fuzzytree::{DecisionTreeClassifierOptions, FuzzificationOptions, TableBuilder};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut table_builder = TableBuilder::new();
//! table_builder.extend(
//!     &[[1.0], [1.0], [2.0], [5.0], [6.0], [7.0]],
//!     &[0.0, 0.0, 0.0, 1.0, 1.0, 1.0],
//! )?;
//! let table = table_builder.build()?;
//!
//! let mut fuzzification = FuzzificationOptions::new();
//! fuzzification.conv_k(2);
//! let classifier = DecisionTreeClassifierOptions::new()
//!     .fuzzification(fuzzification)
//!     .fit(&table)?;
//! assert_eq!(classifier.predict_one(&[6.5])?, 1.0);
//! # Ok(())
//! # }
//! ```
pub use self::criterion::{Criterion, CriterionError};
pub use self::decision_tree::{
    DecisionTree, DecisionTreeClassifier, DecisionTreeClassifierOptions, DecisionTreeError,
    DecisionTreeRegressor, DecisionTreeRegressorOptions, Leaf, Node, SplitRule,
};
pub use self::fuzzify::{
    extract_fuzzy_features, fuzzify, FuzzificationOptions, FuzzifyError, FuzzySets, FuzzyFeature,
    MembershipMatrix,
};
pub use self::table::{ColumnType, Table, TableBuilder, TableError};

pub mod criterion;
pub mod functions;
pub mod fuzzify;

mod decision_tree;
mod kmeans;
mod table;

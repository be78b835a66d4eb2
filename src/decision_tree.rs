pub use self::classifier::{DecisionTreeClassifier, DecisionTreeClassifierOptions};
pub use self::core::{DecisionTree, DecisionTreeError, Leaf, Node, SplitRule};
pub use self::regressor::{DecisionTreeRegressor, DecisionTreeRegressorOptions};

mod classifier;
mod core;
mod regressor;

//! Impurity and dispersion criteria.
//!
//! Every classification criterion has a crisp form (`dm = None`), where class
//! probabilities are relative counts, and a membership-weighted form, where each
//! row contributes its degree of membership instead of one.
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Classification criterion: labels plus optional per-row membership weights.
pub type ImpurityFn = fn(&[f64], Option<&[f64]>) -> f64;

/// Regression criterion: one column per output, one value per output.
pub type DispersionFn = fn(&[Vec<f64>]) -> Vec<f64>;

/// Split criteria selectable by name.
///
/// | name        | variant    |
/// |-------------|------------|
/// | `"entropy"` | `Entropy`  |
/// | `"gini"`    | `Gini`     |
/// | `"mse"`     | `Variance` |
/// | `"mae"`     | `StdDev`   |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Criterion {
    Entropy,
    Gini,
    Variance,
    StdDev,
}

impl Criterion {
    pub fn is_regression(self) -> bool {
        matches!(self, Self::Variance | Self::StdDev)
    }

    pub fn function(self) -> CriterionFn {
        match self {
            Self::Entropy => CriterionFn::Classification(entropy),
            Self::Gini => CriterionFn::Classification(gini),
            Self::Variance => CriterionFn::Regression(variance),
            Self::StdDev => CriterionFn::Regression(std_dev),
        }
    }
}

impl FromStr for Criterion {
    type Err = CriterionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "entropy" => Ok(Self::Entropy),
            "gini" => Ok(Self::Gini),
            "mse" => Ok(Self::Variance),
            "mae" => Ok(Self::StdDev),
            _ => Err(CriterionError::Unknown(s.to_owned())),
        }
    }
}

impl fmt::Display for Criterion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Entropy => "entropy",
            Self::Gini => "gini",
            Self::Variance => "mse",
            Self::StdDev => "mae",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, Clone, Copy)]
pub enum CriterionFn {
    Classification(ImpurityFn),
    Regression(DispersionFn),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CriterionError {
    #[error("unknown criterion {0:?} (expected one of \"entropy\", \"gini\", \"mse\", \"mae\")")]
    Unknown(String),
}

/// Membership mass of the two sides of a candidate split.
#[derive(Debug, Clone, Copy)]
pub struct MembershipSplit<'a> {
    /// Share of the feature's total membership mass held by the true subset.
    pub p_true: f64,
    /// Share of the feature's total membership mass held by the false subset.
    pub p_false: f64,
    /// Per-row membership mass of the true subset, aligned with its labels.
    pub true_dm: &'a [f64],
    /// Per-row membership mass of the false subset, aligned with its labels.
    pub false_dm: &'a [f64],
}

/// Probability of each distinct label, by count or by membership mass.
fn label_probabilities(ys: &[f64], dm: Option<&[f64]>) -> Vec<f64> {
    match dm {
        None => crate::functions::class_proportions(ys.iter().copied()),
        Some(dm) => {
            debug_assert_eq!(ys.len(), dm.len());
            let total = dm.iter().sum::<f64>();
            if total <= 0.0 {
                return Vec::new();
            }
            crate::functions::unique(ys.iter().copied())
                .into_iter()
                .map(|label| {
                    let mass = ys
                        .iter()
                        .zip(dm)
                        .filter(|(y, _)| **y == label)
                        .map(|(_, &w)| w)
                        .sum::<f64>();
                    mass / total
                })
                .collect()
        }
    }
}

pub fn entropy(ys: &[f64], dm: Option<&[f64]>) -> f64 {
    label_probabilities(ys, dm)
        .into_iter()
        .filter(|&p| p > 0.0)
        .map(|p| -p * p.log2())
        .sum()
}

pub fn gini(ys: &[f64], dm: Option<&[f64]>) -> f64 {
    label_probabilities(ys, dm)
        .into_iter()
        .map(|p| p * (1.0 - p))
        .sum()
}

/// Population variance of every output column.
pub fn variance(ys: &[Vec<f64>]) -> Vec<f64> {
    ys.iter()
        .map(|column| {
            if column.is_empty() {
                return 0.0;
            }
            let n = column.len() as f64;
            let m = crate::functions::mean(column.iter().copied());
            column.iter().map(|x| (x - m).powi(2)).sum::<f64>() / n
        })
        .collect()
}

pub fn std_dev(ys: &[Vec<f64>]) -> Vec<f64> {
    variance(ys).into_iter().map(f64::sqrt).collect()
}

/// `criterion(y) - p_true * criterion(y_true) - p_false * criterion(y_false)`.
///
/// Without `fuzzy` the weights are the subset sizes relative to `y`; with it they
/// are the membership shares, and the subsets are scored in weighted form.
pub fn impurity_gain(
    y: &[f64],
    y_true: &[f64],
    y_false: &[f64],
    criterion: ImpurityFn,
    fuzzy: Option<MembershipSplit>,
) -> f64 {
    split_impurity_gain(criterion(y, None), y_true, y_false, criterion, fuzzy)
}

/// [`impurity_gain`] with the impurity of the unsplit rows already known.
pub fn split_impurity_gain(
    impurity: f64,
    y_true: &[f64],
    y_false: &[f64],
    criterion: ImpurityFn,
    fuzzy: Option<MembershipSplit>,
) -> f64 {
    match fuzzy {
        Some(m) => {
            impurity
                - m.p_true * criterion(y_true, Some(m.true_dm))
                - m.p_false * criterion(y_false, Some(m.false_dm))
        }
        None => {
            let n = (y_true.len() + y_false.len()) as f64;
            let p_true = y_true.len() as f64 / n;
            let p_false = y_false.len() as f64 / n;
            impurity - p_true * criterion(y_true, None) - p_false * criterion(y_false, None)
        }
    }
}

/// [`impurity_gain`] normalised by the split information of `x_sub`, the values of
/// the candidate feature. Returns zero when `x_sub` carries no information.
pub fn impurity_gain_ratio(
    y: &[f64],
    y_true: &[f64],
    y_false: &[f64],
    x_sub: &[f64],
    criterion: ImpurityFn,
    fuzzy: Option<MembershipSplit>,
) -> f64 {
    gain_ratio(
        impurity_gain(y, y_true, y_false, criterion, fuzzy),
        criterion(x_sub, None),
    )
}

/// `gain / split_information`, or zero when the split information is not positive.
pub fn gain_ratio(gain: f64, split_information: f64) -> f64 {
    if split_information <= 0.0 {
        0.0
    } else {
        gain / split_information
    }
}

/// Variance reduction summed over all outputs.
///
/// With `fuzzy` only the subset weights change; the dispersion itself stays crisp.
pub fn variance_reduction(
    y: &[Vec<f64>],
    y_true: &[Vec<f64>],
    y_false: &[Vec<f64>],
    criterion: DispersionFn,
    fuzzy: Option<MembershipSplit>,
) -> f64 {
    split_variance_reduction(&criterion(y), y_true, y_false, criterion, fuzzy)
}

/// [`variance_reduction`] with the per-output dispersion of the unsplit rows already known.
pub fn split_variance_reduction(
    dispersion: &[f64],
    y_true: &[Vec<f64>],
    y_false: &[Vec<f64>],
    criterion: DispersionFn,
    fuzzy: Option<MembershipSplit>,
) -> f64 {
    let (p_true, p_false) = match fuzzy {
        Some(m) => (m.p_true, m.p_false),
        None => {
            let n_true = y_true.first().map_or(0, Vec::len) as f64;
            let n_false = y_false.first().map_or(0, Vec::len) as f64;
            let n = n_true + n_false;
            (n_true / n, n_false / n)
        }
    };

    dispersion
        .iter()
        .zip(criterion(y_true))
        .zip(criterion(y_false))
        .map(|((v, v_true), v_false)| v - (p_true * v_true + p_false * v_false))
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-12;

    #[test]
    fn crisp_criteria() {
        let ys = [0.0, 0.0, 1.0, 1.0];
        assert!((entropy(&ys, None) - 1.0).abs() < EPS);
        assert!((gini(&ys, None) - 0.5).abs() < EPS);
        assert_eq!(entropy(&[3.0, 3.0], None), 0.0);
        assert_eq!(gini(&[3.0, 3.0], None), 0.0);
    }

    #[test]
    fn one_hot_membership_matches_crisp_counts() {
        let ys = [0.0, 1.0, 1.0, 2.0, 1.0];
        // Each row fully belongs to one cluster, so its membership mass is one.
        let dm = [1.0; 5];
        assert!((entropy(&ys, Some(&dm)) - entropy(&ys, None)).abs() < EPS);
        assert!((gini(&ys, Some(&dm)) - gini(&ys, None)).abs() < EPS);
    }

    #[test]
    fn membership_weights_shift_probabilities() {
        let ys = [0.0, 1.0];
        let dm = [3.0, 1.0];
        assert!((gini(&ys, Some(&dm)) - 2.0 * 0.75 * 0.25).abs() < EPS);
        assert_eq!(gini(&ys, Some(&[0.0, 0.0])), 0.0);
    }

    #[test]
    fn multi_output_variance() {
        let ys = vec![vec![1.0, 3.0], vec![2.0, 2.0]];
        assert_eq!(variance(&ys), [1.0, 0.0]);
        assert_eq!(std_dev(&ys), [1.0, 0.0]);
    }

    #[test]
    fn gain_of_a_perfect_split() {
        let y = [0.0, 0.0, 1.0, 1.0];
        let gain = impurity_gain(&y, &y[..2], &y[2..], entropy, None);
        assert!((gain - 1.0).abs() < EPS);

        let fuzzy = MembershipSplit {
            p_true: 0.5,
            p_false: 0.5,
            true_dm: &[1.0, 1.0],
            false_dm: &[1.0, 1.0],
        };
        let fuzzy_gain = impurity_gain(&y, &y[..2], &y[2..], entropy, Some(fuzzy));
        assert!((fuzzy_gain - gain).abs() < EPS);

        let ratio = impurity_gain_ratio(&y, &y[..2], &y[2..], &[1.0, 1.0, 2.0, 2.0], entropy, None);
        assert!((ratio - 1.0).abs() < EPS);
        assert_eq!(impurity_gain_ratio(&y, &y[..2], &y[2..], &[1.0; 4], entropy, None), 0.0);
        assert_eq!(split_impurity_gain(entropy(&y, None), &y[..2], &y[2..], entropy, None), gain);
    }

    #[test]
    fn variance_reduction_sums_outputs() {
        let y = vec![vec![0.0, 0.0, 2.0, 2.0], vec![1.0, 1.0, 1.0, 1.0]];
        let y_true = vec![vec![0.0, 0.0], vec![1.0, 1.0]];
        let y_false = vec![vec![2.0, 2.0], vec![1.0, 1.0]];
        let reduction = variance_reduction(&y, &y_true, &y_false, variance, None);
        assert!((reduction - 1.0).abs() < EPS);

        let known = split_variance_reduction(&[1.0, 0.0], &y_true, &y_false, variance, None);
        assert_eq!(known, reduction);
    }

    #[test]
    fn criterion_registry() {
        assert_eq!("gini".parse::<Criterion>(), Ok(Criterion::Gini));
        assert_eq!("mae".parse::<Criterion>(), Ok(Criterion::StdDev));
        assert!(Criterion::Variance.is_regression());
        assert!(!Criterion::Entropy.is_regression());
        assert_eq!(Criterion::Variance.to_string(), "mse");
        assert_eq!(
            "log_loss".parse::<Criterion>(),
            Err(CriterionError::Unknown("log_loss".to_owned()))
        );
    }
}

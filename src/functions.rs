//! Statistics over target values shared by the criteria, leaves and evaluation code.
use crate::table::TableError;
use ordered_float::OrderedFloat;
use std::collections::BTreeMap;

/// Arithmetic mean.
///
/// # Panics
///
/// Panics if `xs` is empty.
pub fn mean(xs: impl Iterator<Item = f64>) -> f64 {
    let mut count = 0;
    let mut total = 0.0;
    for x in xs {
        count += 1;
        total += x;
    }
    assert_ne!(count, 0);
    total / count as f64
}

/// Sorted distinct values.
pub fn unique(xs: impl Iterator<Item = f64>) -> Vec<f64> {
    let mut values = xs.map(OrderedFloat).collect::<Vec<_>>();
    values.sort();
    values.dedup();
    values.into_iter().map(|x| x.0).collect()
}

fn histogram(xs: impl Iterator<Item = f64>) -> (BTreeMap<OrderedFloat<f64>, usize>, usize) {
    let mut histogram = BTreeMap::<_, usize>::new();
    let mut n = 0;
    for x in xs {
        *histogram.entry(OrderedFloat(x)).or_default() += 1;
        n += 1;
    }
    (histogram, n)
}

/// The most frequent label. Ties go to the smallest label.
pub fn majority_class(xs: impl Iterator<Item = f64>) -> Option<f64> {
    let (histogram, _) = histogram(xs);
    let mut best: Option<(f64, usize)> = None;
    for (label, count) in histogram {
        if best.map_or(true, |(_, c)| count > c) {
            best = Some((label.0, count));
        }
    }
    best.map(|(label, _)| label)
}

/// Relative frequency of every distinct label, in ascending label order.
pub fn class_proportions(xs: impl Iterator<Item = f64>) -> Vec<f64> {
    let (histogram, n) = histogram(xs);
    histogram
        .into_iter()
        .map(|(_, count)| count as f64 / n as f64)
        .collect()
}

/// Relative frequency of each of `classes` (sorted) in `xs`; missing classes get zero.
pub fn class_distribution(xs: impl Iterator<Item = f64>, classes: &[f64]) -> Vec<f64> {
    let (histogram, n) = histogram(xs);
    classes
        .iter()
        .map(|&c| {
            let count = histogram.get(&OrderedFloat(c)).copied().unwrap_or(0);
            if n == 0 {
                0.0
            } else {
                count as f64 / n as f64
            }
        })
        .collect()
}

/// One-hot encodes labels `0, 1, ..., n_columns - 1`.
///
/// `n_columns` defaults to the largest label plus one.
pub fn one_hot_encode(labels: &[f64], n_columns: Option<usize>) -> Result<Vec<Vec<f64>>, TableError> {
    let mut indices = Vec::with_capacity(labels.len());
    for &label in labels {
        if !(label >= 0.0 && label.fract() == 0.0 && label.is_finite()) {
            return Err(TableError::InvalidLabel(label));
        }
        indices.push(label as usize);
    }

    let n_columns = match n_columns {
        Some(n_columns) => n_columns,
        None => match indices.iter().zip(labels).max_by_key(|pair| *pair.0) {
            Some((&i, &label)) => i.checked_add(1).ok_or(TableError::InvalidLabel(label))?,
            None => 0,
        },
    };
    indices
        .into_iter()
        .zip(labels)
        .map(|(i, &label)| {
            if i >= n_columns {
                return Err(TableError::InvalidLabel(label));
            }
            let mut row = vec![0.0; n_columns];
            row[i] = 1.0;
            Ok(row)
        })
        .collect()
}

/// Inverse of [`one_hot_encode`]: the index of the largest entry of each row.
pub fn to_nominal<T: AsRef<[f64]>>(rows: &[T]) -> Vec<f64> {
    rows.iter()
        .map(|row| {
            let row = row.as_ref();
            let mut best = 0;
            for (i, &x) in row.iter().enumerate() {
                if x > row[best] {
                    best = i;
                }
            }
            best as f64
        })
        .collect()
}

fn check_predictions(y_true: &[f64], y_pred: &[f64]) -> Result<(), TableError> {
    if y_true.len() != y_pred.len() {
        return Err(TableError::PredictionCountMismatch {
            expected: y_true.len(),
            predicted: y_pred.len(),
        });
    }
    if y_true.is_empty() {
        return Err(TableError::EmptyTable);
    }
    Ok(())
}

/// Share of exactly matching predictions.
pub fn accuracy(y_true: &[f64], y_pred: &[f64]) -> Result<f64, TableError> {
    check_predictions(y_true, y_pred)?;
    let hits = y_true.iter().zip(y_pred).filter(|(a, b)| a == b).count();
    Ok(hits as f64 / y_true.len() as f64)
}

pub fn mse(y_true: &[f64], y_pred: &[f64]) -> Result<f64, TableError> {
    check_predictions(y_true, y_pred)?;
    Ok(mean(y_true.iter().zip(y_pred).map(|(a, b)| (a - b).powi(2))))
}

pub fn mae(y_true: &[f64], y_pred: &[f64]) -> Result<f64, TableError> {
    check_predictions(y_true, y_pred)?;
    Ok(mean(y_true.iter().zip(y_pred).map(|(a, b)| (a - b).abs())))
}

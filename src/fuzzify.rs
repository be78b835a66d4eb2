//! Feature fuzzification.
//!
//! A numeric column is clustered into `conv_k` groups and every value is turned into
//! `conv_k` degrees of membership, one per cluster, decaying linearly with the
//! distance to the cluster centroid. The distance at which a membership reaches
//! zero is the cluster's theta: the distance to its nearest neighbouring centroid.
use crate::kmeans::KMeans;
use log::warn;
use thiserror::Error;

/// Pairwise centroid distance used in place of zero when looking for theta.
const THETA_SENTINEL: f64 = 9999.0;

/// Fuzzification settings.
#[derive(Debug, Clone, PartialEq)]
pub struct FuzzificationOptions {
    conv_k: usize,
    fuzzy_regulation: f64,
    seed: u64,
}

impl FuzzificationOptions {
    /// Makes a `FuzzificationOptions` instance with the default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the number of clusters (and membership columns) per feature.
    ///
    /// The default value is `3`.
    pub fn conv_k(&mut self, conv_k: usize) -> &mut Self {
        self.conv_k = conv_k;
        self
    }

    /// Sets the fuzzy regulation coefficient in `[0, 1]`.
    ///
    /// `0` and `1` give plain linear decay. Any other value `r` scales the
    /// normalised distance by `ln(r) - ln(1 - r)`.
    ///
    /// The default value is `0`.
    pub fn fuzzy_regulation(&mut self, fuzzy_regulation: f64) -> &mut Self {
        self.fuzzy_regulation = fuzzy_regulation;
        self
    }

    /// Sets the clustering seed.
    ///
    /// The default value is `0`.
    pub fn seed(&mut self, seed: u64) -> &mut Self {
        self.seed = seed;
        self
    }

    pub fn get_conv_k(&self) -> usize {
        self.conv_k
    }

    pub fn get_fuzzy_regulation(&self) -> f64 {
        self.fuzzy_regulation
    }

    pub fn get_seed(&self) -> u64 {
        self.seed
    }

    pub fn validate(&self) -> Result<(), FuzzifyError> {
        if self.conv_k < 1 {
            return Err(FuzzifyError::InvalidClusterCount);
        }
        if !(0.0..=1.0).contains(&self.fuzzy_regulation) {
            return Err(FuzzifyError::InvalidRegulation(self.fuzzy_regulation));
        }
        Ok(())
    }
}

impl Default for FuzzificationOptions {
    fn default() -> Self {
        Self {
            conv_k: 3,
            fuzzy_regulation: 0.0,
            seed: 0,
        }
    }
}

/// Dense row-major `(n_samples, n_columns)` matrix of membership degrees.
#[derive(Debug, Clone, PartialEq)]
pub struct MembershipMatrix {
    rows_len: usize,
    columns_len: usize,
    values: Vec<f64>,
}

impl MembershipMatrix {
    fn zeros(rows_len: usize, columns_len: usize) -> Self {
        Self {
            rows_len,
            columns_len,
            values: vec![0.0; rows_len * columns_len],
        }
    }

    pub fn rows_len(&self) -> usize {
        self.rows_len
    }

    pub fn columns_len(&self) -> usize {
        self.columns_len
    }

    pub fn get(&self, row: usize, column: usize) -> f64 {
        self.values[row * self.columns_len + column]
    }

    pub fn row(&self, row: usize) -> &[f64] {
        &self.values[row * self.columns_len..(row + 1) * self.columns_len]
    }

    pub fn column<'a>(&'a self, column: usize) -> impl 'a + Iterator<Item = f64> {
        (0..self.rows_len).map(move |row| self.get(row, column))
    }

    /// Total membership of one row across all columns.
    pub fn row_mass(&self, row: usize) -> f64 {
        self.row(row).iter().sum()
    }

    /// Concatenates matrices with the same number of rows column-wise, in order.
    pub fn hstack(matrices: &[MembershipMatrix]) -> Self {
        let rows_len = matrices.first().map_or(0, |m| m.rows_len);
        let columns_len = matrices.iter().map(|m| m.columns_len).sum();
        let mut values = Vec::with_capacity(rows_len * columns_len);
        for row in 0..rows_len {
            for m in matrices {
                debug_assert_eq!(m.rows_len, rows_len);
                values.extend_from_slice(m.row(row));
            }
        }
        Self {
            rows_len,
            columns_len,
            values,
        }
    }
}

/// The fitted fuzzification of one feature.
///
/// Keeping it around lets unseen values be fuzzified against the training centroids
/// instead of re-clustering.
#[derive(Debug, Clone, PartialEq)]
pub struct FuzzyFeature {
    centroids: Vec<f64>,
    thetas: Vec<f64>,
    fuzzy_regulation: f64,
}

impl FuzzyFeature {
    fn new(centroids: Vec<f64>, fuzzy_regulation: f64) -> Self {
        let thetas = centroids
            .iter()
            .map(|&a| {
                centroids
                    .iter()
                    .map(|&b| {
                        let d = (a - b).abs();
                        if d == 0.0 {
                            THETA_SENTINEL
                        } else {
                            d
                        }
                    })
                    .fold(f64::INFINITY, f64::min)
            })
            .collect();
        Self {
            centroids,
            thetas,
            fuzzy_regulation,
        }
    }

    /// Cluster centroids in ascending order.
    pub fn centroids(&self) -> &[f64] {
        &self.centroids
    }

    pub fn thetas(&self) -> &[f64] {
        &self.thetas
    }

    pub fn clusters_len(&self) -> usize {
        self.centroids.len()
    }

    /// Degrees of membership of `x` to each cluster, floored at zero.
    ///
    /// There is no ceiling: with a regulation coefficient below `0.5` the scale
    /// factor is negative and far-away values get memberships above one.
    pub fn membership(&self, x: f64) -> Vec<f64> {
        let r = self.fuzzy_regulation;
        let plain = r == 0.0 || r == 1.0;
        let scale = r.ln() - (1.0 - r).ln();
        self.centroids
            .iter()
            .zip(&self.thetas)
            .map(|(&c, &theta)| {
                let distance = (x - c).abs() / theta;
                let m = if plain {
                    1.0 - distance
                } else {
                    1.0 - distance * scale
                };
                if m < 0.0 {
                    0.0
                } else {
                    m
                }
            })
            .collect()
    }

    /// Fuzzifies a column against the fitted centroids.
    pub fn transform(&self, column: &[f64]) -> MembershipMatrix {
        let mut matrix = MembershipMatrix::zeros(column.len(), self.clusters_len());
        for (row, &x) in column.iter().enumerate() {
            let start = row * matrix.columns_len;
            matrix.values[start..start + matrix.columns_len].copy_from_slice(&self.membership(x));
        }
        matrix
    }
}

/// Clusters `column` into `conv_k` groups and returns its membership matrix along
/// with the fitted centroids and thetas.
pub fn fuzzify(
    column: &[f64],
    conv_k: usize,
    fuzzy_regulation: f64,
    seed: u64,
) -> Result<(MembershipMatrix, FuzzyFeature), FuzzifyError> {
    let mut options = FuzzificationOptions::new();
    options
        .conv_k(conv_k)
        .fuzzy_regulation(fuzzy_regulation)
        .seed(seed);
    options.validate()?;

    if column.is_empty() {
        return Err(FuzzifyError::EmptyColumn);
    }
    if column.iter().any(|x| !x.is_finite()) {
        return Err(FuzzifyError::NonFiniteValue);
    }
    if column.len() < conv_k {
        return Err(FuzzifyError::TooFewSamples {
            samples: column.len(),
            clusters: conv_k,
        });
    }

    let distinct = crate::functions::unique(column.iter().copied()).len();
    if distinct < conv_k {
        warn!(
            "column has {} distinct values but {} clusters were requested; some centroids coincide",
            distinct, conv_k
        );
    }

    let centroids = KMeans::new(conv_k, seed).fit(column);
    let feature = FuzzyFeature::new(centroids, fuzzy_regulation);
    let matrix = feature.transform(column);
    if matrix.values.iter().any(|&m| m > 1.0) {
        warn!(
            "fuzzy regulation {} produced memberships above 1; they are not capped",
            fuzzy_regulation
        );
    }
    Ok((matrix, feature))
}

/// The fitted fuzzification of every raw feature, in feature order.
#[derive(Debug, Clone, PartialEq)]
pub struct FuzzySets {
    features: Vec<FuzzyFeature>,
}

impl FuzzySets {
    /// Fuzzifies each column independently and concatenates the membership matrices.
    pub fn fit<I>(
        columns: I,
        options: &FuzzificationOptions,
    ) -> Result<(MembershipMatrix, Self), FuzzifyError>
    where
        I: IntoIterator,
        I::Item: AsRef<[f64]>,
    {
        options.validate()?;
        let mut matrices = Vec::new();
        let mut features = Vec::new();
        for (i, column) in columns.into_iter().enumerate() {
            let (matrix, feature) = fuzzify(
                column.as_ref(),
                options.conv_k,
                options.fuzzy_regulation,
                options.seed,
            )
            .map_err(|source| FuzzifyError::Feature {
                feature: i,
                source: Box::new(source),
            })?;
            matrices.push(matrix);
            features.push(feature);
        }
        Ok((MembershipMatrix::hstack(&matrices), Self { features }))
    }

    pub fn features(&self) -> &[FuzzyFeature] {
        &self.features
    }

    /// Number of membership columns per raw feature.
    pub fn conv_k(&self) -> usize {
        self.features.first().map_or(0, FuzzyFeature::clusters_len)
    }

    /// Membership values of one raw row, feature after feature.
    pub fn transform_row(&self, row: &[f64]) -> Result<Vec<f64>, FuzzifyError> {
        if row.len() != self.features.len() {
            return Err(FuzzifyError::FeatureCountMismatch {
                expected: self.features.len(),
                found: row.len(),
            });
        }
        Ok(self
            .features
            .iter()
            .zip(row)
            .flat_map(|(feature, &x)| feature.membership(x))
            .collect())
    }

    /// The raw row followed by its membership values.
    pub fn augment_row(&self, row: &[f64]) -> Result<Vec<f64>, FuzzifyError> {
        let mut augmented = row.to_vec();
        augmented.extend(self.transform_row(row)?);
        Ok(augmented)
    }
}

/// Fuzzifies every column of the row-major matrix `xs`.
///
/// Column `i * conv_k + j` of the result is the membership of feature `i` in its
/// `j`-th cluster.
pub fn extract_fuzzy_features<T: AsRef<[f64]>>(
    xs: &[T],
    options: &FuzzificationOptions,
) -> Result<(MembershipMatrix, FuzzySets), FuzzifyError> {
    let features_len = xs.first().map_or(0, |row| row.as_ref().len());
    let columns = (0..features_len)
        .map(|i| xs.iter().map(|row| row.as_ref()[i]).collect::<Vec<_>>());
    FuzzySets::fit(columns, options)
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum FuzzifyError {
    #[error("the number of clusters must be at least 1")]
    InvalidClusterCount,

    #[error("fuzzy regulation must lie in [0, 1], got {0}")]
    InvalidRegulation(f64),

    #[error("cannot fuzzify an empty column")]
    EmptyColumn,

    #[error("column contains non finite numbers")]
    NonFiniteValue,

    #[error("{clusters} clusters requested for only {samples} samples")]
    TooFewSamples { samples: usize, clusters: usize },

    #[error("expected {expected} feature values, got {found}")]
    FeatureCountMismatch { expected: usize, found: usize },

    #[error("cannot fuzzify feature {feature}: {source}")]
    Feature {
        feature: usize,
        source: Box<FuzzifyError>,
    },
}

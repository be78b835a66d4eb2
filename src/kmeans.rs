//! Seeded k-means over one-dimensional points.
use ordered_float::OrderedFloat;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

#[derive(Debug, Clone)]
pub(crate) struct KMeans {
    k: usize,
    seed: u64,
    n_init: usize,
    max_iter: usize,
    tol: f64,
}

impl KMeans {
    pub(crate) fn new(k: usize, seed: u64) -> Self {
        Self {
            k,
            seed,
            n_init: 10,
            max_iter: 300,
            tol: 1e-4,
        }
    }

    /// Returns `k` centroids in ascending order.
    ///
    /// Runs `n_init` k-means++ initialisations and keeps the run with the lowest
    /// inertia. Requires `1 <= k <= xs.len()`.
    pub(crate) fn fit(&self, xs: &[f64]) -> Vec<f64> {
        debug_assert!(self.k >= 1 && self.k <= xs.len());

        let mut rng = StdRng::seed_from_u64(self.seed);
        let tol = self.tol * crate::criterion::variance(&[xs.to_vec()])[0];

        let mut best: Option<(f64, Vec<f64>)> = None;
        for _ in 0..self.n_init {
            let centroids = self.init_centroids(xs, &mut rng);
            let (inertia, centroids) = self.lloyd(xs, centroids, tol);
            if best.as_ref().map_or(true, |(b, _)| inertia < *b) {
                best = Some((inertia, centroids));
            }
        }

        let mut centroids = best.map(|(_, c)| c).unwrap_or_default();
        centroids.sort_by_key(|&c| OrderedFloat(c));
        centroids
    }

    fn init_centroids<R: Rng + ?Sized>(&self, xs: &[f64], rng: &mut R) -> Vec<f64> {
        let n = xs.len();
        let mut centroids = Vec::with_capacity(self.k);
        centroids.push(xs[rng.gen_range(0, n)]);

        while centroids.len() < self.k {
            let distances = xs
                .iter()
                .map(|&x| nearest(&centroids, x).1)
                .collect::<Vec<_>>();
            let total = distances.iter().sum::<f64>();
            if total <= 0.0 {
                centroids.push(xs[rng.gen_range(0, n)]);
                continue;
            }

            let threshold = rng.gen::<f64>() * total;
            let mut cumsum = 0.0;
            let mut selected = n - 1;
            for (i, &d) in distances.iter().enumerate() {
                cumsum += d;
                if d > 0.0 && cumsum >= threshold {
                    selected = i;
                    break;
                }
            }
            centroids.push(xs[selected]);
        }

        centroids
    }

    fn lloyd(&self, xs: &[f64], mut centroids: Vec<f64>, tol: f64) -> (f64, Vec<f64>) {
        for _ in 0..self.max_iter {
            let mut sums = vec![0.0; self.k];
            let mut counts = vec![0usize; self.k];
            for &x in xs {
                let (j, _) = nearest(&centroids, x);
                sums[j] += x;
                counts[j] += 1;
            }

            let mut shift = 0.0;
            for (j, centroid) in centroids.iter_mut().enumerate() {
                // Empty clusters keep their previous position.
                if counts[j] > 0 {
                    let updated = sums[j] / counts[j] as f64;
                    shift += (updated - *centroid).powi(2);
                    *centroid = updated;
                }
            }
            if shift <= tol {
                break;
            }
        }

        let inertia = xs.iter().map(|&x| nearest(&centroids, x).1).sum();
        (inertia, centroids)
    }
}

/// Index of and squared distance to the closest centroid.
fn nearest(centroids: &[f64], x: f64) -> (usize, f64) {
    let mut best = (0, f64::INFINITY);
    for (j, &c) in centroids.iter().enumerate() {
        let d = (x - c).powi(2);
        if d < best.1 {
            best = (j, d);
        }
    }
    best
}

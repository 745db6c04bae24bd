use rand::{Rng, SeedableRng, rngs::StdRng};
use rand_distr::{Distribution, Uniform};

use super::Kernel;
use crate::{
    aggregate,
    collective::{COORDINATOR, Collective},
    error::{Result, SpmdErr},
    partition::Partition,
};

/// A dense row-major matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct Matrix {
    rows: usize,
    cols: usize,
    data: Vec<f64>,
}

impl Matrix {
    /// Creates a new `Matrix` from its row-major elements.
    ///
    /// # Errors
    /// `LengthMismatch` if `data` doesn't hold `rows * cols` elements.
    pub fn from_vec(rows: usize, cols: usize, data: Vec<f64>) -> Result<Self> {
        if data.len() != rows * cols {
            return Err(SpmdErr::LengthMismatch {
                op: "matrix",
                got: data.len(),
                expected: rows * cols,
            });
        }

        Ok(Self { rows, cols, data })
    }

    pub fn identity(n: usize) -> Self {
        let mut data = vec![0.0; n * n];
        data.iter_mut().step_by(n + 1).for_each(|x| *x = 1.0);
        Self {
            rows: n,
            cols: n,
            data,
        }
    }

    /// A square matrix of elements drawn uniformly from `[0, 10)`.
    pub fn random<R: Rng>(n: usize, rng: &mut R) -> Self {
        // SAFETY: the range is finite and non empty.
        let dist = Uniform::new(0.0, 10.0).unwrap();
        let data = dist.sample_iter(rng).take(n * n).collect();
        Self {
            rows: n,
            cols: n,
            data,
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.data[row * self.cols + col]
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }
}

/// Multiplies a block of rows of `A` by the square matrix `B`.
///
/// Every element is accumulated over `k` in increasing order, so a row of the product
/// is the same whichever worker computes it.
///
/// # Args
/// * `a_rows` - Whole rows of `A`, row-major.
/// * `b` - `B`, row-major `dim x dim`.
/// * `dim` - The side of `B`.
pub fn multiply_rows(a_rows: &[f64], b: &[f64], dim: usize) -> Vec<f64> {
    let mut c = vec![0.0; a_rows.len()];
    if dim == 0 {
        return c;
    }

    for (a_row, c_row) in a_rows.chunks_exact(dim).zip(c.chunks_exact_mut(dim)) {
        for (a_ik, b_row) in a_row.iter().zip(b.chunks_exact(dim)) {
            for (c_ij, b_kj) in c_row.iter_mut().zip(b_row) {
                *c_ij += a_ik * b_kj;
            }
        }
    }

    c
}

#[derive(Debug, Clone)]
enum Operands {
    Random { seed: Option<u64> },
    Given { a: Matrix, b: Matrix },
}

/// Computes `C = A x B` for square matrices, scattering rows of `A` and broadcasting `B`.
#[derive(Debug, Clone)]
pub struct MatMulKernel {
    dim: usize,
    operands: Operands,
}

/// The operands, held by the coordinator for the whole run.
#[derive(Debug, Clone)]
pub struct MatMulInputs {
    pub a: Matrix,
    pub b: Matrix,
}

/// What a worker multiplies.
#[derive(Debug)]
pub struct LocalBlock {
    a_rows: Vec<f64>,
    b: Vec<f64>,
}

/// The coordinator's answer to a matrix multiplication.
#[derive(Debug, Clone)]
pub struct MatMulOutcome {
    pub a: Matrix,
    pub b: Matrix,
    pub c: Matrix,
    /// `C[0][0]` recomputed at the coordinator from `A` and `B`.
    pub expected_c00: f64,
}

impl MatMulOutcome {
    pub fn is_verified(&self) -> bool {
        self.c.rows() == 0 || self.c.get(0, 0) == self.expected_c00
    }

    /// Multiply-adds performed, `N^3`.
    pub fn operations(&self) -> f64 {
        (self.c.rows() as f64).powi(3)
    }
}

impl MatMulKernel {
    /// Creates a kernel multiplying two random `dim x dim` matrices.
    ///
    /// # Args
    /// * `dim` - The side of both operands.
    /// * `seed` - `A` is drawn with `seed + 1` and `B` with `seed + 2`, from the OS when `None`.
    pub fn new(dim: usize, seed: Option<u64>) -> Self {
        Self {
            dim,
            operands: Operands::Random { seed },
        }
    }

    /// Creates a kernel multiplying the given operands.
    ///
    /// # Errors
    /// `InvalidConfig` unless both are square and of the same side.
    pub fn with_operands(a: Matrix, b: Matrix) -> Result<Self> {
        let dim = a.rows();
        if a.cols() != dim || b.rows() != dim || b.cols() != dim {
            return Err(SpmdErr::InvalidConfig(format!(
                "operands must be square and of the same side, got {}x{} and {}x{}",
                a.rows(),
                a.cols(),
                b.rows(),
                b.cols()
            )));
        }

        Ok(Self {
            dim,
            operands: Operands::Given { a, b },
        })
    }

    /// Rows each worker owns, the last workers may get zero padded rows.
    pub fn rows_per_worker(&self, worker_count: usize) -> usize {
        self.dim.div_ceil(worker_count)
    }
}

impl Kernel for MatMulKernel {
    type Global = MatMulInputs;
    type Local = LocalBlock;
    type Estimate = Vec<f64>;
    type Collected = Vec<f64>;
    type Outcome = MatMulOutcome;

    fn validate(&self, worker_count: usize) -> Result<()> {
        if self.dim == 0 {
            return Err(SpmdErr::InvalidConfig("matrix dimension must be positive".into()));
        }

        self.rows_per_worker(worker_count)
            .checked_mul(worker_count)
            .and_then(|rows| rows.checked_mul(self.dim))
            .ok_or_else(|| {
                SpmdErr::InvalidConfig(format!("a {0}x{0} matrix is too large", self.dim))
            })?;

        // B is broadcast whole, in one frame behind the payload header.
        let frame_len = self
            .dim
            .checked_mul(self.dim)
            .and_then(|len| len.checked_mul(size_of::<f64>()))
            .and_then(|len| len.checked_add(size_of::<u64>()));

        if frame_len.is_none_or(|len| len > comms::MAX_FRAME_LEN) {
            return Err(SpmdErr::InvalidConfig(format!(
                "a {0}x{0} matrix doesn't fit in a {1} byte frame",
                self.dim,
                comms::MAX_FRAME_LEN
            )));
        }

        Ok(())
    }

    fn total_work(&self, worker_count: usize) -> u64 {
        (self.rows_per_worker(worker_count) * worker_count) as u64
    }

    fn prepare(&self) -> Result<MatMulInputs> {
        match &self.operands {
            Operands::Given { a, b } => Ok(MatMulInputs {
                a: a.clone(),
                b: b.clone(),
            }),
            Operands::Random { seed } => {
                let seed = seed.unwrap_or_else(|| rand::rng().random());
                let a = Matrix::random(self.dim, &mut StdRng::seed_from_u64(seed.wrapping_add(1)));
                let b = Matrix::random(self.dim, &mut StdRng::seed_from_u64(seed.wrapping_add(2)));
                Ok(MatMulInputs { a, b })
            }
        }
    }

    async fn distribute<C>(
        &self,
        group: &mut C,
        partition: &Partition,
        global: Option<&MatMulInputs>,
    ) -> Result<LocalBlock>
    where
        C: Collective + Send,
    {
        let dim = self.dim;
        let chunk = partition.len as usize * dim;

        // pad `A` with zero rows so every worker gets the same amount of rows
        let padded = global.map(|inputs| {
            let mut a = inputs.a.as_slice().to_vec();
            a.resize(chunk * group.worker_count(), 0.0);
            a
        });
        let a_rows = group.scatter(padded.as_deref(), chunk).await?;

        let mut b = match global {
            Some(inputs) => inputs.b.as_slice().to_vec(),
            None => vec![0.0; dim * dim],
        };
        group.broadcast(&mut b, COORDINATOR).await?;

        Ok(LocalBlock { a_rows, b })
    }

    fn compute(&self, _partition: &Partition, local: LocalBlock) -> Result<Vec<f64>> {
        Ok(multiply_rows(&local.a_rows, &local.b, self.dim))
    }

    fn describe(&self, partition: &Partition, _estimate: &Vec<f64>) -> String {
        let start = (partition.start as usize).min(self.dim);
        let end = (partition.end() as usize).min(self.dim);

        if start == end {
            return format!("worker {}: only padding rows", partition.owner_id);
        }

        format!(
            "worker {}: computed rows {} to {} of C",
            partition.owner_id,
            start,
            end - 1
        )
    }

    async fn collect<C>(
        &self,
        group: &mut C,
        estimate: Vec<f64>,
    ) -> Result<Option<Vec<f64>>>
    where
        C: Collective + Send,
    {
        aggregate::gather_blocks(group, &estimate).await
    }

    fn finalize(
        &self,
        inputs: MatMulInputs,
        mut c: Vec<f64>,
        _worker_count: usize,
    ) -> Result<MatMulOutcome> {
        let dim = self.dim;
        c.truncate(dim * dim);
        let c = Matrix::from_vec(dim, dim, c)?;

        let a = inputs.a.as_slice();
        let b = inputs.b.as_slice();
        let expected_c00 = (0..dim).fold(0.0, |acc, k| acc + a[k] * b[k * dim]);

        Ok(MatMulOutcome {
            a: inputs.a,
            b: inputs.b,
            c,
            expected_c00,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_times_b_is_b() {
        let b = Matrix::random(5, &mut StdRng::seed_from_u64(3));
        let c = multiply_rows(Matrix::identity(5).as_slice(), b.as_slice(), 5);
        assert_eq!(c, b.as_slice());
    }

    #[test]
    fn small_product_by_hand() {
        let a = [1.0, 2.0, 3.0, 4.0];
        let b = [5.0, 6.0, 7.0, 8.0];
        assert_eq!(multiply_rows(&a, &b, 2), vec![19.0, 22.0, 43.0, 50.0]);
    }

    #[test]
    fn a_single_row_block_matches_the_full_product() {
        let mut rng = StdRng::seed_from_u64(11);
        let a = Matrix::random(4, &mut rng);
        let b = Matrix::random(4, &mut rng);

        let full = multiply_rows(a.as_slice(), b.as_slice(), 4);
        let row2 = multiply_rows(&a.as_slice()[8..12], b.as_slice(), 4);
        assert_eq!(&full[8..12], row2.as_slice());
    }

    #[test]
    fn uneven_rows_are_padded() {
        let kernel = MatMulKernel::new(10, Some(1));
        assert_eq!(kernel.rows_per_worker(4), 3);
        assert_eq!(kernel.total_work(4), 12);
        assert_eq!(kernel.total_work(5), 10);
    }

    #[test]
    fn random_operands_depend_only_on_the_seed() {
        let first = MatMulKernel::new(6, Some(9)).prepare().unwrap();
        let second = MatMulKernel::new(6, Some(9)).prepare().unwrap();
        assert_eq!(first.a, second.a);
        assert_eq!(first.b, second.b);
        assert_ne!(first.a, first.b);
        assert!(first.a.as_slice().iter().all(|x| (0.0..10.0).contains(x)));
    }

    #[test]
    fn non_square_operands_are_rejected() {
        let a = Matrix::from_vec(2, 3, vec![0.0; 6]).unwrap();
        let b = Matrix::identity(2);
        assert!(MatMulKernel::with_operands(a, b).is_err());
    }

    #[test]
    fn empty_matrix_is_rejected() {
        assert!(MatMulKernel::new(0, None).validate(2).is_err());
    }

    #[test]
    fn matrices_past_the_frame_limit_are_rejected_up_front() {
        let err = MatMulKernel::new(20_000, None).validate(4).unwrap_err();
        assert!(matches!(err, SpmdErr::InvalidConfig(_)), "{err}");

        assert!(MatMulKernel::new(16_000, None).validate(4).is_ok());
    }
}

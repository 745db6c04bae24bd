//! The coordinator's human readable report.

use std::fmt::{self, Display};

use crate::{
    kernel::{HelloOutcome, MatMulOutcome, Matrix, PiOutcome, SumOutcome},
    run::Finished,
};

/// The only corner of a matrix that gets printed.
const SAMPLE: usize = 5;

/// The final answer of a run, one variant per task.
#[derive(Debug, Clone)]
pub enum Report {
    Hello(Finished<HelloOutcome>),
    Sum(Finished<SumOutcome>),
    MatMul(Finished<MatMulOutcome>),
    MonteCarlo(Finished<PiOutcome>),
}

impl Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Report::Hello(run) => write_hello(f, run),
            Report::Sum(run) => write_sum(f, run),
            Report::MatMul(run) => write_mat_mul(f, run),
            Report::MonteCarlo(run) => write_pi(f, run),
        }
    }
}

fn write_hello(f: &mut fmt::Formatter<'_>, run: &Finished<HelloOutcome>) -> fmt::Result {
    let outcome = &run.outcome;
    writeln!(f, "\n=== RESULTS ===")?;
    writeln!(f, "Greeting broadcast: {:?}", outcome.greeting)?;
    writeln!(f, "Workers reporting:  {:?}", outcome.roster)?;
    write!(f, "Number of workers:  {}", run.worker_count)
}

fn write_sum(f: &mut fmt::Formatter<'_>, run: &Finished<SumOutcome>) -> fmt::Result {
    let outcome = &run.outcome;
    writeln!(f, "\n=== RESULTS ===")?;
    writeln!(f, "Parallel sum of numbers 1 to {} = {}", outcome.n, outcome.sum)?;
    writeln!(f, "Expected sum (formula n*(n+1)/2) = {}", outcome.expected)?;
    writeln!(f, "Match: {}", if outcome.is_exact() { "yes" } else { "NO" })?;
    writeln!(f, "Number of workers used: {}", run.worker_count)?;
    write!(f, "Execution time: {:.6} seconds", run.elapsed.as_secs_f64())
}

fn write_matrix(f: &mut fmt::Formatter<'_>, name: &str, m: &Matrix) -> fmt::Result {
    writeln!(f, "\n{name}:")?;

    for i in 0..m.rows().min(SAMPLE) {
        for j in 0..m.cols().min(SAMPLE) {
            write!(f, "{:6.2} ", m.get(i, j))?;
        }

        if m.cols() > SAMPLE {
            write!(f, "...")?;
        }
        writeln!(f)?;
    }

    if m.rows() > SAMPLE {
        writeln!(f, "...")?;
    }

    Ok(())
}

fn write_mat_mul(f: &mut fmt::Formatter<'_>, run: &Finished<MatMulOutcome>) -> fmt::Result {
    let outcome = &run.outcome;
    let dim = outcome.c.rows();
    let secs = run.elapsed.as_secs_f64();

    writeln!(f, "Matrix size: {dim}x{dim}")?;
    writeln!(f, "Number of workers: {}", run.worker_count)?;
    write_matrix(f, "Matrix A (sample)", &outcome.a)?;
    write_matrix(f, "Matrix B (sample)", &outcome.b)?;

    writeln!(f, "\n=== RESULTS ===")?;
    write_matrix(f, "Result Matrix C = A x B (sample)", &outcome.c)?;

    writeln!(f, "\n=== PERFORMANCE ===")?;
    writeln!(f, "Execution time: {secs:.4} seconds")?;
    writeln!(f, "Operations: {:.0} (multiply-adds)", outcome.operations())?;
    writeln!(f, "GFLOPS: {:.2}", 2.0 * outcome.operations() / (secs * 1e9))?;
    write!(
        f,
        "Verification: C[0][0] = {:.6} (computed: {:.6}) {}",
        outcome.c.get(0, 0),
        outcome.expected_c00,
        if outcome.is_verified() { "ok" } else { "MISMATCH" }
    )
}

fn write_pi(f: &mut fmt::Formatter<'_>, run: &Finished<PiOutcome>) -> fmt::Result {
    let outcome = &run.outcome;
    let stats = &outcome.stats;
    let secs = run.elapsed.as_secs_f64();
    let pi = std::f64::consts::PI;

    writeln!(f, "Total samples: {}", outcome.samples)?;
    writeln!(f, "Number of workers: {}", run.worker_count)?;
    writeln!(f, "Base seed: {}", outcome.seed)?;

    writeln!(f, "\n=== RESULTS ===")?;
    writeln!(f, "Parallel π estimate: {:.10}", stats.mean)?;
    writeln!(f, "Actual π value:      {pi:.10}")?;
    writeln!(f, "Absolute error:      {:.10}", outcome.abs_error())?;
    writeln!(f, "Relative error:      {:.6}%", outcome.rel_error() * 100.0)?;

    writeln!(f, "\n=== STATISTICS ===")?;
    writeln!(f, "Mean across workers:       {:.8}", stats.mean)?;
    writeln!(f, "Variance across workers:   {:.8}", stats.variance)?;
    writeln!(f, "Standard deviation:        {:.8}", stats.std_dev)?;
    writeln!(
        f,
        "Coefficient of variation:  {:.4}%",
        stats.coefficient_of_variation() * 100.0
    )?;

    writeln!(f, "\n=== PERFORMANCE ===")?;
    writeln!(f, "Total execution time:      {secs:.4} seconds")?;
    writeln!(f, "Samples per second:        {:.0}", outcome.samples as f64 / secs)?;
    writeln!(
        f,
        "Time per million samples:  {:.4} seconds",
        secs / (outcome.samples as f64 / 1e6)
    )?;

    let theoretical = outcome.theoretical_error();
    writeln!(f, "\n=== THEORETICAL ANALYSIS ===")?;
    writeln!(f, "Theoretical standard error: {theoretical:.8}")?;
    write!(f, "Observed vs theoretical:    {:.2}x", stats.std_dev / theoretical)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn sum_report_states_the_match() {
        let report = Report::Sum(Finished {
            outcome: SumOutcome {
                n: 10,
                sum: 55,
                expected: 55,
            },
            worker_count: 2,
            elapsed: Duration::from_millis(3),
        });

        let text = report.to_string();
        assert!(text.contains("Parallel sum of numbers 1 to 10 = 55"));
        assert!(text.contains("Match: yes"));
    }

    #[test]
    fn large_matrices_are_sampled() {
        let m = Matrix::identity(7);
        let report = Report::MatMul(Finished {
            outcome: MatMulOutcome {
                a: m.clone(),
                b: m.clone(),
                c: m,
                expected_c00: 1.0,
            },
            worker_count: 3,
            elapsed: Duration::from_secs(1),
        });

        let text = report.to_string();
        assert!(text.contains("Matrix size: 7x7"));
        assert!(text.contains("  1.00   0.00   0.00   0.00   0.00 ..."));
        assert!(text.contains("(computed: 1.000000) ok"));
    }
}

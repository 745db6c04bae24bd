use std::num::NonZeroUsize;

use rand::{SeedableRng, rngs::StdRng};
use spmd::{
    Report, SpmdErr, Task,
    kernel::{HelloKernel, MatMulKernel, Matrix, MonteCarloKernel, RangeSumKernel},
    run_local,
};

fn workers(n: usize) -> NonZeroUsize {
    NonZeroUsize::new(n).unwrap()
}

fn run(task: Task, n: usize) -> Report {
    run_local(&task, workers(n)).unwrap().unwrap()
}

#[test]
fn sum_of_a_million_is_exact_for_any_worker_count() {
    for n in [1, 2, 3, 4, 8] {
        let Report::Sum(finished) = run(Task::Sum(RangeSumKernel::new(1_000_000)), n) else {
            panic!("expected a sum report");
        };

        assert_eq!(finished.outcome.sum, 500_000_500_000);
        assert!(finished.outcome.is_exact());
        assert_eq!(finished.worker_count, n);
    }
}

#[test]
fn sum_with_more_workers_than_terms() {
    let Report::Sum(finished) = run(Task::Sum(RangeSumKernel::new(3)), 5) else {
        panic!("expected a sum report");
    };

    assert_eq!(finished.outcome.sum, 6);
}

#[test]
fn identity_times_b_is_b() {
    let mut rng = StdRng::seed_from_u64(3);
    let b = Matrix::random(7, &mut rng);
    let kernel = MatMulKernel::with_operands(Matrix::identity(7), b.clone()).unwrap();

    let Report::MatMul(finished) = run(Task::MatMul(kernel), 3) else {
        panic!("expected a matmul report");
    };

    assert_eq!(finished.outcome.c, b);
    assert!(finished.outcome.is_verified());
}

#[test]
fn matmul_doesnt_depend_on_the_worker_count() {
    let mut rng = StdRng::seed_from_u64(11);
    let a = Matrix::random(10, &mut rng);
    let b = Matrix::random(10, &mut rng);

    let product = |n| {
        let kernel = MatMulKernel::with_operands(a.clone(), b.clone()).unwrap();
        let Report::MatMul(finished) = run(Task::MatMul(kernel), n) else {
            panic!("expected a matmul report");
        };
        finished.outcome.c
    };

    let single = product(1);
    for n in [2, 3, 4, 7, 8] {
        assert_eq!(product(n), single, "{n} workers");
    }
}

#[test]
fn seeded_random_matmul_is_reproducible() {
    let product = || {
        let Report::MatMul(finished) = run(Task::MatMul(MatMulKernel::new(12, Some(5))), 4) else {
            panic!("expected a matmul report");
        };
        finished.outcome.c
    };

    assert_eq!(product(), product());
}

#[test]
fn monte_carlo_with_a_fixed_seed_is_idempotent() {
    let estimate = || {
        let task = Task::MonteCarlo(MonteCarloKernel::new(40_000, Some(42)));
        let Report::MonteCarlo(finished) = run(task, 4) else {
            panic!("expected a monte carlo report");
        };
        finished.outcome
    };

    let first = estimate();
    let second = estimate();
    assert_eq!(first.moments, second.moments);
    assert_eq!(first.stats, second.stats);
    assert_eq!(first.seed, 42);
}

#[test]
fn monte_carlo_statistics_are_consistent() {
    let task = Task::MonteCarlo(MonteCarloKernel::new(200_000, Some(9)));
    let Report::MonteCarlo(finished) = run(task, 4) else {
        panic!("expected a monte carlo report");
    };

    let stats = finished.outcome.stats;
    assert!(stats.variance >= 0.0);
    assert!((stats.std_dev * stats.std_dev - stats.variance).abs() < 1e-12);
    assert!(finished.outcome.abs_error() < 0.05, "π ≈ {}", stats.mean);
}

#[test]
fn monte_carlo_needs_a_sample_per_worker() {
    let task = Task::MonteCarlo(MonteCarloKernel::new(2, Some(1)));
    let err = run_local(&task, workers(4)).unwrap_err();

    assert!(matches!(err, SpmdErr::InvalidConfig(_)), "{err}");
}

#[test]
fn hello_reaches_every_worker() {
    let Report::Hello(finished) = run(Task::Hello(HelloKernel), 4) else {
        panic!("expected a hello report");
    };

    assert_eq!(finished.outcome.greeting, vec![1, 2, 3, 4, 5]);
    assert_eq!(finished.outcome.roster, vec![0, 1, 2, 3]);
}

#[test]
fn reports_render_for_every_task() {
    let tasks = [
        Task::Hello(HelloKernel),
        Task::Sum(RangeSumKernel::new(100)),
        Task::MatMul(MatMulKernel::new(6, Some(1))),
        Task::MonteCarlo(MonteCarloKernel::new(1_000, Some(1))),
    ];

    for task in tasks {
        let text = run(task, 2).to_string();
        assert!(text.contains("=== RESULTS ==="), "{text}");
    }
}

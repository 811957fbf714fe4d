use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use latbin::{
    plan_bins, BinLayout, DriverConfig, EvaluationDriver, Example, Label, Learner,
    MajorityClassLearner, PredictionRecord, PredictionRole, TallyEvaluator, TaskKind,
};
use std::hint::black_box;

/// One instance with `reps` repredictions spread over `[0, 10_000]`.
fn records(reps: usize) -> Vec<PredictionRecord> {
    let mut out = Vec::with_capacity(reps + 2);
    out.push(PredictionRecord::new(vec![0.7, 0.3], 0, PredictionRole::First));
    for i in 0..reps {
        // Uneven spacing so some bins merge and some forward-fill.
        let t = ((i * i) % 9_973) as i64 + 1;
        let votes = if i % 3 == 0 { vec![0.2, 0.8] } else { vec![0.6, 0.4] };
        out.push(PredictionRecord::new(votes, t, PredictionRole::Reprediction));
    }
    out[1..].sort_by_key(|r| r.timestamp());
    out.push(PredictionRecord::new(vec![0.1, 0.9], 10_000, PredictionRole::Final));
    out
}

fn bench_plan(c: &mut Criterion) {
    let mut group = c.benchmark_group("plan_bins");
    for &(bins, reps) in &[(10usize, 5usize), (50, 100), (1000, 2_000)] {
        let layout = BinLayout::new(bins).unwrap();
        let base = records(reps);
        group.bench_with_input(
            BenchmarkId::new(format!("bins{bins}"), reps),
            &reps,
            |b, &_reps| {
                b.iter(|| {
                    let mut rs = base.clone();
                    black_box(plan_bins(layout, &mut rs).unwrap());
                })
            },
        );
    }
    group.finish();
}

fn bench_backlog(c: &mut Criterion) {
    // A large backlog of pending instances swept by every label.
    let mut group = c.benchmark_group("driver_sweep");
    for &pending in &[1_000u64, 10_000] {
        group.bench_with_input(BenchmarkId::from_parameter(pending), &pending, |b, &n| {
            let cfg = DriverConfig::default().with_prediction_frequency(10);
            let mut model = MajorityClassLearner::default();
            model.train(&Example::labelled(u64::MAX, 0, vec![], Label::Class(1)));
            let mut base =
                EvaluationDriver::new(cfg, |_| TallyEvaluator::new(TaskKind::Classification))
                    .unwrap();
            for id in 0..n {
                base.process(&model, Example::unlabelled(id, 0, vec![])).unwrap();
            }
            b.iter(|| {
                let mut d = base.clone();
                for j in 0..100u64 {
                    let e = Example::labelled(j, 1 + j as i64, vec![], Label::Class(0));
                    black_box(d.process(&model, e).unwrap());
                }
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_plan, bench_backlog);
criterion_main!(benches);

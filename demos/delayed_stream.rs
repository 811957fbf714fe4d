//! Per-bin accuracy of a majority-class learner on a synthetic delayed-label stream.
//!
//! Shows how a statistics-bearing evaluator plugs into the bins: it scores accuracy and
//! reuses `OverheadCounters` for the evaluation-overhead figures.
//!
//! Run:
//! `RUST_LOG=latbin=debug cargo run --example delayed_stream --features stochastic`

use latbin::{
    max_index, merge_run, run_prequential, DelayedLabelConfig, DelayedLabelStream, DriverConfig,
    EvaluationDriver, Evaluator, Example, MajorityClassLearner, Measurement, OverheadCounters,
    PrequentialConfig, TaskKind, TimedVotes,
};
use tracing_subscriber::EnvFilter;

/// Weighted accuracy of argmax votes against class labels.
#[derive(Debug, Clone, Default)]
struct Accuracy {
    weight: f64,
    correct: f64,
    overhead: OverheadCounters,
}

impl Accuracy {
    fn score(&mut self, example: &Example, votes: &[f64]) {
        let Some(truth) = example.label.and_then(|l| l.class()) else {
            return;
        };
        if example.weight <= 0.0 {
            return;
        }
        self.weight += example.weight;
        if max_index(votes) == Some(truth) {
            self.correct += example.weight;
        }
    }

    fn value(&self) -> f64 {
        if self.weight > 0.0 {
            self.correct / self.weight
        } else {
            0.0
        }
    }
}

impl Evaluator for Accuracy {
    fn task(&self) -> TaskKind {
        TaskKind::Classification
    }

    fn reset(&mut self) {
        *self = Self::default();
    }

    fn add_result(&mut self, example: &Example, votes: &[f64]) {
        self.score(example, votes);
        self.overhead.observe(example, true);
    }

    fn add_cloned_result(&mut self, example: &Example, votes: &[f64]) {
        self.score(example, votes);
        self.overhead.observe(example, false);
    }

    fn add_merged_result(&mut self, example: &Example, run: &[TimedVotes]) {
        let merged = merge_run(self.task(), run);
        self.add_result(example, &merged);
    }

    fn set_backlog_size(&mut self, n: usize) {
        self.overhead.instances_in_buffer = n;
    }

    fn set_reprediction_backlog(&mut self, n: usize) {
        self.overhead.predictions_in_buffer = n;
    }

    fn increment_total_repredictions_for_finished_instance(&mut self, count: usize) {
        self.overhead.finished_repredictions += count as u64;
    }

    fn measurements(&self) -> Vec<Measurement> {
        let mut out = vec![
            Measurement::new("classified instances", self.weight),
            Measurement::new("classifications correct (percent)", 100.0 * self.value()),
        ];
        out.extend(self.overhead.measurements());
        out
    }
}

fn main() -> latbin::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("latbin=info")),
        )
        .with_target(true)
        .init();

    let stream_cfg = DelayedLabelConfig {
        instances: 20_000,
        classes: 3,
        mean_delay: 200.0,
        label_noise: 0.05,
        ..DelayedLabelConfig::default()
    };
    let mut stream = DelayedLabelStream::new(stream_cfg, 7)?;

    let cfg = DriverConfig::default()
        .with_bin_count(10)
        .with_prediction_frequency(25)
        .with_backlog_warning(500);
    let mut driver = EvaluationDriver::new(cfg, |_| Accuracy::default())?;
    let mut learner = MajorityClassLearner::default();

    let pcfg = PrequentialConfig::default().with_sample_frequency(10_000);
    let summary = run_prequential(&pcfg, &mut driver, &mut learner, &mut stream)?;

    println!(
        "{} examples, {} finished, {} pending, {:.3}s",
        summary.instances,
        summary.finalized,
        summary.pending,
        summary.elapsed.as_secs_f64()
    );
    println!();
    println!("{:>5}  {:>9}  {:>10}", "bin", "accuracy", "calculated");
    let layout = driver.layout();
    for (i, e) in driver.evaluators().iter().enumerate() {
        let label = match i {
            0 => "first".to_string(),
            i if i == layout.final_bin() => "final".to_string(),
            i => i.to_string(),
        };
        println!(
            "{label:>5}  {:>8.2}%  {:>10}",
            100.0 * e.value(),
            e.overhead.calculated_predictions
        );
    }
    println!(
        "average repredictions per instance: {:.2}",
        driver.evaluators().immediate().overhead.average_repredictions()
    );

    println!();
    summary.curve.write_csv(std::io::stdout().lock())?;
    Ok(())
}

//! Simulated model training.
//!
//! No model is trained here. The functions in this module fabricate a
//! plausible-looking loss/accuracy history and summary metrics from a seeded
//! hash, entirely separate from the reconciliation engine. Keep it that way:
//! nothing in this module may influence tallies.

/// Knobs of the simulated run. They shape the fabricated numbers and the
/// reported timings, nothing else.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingConfig {
    pub framework: String,
    pub model_type: String,
    pub epochs: u32,
    pub batch_size: u32,
    pub learning_rate: f64,
    /// Training share of the train/test split, in percent.
    pub train_split: u32,
    /// Seed for the fabricated randomness. Equal seeds give equal reports.
    pub seed: u64,
}

impl Default for TrainingConfig {
    fn default() -> TrainingConfig {
        TrainingConfig {
            framework: "sklearn".to_string(),
            model_type: "random_forest".to_string(),
            epochs: 50,
            batch_size: 32,
            learning_rate: 0.001,
            train_split: 80,
            seed: 42,
        }
    }
}

/// One sampled point of the fabricated history. At most five points are
/// generated regardless of the epoch count.
#[derive(Debug, Clone, PartialEq)]
pub struct EpochStat {
    pub epoch: u32,
    pub loss: f64,
    pub accuracy: f64,
    pub val_loss: f64,
    pub val_accuracy: f64,
}

/// Headline metrics, rounded to one decimal.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingMetrics {
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub f1_score: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrainingReport {
    pub metrics: TrainingMetrics,
    pub history: Vec<EpochStat>,
    /// Pretended wall-clock duration, like "1m 40s".
    pub training_time: String,
    /// Rows in the reconciled dataset. The timing formula treats an empty
    /// dataset as a hundred rows, this count stays truthful.
    pub dataset_rows: usize,
}

/// Uniform value in [0, 1) derived from the seed, a usage tag and a step
/// index. Same inputs, same output.
fn pseudo_random(seed: u64, tag: &str, step: u32) -> f64 {
    let digest = sha256::digest(format!("{}:{}:{}", seed, tag, step));
    let mut acc: u64 = 0;
    for c in digest.chars().take(13) {
        acc = acc * 16 + c.to_digit(16).unwrap_or(0) as u64;
    }
    acc as f64 / (1u64 << 52) as f64
}

fn round1(x: f64) -> f64 {
    (x * 10.0).round() / 10.0
}

/// Fabricates a training report for the given dataset size.
///
/// The history improves monotonically-ish towards the clamp values: loss
/// never goes below 0.08, accuracy never above 95, validation accuracy never
/// above 94. An empty dataset is timed as a hundred rows.
pub fn simulate_training(config: &TrainingConfig, dataset_rows: usize) -> TrainingReport {
    let data_size = if dataset_rows == 0 { 100 } else { dataset_rows };
    let epochs = config.epochs.max(1);
    let num_steps = std::cmp::min(5, (epochs + 9) / 10);
    let step_size = epochs / num_steps;

    let mut history: Vec<EpochStat> = Vec::with_capacity(num_steps as usize);
    for i in 1..=num_steps {
        let epoch = if i == num_steps { epochs } else { i * step_size };
        let progress = f64::from(i) / f64::from(num_steps);
        let loss = 0.5 - progress * 0.42 + pseudo_random(config.seed, "loss", i) * 0.05;
        let val_loss = loss + 0.05 + pseudo_random(config.seed, "val_loss", i) * 0.05;
        let accuracy = 80.0 + progress * 14.5 + pseudo_random(config.seed, "accuracy", i) * 2.0;
        let val_accuracy = accuracy - 2.0 + pseudo_random(config.seed, "val_accuracy", i) * 3.0;
        history.push(EpochStat {
            epoch,
            loss: loss.max(0.08),
            accuracy: accuracy.min(95.0),
            val_loss: val_loss.max(0.12),
            val_accuracy: val_accuracy.min(94.0),
        });
    }

    let final_accuracy = history
        .last()
        .map(|stat| stat.val_accuracy)
        .unwrap_or(0.0);
    let precision = round1(final_accuracy - 2.0 + pseudo_random(config.seed, "precision", 0) * 3.0);
    let recall = round1(final_accuracy - 3.0 + pseudo_random(config.seed, "recall", 0) * 4.0);
    let f1_score = round1(2.0 * precision * recall / (precision + recall));
    let metrics = TrainingMetrics {
        accuracy: round1(final_accuracy),
        precision,
        recall,
        f1_score,
    };

    let secs_per_epoch = (data_size as u64 + 99) / 100;
    let total_secs = secs_per_epoch * u64::from(epochs);
    let training_time = format!("{}m {}s", total_secs / 60, total_secs % 60);

    TrainingReport {
        metrics,
        history,
        training_time,
        dataset_rows,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equal_seeds_give_equal_reports() {
        let config = TrainingConfig::default();
        assert_eq!(simulate_training(&config, 500), simulate_training(&config, 500));
        let other = TrainingConfig {
            seed: 43,
            ..TrainingConfig::default()
        };
        assert_ne!(
            simulate_training(&config, 500).metrics,
            simulate_training(&other, 500).metrics
        );
    }

    #[test]
    fn history_respects_the_clamps() {
        let report = simulate_training(&TrainingConfig::default(), 1000);
        for stat in &report.history {
            assert!(stat.loss >= 0.08);
            assert!(stat.val_loss >= 0.12);
            assert!(stat.accuracy <= 95.0);
            assert!(stat.val_accuracy <= 94.0);
        }
    }

    #[test]
    fn history_is_sampled_at_up_to_five_points() {
        let config = TrainingConfig::default();
        let report = simulate_training(&config, 100);
        assert_eq!(report.history.len(), 5);
        assert_eq!(report.history.last().unwrap().epoch, 50);

        let short = TrainingConfig {
            epochs: 7,
            ..TrainingConfig::default()
        };
        let report = simulate_training(&short, 100);
        assert_eq!(report.history.len(), 1);
        assert_eq!(report.history[0].epoch, 7);
    }

    #[test]
    fn empty_datasets_are_timed_as_a_hundred_rows() {
        let report = simulate_training(&TrainingConfig::default(), 0);
        assert_eq!(report.dataset_rows, 0);
        // One second per hundred rows, fifty epochs.
        assert_eq!(report.training_time, "0m 50s");
    }

    #[test]
    fn f1_is_the_harmonic_mean() {
        let report = simulate_training(&TrainingConfig::default(), 250);
        let m = &report.metrics;
        let expected = 2.0 * m.precision * m.recall / (m.precision + m.recall);
        assert!((m.f1_score - expected).abs() <= 0.05 + f64::EPSILON);
    }
}

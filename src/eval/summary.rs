//! Summary statistics over runner and grader output.
//!
//! Everything here is recomputed from the record lists on demand.
//! Records without an overall score are left out of averages rather than
//! counted as zero.

use super::record::{GradeRecord, GradeStatus, ResponseRecord};
use serde::Serialize;
use std::collections::BTreeMap;

/// Dataset label used when a record carries none.
pub const UNKNOWN_DATASET: &str = "Unknown";

fn mean(values: impl IntoIterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values
        .into_iter()
        .fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    (count > 0).then(|| sum / count as f64)
}

fn rate(part: usize, total: usize) -> f64 {
    if total > 0 {
        part as f64 / total as f64
    } else {
        0.0
    }
}

/// Exit code of a run whose failure rate exceeded the threshold.
pub const EXIT_OVER_THRESHOLD: u8 = 2;

/// Process exit code for a completed run: 0, or [`EXIT_OVER_THRESHOLD`]
/// when the failure rate is strictly above `threshold`.
pub fn exit_code_for(failure_rate: f64, threshold: f64) -> u8 {
    if failure_rate > threshold {
        EXIT_OVER_THRESHOLD
    } else {
        0
    }
}

/// Counts emitted by the runner after a run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Fraction of questions answered successfully (0.0 - 1.0).
    pub success_rate: f64,
    /// Mean answering latency in seconds over all questions.
    pub average_duration: f64,
}

impl RunSummary {
    pub fn from_records(records: &[ResponseRecord]) -> Self {
        let total = records.len();
        let succeeded = records.iter().filter(|r| r.success).count();

        Self {
            total,
            succeeded,
            failed: total - succeeded,
            success_rate: rate(succeeded, total),
            average_duration: mean(records.iter().map(|r| r.duration)).unwrap_or(0.0),
        }
    }

    pub fn failure_rate(&self) -> f64 {
        rate(self.failed, self.total)
    }

    /// Print summary to stdout.
    pub fn print_summary(&self) {
        println!("{}", "-".repeat(60));
        println!("EVALUATION SUMMARY");
        println!("Total questions: {}", self.total);
        println!("Successful: {}", self.succeeded);
        println!("Failed: {}", self.failed);
        println!("Success rate: {:.1}%", self.success_rate * 100.0);
        println!("Average response time: {:.2} seconds", self.average_duration);
    }
}

/// Mean score per judging criterion.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CriteriaAverages {
    pub accuracy: Option<f64>,
    pub completeness: Option<f64>,
    pub relevance: Option<f64>,
    pub clarity: Option<f64>,
}

/// Per-dataset breakdown.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DatasetStats {
    pub total: usize,
    pub graded: usize,
    pub average_score: Option<f64>,
}

/// Aggregate view of a list of grade records.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SummaryStats {
    pub total: usize,
    /// Questions the agent answered without error.
    pub answered: usize,
    pub answer_failures: usize,
    pub success_rate: f64,
    pub average_duration: Option<f64>,
    pub graded: usize,
    pub grading_failed: usize,
    pub skipped: usize,
    pub average_score: Option<f64>,
    pub min_score: Option<f64>,
    pub max_score: Option<f64>,
    pub criteria: CriteriaAverages,
    /// Rounded overall score -> number of graded records.
    pub score_distribution: BTreeMap<i64, usize>,
    pub datasets: BTreeMap<String, DatasetStats>,
    /// Earliest answer timestamp in the run.
    pub started_at: Option<String>,
}

impl SummaryStats {
    pub fn from_records(records: &[GradeRecord]) -> Self {
        let total = records.len();
        let answered = records.iter().filter(|r| r.response.success).count();
        let count_status =
            |status: GradeStatus| records.iter().filter(|r| r.status == status).count();

        let grades: Vec<_> = records.iter().filter_map(|r| r.grade.as_ref()).collect();
        let scores: Vec<f64> = grades.iter().map(|g| g.overall_score).collect();

        let mut score_distribution = BTreeMap::new();
        for score in &scores {
            *score_distribution.entry(score.round() as i64).or_insert(0) += 1;
        }

        let mut dataset_scores: BTreeMap<String, (usize, Vec<f64>)> = BTreeMap::new();
        for record in records {
            let label = match record.response.expected_dataset.trim() {
                "" => UNKNOWN_DATASET.to_string(),
                label => label.to_string(),
            };
            let entry = dataset_scores.entry(label).or_default();
            entry.0 += 1;
            if let Some(score) = record.overall_score() {
                entry.1.push(score);
            }
        }

        let datasets = dataset_scores
            .into_iter()
            .map(|(label, (total, scores))| {
                let stats = DatasetStats {
                    total,
                    graded: scores.len(),
                    average_score: mean(scores),
                };
                (label, stats)
            })
            .collect();

        Self {
            total,
            answered,
            answer_failures: total - answered,
            success_rate: rate(answered, total),
            average_duration: mean(records.iter().map(|r| r.response.duration)),
            graded: count_status(GradeStatus::Graded),
            grading_failed: count_status(GradeStatus::GradingFailed),
            skipped: count_status(GradeStatus::Skipped),
            average_score: mean(scores.iter().copied()),
            min_score: scores.iter().copied().reduce(f64::min),
            max_score: scores.iter().copied().reduce(f64::max),
            criteria: CriteriaAverages {
                accuracy: mean(grades.iter().map(|g| g.accuracy)),
                completeness: mean(grades.iter().map(|g| g.completeness)),
                relevance: mean(grades.iter().map(|g| g.relevance)),
                clarity: mean(grades.iter().map(|g| g.clarity)),
            },
            score_distribution,
            datasets,
            started_at: records
                .iter()
                .map(|r| r.response.timestamp.as_str())
                .min()
                .map(str::to_string),
        }
    }

    /// Fraction of records that did not end up graded.
    pub fn failure_rate(&self) -> f64 {
        rate(self.total - self.graded, self.total)
    }

    /// Print summary to stdout.
    pub fn print_summary(&self) {
        let fmt_score = |score: Option<f64>| match score {
            Some(s) => format!("{:.2}/5", s),
            None => "n/a".to_string(),
        };

        println!("{}", "-".repeat(60));
        println!("GRADING SUMMARY");
        println!("Total responses: {}", self.total);
        println!("Successfully graded: {}", self.graded);
        println!("Failed to grade: {}", self.grading_failed);
        println!("Skipped (original failures): {}", self.skipped);
        println!("Answer success rate: {:.1}%", self.success_rate * 100.0);
        if let Some(duration) = self.average_duration {
            println!("Average response time: {:.2} seconds", duration);
        }
        if let Some(started) = &self.started_at {
            println!("Run started: {}", started);
        }

        if self.average_score.is_none() {
            return;
        }

        println!("Average overall score: {}", fmt_score(self.average_score));
        println!(
            "Min / max overall score: {} / {}",
            fmt_score(self.min_score),
            fmt_score(self.max_score)
        );
        println!("Average per criterion:");
        println!("  accuracy:     {}", fmt_score(self.criteria.accuracy));
        println!("  completeness: {}", fmt_score(self.criteria.completeness));
        println!("  relevance:    {}", fmt_score(self.criteria.relevance));
        println!("  clarity:      {}", fmt_score(self.criteria.clarity));

        println!("Score distribution:");
        for (score, count) in &self.score_distribution {
            println!("  {}/5: {} responses", score, count);
        }

        println!("By dataset:");
        for (label, stats) in &self.datasets {
            println!(
                "  {}: {} questions, {} graded, average {}",
                label,
                stats.total,
                stats.graded,
                fmt_score(stats.average_score)
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eval::question::Question;
    use crate::eval::record::{Grade, GradeOutcome};
    use std::time::Duration;

    fn response(id: i64, dataset: &str, ok: bool, secs: u64) -> ResponseRecord {
        let outcome = if ok {
            Ok("odpověď".to_string())
        } else {
            Err("selhání".to_string())
        };
        ResponseRecord::from_outcome(
            &Question::new(id, "otázka").with_dataset(dataset),
            outcome,
            Duration::from_secs(secs),
            format!("2025-05-24T08:0{}:00+02:00", id),
        )
    }

    fn graded(id: i64, dataset: &str, score: f64) -> GradeRecord {
        GradeRecord::new(
            response(id, dataset, true, 2),
            GradeOutcome::Graded {
                grade: Grade {
                    accuracy: score,
                    completeness: score - 1.0,
                    relevance: 5.0,
                    clarity: 4.0,
                    overall_score: score,
                    reasoning: None,
                    strengths: None,
                    weaknesses: None,
                },
                ground_truth: "gt".to_string(),
            },
            "2025-05-24T09:00:00+02:00".to_string(),
        )
    }

    fn skipped(id: i64, dataset: &str) -> GradeRecord {
        GradeRecord::new(
            response(id, dataset, false, 4),
            GradeOutcome::Skipped,
            "2025-05-24T09:00:00+02:00".to_string(),
        )
    }

    #[test]
    fn test_average_excludes_records_without_score() {
        let records = vec![
            graded(1, "messages", 4.0),
            graded(2, "messages", 5.0),
            skipped(3, "messages"),
        ];
        let stats = SummaryStats::from_records(&records);

        assert_eq!(stats.average_score, Some(4.5));
        assert_eq!(stats.graded, 2);
        assert_eq!(stats.skipped, 1);
        assert_eq!(stats.datasets["messages"].average_score, Some(4.5));
        assert_eq!(stats.datasets["messages"].total, 3);
    }

    #[test]
    fn test_counts_histogram_and_datasets() {
        let failed = GradeRecord::new(
            response(4, "", true, 3),
            GradeOutcome::Failed {
                ground_truth: None,
                error: "No ground truth found for question ID 4".to_string(),
            },
            "2025-05-24T09:00:00+02:00".to_string(),
        );
        let records = vec![
            graded(1, "official_boards", 3.5),
            graded(2, "editors", 4.4),
            skipped(3, "editors"),
            failed,
        ];
        let stats = SummaryStats::from_records(&records);

        assert_eq!(stats.total, 4);
        assert_eq!(stats.answered, 3);
        assert_eq!(stats.answer_failures, 1);
        assert_eq!(stats.success_rate, 0.75);
        assert_eq!(stats.grading_failed, 1);
        assert_eq!(stats.min_score, Some(3.5));
        assert_eq!(stats.max_score, Some(4.4));
        assert_eq!(stats.criteria.relevance, Some(5.0));
        assert_eq!(stats.score_distribution.get(&4), Some(&2));
        assert_eq!(stats.datasets[UNKNOWN_DATASET].graded, 0);
        assert_eq!(stats.datasets[UNKNOWN_DATASET].average_score, None);
        assert_eq!(stats.datasets["editors"].graded, 1);
        assert_eq!(stats.average_duration, Some(11.0 / 4.0));
        assert_eq!(stats.started_at.as_deref(), Some("2025-05-24T08:01:00+02:00"));
        assert_eq!(stats.failure_rate(), 0.5);
    }

    #[test]
    fn test_empty_records() {
        let stats = SummaryStats::from_records(&[]);
        assert_eq!(stats.total, 0);
        assert_eq!(stats.average_score, None);
        assert_eq!(stats.failure_rate(), 0.0);
        assert!(stats.datasets.is_empty());
    }

    #[test]
    fn test_run_summary() {
        let records = vec![
            response(1, "messages", true, 2),
            response(2, "messages", false, 4),
            response(3, "editors", true, 3),
            response(4, "editors", true, 3),
        ];
        let summary = RunSummary::from_records(&records);

        assert_eq!(summary.total, 4);
        assert_eq!(summary.succeeded, 3);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.success_rate, 0.75);
        assert_eq!(summary.average_duration, 3.0);
        assert_eq!(summary.failure_rate(), 0.25);

        let empty = RunSummary::from_records(&[]);
        assert_eq!(empty.average_duration, 0.0);
        assert_eq!(empty.success_rate, 0.0);
    }

    #[test]
    fn test_run_exit_code_at_threshold_boundary() {
        let half_failed = RunSummary::from_records(&[
            response(1, "messages", true, 1),
            response(2, "messages", false, 1),
        ]);
        assert_eq!(half_failed.failure_rate(), 0.5);
        assert_eq!(exit_code_for(half_failed.failure_rate(), 0.5), 0);
        assert_eq!(exit_code_for(half_failed.failure_rate(), 0.49), EXIT_OVER_THRESHOLD);

        let all_failed = RunSummary::from_records(&[response(1, "messages", false, 1)]);
        assert_eq!(exit_code_for(all_failed.failure_rate(), 1.0), 0);
        assert_eq!(exit_code_for(all_failed.failure_rate(), 0.5), EXIT_OVER_THRESHOLD);
    }

    #[test]
    fn test_grading_exit_code_counts_skipped_as_failures() {
        let stats = SummaryStats::from_records(&[
            graded(1, "messages", 4.0),
            graded(2, "messages", 5.0),
            skipped(3, "messages"),
            skipped(4, "messages"),
        ]);
        assert_eq!(stats.failure_rate(), 0.5);
        assert_eq!(exit_code_for(stats.failure_rate(), 0.5), 0);
        assert_eq!(exit_code_for(stats.failure_rate(), 0.25), EXIT_OVER_THRESHOLD);

        let empty = SummaryStats::from_records(&[]);
        assert_eq!(exit_code_for(empty.failure_rate(), 0.0), 0);
    }
}

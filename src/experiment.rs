// Comparative experiments - every topic under every iteration budget

use crate::config::OutputConfig;
use crate::error::{Error, Result};
use crate::generation::backend::{Backend, DEFAULT_MAX_TOKENS};
use crate::generation::{DEFAULT_MIN_QUALITY_SCORE, GenerationRequest, Orchestrator, ProviderInfo};
use crate::output;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

/// Floor for average times so instant runs (simulation) keep a finite efficiency ratio
const MIN_TIME_SECS: f64 = 1e-3;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TrialResult {
    pub topic: String,
    pub final_score: f64,
    pub iterations_used: u32,
    pub execution_time: f64,
    pub llm_calls: u32,
    pub approved: bool,
    pub content_length: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConfigurationStatistics {
    pub avg_score: f64,
    pub avg_time: f64,
    pub total_llm_calls: u32,
    pub approval_rate: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigurationRun {
    pub max_iterations: u32,
    pub results: Vec<TrialResult>,
    pub statistics: ConfigurationStatistics,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConfigSnapshot {
    pub iterations: u32,
    pub avg_score: f64,
    pub avg_time: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub efficiency_ratio: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExperimentSummary {
    pub best_quality_config: ConfigSnapshot,
    pub fastest_config: ConfigSnapshot,
    pub most_efficient_config: ConfigSnapshot,
    pub quality_improvement_percent: f64,
    pub total_llm_calls: u32,
    pub recommendations: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Experiment {
    pub experiment_id: String,
    pub topics: Vec<String>,
    pub provider_info: ProviderInfo,
    pub configurations: Vec<ConfigurationRun>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub summary: ExperimentSummary,
}

impl Experiment {
    /// Write the JSON record and the markdown report
    pub async fn save(&self, dirs: &OutputConfig) -> Result<(PathBuf, PathBuf)> {
        let prefix = format!("experiment_{}", self.experiment_id);
        let json = output::save_json(&dirs.experiments_dir, &prefix, self).await?;
        let report = output::save_text(&dirs.reports_dir, &prefix, "md", &render_report(self)).await?;
        Ok((json, report))
    }
}

/// Runs the same topics under several iteration budgets against one backend
pub struct ExperimentRunner {
    backend: Arc<dyn Backend>,
    min_quality_score: f64,
    max_tokens: u32,
}

impl ExperimentRunner {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self {
            backend,
            min_quality_score: DEFAULT_MIN_QUALITY_SCORE,
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }

    pub fn with_min_quality_score(mut self, min_quality_score: f64) -> Self {
        self.min_quality_score = min_quality_score;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub async fn run(&self, topics: &[String], budgets: &[u32]) -> Result<Experiment> {
        if topics.is_empty() {
            return Err(Error::InvalidRequest("experiment needs at least one topic".to_string()));
        }
        if budgets.is_empty() {
            return Err(Error::InvalidRequest(
                "experiment needs at least one iteration budget".to_string(),
            ));
        }

        let start_time = Utc::now();
        let experiment_id = format!("exp_{}", start_time.format("%Y%m%d_%H%M%S"));
        info!(
            "Experiment {}: {} topic(s) x budgets {:?}",
            experiment_id,
            topics.len(),
            budgets
        );

        let mut orchestrator = Orchestrator::with_max_tokens(self.backend.clone(), self.max_tokens);
        let mut configurations = Vec::with_capacity(budgets.len());

        for &max_iterations in budgets {
            let mut results = Vec::with_capacity(topics.len());

            for (i, topic) in topics.iter().enumerate() {
                info!("Budget {}: trial {}/{}", max_iterations, i + 1, topics.len());
                let request = GenerationRequest::new(topic.clone())
                    .with_max_iterations(max_iterations)
                    .with_min_quality_score(self.min_quality_score);
                let result = orchestrator.run(request).await?;

                results.push(TrialResult {
                    topic: topic.clone(),
                    final_score: result.final_score,
                    iterations_used: result.iterations_used,
                    execution_time: result.execution_time_seconds,
                    llm_calls: result.llm_calls,
                    approved: result.approved,
                    content_length: result.final_content.chars().count(),
                });
            }

            let statistics = statistics(&results);
            info!(
                "Budget {}: avg score {:.1}, avg time {:.1}s, approval {:.0}%",
                max_iterations,
                statistics.avg_score,
                statistics.avg_time,
                statistics.approval_rate * 100.0
            );
            configurations.push(ConfigurationRun {
                max_iterations,
                results,
                statistics,
            });
        }

        let summary = summarize(&configurations)
            .ok_or(Error::IncompleteRun("experiment produced no configurations"))?;

        Ok(Experiment {
            experiment_id,
            topics: topics.to_vec(),
            provider_info: orchestrator.provider_info(),
            configurations,
            start_time,
            end_time: Utc::now(),
            summary,
        })
    }
}

fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

pub fn statistics(results: &[TrialResult]) -> ConfigurationStatistics {
    let n = results.len().max(1) as f64;
    ConfigurationStatistics {
        avg_score: round_to(results.iter().map(|r| r.final_score).sum::<f64>() / n, 2),
        avg_time: round_to(results.iter().map(|r| r.execution_time).sum::<f64>() / n, 2),
        total_llm_calls: results.iter().map(|r| r.llm_calls).sum(),
        approval_rate: results.iter().filter(|r| r.approved).count() as f64 / n,
    }
}

fn efficiency(run: &ConfigurationRun) -> f64 {
    run.statistics.avg_score / run.statistics.avg_time.max(MIN_TIME_SECS)
}

fn snapshot(run: &ConfigurationRun) -> ConfigSnapshot {
    ConfigSnapshot {
        iterations: run.max_iterations,
        avg_score: run.statistics.avg_score,
        avg_time: run.statistics.avg_time,
        efficiency_ratio: None,
    }
}

/// Best, fastest and most efficient configurations; `None` when there are none
pub fn summarize(configurations: &[ConfigurationRun]) -> Option<ExperimentSummary> {
    let best = configurations
        .iter()
        .max_by(|a, b| a.statistics.avg_score.total_cmp(&b.statistics.avg_score))?;
    let fastest = configurations
        .iter()
        .min_by(|a, b| a.statistics.avg_time.total_cmp(&b.statistics.avg_time))?;
    let efficient = configurations
        .iter()
        .max_by(|a, b| efficiency(a).total_cmp(&efficiency(b)))?;

    let scores = configurations.iter().map(|c| c.statistics.avg_score);
    let max = scores.clone().fold(f64::MIN, f64::max);
    let min = scores.fold(f64::MAX, f64::min);
    let improvement = if min > 0.0 { (max - min) / min * 100.0 } else { 0.0 };

    Some(ExperimentSummary {
        best_quality_config: snapshot(best),
        fastest_config: snapshot(fastest),
        most_efficient_config: ConfigSnapshot {
            efficiency_ratio: Some(efficiency(efficient)),
            ..snapshot(efficient)
        },
        quality_improvement_percent: round_to(improvement, 1),
        total_llm_calls: configurations.iter().map(|c| c.statistics.total_llm_calls).sum(),
        recommendations: recommendations(configurations),
    })
}

pub fn recommendations(configurations: &[ConfigurationRun]) -> Vec<String> {
    let mut recommendations = Vec::new();

    let mut scores: Vec<(u32, f64)> = configurations
        .iter()
        .map(|c| (c.max_iterations, c.statistics.avg_score))
        .collect();
    scores.sort_by_key(|(iterations, _)| *iterations);

    if scores.len() > 1 {
        let first_gain = scores[1].1 - scores[0].1;
        if first_gain > 0.5 {
            recommendations.push("An additional iteration yields a significant quality gain".to_string());
        }
        if scores.len() > 2 {
            let second_gain = scores[2].1 - scores[1].1;
            if second_gain < first_gain * 0.5 {
                recommendations.push("Diminishing returns observed after two iterations".to_string());
            }
        }

        if let Some(best) = configurations
            .iter()
            .max_by(|a, b| a.statistics.avg_score.total_cmp(&b.statistics.avg_score))
            .filter(|best| best.statistics.avg_score >= 8.0)
        {
            recommendations.push(format!(
                "{} iteration(s) reach excellent quality",
                best.max_iterations
            ));
        }
    }

    if let Some(fastest) = configurations
        .iter()
        .min_by(|a, b| a.statistics.avg_time.total_cmp(&b.statistics.avg_time))
        .filter(|fastest| fastest.statistics.avg_score >= 7.0)
    {
        recommendations.push(format!(
            "For quick turnaround: {} iteration(s) give good quality in {:.1}s",
            fastest.max_iterations, fastest.statistics.avg_time
        ));
    }

    recommendations
}

/// Markdown report of an experiment
pub fn render_report(experiment: &Experiment) -> String {
    let summary = &experiment.summary;
    let budgets: Vec<u32> = experiment.configurations.iter().map(|c| c.max_iterations).collect();
    let total_trials: usize = experiment.configurations.iter().map(|c| c.results.len()).sum();

    let mut report = String::new();
    let _ = writeln!(report, "# Experiment Report - AutonoWrite\n");
    let _ = writeln!(report, "## Setup");
    let _ = writeln!(report, "- **ID**: {}", experiment.experiment_id);
    let _ = writeln!(
        report,
        "- **Provider**: {} ({})",
        experiment.provider_info.provider_type, experiment.provider_info.model
    );
    let _ = writeln!(report, "- **Topics**: {}", experiment.topics.len());
    let _ = writeln!(report, "- **Iteration budgets**: {:?}", budgets);
    let _ = writeln!(report, "- **Total trials**: {}\n", total_trials);

    let _ = writeln!(report, "## Key Results\n");
    let sections = [
        ("Best Quality", &summary.best_quality_config),
        ("Fastest", &summary.fastest_config),
        ("Most Efficient (quality/time)", &summary.most_efficient_config),
    ];
    for (title, snapshot) in sections {
        let _ = writeln!(report, "### {}", title);
        let _ = writeln!(report, "- **Iterations**: {}", snapshot.iterations);
        let _ = writeln!(report, "- **Average score**: {:.2}/10", snapshot.avg_score);
        let _ = writeln!(report, "- **Average time**: {:.1}s", snapshot.avg_time);
        if let Some(ratio) = snapshot.efficiency_ratio {
            let _ = writeln!(report, "- **Efficiency ratio**: {:.2}", ratio);
        }
        let _ = writeln!(report);
    }

    let _ = writeln!(report, "## Statistics");
    let _ = writeln!(report, "- **Quality improvement**: {}%", summary.quality_improvement_percent);
    let _ = writeln!(report, "- **Total LLM calls**: {}\n", summary.total_llm_calls);

    let _ = writeln!(report, "## Results by Configuration");
    for config in &experiment.configurations {
        let stats = &config.statistics;
        let _ = writeln!(report, "\n### {} iteration(s)", config.max_iterations);
        let _ = writeln!(report, "- **Average score**: {:.2}/10", stats.avg_score);
        let _ = writeln!(report, "- **Average time**: {:.1}s", stats.avg_time);
        let _ = writeln!(report, "- **Approval rate**: {:.1}%", stats.approval_rate * 100.0);
        let _ = writeln!(report, "- **LLM calls**: {}\n", stats.total_llm_calls);
        for result in &config.results {
            let topic: String = result.topic.chars().take(60).collect();
            let _ = writeln!(report, "- {} (score: {:.1})", topic, result.final_score);
        }
    }

    let _ = writeln!(report, "\n## Recommendations\n");
    if summary.recommendations.is_empty() {
        let _ = writeln!(report, "- No clear recommendation from this sample");
    }
    for recommendation in &summary.recommendations {
        let _ = writeln!(report, "- {}", recommendation);
    }

    let _ = writeln!(
        report,
        "\n---\n*Generated {}*",
        experiment.end_time.format("%Y-%m-%d %H:%M:%S UTC")
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::backend::SimulationBackend;

    fn run_with(max_iterations: u32, scores: &[f64], time: f64, approved: bool) -> ConfigurationRun {
        let results: Vec<TrialResult> = scores
            .iter()
            .map(|&score| TrialResult {
                topic: "t".to_string(),
                final_score: score,
                iterations_used: max_iterations,
                execution_time: time,
                llm_calls: 2 + 2 * max_iterations,
                approved,
                content_length: 100,
            })
            .collect();
        ConfigurationRun {
            max_iterations,
            statistics: statistics(&results),
            results,
        }
    }

    #[test]
    fn test_statistics() {
        let stats = run_with(2, &[7.0, 8.0], 3.0, true).statistics;
        assert_eq!(stats.avg_score, 7.5);
        assert_eq!(stats.avg_time, 3.0);
        assert_eq!(stats.total_llm_calls, 12);
        assert_eq!(stats.approval_rate, 1.0);
    }

    #[test]
    fn test_summary_picks_best_fastest_and_efficient() {
        let configs = vec![
            run_with(1, &[6.0], 1.0, false),
            run_with(2, &[7.5], 2.0, false),
            run_with(3, &[8.4], 6.0, true),
        ];
        let summary = summarize(&configs).unwrap();

        assert_eq!(summary.best_quality_config.iterations, 3);
        assert_eq!(summary.fastest_config.iterations, 1);
        assert_eq!(summary.most_efficient_config.iterations, 1);
        assert_eq!(summary.most_efficient_config.efficiency_ratio, Some(6.0));
        assert_eq!(summary.quality_improvement_percent, 40.0);
        assert_eq!(summary.total_llm_calls, 4 + 6 + 8);
    }

    #[test]
    fn test_zero_time_does_not_divide_by_zero() {
        let configs = vec![run_with(1, &[7.8], 0.0, false)];
        let summary = summarize(&configs).unwrap();
        assert!(summary.most_efficient_config.efficiency_ratio.unwrap().is_finite());
        assert_eq!(summary.quality_improvement_percent, 0.0);
    }

    #[test]
    fn test_summary_of_nothing() {
        assert!(summarize(&[]).is_none());
    }

    #[test]
    fn test_recommendations() {
        let configs = vec![
            run_with(1, &[6.0], 1.0, false),
            run_with(2, &[7.5], 2.0, false),
            run_with(3, &[8.1], 4.0, true),
        ];
        let recommendations = recommendations(&configs);
        assert!(recommendations.iter().any(|r| r.contains("significant quality gain")));
        assert!(recommendations.iter().any(|r| r.contains("Diminishing returns")));
        assert!(recommendations.iter().any(|r| r.starts_with("3 iteration(s)")));
        assert!(!recommendations.iter().any(|r| r.contains("quick turnaround")));
    }

    #[tokio::test]
    async fn test_runner_with_simulation() {
        let runner = ExperimentRunner::new(Arc::new(SimulationBackend::new()));
        let topics = vec!["A".to_string(), "B".to_string()];
        let experiment = runner.run(&topics, &[1, 2]).await.unwrap();

        assert_eq!(experiment.configurations.len(), 2);
        assert_eq!(experiment.configurations[0].statistics.total_llm_calls, 8);
        assert_eq!(experiment.configurations[1].statistics.total_llm_calls, 12);
        assert_eq!(experiment.summary.total_llm_calls, 20);
        assert_eq!(experiment.provider_info.provider_type, "simulation");

        let report = render_report(&experiment);
        assert!(report.starts_with("# Experiment Report"));
        assert!(report.contains("### 2 iteration(s)"));
    }

    #[tokio::test]
    async fn test_runner_rejects_empty_input() {
        let runner = ExperimentRunner::new(Arc::new(SimulationBackend::new()));
        assert!(runner.run(&[], &[1]).await.is_err());
        assert!(runner.run(&["A".to_string()], &[]).await.is_err());
        assert!(runner.run(&["A".to_string()], &[0]).await.is_err());
    }

    #[tokio::test]
    async fn test_save_writes_json_and_report() {
        let dir = tempfile::tempdir().unwrap();
        let output = OutputConfig {
            results_dir: dir.path().join("results"),
            experiments_dir: dir.path().join("experiments"),
            reports_dir: dir.path().join("reports"),
        };
        let runner = ExperimentRunner::new(Arc::new(SimulationBackend::new()));
        let experiment = runner.run(&["A".to_string()], &[1]).await.unwrap();

        let (json, report) = experiment.save(&output).await.unwrap();
        assert!(json.starts_with(dir.path().join("experiments")));
        assert!(report.starts_with(dir.path().join("reports")));
    }
}

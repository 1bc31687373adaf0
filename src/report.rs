//! Report generation for mutation testing results
//!
//! This module formats and displays mutation testing results.

use colored::Colorize;
use std::time::Duration;

use crate::runner::{MutationResult, MutationStatus};

/// Summary report of mutation testing
#[derive(Debug)]
pub struct MutationReport {
    pub results: Vec<MutationResult>,
    pub total_duration: Duration,
}

impl MutationReport {
    /// Create a new report from results
    pub fn new(results: Vec<MutationResult>) -> Self {
        let total_duration = results.iter().map(|r| r.duration).sum();
        Self {
            results,
            total_duration,
        }
    }

    fn count(&self, status: impl Fn(&MutationStatus) -> bool) -> usize {
        self.results.iter().filter(|r| status(&r.status)).count()
    }

    /// Mutants the tests detected
    pub fn killed(&self) -> usize {
        self.count(|s| *s == MutationStatus::Killed)
    }

    /// Mutants the tests missed
    pub fn survived(&self) -> usize {
        self.count(|s| *s == MutationStatus::Survived)
    }

    pub fn timeouts(&self) -> usize {
        self.count(|s| *s == MutationStatus::Timeout)
    }

    pub fn compile_errors(&self) -> usize {
        self.count(|s| *s == MutationStatus::CompileError)
    }

    /// Mutants or whole targets that could not be tested
    pub fn errors(&self) -> usize {
        self.count(|s| matches!(s, MutationStatus::Error(_)))
    }

    /// Number of mutants tried, excluding failed targets
    pub fn total(&self) -> usize {
        self.results.iter().filter(|r| r.mutation_id.is_some()).count()
    }

    /// Calculate mutation score (percentage of killed mutations)
    /// Only considers killed and survived (excludes errors/timeouts)
    pub fn score(&self) -> f64 {
        let testable = self.killed() + self.survived();
        if testable == 0 {
            return 100.0;
        }
        (self.killed() as f64 / testable as f64) * 100.0
    }

    /// Get surviving mutations (test gaps)
    pub fn surviving_mutations(&self) -> Vec<&MutationResult> {
        self.results
            .iter()
            .filter(|r| r.status == MutationStatus::Survived)
            .collect()
    }

    /// Print the report to stdout
    pub fn print(&self) {
        println!();
        println!("{}", "Mutation Testing Report".bold());
        println!("{}", "=".repeat(60));
        println!();

        // Print each result
        for result in &self.results {
            let status_str = match &result.status {
                MutationStatus::Killed => "[KILLED]".green().bold(),
                MutationStatus::Survived => "[SURVIVED]".red().bold(),
                MutationStatus::Timeout => "[TIMEOUT]".yellow().bold(),
                MutationStatus::CompileError => "[COMPILE ERROR]".yellow().bold(),
                MutationStatus::Error(_) => "[ERROR]".yellow().bold(),
            };

            match (result.mutation_id, &result.status) {
                (None, MutationStatus::Error(message)) => {
                    println!("{} {}", status_str, result.file.display());
                    println!("        {}", message.dimmed());
                }
                _ => {
                    let id = result
                        .mutation_id
                        .map(|id| format!("#{}", id))
                        .unwrap_or_default();
                    println!(
                        "{} {} - {} -> {}",
                        status_str,
                        id.dimmed(),
                        result.original,
                        result.replacement
                    );
                    println!(
                        "        {} by '{}'",
                        location(result).dimmed(),
                        result.operator
                    );
                }
            }
        }

        // Print summary
        println!();
        println!("{}", "Summary".bold());
        println!("{}", "-".repeat(40));
        println!("Total mutations:   {}", self.total());
        println!(
            "Killed:            {} {}",
            self.killed(),
            "(good - tests caught the mutation)".dimmed()
        );
        println!(
            "Survived:          {} {}",
            self.survived(),
            "(bad - tests missed the mutation)".dimmed()
        );

        if self.timeouts() > 0 {
            println!("Timeouts:          {}", self.timeouts());
        }
        if self.compile_errors() > 0 {
            println!("Compile errors:    {}", self.compile_errors());
        }
        if self.errors() > 0 {
            println!("Errors:            {}", self.errors());
        }

        println!();
        let score = self.score();
        let score_str = format!("{:.1}%", score);
        let score_colored = if score >= 90.0 {
            score_str.green().bold()
        } else if score >= 70.0 {
            score_str.yellow().bold()
        } else {
            score_str.red().bold()
        };
        println!("Mutation Score:    {}", score_colored);
        println!(
            "Duration:          {:.2}s",
            self.total_duration.as_secs_f64()
        );

        // Print surviving mutations if any
        let survivors = self.surviving_mutations();
        if !survivors.is_empty() {
            println!();
            println!(
                "{}",
                "Surviving Mutations (improve your tests!)".red().bold()
            );
            println!("{}", "-".repeat(40));
            for mutation in survivors {
                println!(
                    "  • {} -> {}",
                    mutation.original.yellow(),
                    mutation.replacement.yellow()
                );
                println!("    by '{}' at {}", mutation.operator, location(mutation));
            }
        }

    }
}

fn location(result: &MutationResult) -> String {
    match result.line {
        Some(line) => format!("{}:{}", result.file.display(), line),
        None => result.file.display().to_string(),
    }
}

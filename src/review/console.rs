use anyhow::{anyhow, Result};
use async_trait::async_trait;
use colored::Colorize;
use tokio::sync::Mutex;
use tracing::{debug, error, info};

use std::io::{self, Write};
use std::sync::Arc;

use crate::review::types::{BreakpointRequest, ReviewDecision, Reviewer};

/// A reviewer that displays breakpoints on the terminal and reads the answer from stdin
#[derive(Debug, Clone)]
pub struct ConsoleReviewer {
    /// Whether to use colored output
    colored_output: bool,

    /// Access mutex so concurrent breakpoints do not interleave on the terminal
    access_mutex: Arc<Mutex<()>>,
}

impl Default for ConsoleReviewer {
    fn default() -> Self {
        Self {
            colored_output: true,
            access_mutex: Arc::new(Mutex::new(())),
        }
    }
}

impl ConsoleReviewer {
    /// Create a new console reviewer
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new console reviewer with colored output disabled
    pub fn without_color() -> Self {
        Self {
            colored_output: false,
            access_mutex: Arc::new(Mutex::new(())),
        }
    }

    /// Format a breakpoint for display
    fn format_request(&self, request: &BreakpointRequest) -> String {
        let mut text = String::new();

        if self.colored_output {
            text.push_str(&format!("{}\n", "REVIEW REQUIRED".bold().blue()));
            text.push_str(&format!("{}\n", request.title.bold()));
        } else {
            text.push_str("REVIEW REQUIRED\n");
            text.push_str(&format!("{}\n", request.title));
        }
        text.push_str(&format!("{}\n", "─".repeat(50)));
        text.push_str(&format!("run: {}\n", request.context.run_id));

        if !request.context.summary.is_empty() {
            text.push_str("\nSummary:\n");
            for (key, value) in &request.context.summary {
                text.push_str(&format!("  {}: {}\n", key, value));
            }
        }

        if !request.context.files.is_empty() {
            text.push_str("\nFiles:\n");
            for file in &request.context.files {
                match &file.label {
                    Some(label) => {
                        text.push_str(&format!("  {} ({}, {})\n", file.path, file.format, label))
                    }
                    None => text.push_str(&format!("  {} ({})\n", file.path, file.format)),
                }
            }
        }

        text.push('\n');
        if self.colored_output {
            text.push_str(&request.question.yellow().to_string());
            text.push_str(&format!("\n{}", "[Enter/y] approve  [n <reason>] reject  [d] defer".dimmed()));
        } else {
            text.push_str(&request.question);
            text.push_str("\n[Enter/y] approve  [n <reason>] reject  [d] defer");
        }

        text
    }

    /// Read a line from stdin
    async fn read_line(&self) -> Result<String> {
        // Use tokio's blocking API to read input without blocking the runtime
        let mut input = String::new();

        tokio::task::spawn_blocking(move || match io::stdin().read_line(&mut input) {
            Ok(0) => Err(anyhow!("stdin closed before the breakpoint was resolved")),
            Ok(_) => Ok(input),
            Err(e) => Err(anyhow!("Failed to read input: {}", e)),
        })
        .await?
        .map(|s| s.trim().to_string())
    }
}

#[async_trait]
impl Reviewer for ConsoleReviewer {
    async fn review(&self, request: BreakpointRequest) -> Result<ReviewDecision> {
        info!(
            "Presenting breakpoint: id={}, title={}",
            request.request_id, request.title
        );

        let _lock = self.access_mutex.lock().await;

        println!("\n{}\n", self.format_request(&request));
        if self.colored_output {
            print!("{} ", ">".green().bold());
        } else {
            print!("> ");
        }
        io::stdout().flush()?;

        match self.read_line().await {
            Ok(answer) => {
                debug!("Received review answer: {}", answer);
                Ok(ReviewDecision::parse(&answer))
            }
            Err(e) => {
                error!("Error collecting review: {}", e);
                Err(e)
            }
        }
    }
}

//! Jobs-to-be-done analysis.
//!
//! Stops early when fewer than `minimumJobCount` core jobs are identified.
//! Competitive analysis and the positioning map are optional phases; when
//! skipped their result slots are `null` and later phases accept that.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::Level;

use super::common::{agent_task, decode_inputs, require};
use crate::error::Result;
use crate::workflow::{
    Breakpoint, Process, ProcessOutcome, QualityGate, RunContext, TaskDefinition, TaskResult,
};

const PROCESS_ID: &str = "product-management/jtbd-analysis";
const LABELS: &[&str] = &["product-management", "jtbd"];

/// How deep the research goes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResearchDepth {
    /// Desk research only
    Quick,
    /// Desk research plus existing interview data
    #[default]
    Standard,
    /// Adds new customer interviews
    Deep,
}

/// Inputs of the JTBD process
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct JtbdInputs {
    /// Product under analysis
    pub product_name: String,
    /// Market or segment the jobs are sought in
    pub target_market: String,
    /// Fewer core jobs than this halts the process
    pub minimum_job_count: usize,
    /// Run the competitive analysis phase
    pub include_competitive_analysis: bool,
    /// Run the positioning map phase
    pub generate_positioning_map: bool,
    /// Research depth
    pub research_depth: ResearchDepth,
}

impl Default for JtbdInputs {
    fn default() -> Self {
        Self {
            product_name: String::new(),
            target_market: "general".to_string(),
            minimum_job_count: 3,
            include_competitive_analysis: true,
            generate_positioning_map: true,
            research_depth: ResearchDepth::Standard,
        }
    }
}

/// The JTBD analysis process
#[derive(Debug, Clone)]
pub struct JtbdAnalysis {
    job_identification: TaskDefinition,
    job_mapping: TaskDefinition,
    outcome_analysis: TaskDefinition,
    opportunity_prioritization: TaskDefinition,
    competitive_analysis: TaskDefinition,
    positioning_map: TaskDefinition,
    recommendations: TaskDefinition,
}

impl Default for JtbdAnalysis {
    fn default() -> Self {
        Self::new()
    }
}

impl JtbdAnalysis {
    /// Build the process and its task definitions
    pub fn new() -> Self {
        Self {
            job_identification: agent_task(
                "jtbd-job-identification",
                "Identify jobs to be done",
                "Customer research lead",
                &[
                    "Identify the core functional jobs customers hire the product for",
                    "Add the emotional and social jobs that accompany them",
                    "Rate the importance of each job",
                ],
                LABELS,
                json!({
                    "type": "object",
                    "required": ["coreJobs"],
                    "properties": {
                        "coreJobs": {
                            "type": "array",
                            "items": {
                                "type": "object",
                                "required": ["job", "jobType", "importance"],
                                "properties": {
                                    "job": { "type": "string" },
                                    "jobType": { "type": "string", "enum": ["functional", "emotional", "social"] },
                                    "importance": { "type": "integer", "minimum": 1, "maximum": 10 },
                                    "jobExecutor": { "type": "string" }
                                }
                            }
                        },
                        "relatedJobs": { "type": "array", "items": { "type": "string" } }
                    }
                }),
            ),
            job_mapping: agent_task(
                "jtbd-job-mapping",
                "Map job steps",
                "Service designer",
                &["Break each core job into its steps from define to conclude"],
                LABELS,
                json!({
                    "type": "object",
                    "required": ["jobMaps"],
                    "properties": {
                        "jobMaps": {
                            "type": "array",
                            "items": {
                                "type": "object",
                                "required": ["job", "steps"],
                                "properties": {
                                    "job": { "type": "string" },
                                    "steps": {
                                        "type": "array",
                                        "items": {
                                            "type": "object",
                                            "required": ["stage", "description"],
                                            "properties": {
                                                "stage": {
                                                    "type": "string",
                                                    "enum": ["define", "locate", "prepare", "confirm", "execute", "monitor", "modify", "conclude"]
                                                },
                                                "description": { "type": "string" }
                                            }
                                        }
                                    }
                                }
                            }
                        }
                    }
                }),
            ),
            outcome_analysis: agent_task(
                "jtbd-outcome-analysis",
                "Analyze desired outcomes",
                "Quantitative researcher",
                &[
                    "List desired outcomes per job step",
                    "Rate importance and current satisfaction",
                    "Compute opportunity as importance + max(importance - satisfaction, 0)",
                ],
                LABELS,
                json!({
                    "type": "object",
                    "required": ["desiredOutcomes"],
                    "properties": {
                        "desiredOutcomes": {
                            "type": "array",
                            "items": {
                                "type": "object",
                                "required": ["outcome", "importance", "satisfaction", "opportunityScore"],
                                "properties": {
                                    "outcome": { "type": "string" },
                                    "importance": { "type": "number", "minimum": 1, "maximum": 10 },
                                    "satisfaction": { "type": "number", "minimum": 1, "maximum": 10 },
                                    "opportunityScore": { "type": "number", "minimum": 0, "maximum": 20 }
                                }
                            }
                        }
                    }
                }),
            ),
            opportunity_prioritization: agent_task(
                "jtbd-opportunity-prioritization",
                "Prioritize opportunities",
                "Product strategist",
                &["Rank underserved outcomes and classify each opportunity"],
                LABELS,
                json!({
                    "type": "object",
                    "required": ["opportunities"],
                    "properties": {
                        "opportunities": {
                            "type": "array",
                            "items": {
                                "type": "object",
                                "required": ["outcome", "classification"],
                                "properties": {
                                    "outcome": { "type": "string" },
                                    "classification": { "type": "string", "enum": ["underserved", "appropriately-served", "overserved"] },
                                    "rank": { "type": "integer", "minimum": 1 }
                                }
                            }
                        }
                    }
                }),
            ),
            competitive_analysis: agent_task(
                "jtbd-competitive-analysis",
                "Analyze competing solutions per job",
                "Competitive intelligence analyst",
                &[
                    "Identify the solutions customers currently hire for each core job",
                    "Rate how well each solution gets the job done",
                ],
                LABELS,
                json!({
                    "type": "object",
                    "required": ["competingSolutions"],
                    "properties": {
                        "competingSolutions": {
                            "type": "array",
                            "items": {
                                "type": "object",
                                "required": ["solution", "jobCoverage"],
                                "properties": {
                                    "solution": { "type": "string" },
                                    "solutionType": { "type": "string", "enum": ["direct", "indirect", "workaround", "non-consumption"] },
                                    "jobCoverage": { "type": "number", "minimum": 0, "maximum": 1 }
                                }
                            }
                        }
                    }
                }),
            ),
            positioning_map: agent_task(
                "jtbd-positioning-map",
                "Build job-based positioning map",
                "Product marketing manager",
                &[
                    "Choose two axes drawn from the most important outcomes",
                    "Place the product and any known competitors on the map",
                ],
                LABELS,
                json!({
                    "type": "object",
                    "required": ["axes", "positions"],
                    "properties": {
                        "axes": {
                            "type": "object",
                            "required": ["x", "y"],
                            "properties": {
                                "x": { "type": "string" },
                                "y": { "type": "string" }
                            }
                        },
                        "positions": {
                            "type": "array",
                            "items": {
                                "type": "object",
                                "required": ["name", "x", "y"],
                                "properties": {
                                    "name": { "type": "string" },
                                    "x": { "type": "number", "minimum": 0, "maximum": 10 },
                                    "y": { "type": "number", "minimum": 0, "maximum": 10 }
                                }
                            }
                        }
                    }
                }),
            ),
            recommendations: agent_task(
                "jtbd-recommendations",
                "Recommend product direction",
                "Product strategist",
                &[
                    "Turn the top opportunities into product recommendations",
                    "Use the competitive view and positioning when present",
                ],
                LABELS,
                json!({
                    "type": "object",
                    "required": ["recommendations"],
                    "properties": {
                        "recommendations": {
                            "type": "array",
                            "items": {
                                "type": "object",
                                "required": ["recommendation", "priority"],
                                "properties": {
                                    "recommendation": { "type": "string" },
                                    "priority": { "type": "string", "enum": ["high", "medium", "low"] },
                                    "targetJob": { "type": "string" }
                                }
                            }
                        },
                        "positioningStatement": { "type": "string" }
                    }
                }),
            ),
        }
    }
}

fn value_or_null(result: &Option<TaskResult>) -> Value {
    result
        .as_ref()
        .map(|r| r.value.clone())
        .unwrap_or(Value::Null)
}

#[async_trait]
impl Process for JtbdAnalysis {
    fn id(&self) -> &str {
        PROCESS_ID
    }

    fn description(&self) -> &str {
        "Identify customer jobs, outcomes and opportunities"
    }

    fn tasks(&self) -> Vec<TaskDefinition> {
        vec![
            self.job_identification.clone(),
            self.job_mapping.clone(),
            self.outcome_analysis.clone(),
            self.opportunity_prioritization.clone(),
            self.competitive_analysis.clone(),
            self.positioning_map.clone(),
            self.recommendations.clone(),
        ]
    }

    async fn run(&self, inputs: Value, ctx: &RunContext) -> Result<ProcessOutcome> {
        let inputs: JtbdInputs = decode_inputs(PROCESS_ID, inputs)?;
        require(PROCESS_ID, "productName", &inputs.product_name)?;
        let product = inputs.product_name.as_str();

        let jobs = ctx
            .task(
                &self.job_identification,
                json!({
                    "productName": product,
                    "targetMarket": inputs.target_market,
                    "researchDepth": inputs.research_depth,
                }),
            )
            .await?;

        let gate = QualityGate::new(
            "job-identification",
            "Broaden the research scope or lower minimumJobCount, then rerun the analysis",
        );
        if let Err(failure) =
            gate.at_least("core jobs", jobs.count("coreJobs"), inputs.minimum_job_count)
        {
            ctx.log(Level::WARN, &failure.error);
            return Ok(failure.into());
        }

        ctx.breakpoint(
            Breakpoint::new(
                "Job identification",
                format!(
                    "{} core jobs identified for {}. Review them before mapping job steps?",
                    jobs.count("coreJobs"),
                    product
                ),
            )
            .with_summary("coreJobs", jobs.count("coreJobs"))
            .with_summary("relatedJobs", jobs.count("relatedJobs")),
        )
        .await?;

        let job_maps = ctx
            .task(
                &self.job_mapping,
                json!({ "productName": product, "coreJobs": jobs.value["coreJobs"] }),
            )
            .await?;

        let outcomes = ctx
            .task(
                &self.outcome_analysis,
                json!({ "productName": product, "jobMaps": job_maps.value["jobMaps"] }),
            )
            .await?;

        let opportunities = ctx
            .task(
                &self.opportunity_prioritization,
                json!({
                    "productName": product,
                    "desiredOutcomes": outcomes.value["desiredOutcomes"],
                }),
            )
            .await?;

        let competitive = if inputs.include_competitive_analysis {
            let result = ctx
                .task(
                    &self.competitive_analysis,
                    json!({
                        "productName": product,
                        "coreJobs": jobs.value["coreJobs"],
                        "targetMarket": inputs.target_market,
                    }),
                )
                .await?;

            ctx.breakpoint(
                Breakpoint::new(
                    "Competitive analysis",
                    "Review how competing solutions get the core jobs done?",
                )
                .with_summary("competingSolutions", result.count("competingSolutions"))
                .with_summary("opportunities", opportunities.count("opportunities")),
            )
            .await?;
            Some(result)
        } else {
            ctx.log(Level::INFO, "Skipping competitive analysis");
            None
        };

        let positioning = if inputs.generate_positioning_map {
            Some(
                ctx.task(
                    &self.positioning_map,
                    json!({
                        "productName": product,
                        "desiredOutcomes": outcomes.value["desiredOutcomes"],
                        "competitiveAnalysis": value_or_null(&competitive),
                    }),
                )
                .await?,
            )
        } else {
            None
        };

        let recommendations = ctx
            .task(
                &self.recommendations,
                json!({
                    "productName": product,
                    "opportunities": opportunities.value["opportunities"],
                    "competitiveAnalysis": value_or_null(&competitive),
                    "positioningMap": value_or_null(&positioning),
                }),
            )
            .await?;

        let competitive_summary = competitive
            .as_ref()
            .map(|c| json!({ "competingSolutions": c.value["competingSolutions"] }));
        let positioning_summary = positioning
            .as_ref()
            .map(|p| json!({ "axes": p.value["axes"], "positions": p.value["positions"] }));

        Ok(ctx.complete(
            json!({
                "productName": product,
                "jobIdentification": {
                    "coreJobs": jobs.value["coreJobs"],
                    "totalJobs": jobs.count("coreJobs"),
                },
                "jobMaps": job_maps.value["jobMaps"],
                "outcomeAnalysis": {
                    "desiredOutcomes": outcomes.value["desiredOutcomes"],
                    "totalOutcomes": outcomes.count("desiredOutcomes"),
                },
                "opportunities": opportunities.value["opportunities"],
                "competitiveAnalysis": competitive_summary,
                "positioningMap": positioning_summary,
                "recommendations": recommendations.value["recommendations"],
            }),
            serde_json::to_value(&inputs)?,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_defaults() {
        let inputs: JtbdInputs = decode_inputs(PROCESS_ID, json!({ "productName": "Acme" })).unwrap();
        assert_eq!(inputs.minimum_job_count, 3);
        assert!(inputs.include_competitive_analysis);
        assert_eq!(inputs.research_depth, ResearchDepth::Standard);
    }

    #[test]
    fn test_rejects_unknown_depth() {
        let err = decode_inputs::<JtbdInputs>(
            PROCESS_ID,
            json!({ "productName": "Acme", "researchDepth": "extreme" }),
        )
        .unwrap_err();
        assert!(err.to_string().contains("researchDepth") || err.to_string().contains("extreme"));
    }
}

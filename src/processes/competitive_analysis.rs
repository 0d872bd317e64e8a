//! Competitive analysis.
//!
//! Surveys the market, profiles every competitor concurrently, compares
//! features and optionally builds a SWOT and a positioning map.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeSet;
use tracing::Level;

use super::common::{agent_task, decode_inputs, require};
use crate::error::Result;
use crate::workflow::{
    Breakpoint, Process, ProcessOutcome, QualityGate, RunContext, TaskCall, TaskDefinition,
};

const PROCESS_ID: &str = "product-management/competitive-analysis";
const LABELS: &[&str] = &["product-management", "competitive-analysis"];

/// Inputs of the competitive analysis process
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CompetitiveInputs {
    /// Product being positioned
    pub product_name: String,
    /// Market or category
    pub market: String,
    /// Competitors known up front
    pub competitors: Vec<String>,
    /// Fewer competitors than this halts the process
    pub minimum_competitors: usize,
    /// Run the SWOT phase
    pub include_swot: bool,
    /// Run the positioning map phase
    pub generate_positioning_map: bool,
}

impl Default for CompetitiveInputs {
    fn default() -> Self {
        Self {
            product_name: String::new(),
            market: "general".to_string(),
            competitors: Vec::new(),
            minimum_competitors: 2,
            include_swot: true,
            generate_positioning_map: true,
        }
    }
}

/// The competitive analysis process
#[derive(Debug, Clone)]
pub struct CompetitiveAnalysis {
    market_landscape: TaskDefinition,
    competitor_profile: TaskDefinition,
    feature_comparison: TaskDefinition,
    swot_analysis: TaskDefinition,
    positioning_map: TaskDefinition,
    strategic_recommendations: TaskDefinition,
}

impl Default for CompetitiveAnalysis {
    fn default() -> Self {
        Self::new()
    }
}

impl CompetitiveAnalysis {
    /// Build the process and its task definitions
    pub fn new() -> Self {
        Self {
            market_landscape: agent_task(
                "ca-market-landscape",
                "Survey the competitive landscape",
                "Market research analyst",
                &[
                    "Describe the market and its main segments",
                    "List direct and indirect competitors beyond those already named",
                ],
                LABELS,
                json!({
                    "type": "object",
                    "required": ["marketOverview", "identifiedCompetitors"],
                    "properties": {
                        "marketOverview": { "type": "string" },
                        "identifiedCompetitors": {
                            "type": "array",
                            "items": {
                                "type": "object",
                                "required": ["name", "category"],
                                "properties": {
                                    "name": { "type": "string" },
                                    "category": { "type": "string", "enum": ["direct", "indirect", "substitute"] }
                                }
                            }
                        },
                        "marketSizeUsd": { "type": "number", "minimum": 0 }
                    }
                }),
            ),
            competitor_profile: agent_task(
                "ca-competitor-profile",
                "Profile a competitor",
                "Competitive intelligence analyst",
                &[
                    "Summarize the competitor's offering, pricing and target customers",
                    "Assess its strengths and weaknesses against the product",
                ],
                LABELS,
                json!({
                    "type": "object",
                    "required": ["competitor", "strengths", "weaknesses", "threatLevel"],
                    "properties": {
                        "competitor": { "type": "string" },
                        "pricingModel": { "type": "string" },
                        "strengths": { "type": "array", "items": { "type": "string" } },
                        "weaknesses": { "type": "array", "items": { "type": "string" } },
                        "threatLevel": { "type": "string", "enum": ["low", "medium", "high"] }
                    }
                }),
            ),
            feature_comparison: agent_task(
                "ca-feature-comparison",
                "Compare features",
                "Product manager",
                &["Build a feature matrix of the product against every profiled competitor"],
                LABELS,
                json!({
                    "type": "object",
                    "required": ["features"],
                    "properties": {
                        "features": {
                            "type": "array",
                            "items": {
                                "type": "object",
                                "required": ["feature", "coverage"],
                                "properties": {
                                    "feature": { "type": "string" },
                                    "coverage": {
                                        "type": "array",
                                        "items": {
                                            "type": "object",
                                            "required": ["name", "support"],
                                            "properties": {
                                                "name": { "type": "string" },
                                                "support": { "type": "string", "enum": ["full", "partial", "none"] }
                                            }
                                        }
                                    }
                                }
                            }
                        },
                        "differentiators": { "type": "array", "items": { "type": "string" } }
                    }
                }),
            ),
            swot_analysis: agent_task(
                "ca-swot-analysis",
                "Run a SWOT analysis",
                "Strategy consultant",
                &["Summarize strengths, weaknesses, opportunities and threats for the product"],
                LABELS,
                json!({
                    "type": "object",
                    "required": ["strengths", "weaknesses", "opportunities", "threats"],
                    "properties": {
                        "strengths": { "type": "array", "items": { "type": "string" } },
                        "weaknesses": { "type": "array", "items": { "type": "string" } },
                        "opportunities": { "type": "array", "items": { "type": "string" } },
                        "threats": { "type": "array", "items": { "type": "string" } }
                    }
                }),
            ),
            positioning_map: agent_task(
                "ca-positioning-map",
                "Build competitive positioning map",
                "Product marketing manager",
                &["Place the product and each competitor on two decisive buying criteria"],
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
                        },
                        "whiteSpace": { "type": "string" }
                    }
                }),
            ),
            strategic_recommendations: agent_task(
                "ca-strategic-recommendations",
                "Recommend competitive strategy",
                "Product strategist",
                &["Recommend how to win against the highest-threat competitors"],
                LABELS,
                json!({
                    "type": "object",
                    "required": ["recommendations"],
                    "properties": {
                        "recommendations": {
                            "type": "array",
                            "items": {
                                "type": "object",
                                "required": ["recommendation", "horizon"],
                                "properties": {
                                    "recommendation": { "type": "string" },
                                    "horizon": { "type": "string", "enum": ["now", "next", "later"] },
                                    "targetCompetitor": { "type": "string" }
                                }
                            }
                        }
                    }
                }),
            ),
        }
    }
}

/// Named competitors first, then newly identified ones, without duplicates
fn merge_competitors(named: &[String], identified: &Value) -> Vec<String> {
    let mut seen = BTreeSet::new();
    let identified = identified
        .as_array()
        .into_iter()
        .flatten()
        .filter_map(|c| c.get("name").and_then(Value::as_str))
        .map(str::to_string);

    named
        .iter()
        .cloned()
        .chain(identified)
        .filter(|name| !name.trim().is_empty() && seen.insert(name.to_lowercase()))
        .collect()
}

#[async_trait]
impl Process for CompetitiveAnalysis {
    fn id(&self) -> &str {
        PROCESS_ID
    }

    fn description(&self) -> &str {
        "Profile competitors and derive a competitive strategy"
    }

    fn tasks(&self) -> Vec<TaskDefinition> {
        vec![
            self.market_landscape.clone(),
            self.competitor_profile.clone(),
            self.feature_comparison.clone(),
            self.swot_analysis.clone(),
            self.positioning_map.clone(),
            self.strategic_recommendations.clone(),
        ]
    }

    async fn run(&self, inputs: Value, ctx: &RunContext) -> Result<ProcessOutcome> {
        let inputs: CompetitiveInputs = decode_inputs(PROCESS_ID, inputs)?;
        require(PROCESS_ID, "productName", &inputs.product_name)?;
        let product = inputs.product_name.as_str();

        let landscape = ctx
            .task(
                &self.market_landscape,
                json!({
                    "productName": product,
                    "market": inputs.market,
                    "knownCompetitors": inputs.competitors,
                }),
            )
            .await?;

        let competitors =
            merge_competitors(&inputs.competitors, &landscape.value["identifiedCompetitors"]);
        let gate = QualityGate::new(
            "market-landscape",
            "Name competitors explicitly or widen the market definition",
        );
        if let Err(failure) =
            gate.at_least("competitors", competitors.len(), inputs.minimum_competitors)
        {
            ctx.log(Level::WARN, &failure.error);
            return Ok(failure.into());
        }

        let calls = competitors
            .iter()
            .map(|competitor| {
                TaskCall::new(
                    &self.competitor_profile,
                    json!({
                        "productName": product,
                        "competitor": competitor,
                        "market": inputs.market,
                    }),
                )
            })
            .collect();
        let profiles = ctx.parallel_all(calls).await?;
        let profile_values: Vec<Value> = profiles.iter().map(|p| p.value.clone()).collect();
        let high_threats = profiles
            .iter()
            .filter(|p| p.value["threatLevel"] == "high")
            .count();

        let features = ctx
            .task(
                &self.feature_comparison,
                json!({ "productName": product, "profiles": profile_values }),
            )
            .await?;

        let swot = if inputs.include_swot {
            Some(
                ctx.task(
                    &self.swot_analysis,
                    json!({
                        "productName": product,
                        "profiles": profile_values,
                        "differentiators": features.value.get("differentiators"),
                    }),
                )
                .await?,
            )
        } else {
            None
        };

        let positioning = if inputs.generate_positioning_map {
            Some(
                ctx.task(
                    &self.positioning_map,
                    json!({
                        "productName": product,
                        "competitors": competitors,
                        "features": features.value["features"],
                    }),
                )
                .await?,
            )
        } else {
            None
        };

        ctx.breakpoint(
            Breakpoint::new(
                "Competitive landscape",
                format!(
                    "{} competitors profiled for {} ({} high threat). Proceed to strategic recommendations?",
                    profiles.len(),
                    product,
                    high_threats
                ),
            )
            .with_summary("competitors", competitors.len())
            .with_summary("highThreats", high_threats)
            .with_summary("features", features.count("features")),
        )
        .await?;

        let swot_value = swot.as_ref().map(|s| s.value.clone());
        let positioning_value = positioning
            .as_ref()
            .map(|p| json!({ "axes": p.value["axes"], "positions": p.value["positions"] }));

        let recommendations = ctx
            .task(
                &self.strategic_recommendations,
                json!({
                    "productName": product,
                    "profiles": profile_values,
                    "swot": swot_value,
                    "positioningMap": positioning_value,
                }),
            )
            .await?;

        let competitor_summaries: Vec<Value> = profiles
            .iter()
            .map(|p| {
                json!({
                    "competitor": p.value["competitor"],
                    "threatLevel": p.value["threatLevel"],
                })
            })
            .collect();

        Ok(ctx.complete(
            json!({
                "productName": product,
                "marketOverview": landscape.value["marketOverview"],
                "competitors": competitor_summaries,
                "featureComparison": features.value["features"],
                "swot": swot_value,
                "positioningMap": positioning_value,
                "recommendations": recommendations.value["recommendations"],
            }),
            serde_json::to_value(&inputs)?,
        ))
    }
}

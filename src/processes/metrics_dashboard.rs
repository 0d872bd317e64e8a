//! Metrics dashboard setup.
//!
//! Halts when no KPI comes out of the KPI definition phase.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::Level;

use super::common::{agent_task, decode_inputs, require};
use crate::error::Result;
use crate::workflow::{Breakpoint, Process, ProcessOutcome, QualityGate, RunContext, TaskDefinition};

const PROCESS_ID: &str = "product-management/metrics-dashboard";
const LABELS: &[&str] = &["product-management", "metrics-dashboard"];

/// Audience and purpose of the dashboard
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DashboardType {
    /// Day-to-day health for the team
    #[default]
    Operational,
    /// Goal tracking for leadership
    Strategic,
    /// Exploration for analysts
    Analytical,
}

/// Inputs of the metrics dashboard process
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DashboardInputs {
    /// Product being measured
    pub product_name: String,
    /// Dashboard flavor
    pub dashboard_type: DashboardType,
    /// Goals the KPIs must trace back to
    pub business_goals: Vec<String>,
    /// How often data refreshes
    pub refresh_cadence: String,
    /// Run the alerting phase
    pub include_alerts: bool,
}

impl Default for DashboardInputs {
    fn default() -> Self {
        Self {
            product_name: String::new(),
            dashboard_type: DashboardType::Operational,
            business_goals: Vec::new(),
            refresh_cadence: "daily".to_string(),
            include_alerts: true,
        }
    }
}

/// The metrics dashboard process
#[derive(Debug, Clone)]
pub struct MetricsDashboard {
    goal_mapping: TaskDefinition,
    kpi_definition: TaskDefinition,
    data_sources: TaskDefinition,
    layout_design: TaskDefinition,
    alert_rules: TaskDefinition,
    implementation_plan: TaskDefinition,
}

impl Default for MetricsDashboard {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsDashboard {
    /// Build the process and its task definitions
    pub fn new() -> Self {
        Self {
            goal_mapping: agent_task(
                "md-goal-mapping",
                "Map business goals to questions",
                "Product analytics lead",
                &["Turn each business goal into the questions the dashboard must answer"],
                LABELS,
                json!({
                    "type": "object",
                    "required": ["goals"],
                    "properties": {
                        "goals": {
                            "type": "array",
                            "items": {
                                "type": "object",
                                "required": ["goal", "questions"],
                                "properties": {
                                    "goal": { "type": "string" },
                                    "questions": { "type": "array", "items": { "type": "string" } }
                                }
                            }
                        }
                    }
                }),
            ),
            kpi_definition: agent_task(
                "md-kpi-definition",
                "Define KPIs",
                "Product analytics lead",
                &[
                    "Define a KPI for each question with a formula and a unit",
                    "Set a target plus warning and critical thresholds",
                ],
                LABELS,
                json!({
                    "type": "object",
                    "required": ["kpis"],
                    "properties": {
                        "kpis": {
                            "type": "array",
                            "items": {
                                "type": "object",
                                "required": ["name", "formula", "target", "thresholds"],
                                "properties": {
                                    "name": { "type": "string" },
                                    "formula": { "type": "string" },
                                    "unit": { "type": "string" },
                                    "target": { "type": "number" },
                                    "direction": { "type": "string", "enum": ["higher-is-better", "lower-is-better"] },
                                    "thresholds": {
                                        "type": "object",
                                        "required": ["warning", "critical"],
                                        "properties": {
                                            "warning": { "type": "number" },
                                            "critical": { "type": "number" }
                                        }
                                    }
                                }
                            }
                        }
                    }
                }),
            ),
            data_sources: agent_task(
                "md-data-sources",
                "Identify data sources",
                "Data engineer",
                &["Name the source system and freshness for each KPI input"],
                LABELS,
                json!({
                    "type": "object",
                    "required": ["sources"],
                    "properties": {
                        "sources": {
                            "type": "array",
                            "items": {
                                "type": "object",
                                "required": ["name", "system", "latencyMinutes"],
                                "properties": {
                                    "name": { "type": "string" },
                                    "system": { "type": "string" },
                                    "latencyMinutes": { "type": "integer", "minimum": 0 },
                                    "kpis": { "type": "array", "items": { "type": "string" } }
                                }
                            }
                        },
                        "gaps": { "type": "array", "items": { "type": "string" } }
                    }
                }),
            ),
            layout_design: agent_task(
                "md-layout-design",
                "Design dashboard layout",
                "Data visualization designer",
                &[
                    "Lay out panels so the most important KPIs are read first",
                    "Pick a chart type per KPI",
                ],
                LABELS,
                json!({
                    "type": "object",
                    "required": ["panels"],
                    "properties": {
                        "panels": {
                            "type": "array",
                            "items": {
                                "type": "object",
                                "required": ["kpi", "visualization", "position"],
                                "properties": {
                                    "kpi": { "type": "string" },
                                    "visualization": { "type": "string", "enum": ["number", "line", "bar", "table", "gauge"] },
                                    "position": { "type": "integer", "minimum": 1 }
                                }
                            }
                        }
                    }
                }),
            ),
            alert_rules: agent_task(
                "md-alert-rules",
                "Define alert rules",
                "Site reliability engineer",
                &["Derive alert rules from the KPI thresholds and route them to owners"],
                LABELS,
                json!({
                    "type": "object",
                    "required": ["rules"],
                    "properties": {
                        "rules": {
                            "type": "array",
                            "items": {
                                "type": "object",
                                "required": ["kpi", "severity", "owner"],
                                "properties": {
                                    "kpi": { "type": "string" },
                                    "severity": { "type": "string", "enum": ["warning", "critical"] },
                                    "owner": { "type": "string" }
                                }
                            }
                        }
                    }
                }),
            ),
            implementation_plan: agent_task(
                "md-implementation-plan",
                "Plan dashboard implementation",
                "Analytics engineering manager",
                &["Sequence the build of data pipelines, panels and alerts"],
                LABELS,
                json!({
                    "type": "object",
                    "required": ["phases"],
                    "properties": {
                        "phases": {
                            "type": "array",
                            "items": {
                                "type": "object",
                                "required": ["phase", "durationWeeks"],
                                "properties": {
                                    "phase": { "type": "string" },
                                    "durationWeeks": { "type": "number", "minimum": 0 }
                                }
                            }
                        },
                        "tooling": { "type": "string" }
                    }
                }),
            ),
        }
    }
}

#[async_trait]
impl Process for MetricsDashboard {
    fn id(&self) -> &str {
        PROCESS_ID
    }

    fn description(&self) -> &str {
        "Define KPIs and design a product metrics dashboard"
    }

    fn tasks(&self) -> Vec<TaskDefinition> {
        vec![
            self.goal_mapping.clone(),
            self.kpi_definition.clone(),
            self.data_sources.clone(),
            self.layout_design.clone(),
            self.alert_rules.clone(),
            self.implementation_plan.clone(),
        ]
    }

    async fn run(&self, inputs: Value, ctx: &RunContext) -> Result<ProcessOutcome> {
        let inputs: DashboardInputs = decode_inputs(PROCESS_ID, inputs)?;
        require(PROCESS_ID, "productName", &inputs.product_name)?;
        let product = inputs.product_name.as_str();

        let goals = ctx
            .task(
                &self.goal_mapping,
                json!({
                    "productName": product,
                    "businessGoals": inputs.business_goals,
                    "dashboardType": inputs.dashboard_type,
                }),
            )
            .await?;

        let kpis = ctx
            .task(
                &self.kpi_definition,
                json!({
                    "productName": product,
                    "goals": goals.value["goals"],
                    "dashboardType": inputs.dashboard_type,
                }),
            )
            .await?;

        let gate = QualityGate::new(
            "kpi-definition",
            "Clarify the business goals so that at least one KPI can be defined",
        );
        if let Err(failure) = gate.check(kpis.count("kpis") > 0, "No KPIs defined") {
            ctx.log(Level::WARN, &failure.error);
            return Ok(failure.into());
        }

        let sources = ctx
            .task(
                &self.data_sources,
                json!({
                    "productName": product,
                    "kpis": kpis.value["kpis"],
                    "refreshCadence": inputs.refresh_cadence,
                }),
            )
            .await?;

        let layout = ctx
            .task(
                &self.layout_design,
                json!({
                    "productName": product,
                    "kpis": kpis.value["kpis"],
                    "dashboardType": inputs.dashboard_type,
                }),
            )
            .await?;

        let alerts = if inputs.include_alerts {
            Some(
                ctx.task(
                    &self.alert_rules,
                    json!({ "productName": product, "kpis": kpis.value["kpis"] }),
                )
                .await?,
            )
        } else {
            None
        };
        let alert_rules = alerts.as_ref().map(|a| a.value["rules"].clone());

        ctx.breakpoint(
            Breakpoint::new(
                "Dashboard design review",
                format!(
                    "{} KPIs across {} panels for the {} dashboard. Approve the design?",
                    kpis.count("kpis"),
                    layout.count("panels"),
                    product
                ),
            )
            .with_summary("kpis", kpis.count("kpis"))
            .with_summary("dataSources", sources.count("sources"))
            .with_summary("dataGaps", sources.count("gaps"))
            .with_summary("alertRules", alerts.as_ref().map(|a| a.count("rules")).unwrap_or(0)),
        )
        .await?;

        let plan = ctx
            .task(
                &self.implementation_plan,
                json!({
                    "productName": product,
                    "sources": sources.value["sources"],
                    "panels": layout.value["panels"],
                    "alertRules": alert_rules,
                }),
            )
            .await?;

        Ok(ctx.complete(
            json!({
                "productName": product,
                "dashboardType": inputs.dashboard_type,
                "goals": goals.value["goals"],
                "kpis": kpis.value["kpis"],
                "dataSources": sources.value["sources"],
                "layout": layout.value["panels"],
                "alertRules": alert_rules,
                "implementationPlan": plan.value["phases"],
            }),
            serde_json::to_value(&inputs)?,
        ))
    }
}

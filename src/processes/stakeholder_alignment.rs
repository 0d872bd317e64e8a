//! Stakeholder alignment for a product initiative.
//!
//! Interviews each stakeholder group concurrently, resolves conflicts into
//! an alignment plan and collects sign-off. Rejections in the sign-off are
//! reported in the result; they do not stop the process.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::Level;

use super::common::{agent_task, decode_inputs, require};
use crate::error::Result;
use crate::workflow::{
    Breakpoint, Process, ProcessOutcome, QualityGate, RunContext, TaskCall, TaskDefinition,
};

const PROCESS_ID: &str = "product-management/stakeholder-alignment";
const LABELS: &[&str] = &["product-management", "stakeholder-alignment"];

/// Inputs of the stakeholder alignment process
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StakeholderInputs {
    /// Product the initiative belongs to
    pub product_name: String,
    /// Initiative that needs alignment
    pub initiative: String,
    /// Groups to interview
    pub stakeholder_groups: Vec<String>,
    /// Run the sign-off phase
    pub require_signoff: bool,
}

impl Default for StakeholderInputs {
    fn default() -> Self {
        Self {
            product_name: String::new(),
            initiative: String::new(),
            stakeholder_groups: ["engineering", "sales", "marketing", "support", "leadership"]
                .iter()
                .map(|g| g.to_string())
                .collect(),
            require_signoff: true,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct SignoffTally {
    approved_count: u64,
    rejected_count: u64,
    conditional_count: u64,
}

/// The stakeholder alignment process
#[derive(Debug, Clone)]
pub struct StakeholderAlignment {
    stakeholder_mapping: TaskDefinition,
    group_interview: TaskDefinition,
    conflict_analysis: TaskDefinition,
    alignment_plan: TaskDefinition,
    stakeholder_signoff: TaskDefinition,
    communication_plan: TaskDefinition,
}

impl Default for StakeholderAlignment {
    fn default() -> Self {
        Self::new()
    }
}

impl StakeholderAlignment {
    /// Build the process and its task definitions
    pub fn new() -> Self {
        Self {
            stakeholder_mapping: agent_task(
                "sa-stakeholder-mapping",
                "Map stakeholders",
                "Product operations lead",
                &[
                    "Identify the people affected by or deciding on the initiative",
                    "Rate each stakeholder's influence and interest",
                ],
                LABELS,
                json!({
                    "type": "object",
                    "required": ["stakeholders"],
                    "properties": {
                        "stakeholders": {
                            "type": "array",
                            "items": {
                                "type": "object",
                                "required": ["name", "group", "influence", "interest"],
                                "properties": {
                                    "name": { "type": "string" },
                                    "group": { "type": "string" },
                                    "influence": { "type": "string", "enum": ["high", "medium", "low"] },
                                    "interest": { "type": "string", "enum": ["high", "medium", "low"] }
                                }
                            }
                        }
                    }
                }),
            ),
            group_interview: agent_task(
                "sa-group-interview",
                "Interview a stakeholder group",
                "User researcher",
                &[
                    "Capture the group's priorities and concerns about the initiative",
                    "Note what the group needs in order to support it",
                ],
                LABELS,
                json!({
                    "type": "object",
                    "required": ["group", "priorities", "concerns", "supportLevel"],
                    "properties": {
                        "group": { "type": "string" },
                        "priorities": { "type": "array", "items": { "type": "string" } },
                        "concerns": { "type": "array", "items": { "type": "string" } },
                        "supportLevel": { "type": "integer", "minimum": 1, "maximum": 5 }
                    }
                }),
            ),
            conflict_analysis: agent_task(
                "sa-conflict-analysis",
                "Analyze stakeholder conflicts",
                "Mediator",
                &["Find where group priorities conflict and propose trade-offs"],
                LABELS,
                json!({
                    "type": "object",
                    "required": ["conflicts"],
                    "properties": {
                        "conflicts": {
                            "type": "array",
                            "items": {
                                "type": "object",
                                "required": ["between", "issue", "severity"],
                                "properties": {
                                    "between": { "type": "array", "minItems": 2, "items": { "type": "string" } },
                                    "issue": { "type": "string" },
                                    "severity": { "type": "string", "enum": ["low", "medium", "high"] },
                                    "proposedResolution": { "type": "string" }
                                }
                            }
                        }
                    }
                }),
            ),
            alignment_plan: agent_task(
                "sa-alignment-plan",
                "Build the alignment plan",
                "Program manager",
                &[
                    "Assign responsible, accountable, consulted and informed parties",
                    "List the decisions that need sign-off",
                ],
                LABELS,
                json!({
                    "type": "object",
                    "required": ["raci", "decisions"],
                    "properties": {
                        "raci": {
                            "type": "array",
                            "items": {
                                "type": "object",
                                "required": ["activity", "responsible", "accountable"],
                                "properties": {
                                    "activity": { "type": "string" },
                                    "responsible": { "type": "string" },
                                    "accountable": { "type": "string" },
                                    "consulted": { "type": "array", "items": { "type": "string" } },
                                    "informed": { "type": "array", "items": { "type": "string" } }
                                }
                            }
                        },
                        "decisions": { "type": "array", "items": { "type": "string" } }
                    }
                }),
            ),
            stakeholder_signoff: agent_task(
                "sa-stakeholder-signoff",
                "Collect stakeholder sign-off",
                "Program manager",
                &[
                    "Record each stakeholder's sign-off decision on the alignment plan",
                    "Capture conditions attached to conditional approvals",
                ],
                LABELS,
                json!({
                    "type": "object",
                    "required": ["signoffs", "approvedCount", "rejectedCount", "conditionalCount"],
                    "properties": {
                        "signoffs": {
                            "type": "array",
                            "items": {
                                "type": "object",
                                "required": ["stakeholder", "decision"],
                                "properties": {
                                    "stakeholder": { "type": "string" },
                                    "decision": { "type": "string", "enum": ["approved", "rejected", "conditional"] },
                                    "conditions": { "type": "array", "items": { "type": "string" } }
                                }
                            }
                        },
                        "approvedCount": { "type": "integer", "minimum": 0 },
                        "rejectedCount": { "type": "integer", "minimum": 0 },
                        "conditionalCount": { "type": "integer", "minimum": 0 }
                    }
                }),
            ),
            communication_plan: agent_task(
                "sa-communication-plan",
                "Plan alignment communications",
                "Internal communications lead",
                &["Plan how each group is kept informed as the initiative progresses"],
                LABELS,
                json!({
                    "type": "object",
                    "required": ["updates"],
                    "properties": {
                        "updates": {
                            "type": "array",
                            "items": {
                                "type": "object",
                                "required": ["audience", "cadence"],
                                "properties": {
                                    "audience": { "type": "string" },
                                    "cadence": { "type": "string", "enum": ["weekly", "biweekly", "monthly", "milestone"] },
                                    "channel": { "type": "string" }
                                }
                            }
                        }
                    }
                }),
            ),
        }
    }
}

#[async_trait]
impl Process for StakeholderAlignment {
    fn id(&self) -> &str {
        PROCESS_ID
    }

    fn description(&self) -> &str {
        "Align stakeholder groups on an initiative and collect sign-off"
    }

    fn tasks(&self) -> Vec<TaskDefinition> {
        vec![
            self.stakeholder_mapping.clone(),
            self.group_interview.clone(),
            self.conflict_analysis.clone(),
            self.alignment_plan.clone(),
            self.stakeholder_signoff.clone(),
            self.communication_plan.clone(),
        ]
    }

    async fn run(&self, inputs: Value, ctx: &RunContext) -> Result<ProcessOutcome> {
        let inputs: StakeholderInputs = decode_inputs(PROCESS_ID, inputs)?;
        require(PROCESS_ID, "productName", &inputs.product_name)?;
        let product = inputs.product_name.as_str();
        let initiative = if inputs.initiative.is_empty() {
            product
        } else {
            inputs.initiative.as_str()
        };

        let mapping = ctx
            .task(
                &self.stakeholder_mapping,
                json!({
                    "productName": product,
                    "initiative": initiative,
                    "stakeholderGroups": inputs.stakeholder_groups,
                }),
            )
            .await?;

        let gate = QualityGate::new(
            "stakeholder-mapping",
            "Name at least one stakeholder group and owner for the initiative",
        );
        if let Err(failure) = gate.check(
            mapping.count("stakeholders") > 0 && !inputs.stakeholder_groups.is_empty(),
            "No stakeholders identified",
        ) {
            ctx.log(Level::WARN, &failure.error);
            return Ok(failure.into());
        }

        let calls = inputs
            .stakeholder_groups
            .iter()
            .map(|group| {
                TaskCall::new(
                    &self.group_interview,
                    json!({
                        "productName": product,
                        "initiative": initiative,
                        "group": group,
                        "stakeholders": mapping.value["stakeholders"],
                    }),
                )
            })
            .collect();
        let interviews = ctx.parallel_all(calls).await?;
        let interview_values: Vec<Value> = interviews.iter().map(|i| i.value.clone()).collect();

        let conflicts = ctx
            .task(
                &self.conflict_analysis,
                json!({ "productName": product, "interviews": interview_values }),
            )
            .await?;

        let plan = ctx
            .task(
                &self.alignment_plan,
                json!({
                    "productName": product,
                    "initiative": initiative,
                    "conflicts": conflicts.value["conflicts"],
                    "stakeholders": mapping.value["stakeholders"],
                }),
            )
            .await?;

        ctx.breakpoint(
            Breakpoint::new(
                "Alignment plan review",
                format!(
                    "{} conflicts found across {} groups. Is the alignment plan ready for sign-off?",
                    conflicts.count("conflicts"),
                    interviews.len()
                ),
            )
            .with_summary("stakeholders", mapping.count("stakeholders"))
            .with_summary("groupsInterviewed", interviews.len())
            .with_summary("conflicts", conflicts.count("conflicts"))
            .with_summary("decisions", plan.count("decisions")),
        )
        .await?;

        let signoff = if inputs.require_signoff {
            let result = ctx
                .task(
                    &self.stakeholder_signoff,
                    json!({
                        "productName": product,
                        "initiative": initiative,
                        "raci": plan.value["raci"],
                        "decisions": plan.value["decisions"],
                    }),
                )
                .await?;
            let tally: SignoffTally = result.parse()?;
            if tally.rejected_count > 0 {
                ctx.log(
                    Level::WARN,
                    &format!("{} stakeholders rejected the alignment plan", tally.rejected_count),
                );
            }
            Some(json!({
                "signoffs": result.value["signoffs"],
                "approvedCount": tally.approved_count,
                "rejectedCount": tally.rejected_count,
                "conditionalCount": tally.conditional_count,
                "fullyAligned": tally.rejected_count == 0 && tally.conditional_count == 0,
            }))
        } else {
            None
        };

        let communications = ctx
            .task(
                &self.communication_plan,
                json!({
                    "productName": product,
                    "stakeholderGroups": inputs.stakeholder_groups,
                    "signoff": signoff,
                }),
            )
            .await?;

        let group_summaries: Vec<Value> = interviews
            .iter()
            .map(|i| {
                json!({
                    "group": i.value["group"],
                    "supportLevel": i.value["supportLevel"],
                    "concerns": i.count("concerns"),
                })
            })
            .collect();

        Ok(ctx.complete(
            json!({
                "productName": product,
                "initiative": initiative,
                "stakeholders": mapping.value["stakeholders"],
                "groups": group_summaries,
                "conflicts": conflicts.value["conflicts"],
                "alignmentPlan": {
                    "raci": plan.value["raci"],
                    "decisions": plan.value["decisions"],
                },
                "signoff": signoff,
                "communicationPlan": communications.value["updates"],
            }),
            serde_json::to_value(&inputs)?,
        ))
    }
}

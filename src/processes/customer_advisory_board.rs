//! Customer Advisory Board setup.
//!
//! Fourteen sequential phases from program objectives to launch, with
//! reviews after the program design, after the charter and meeting plan,
//! and before launch.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::Level;

use super::common::{agent_task, decode_inputs, field, require};
use crate::error::Result;
use crate::workflow::{Breakpoint, Process, ProcessOutcome, RunContext, TaskDefinition};

const PROCESS_ID: &str = "product-management/customer-advisory-board";
const LABELS: &[&str] = &["product-management", "customer-advisory-board"];

/// How often the board meets
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MeetingFrequency {
    /// Twelve meetings a year
    Monthly,
    /// Four meetings a year
    #[default]
    Quarterly,
    /// Two meetings a year
    SemiAnnual,
    /// One meeting a year
    Annual,
}

impl MeetingFrequency {
    /// Meetings per year at this cadence
    pub fn meetings_per_year(&self) -> u32 {
        match self {
            Self::Monthly => 12,
            Self::Quarterly => 4,
            Self::SemiAnnual => 2,
            Self::Annual => 1,
        }
    }
}

/// Inputs of the advisory board process
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CabInputs {
    /// Product the board advises on
    pub product_name: String,
    /// Target number of members
    pub board_size: u32,
    /// Meeting cadence
    pub meeting_frequency: MeetingFrequency,
    /// Length of one membership term
    pub program_duration_months: u32,
    /// Customer segments to recruit from
    pub target_segments: Vec<String>,
    /// Whether virtual sessions complement in-person meetings
    pub include_virtual_meetings: bool,
}

impl Default for CabInputs {
    fn default() -> Self {
        Self {
            product_name: String::new(),
            board_size: 12,
            meeting_frequency: MeetingFrequency::Quarterly,
            program_duration_months: 24,
            target_segments: vec!["enterprise".to_string(), "mid-market".to_string()],
            include_virtual_meetings: true,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProgramStructure {
    board_size: u32,
    meeting_frequency: String,
    term_length_months: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MeetingStructure {
    annual_meetings: u32,
    format: String,
}

/// The customer advisory board process
#[derive(Debug, Clone)]
pub struct CustomerAdvisoryBoard {
    objectives: TaskDefinition,
    program_structure: TaskDefinition,
    member_criteria: TaskDefinition,
    candidate_identification: TaskDefinition,
    recruitment_outreach: TaskDefinition,
    charter: TaskDefinition,
    meeting_structure: TaskDefinition,
    engagement_plan: TaskDefinition,
    feedback_framework: TaskDefinition,
    communication_plan: TaskDefinition,
    governance: TaskDefinition,
    success_metrics: TaskDefinition,
    budget: TaskDefinition,
    launch_plan: TaskDefinition,
}

impl Default for CustomerAdvisoryBoard {
    fn default() -> Self {
        Self::new()
    }
}

impl CustomerAdvisoryBoard {
    /// Build the process and its task definitions
    pub fn new() -> Self {
        Self {
            objectives: agent_task(
                "cab-objectives",
                "Define advisory board objectives",
                "Customer success strategist",
                &[
                    "Identify the strategic questions the board should help answer",
                    "Tie each objective to a product or business outcome",
                    "State how success will be recognized",
                ],
                LABELS,
                json!({
                    "type": "object",
                    "required": ["objectives", "strategicThemes"],
                    "properties": {
                        "objectives": {
                            "type": "array",
                            "minItems": 1,
                            "items": {
                                "type": "object",
                                "required": ["objective", "priority"],
                                "properties": {
                                    "objective": { "type": "string" },
                                    "priority": { "type": "string", "enum": ["high", "medium", "low"] },
                                    "successIndicator": { "type": "string" }
                                }
                            }
                        },
                        "strategicThemes": { "type": "array", "items": { "type": "string" } }
                    }
                }),
            ),
            program_structure: agent_task(
                "cab-program-structure",
                "Design advisory board program structure",
                "Program manager",
                &[
                    "Size the board against the requested target",
                    "Set the meeting cadence and membership term",
                    "Describe tiers or sub-committees if any",
                ],
                LABELS,
                json!({
                    "type": "object",
                    "required": ["boardSize", "meetingFrequency", "termLengthMonths"],
                    "properties": {
                        "boardSize": { "type": "integer", "minimum": 3, "maximum": 50 },
                        "meetingFrequency": {
                            "type": "string",
                            "enum": ["monthly", "quarterly", "semi-annual", "annual"]
                        },
                        "termLengthMonths": { "type": "integer", "minimum": 6, "maximum": 60 },
                        "tiers": { "type": "array", "items": { "type": "string" } }
                    }
                }),
            ),
            member_criteria: agent_task(
                "cab-member-criteria",
                "Define member selection criteria",
                "Customer insights lead",
                &[
                    "Define must-have and nice-to-have member attributes",
                    "Balance segments, company sizes and personas",
                    "Weight each criterion",
                ],
                LABELS,
                json!({
                    "type": "object",
                    "required": ["criteria"],
                    "properties": {
                        "criteria": {
                            "type": "array",
                            "minItems": 1,
                            "items": {
                                "type": "object",
                                "required": ["criterion", "weight"],
                                "properties": {
                                    "criterion": { "type": "string" },
                                    "weight": { "type": "number", "minimum": 0, "maximum": 1 },
                                    "mandatory": { "type": "boolean" }
                                }
                            }
                        },
                        "diversityTargets": { "type": "array", "items": { "type": "string" } }
                    }
                }),
            ),
            candidate_identification: agent_task(
                "cab-candidate-identification",
                "Identify board candidates",
                "Account strategist",
                &[
                    "Shortlist customers matching the selection criteria",
                    "Score each candidate against every criterion",
                    "Keep more candidates than open seats",
                ],
                LABELS,
                json!({
                    "type": "object",
                    "required": ["candidates"],
                    "properties": {
                        "candidates": {
                            "type": "array",
                            "items": {
                                "type": "object",
                                "required": ["company", "score"],
                                "properties": {
                                    "company": { "type": "string" },
                                    "contactRole": { "type": "string" },
                                    "segment": { "type": "string" },
                                    "score": { "type": "number", "minimum": 0, "maximum": 100 }
                                }
                            }
                        }
                    }
                }),
            ),
            recruitment_outreach: agent_task(
                "cab-recruitment-outreach",
                "Plan recruitment outreach",
                "Customer marketing manager",
                &[
                    "Draft the invitation message and value proposition for members",
                    "Sequence outreach by candidate score",
                ],
                LABELS,
                json!({
                    "type": "object",
                    "required": ["invitationTemplate", "outreachSequence"],
                    "properties": {
                        "invitationTemplate": { "type": "string" },
                        "memberBenefits": { "type": "array", "items": { "type": "string" } },
                        "outreachSequence": {
                            "type": "array",
                            "items": {
                                "type": "object",
                                "required": ["step", "channel"],
                                "properties": {
                                    "step": { "type": "integer", "minimum": 1 },
                                    "channel": { "type": "string", "enum": ["email", "call", "executive-sponsor", "event"] }
                                }
                            }
                        }
                    }
                }),
            ),
            charter: agent_task(
                "cab-charter",
                "Draft advisory board charter",
                "Program manager",
                &[
                    "State purpose, scope and member commitments",
                    "Cover confidentiality and intellectual property terms",
                ],
                LABELS,
                json!({
                    "type": "object",
                    "required": ["purpose", "commitments"],
                    "properties": {
                        "purpose": { "type": "string" },
                        "commitments": { "type": "array", "items": { "type": "string" } },
                        "confidentiality": { "type": "string" }
                    }
                }),
            ),
            meeting_structure: agent_task(
                "cab-meeting-structure",
                "Design meeting structure",
                "Program manager",
                &[
                    "Derive the number of meetings per year from the cadence",
                    "Draft a reusable agenda template",
                    "Choose in-person, virtual or hybrid format",
                ],
                LABELS,
                json!({
                    "type": "object",
                    "required": ["annualMeetings", "format", "agendaTemplate"],
                    "properties": {
                        "annualMeetings": { "type": "integer", "minimum": 1, "maximum": 12 },
                        "format": { "type": "string", "enum": ["in-person", "virtual", "hybrid"] },
                        "durationHours": { "type": "number", "minimum": 0.5, "maximum": 16 },
                        "agendaTemplate": { "type": "array", "items": { "type": "string" } }
                    }
                }),
            ),
            engagement_plan: agent_task(
                "cab-engagement-plan",
                "Plan member engagement between meetings",
                "Community manager",
                &["Propose touchpoints that keep members engaged between meetings"],
                LABELS,
                json!({
                    "type": "object",
                    "required": ["activities"],
                    "properties": {
                        "activities": {
                            "type": "array",
                            "items": {
                                "type": "object",
                                "required": ["activity", "cadence"],
                                "properties": {
                                    "activity": { "type": "string" },
                                    "cadence": { "type": "string" }
                                }
                            }
                        }
                    }
                }),
            ),
            feedback_framework: agent_task(
                "cab-feedback-framework",
                "Define feedback capture framework",
                "Product operations lead",
                &[
                    "Define how feedback is captured, triaged and routed to product teams",
                    "Define how members hear back about their feedback",
                ],
                LABELS,
                json!({
                    "type": "object",
                    "required": ["captureMethods", "closeTheLoop"],
                    "properties": {
                        "captureMethods": { "type": "array", "items": { "type": "string" } },
                        "triageSlaDays": { "type": "integer", "minimum": 1 },
                        "closeTheLoop": { "type": "string" }
                    }
                }),
            ),
            communication_plan: agent_task(
                "cab-communication-plan",
                "Plan board communications",
                "Customer marketing manager",
                &["Plan internal and member-facing communications for the program"],
                LABELS,
                json!({
                    "type": "object",
                    "required": ["channels"],
                    "properties": {
                        "channels": {
                            "type": "array",
                            "items": {
                                "type": "object",
                                "required": ["audience", "channel"],
                                "properties": {
                                    "audience": { "type": "string", "enum": ["members", "internal", "executives"] },
                                    "channel": { "type": "string" },
                                    "frequency": { "type": "string" }
                                }
                            }
                        }
                    }
                }),
            ),
            governance: agent_task(
                "cab-governance",
                "Define program governance",
                "Executive sponsor liaison",
                &[
                    "Assign owners for the program, meetings and follow-ups",
                    "Define member rotation and offboarding rules",
                ],
                LABELS,
                json!({
                    "type": "object",
                    "required": ["roles", "rotationPolicy"],
                    "properties": {
                        "roles": {
                            "type": "array",
                            "items": {
                                "type": "object",
                                "required": ["role", "owner"],
                                "properties": {
                                    "role": { "type": "string" },
                                    "owner": { "type": "string" }
                                }
                            }
                        },
                        "rotationPolicy": { "type": "string" }
                    }
                }),
            ),
            success_metrics: agent_task(
                "cab-success-metrics",
                "Define program success metrics",
                "Product analytics lead",
                &[
                    "Define measurable indicators of program health",
                    "Set warning and target thresholds for each",
                ],
                LABELS,
                json!({
                    "type": "object",
                    "required": ["metrics"],
                    "properties": {
                        "metrics": {
                            "type": "array",
                            "items": {
                                "type": "object",
                                "required": ["name", "target"],
                                "properties": {
                                    "name": { "type": "string" },
                                    "target": { "type": "number" },
                                    "thresholds": {
                                        "type": "object",
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
            budget: agent_task(
                "cab-budget",
                "Estimate program budget",
                "Finance partner",
                &["Estimate annual cost by line item given meeting cadence and format"],
                LABELS,
                json!({
                    "type": "object",
                    "required": ["annualBudget", "lineItems"],
                    "properties": {
                        "annualBudget": { "type": "number", "minimum": 0 },
                        "currency": { "type": "string" },
                        "lineItems": {
                            "type": "array",
                            "items": {
                                "type": "object",
                                "required": ["item", "amount"],
                                "properties": {
                                    "item": { "type": "string" },
                                    "amount": { "type": "number", "minimum": 0 }
                                }
                            }
                        }
                    }
                }),
            ),
            launch_plan: agent_task(
                "cab-launch-plan",
                "Plan the advisory board launch",
                "Program manager",
                &[
                    "Sequence the launch milestones from invitations to the kickoff meeting",
                    "Flag launch risks with mitigations",
                ],
                LABELS,
                json!({
                    "type": "object",
                    "required": ["milestones", "readiness"],
                    "properties": {
                        "milestones": {
                            "type": "array",
                            "items": {
                                "type": "object",
                                "required": ["milestone", "weekOffset"],
                                "properties": {
                                    "milestone": { "type": "string" },
                                    "weekOffset": { "type": "integer", "minimum": 0 }
                                }
                            }
                        },
                        "risks": { "type": "array", "items": { "type": "string" } },
                        "readiness": { "type": "string", "enum": ["ready", "ready-with-risks", "not-ready"] }
                    }
                }),
            ),
        }
    }
}

#[async_trait]
impl Process for CustomerAdvisoryBoard {
    fn id(&self) -> &str {
        PROCESS_ID
    }

    fn description(&self) -> &str {
        "Set up a customer advisory board from objectives through launch"
    }

    fn tasks(&self) -> Vec<TaskDefinition> {
        vec![
            self.objectives.clone(),
            self.program_structure.clone(),
            self.member_criteria.clone(),
            self.candidate_identification.clone(),
            self.recruitment_outreach.clone(),
            self.charter.clone(),
            self.meeting_structure.clone(),
            self.engagement_plan.clone(),
            self.feedback_framework.clone(),
            self.communication_plan.clone(),
            self.governance.clone(),
            self.success_metrics.clone(),
            self.budget.clone(),
            self.launch_plan.clone(),
        ]
    }

    async fn run(&self, inputs: Value, ctx: &RunContext) -> Result<ProcessOutcome> {
        let inputs: CabInputs = decode_inputs(PROCESS_ID, inputs)?;
        require(PROCESS_ID, "productName", &inputs.product_name)?;
        let product = inputs.product_name.as_str();
        ctx.log(Level::INFO, &format!("Setting up customer advisory board for {}", product));

        let objectives = ctx
            .task(
                &self.objectives,
                json!({ "productName": product, "targetSegments": inputs.target_segments }),
            )
            .await?;

        let program = ctx
            .task(
                &self.program_structure,
                json!({
                    "productName": product,
                    "boardSize": inputs.board_size,
                    "meetingFrequency": inputs.meeting_frequency,
                    "programDurationMonths": inputs.program_duration_months,
                    "objectives": objectives.value["objectives"],
                }),
            )
            .await?;
        let structure: ProgramStructure = program.parse()?;

        let criteria = ctx
            .task(
                &self.member_criteria,
                json!({
                    "productName": product,
                    "targetSegments": inputs.target_segments,
                    "boardSize": structure.board_size,
                }),
            )
            .await?;

        ctx.breakpoint(
            Breakpoint::new(
                "Advisory board program design",
                format!(
                    "Review the program design for {}: {} members meeting {}. Proceed to candidate identification?",
                    product, structure.board_size, structure.meeting_frequency
                ),
            )
            .with_summary("objectives", objectives.count("objectives"))
            .with_summary("boardSize", structure.board_size)
            .with_summary("selectionCriteria", criteria.count("criteria")),
        )
        .await?;

        let candidates = ctx
            .task(
                &self.candidate_identification,
                json!({
                    "productName": product,
                    "criteria": criteria.value["criteria"],
                    "boardSize": structure.board_size,
                }),
            )
            .await?;

        let outreach = ctx
            .task(
                &self.recruitment_outreach,
                json!({
                    "productName": product,
                    "candidates": candidates.value["candidates"],
                    "objectives": objectives.value["objectives"],
                }),
            )
            .await?;

        let charter = ctx
            .task(
                &self.charter,
                json!({
                    "productName": product,
                    "objectives": objectives.value["objectives"],
                    "termLengthMonths": structure.term_length_months,
                }),
            )
            .await?;

        let meetings = ctx
            .task(
                &self.meeting_structure,
                json!({
                    "productName": product,
                    "meetingFrequency": inputs.meeting_frequency,
                    "meetingsPerYear": inputs.meeting_frequency.meetings_per_year(),
                    "includeVirtualMeetings": inputs.include_virtual_meetings,
                }),
            )
            .await?;
        let meeting_structure: MeetingStructure = meetings.parse()?;

        ctx.breakpoint(
            Breakpoint::new(
                "Charter and meeting plan",
                format!(
                    "Review the charter and the {} meeting plan ({} meetings a year). Continue with engagement and governance?",
                    meeting_structure.format, meeting_structure.annual_meetings
                ),
            )
            .with_summary("candidates", candidates.count("candidates"))
            .with_summary("outreachSteps", outreach.count("outreachSequence"))
            .with_summary("annualMeetings", meeting_structure.annual_meetings),
        )
        .await?;

        let engagement = ctx
            .task(
                &self.engagement_plan,
                json!({
                    "productName": product,
                    "annualMeetings": meeting_structure.annual_meetings,
                    "format": meeting_structure.format,
                }),
            )
            .await?;

        let feedback = ctx
            .task(
                &self.feedback_framework,
                json!({ "productName": product, "objectives": objectives.value["objectives"] }),
            )
            .await?;

        let communications = ctx
            .task(
                &self.communication_plan,
                json!({
                    "productName": product,
                    "engagementActivities": engagement.value["activities"],
                }),
            )
            .await?;

        let governance = ctx
            .task(
                &self.governance,
                json!({
                    "productName": product,
                    "boardSize": structure.board_size,
                    "termLengthMonths": structure.term_length_months,
                }),
            )
            .await?;

        let metrics = ctx
            .task(
                &self.success_metrics,
                json!({
                    "productName": product,
                    "objectives": objectives.value["objectives"],
                    "feedbackCapture": feedback.value["captureMethods"],
                }),
            )
            .await?;

        let budget = ctx
            .task(
                &self.budget,
                json!({
                    "productName": product,
                    "boardSize": structure.board_size,
                    "annualMeetings": meeting_structure.annual_meetings,
                    "format": meeting_structure.format,
                }),
            )
            .await?;

        ctx.breakpoint(
            Breakpoint::new(
                "Advisory board launch sign-off",
                format!("Approve the launch of the {} customer advisory board?", product),
            )
            .with_summary("successMetrics", metrics.count("metrics"))
            .with_summary("annualBudget", field(&budget.value, "annualBudget"))
            .with_summary("governanceRoles", governance.count("roles")),
        )
        .await?;

        let launch = ctx
            .task(
                &self.launch_plan,
                json!({
                    "productName": product,
                    "candidates": candidates.value["candidates"],
                    "charter": charter.value["purpose"],
                    "communications": communications.value["channels"],
                    "annualBudget": field(&budget.value, "annualBudget"),
                }),
            )
            .await?;

        Ok(ctx.complete(
            json!({
                "productName": product,
                "objectives": objectives.value["objectives"],
                "programStructure": {
                    "boardSize": structure.board_size,
                    "meetingFrequency": structure.meeting_frequency,
                    "termLengthMonths": structure.term_length_months,
                },
                "memberCriteria": criteria.value["criteria"],
                "candidateCount": candidates.count("candidates"),
                "recruitment": {
                    "outreachSteps": outreach.count("outreachSequence"),
                    "memberBenefits": field(&outreach.value, "memberBenefits"),
                },
                "charter": {
                    "purpose": charter.value["purpose"],
                    "commitments": charter.value["commitments"],
                },
                "meetingStructure": {
                    "annualMeetings": meeting_structure.annual_meetings,
                    "format": meeting_structure.format,
                    "agendaTemplate": meetings.value["agendaTemplate"],
                },
                "engagementActivities": engagement.count("activities"),
                "feedbackFramework": {
                    "captureMethods": feedback.value["captureMethods"],
                    "closeTheLoop": feedback.value["closeTheLoop"],
                },
                "communicationChannels": communications.count("channels"),
                "governance": {
                    "roles": governance.value["roles"],
                    "rotationPolicy": governance.value["rotationPolicy"],
                },
                "successMetrics": metrics.value["metrics"],
                "budget": {
                    "annualBudget": budget.value["annualBudget"],
                    "currency": field(&budget.value, "currency"),
                },
                "launchPlan": {
                    "milestones": launch.value["milestones"],
                    "readiness": launch.value["readiness"],
                },
            }),
            serde_json::to_value(&inputs)?,
        ))
    }
}

//! Catalog of product-management processes.
//!
//! Every process is registered under `product-management/<slug>` and can
//! be looked up by its full identifier or by the slug alone.

mod common;
mod competitive_analysis;
mod customer_advisory_board;
mod jtbd_analysis;
mod metrics_dashboard;
mod stakeholder_alignment;

use once_cell::sync::Lazy;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::workflow::Process;

pub use competitive_analysis::{CompetitiveAnalysis, CompetitiveInputs};
pub use customer_advisory_board::{CabInputs, CustomerAdvisoryBoard, MeetingFrequency};
pub use jtbd_analysis::{JtbdAnalysis, JtbdInputs, ResearchDepth};
pub use metrics_dashboard::{DashboardInputs, DashboardType, MetricsDashboard};
pub use stakeholder_alignment::{StakeholderAlignment, StakeholderInputs};

/// Namespace shared by every registered process
pub const NAMESPACE: &str = "product-management";

static CATALOG: Lazy<Vec<Arc<dyn Process>>> = Lazy::new(|| {
    let processes: Vec<Arc<dyn Process>> = vec![
        Arc::new(CustomerAdvisoryBoard::new()),
        Arc::new(JtbdAnalysis::new()),
        Arc::new(CompetitiveAnalysis::new()),
        Arc::new(StakeholderAlignment::new()),
        Arc::new(MetricsDashboard::new()),
    ];
    processes
});

/// Every registered process
pub fn catalog() -> &'static [Arc<dyn Process>] {
    &CATALOG
}

/// Look up a process by identifier or slug
pub fn find(id: &str) -> Result<Arc<dyn Process>> {
    let qualified = if id.contains('/') {
        id.to_string()
    } else {
        format!("{}/{}", NAMESPACE, id)
    };

    catalog()
        .iter()
        .find(|process| process.id() == qualified)
        .cloned()
        .ok_or_else(|| Error::UnknownProcess(id.to_string()))
}

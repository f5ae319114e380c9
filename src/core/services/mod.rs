pub mod instance_service;
pub mod materializer;
pub mod template_service;

pub use instance_service::InstanceService;
pub use materializer::{
    apply_plan, plan_reconcile, prune_orphans, reconcile, CancelToken, Materializer,
    MaterializerOptions, ReconcileFailure, ReconcilePlan, ReconcileReport, TemplatePlan,
};
pub use template_service::TemplateService;

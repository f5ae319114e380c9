//! Incremental materialization of template occurrences into the instance store.
//!
//! A pass computes which instances the rolling window requires, subtracts the
//! ids that already exist, and merge-writes the rest one at a time. Because
//! ids are derived from `(templateId, dueDate)` and writes are
//! create-if-absent, passes can be repeated, run concurrently, or cut short
//! and resumed without producing duplicates or clobbering user changes.

use std::{
    collections::{HashMap, HashSet},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use chrono::{DateTime, Utc};
use tracing::{debug, info, instrument, warn};

use crate::{
    config::Config,
    core::clock::Clock,
    errors::{Result, StoreError},
    recurring::{
        generate_instances_for_window, DateWindow, RecurringInstance, RecurringTemplate,
        STANDARD_WINDOW_DAYS,
    },
    storage::RecurringStore,
};

/// Shared flag that stops a pass between two writes.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MaterializerOptions {
    pub window_days: u32,
    /// Mark every unpaid instance whose due date has arrived as paid.
    pub auto_mark_paid: bool,
}

impl Default for MaterializerOptions {
    fn default() -> Self {
        Self {
            window_days: STANDARD_WINDOW_DAYS,
            auto_mark_paid: false,
        }
    }
}

impl From<&Config> for MaterializerOptions {
    fn from(config: &Config) -> Self {
        Self {
            window_days: config.window_days,
            auto_mark_paid: config.auto_mark_paid,
        }
    }
}

/// Instances one template still needs inside the window.
#[derive(Debug, Clone, PartialEq)]
pub struct TemplatePlan {
    pub template_id: String,
    pub missing: Vec<RecurringInstance>,
}

/// Pure diff between what the window requires and what already exists.
#[derive(Debug, Clone, PartialEq)]
pub struct ReconcilePlan {
    pub window: DateWindow,
    pub templates: Vec<TemplatePlan>,
    pub already_present: usize,
}

impl ReconcilePlan {
    pub fn missing_count(&self) -> usize {
        self.templates.iter().map(|plan| plan.missing.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.missing_count() == 0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReconcileFailure {
    pub template_id: String,
    pub error: StoreError,
}

/// Outcome of one materialization pass.
#[derive(Debug, Clone, PartialEq)]
pub struct ReconcileReport {
    pub window: DateWindow,
    pub created: Vec<String>,
    pub already_present: usize,
    pub auto_paid: Vec<String>,
    pub failures: Vec<ReconcileFailure>,
    pub cancelled: bool,
}

impl ReconcileReport {
    fn empty(window: DateWindow) -> Self {
        Self {
            window,
            created: Vec::new(),
            already_present: 0,
            auto_paid: Vec::new(),
            failures: Vec::new(),
            cancelled: false,
        }
    }

    /// `true` when every template was processed without a store failure.
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty() && !self.cancelled
    }

    pub fn has_denied(&self) -> bool {
        self.failures.iter().any(|f| f.error.is_denied())
    }

    /// `true` when rerunning the whole pass may finish the remaining work.
    pub fn should_retry(&self) -> bool {
        self.cancelled || self.failures.iter().any(|f| f.error.is_retryable())
    }
}

/// Computes the instances missing from `existing` for every active template.
pub fn plan_reconcile(
    templates: &[RecurringTemplate],
    existing: &[RecurringInstance],
    window: DateWindow,
) -> ReconcilePlan {
    let known: HashSet<&str> = existing.iter().map(|i| i.id.as_str()).collect();
    // A snapshot may list the same template twice; plan each id once.
    let mut planned: HashSet<String> = HashSet::new();
    let mut plans = Vec::new();
    let mut already_present = 0usize;

    for template in templates {
        if template.id.trim().is_empty() || template.is_paused() {
            continue;
        }
        let generated = generate_instances_for_window(template, window.start, window.end);
        let mut missing = Vec::new();
        for instance in generated {
            if known.contains(instance.id.as_str()) {
                already_present += 1;
            } else if planned.insert(instance.id.clone()) {
                missing.push(instance);
            }
        }
        if missing.is_empty() {
            continue;
        }
        plans.push(TemplatePlan {
            template_id: template.id.clone(),
            missing,
        });
    }

    ReconcilePlan {
        window,
        templates: plans,
        already_present,
    }
}

/// Writes every instance `existing` lacks for the window, without a clock.
pub fn reconcile(
    store: &dyn RecurringStore,
    templates: &[RecurringTemplate],
    existing: &[RecurringInstance],
    window: DateWindow,
) -> ReconcileReport {
    apply_plan(
        store,
        plan_reconcile(templates, existing, window),
        None,
        &CancelToken::new(),
    )
}

/// Merge-writes a plan one instance at a time, stamping `createdAt` with
/// `stamp`. A failed write abandons the rest of that template's instances and
/// moves on to the next template.
pub fn apply_plan(
    store: &dyn RecurringStore,
    plan: ReconcilePlan,
    stamp: Option<DateTime<Utc>>,
    cancel: &CancelToken,
) -> ReconcileReport {
    let mut report = ReconcileReport::empty(plan.window);
    report.already_present = plan.already_present;

    'templates: for template_plan in plan.templates {
        for mut instance in template_plan.missing {
            if cancel.is_cancelled() {
                report.cancelled = true;
                break 'templates;
            }
            instance.created_at = stamp;
            match store.merge_instance(&instance) {
                Ok(true) => {
                    debug!(id = %instance.id, due = %instance.due_date, "materialized instance");
                    report.created.push(instance.id);
                }
                Ok(false) => report.already_present += 1,
                Err(error) => {
                    warn!(
                        template_id = %template_plan.template_id,
                        %error,
                        "failed to materialize instance; continuing with next template"
                    );
                    report.failures.push(ReconcileFailure {
                        template_id: template_plan.template_id.clone(),
                        error,
                    });
                    continue 'templates;
                }
            }
        }
    }

    report
}

/// Runs pull-based materialization passes against a store.
pub struct Materializer<'a> {
    store: &'a dyn RecurringStore,
    clock: &'a dyn Clock,
    options: MaterializerOptions,
    cancel: CancelToken,
}

impl<'a> Materializer<'a> {
    pub fn new(store: &'a dyn RecurringStore, clock: &'a dyn Clock) -> Self {
        Self {
            store,
            clock,
            options: MaterializerOptions::default(),
            cancel: CancelToken::new(),
        }
    }

    pub fn with_options(mut self, options: MaterializerOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn window(&self) -> DateWindow {
        DateWindow::rolling(self.clock.today(), self.options.window_days)
    }

    /// Materializes the given snapshot of templates and instances.
    pub fn reconcile(
        &self,
        templates: &[RecurringTemplate],
        existing: &[RecurringInstance],
        window: DateWindow,
    ) -> ReconcileReport {
        let plan = plan_reconcile(templates, existing, window);
        apply_plan(self.store, plan, Some(self.clock.now()), &self.cancel)
    }

    /// Reads both collections, fills the rolling window and, when enabled,
    /// marks arrived instances paid. Store read failures abort the pass;
    /// write failures and undecodable templates are recorded per template.
    #[instrument(skip_all, fields(today = %self.clock.today()))]
    pub fn run(&self) -> Result<ReconcileReport> {
        let templates = self.store.list_templates()?;
        let rejected = self.store.rejected_templates()?;
        let existing = self.store.list_instances()?;
        let window = self.window();
        let now = self.clock.now();

        let plan = plan_reconcile(&templates, &existing, window);
        let planned: Vec<RecurringInstance> = plan
            .templates
            .iter()
            .flat_map(|template_plan| template_plan.missing.iter().cloned())
            .map(|mut instance| {
                instance.created_at = Some(now);
                instance
            })
            .collect();
        let mut report = apply_plan(self.store, plan, Some(now), &self.cancel);

        for doc in rejected {
            warn!(template_id = doc.label(), reason = %doc.reason, "skipping unreadable template");
            report.failures.push(ReconcileFailure {
                template_id: doc.label().to_string(),
                error: StoreError::Corrupt(doc.reason),
            });
        }

        if !report.cancelled {
            let instances = match self.store.list_instances() {
                Ok(instances) => instances,
                Err(error) => {
                    warn!(%error, "re-reading instances failed; auto-marking from the pass snapshot");
                    let created: HashSet<&str> = report.created.iter().map(String::as_str).collect();
                    existing
                        .into_iter()
                        .chain(planned.into_iter().filter(|i| created.contains(i.id.as_str())))
                        .collect()
                }
            };
            self.auto_mark_paid(&templates, instances, &mut report);
        }

        info!(
            window_start = %window.start,
            window_end = %window.end,
            created = report.created.len(),
            already_present = report.already_present,
            auto_paid = report.auto_paid.len(),
            failures = report.failures.len(),
            cancelled = report.cancelled,
            "reconcile pass finished"
        );
        Ok(report)
    }

    fn auto_mark_paid(
        &self,
        templates: &[RecurringTemplate],
        instances: Vec<RecurringInstance>,
        report: &mut ReconcileReport,
    ) {
        let by_id: HashMap<&str, &RecurringTemplate> =
            templates.iter().map(|t| (t.id.as_str(), t)).collect();
        let today = self.clock.today();
        let now = self.clock.now();

        for mut instance in instances {
            if instance.is_terminal() || instance.due_date > today {
                continue;
            }
            let Some(template) = by_id.get(instance.template_id.as_str()) else {
                continue;
            };
            if template.is_paused() || !(self.options.auto_mark_paid || template.autopost) {
                continue;
            }
            if self.cancel.is_cancelled() {
                report.cancelled = true;
                break;
            }
            instance.mark_paid(None, now);
            match self.store.save_instance(&instance) {
                Ok(()) => report.auto_paid.push(instance.id),
                Err(error) => {
                    warn!(id = %instance.id, %error, "failed to auto-mark instance paid");
                    report.failures.push(ReconcileFailure {
                        template_id: instance.template_id.clone(),
                        error,
                    });
                }
            }
        }
    }
}

/// Deletes instances whose template no longer exists. Never part of a
/// reconcile pass; callers invoke it explicitly.
pub fn prune_orphans(store: &dyn RecurringStore) -> Result<Vec<String>> {
    let template_ids: HashSet<String> = store
        .list_templates()?
        .into_iter()
        .map(|template| template.id)
        .collect();
    let mut removed = Vec::new();
    for instance in store.list_instances()? {
        if template_ids.contains(&instance.template_id) {
            continue;
        }
        if store.delete_instance(&instance.id)? {
            removed.push(instance.id);
        }
    }
    if !removed.is_empty() {
        info!(removed = removed.len(), "pruned orphaned instances");
    }
    Ok(removed)
}

//! @acp:module "Batch"
//! @acp:summary "Target resolution and per-target batch execution with failure isolation"
//! @acp:domain cloud
//! @acp:layer service
//!
//! A batch run goes through these states:
//!
//! ```text
//! Validating -> (aborted | ConfirmingBreadth) -> (cancelled | Resolving)
//!            -> Executing(target 1) -> ... -> Executing(target n) -> Done
//! ```
//!
//! Only the check callback can abort a batch. Resolution failures and
//! per-target failures become [`BatchOutcome`]s and the run continues.

use std::collections::VecDeque;
use std::fmt;

use crate::driver::Driver;
use crate::error::Result;
use crate::operation::{ask_yes, Cancellation, Completion};
use crate::terminal::Console;

/// Which instances a batch operator acts on
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TargetFilter {
    /// `None` means every region
    pub region: Option<String>,
    /// Instance IDs; empty means every instance of the selected regions
    pub selector: Vec<String>,
    /// Skip the breadth confirmation
    pub force: bool,
}

impl TargetFilter {
    /// Build a filter from raw flag values. A non-empty `insid` replaces
    /// the comma list in `insids`.
    pub fn from_flags(region: &str, insids: &str, insid: &str, force: bool) -> Self {
        let region = region.trim();
        let selector = if insid.trim().is_empty() {
            split_ids(insids)
        } else {
            vec![insid.trim().to_string()]
        };
        Self {
            region: (!region.is_empty()).then(|| region.to_string()),
            selector,
            force,
        }
    }

    pub fn region(&self) -> &str {
        self.region.as_deref().unwrap_or("")
    }

    /// Which dimension is unconstrained, if any
    pub fn breadth(&self) -> Option<Breadth> {
        match &self.region {
            None if self.selector.is_empty() => Some(Breadth::Everything),
            None => Some(Breadth::AllRegions),
            Some(region) if self.selector.is_empty() => {
                Some(Breadth::WholeRegion(region.clone()))
            }
            Some(_) => None,
        }
    }
}

/// Split a comma-separated ID list, dropping blanks
pub fn split_ids(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .collect()
}

/// An under-specified filter
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Breadth {
    /// Neither region nor instances given
    Everything,
    /// Instances given, region not
    AllRegions,
    /// Region given, instances not
    WholeRegion(String),
}

impl fmt::Display for Breadth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Breadth::Everything => write!(
                f,
                "No region and no instance ID given: the operation applies to every instance in every region"
            ),
            Breadth::AllRegions => write!(
                f,
                "No region given: the instance IDs are looked up in every region"
            ),
            Breadth::WholeRegion(region) => write!(
                f,
                "No instance ID given: the operation applies to every instance in {}",
                region
            ),
        }
    }
}

/// One concrete instance a batch acts on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTarget {
    pub region: String,
    pub name: String,
    pub instance_id: String,
}

/// A region or instance the resolver could not turn into a target
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unresolved {
    /// `None` when the region list itself could not be fetched
    pub region: Option<String>,
    /// `None` when a whole region's instance list could not be fetched
    pub instance_id: Option<String>,
    pub reason: String,
}

/// Result for one target of a batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchOutcome {
    Succeeded {
        label: String,
        target: ResolvedTarget,
    },
    Failed {
        label: String,
        target: ResolvedTarget,
        reason: String,
    },
    Unresolved {
        label: String,
        unresolved: Unresolved,
    },
}

impl BatchOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, BatchOutcome::Succeeded { .. })
    }

    /// Instance ID the outcome refers to, if known
    pub fn instance_id(&self) -> Option<&str> {
        match self {
            BatchOutcome::Succeeded { target, .. } | BatchOutcome::Failed { target, .. } => {
                Some(&target.instance_id)
            }
            BatchOutcome::Unresolved { unresolved, .. } => unresolved.instance_id.as_deref(),
        }
    }
}

impl fmt::Display for BatchOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BatchOutcome::Succeeded { label, target } => write!(
                f,
                "{} {} ({}) in {}: succeeded",
                label, target.name, target.instance_id, target.region
            ),
            BatchOutcome::Failed {
                label,
                target,
                reason,
            } => write!(
                f,
                "{} {} ({}) in {}: failed: {}",
                label, target.name, target.instance_id, target.region, reason
            ),
            BatchOutcome::Unresolved { label, unresolved } => {
                match (&unresolved.region, &unresolved.instance_id) {
                    (Some(region), Some(id)) => write!(
                        f,
                        "{} {} in {}: failed: cannot resolve instance: {}",
                        label, id, region, unresolved.reason
                    ),
                    (Some(region), None) => write!(
                        f,
                        "{} in {}: failed: cannot list instances: {}",
                        label, region, unresolved.reason
                    ),
                    (None, _) => write!(
                        f,
                        "{}: failed: cannot list regions: {}",
                        label, unresolved.reason
                    ),
                }
            }
        }
    }
}

enum Step {
    Region(String),
    Lookup { region: String, id: String },
    Ready(std::result::Result<ResolvedTarget, Unresolved>),
}

/// Lazy resolver from a [`TargetFilter`] to targets, in driver order.
///
/// Driver calls happen only as targets are pulled. A fresh resolver must be
/// created for every run.
pub struct Targets<'d> {
    driver: &'d dyn Driver,
    filter: TargetFilter,
    started: bool,
    steps: VecDeque<Step>,
}

impl<'d> Targets<'d> {
    pub fn new(driver: &'d dyn Driver, filter: &TargetFilter) -> Self {
        Self {
            driver,
            filter: filter.clone(),
            started: false,
            steps: VecDeque::new(),
        }
    }

    fn start(&mut self) {
        self.started = true;
        match &self.filter.region {
            Some(region) => self.steps.push_back(Step::Region(region.clone())),
            None => match self.driver.list_regions() {
                Ok(regions) => self
                    .steps
                    .extend(regions.into_iter().map(|r| Step::Region(r.region))),
                Err(e) => self.steps.push_back(Step::Ready(Err(Unresolved {
                    region: None,
                    instance_id: None,
                    reason: e.to_string(),
                }))),
            },
        }
    }

    /// Queue the work of one region ahead of the remaining regions
    fn expand(&mut self, region: String) {
        let steps: Vec<Step> = if self.filter.selector.is_empty() {
            match self.driver.list_instances(&region) {
                Ok(instances) => instances
                    .into_iter()
                    .map(|i| {
                        Step::Ready(Ok(ResolvedTarget {
                            region: region.clone(),
                            name: i.name,
                            instance_id: i.id,
                        }))
                    })
                    .collect(),
                Err(e) => vec![Step::Ready(Err(Unresolved {
                    region: Some(region),
                    instance_id: None,
                    reason: e.to_string(),
                }))],
            }
        } else {
            self.filter
                .selector
                .iter()
                .map(|id| Step::Lookup {
                    region: region.clone(),
                    id: id.clone(),
                })
                .collect()
        };
        for step in steps.into_iter().rev() {
            self.steps.push_front(step);
        }
    }
}

impl Iterator for Targets<'_> {
    type Item = std::result::Result<ResolvedTarget, Unresolved>;

    fn next(&mut self) -> Option<Self::Item> {
        if !self.started {
            self.start();
        }
        loop {
            match self.steps.pop_front()? {
                Step::Region(region) => self.expand(region),
                Step::Lookup { region, id } => {
                    return Some(match self.driver.instance_info(&region, &id) {
                        Ok(instance) => Ok(ResolvedTarget {
                            region,
                            name: instance.name,
                            instance_id: instance.id,
                        }),
                        Err(e) => Err(Unresolved {
                            region: Some(region),
                            instance_id: Some(id),
                            reason: e.to_string(),
                        }),
                    });
                }
                Step::Ready(item) => return Some(item),
            }
        }
    }
}

/// How a batch operator reports and confirms
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchOptions {
    /// Human-readable action label, e.g. "stop"
    pub label: String,
    /// Ask before acting on an under-specified filter
    pub breadth_confirm: bool,
    /// Report successful targets; listing operators print their own rows
    pub report_success: bool,
}

impl BatchOptions {
    pub fn new(label: &str) -> Self {
        Self {
            label: label.to_string(),
            breadth_confirm: true,
            report_success: true,
        }
    }

    pub fn without_breadth_confirm(mut self) -> Self {
        self.breadth_confirm = false;
        self
    }

    pub fn quiet_success(mut self) -> Self {
        self.report_success = false;
        self
    }
}

/// Tally of one batch run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub succeeded: usize,
    pub failed: usize,
    pub cancelled: Option<Cancellation>,
}

impl BatchSummary {
    pub fn completion(&self) -> Completion {
        match self.cancelled {
            Some(reason) => Completion::Cancelled(reason),
            None => Completion::Done,
        }
    }
}

/// Run `per_target` once for every target `filter` resolves to.
///
/// `check` runs first; its error aborts the batch before any driver call.
/// Outcomes are reported to `console` as they happen.
pub fn execute<C, F>(
    driver: &dyn Driver,
    console: &mut dyn Console,
    filter: &TargetFilter,
    options: &BatchOptions,
    check: C,
    mut per_target: F,
) -> Result<BatchSummary>
where
    C: FnOnce(&TargetFilter) -> Result<()>,
    F: FnMut(&dyn Driver, &ResolvedTarget, &mut dyn Console) -> Result<()>,
{
    tracing::debug!(label = %options.label, ?filter, "batch validating");
    check(filter)?;

    let mut summary = BatchSummary::default();

    if options.breadth_confirm && !filter.force {
        if let Some(breadth) = filter.breadth() {
            tracing::debug!(label = %options.label, ?breadth, "batch confirming breadth");
            console.warn(&breadth.to_string());
            console.say("Add -f to skip this confirmation.");
            if !ask_yes(
                console,
                "Enter Y to continue (case-insensitive, anything else cancels): ",
            )? {
                let reason = Cancellation::BreadthDeclined;
                tracing::info!(label = %options.label, "batch cancelled at breadth confirmation");
                console.say(&reason.to_string());
                summary.cancelled = Some(reason);
                return Ok(summary);
            }
        }
    }

    tracing::debug!(label = %options.label, "batch resolving");
    for item in Targets::new(driver, filter) {
        let outcome = match item {
            Ok(target) => {
                tracing::debug!(label = %options.label, region = %target.region, instance = %target.instance_id, "batch executing");
                match per_target(driver, &target, &mut *console) {
                    Ok(()) => BatchOutcome::Succeeded {
                        label: options.label.clone(),
                        target,
                    },
                    Err(e) => BatchOutcome::Failed {
                        label: options.label.clone(),
                        target,
                        reason: e.to_string(),
                    },
                }
            }
            Err(unresolved) => BatchOutcome::Unresolved {
                label: options.label.clone(),
                unresolved,
            },
        };

        if outcome.is_success() {
            summary.succeeded += 1;
            if options.report_success {
                console.report(&outcome);
            }
        } else {
            summary.failed += 1;
            tracing::warn!(%outcome, "batch target failed");
            console.report(&outcome);
        }
    }

    tracing::debug!(label = %options.label, succeeded = summary.succeeded, failed = summary.failed, "batch done");
    Ok(summary)
}

/// Run `f` for each resource ID in order, reporting one outcome per ID.
///
/// Used by operators that act on explicit snapshot, image or key pair IDs
/// rather than instances. A failing ID never stops the loop.
pub fn each_id<F>(
    console: &mut dyn Console,
    label: &str,
    kind: &str,
    region: &str,
    ids: &[String],
    mut f: F,
) -> BatchSummary
where
    F: FnMut(&str) -> Result<()>,
{
    let mut summary = BatchSummary::default();
    for id in ids {
        let target = ResolvedTarget {
            region: region.to_string(),
            name: kind.to_string(),
            instance_id: id.clone(),
        };
        let outcome = match f(id) {
            Ok(()) => {
                summary.succeeded += 1;
                BatchOutcome::Succeeded {
                    label: label.to_string(),
                    target,
                }
            }
            Err(e) => {
                summary.failed += 1;
                tracing::warn!(kind, id = %id, error = %e, "{} failed", label);
                BatchOutcome::Failed {
                    label: label.to_string(),
                    target,
                    reason: e.to_string(),
                }
            }
        };
        console.report(&outcome);
    }
    summary
}

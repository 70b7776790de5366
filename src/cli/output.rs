//! Output formatting for CLI commands.
//!
//! This module provides formatting utilities for displaying plans, apply
//! results and errors to the user in text or JSON form.

use colored::Colorize;
use std::fmt::Write;
use tabled::{Table, Tabled};

use crate::config::ValidationResult;
use crate::error::GitopsError;
use crate::manager::{ApplyOutcome, PlanOutcome};
use crate::planner::{AclPlan, DesiredPlan, PlanAction, PlanOptions, PlanOverview, TopicPlan};

use super::commands::OutputFormat;

/// Output formatter for CLI.
#[derive(Debug)]
pub struct OutputFormatter {
    /// Output format.
    format: OutputFormat,
    /// Flags that decide which entries are shown.
    options: PlanOptions,
}

/// Plan summary row for table display.
#[derive(Tabled)]
struct SummaryRow {
    #[tabled(rename = "Resource")]
    kind: &'static str,
    #[tabled(rename = "Create")]
    add: usize,
    #[tabled(rename = "Update")]
    update: usize,
    #[tabled(rename = "Delete")]
    remove: usize,
}

impl SummaryRow {
    const fn new(kind: &'static str, overview: PlanOverview) -> Self {
        Self {
            kind,
            add: overview.add,
            update: overview.update,
            remove: overview.remove,
        }
    }
}

impl OutputFormatter {
    /// Creates a new output formatter.
    #[must_use]
    pub const fn new(format: OutputFormat, options: PlanOptions) -> Self {
        Self { format, options }
    }

    /// Formats a validation result.
    #[must_use]
    pub fn format_validation(&self, result: &ValidationResult, show_warnings: bool) -> String {
        match self.format {
            OutputFormat::Json => json(&serde_json::json!({
                "valid": result.is_valid(),
                "warnings": result.warnings,
            })),
            OutputFormat::Text => {
                let mut output = format!(
                    "{} This state file is a valid Kafka GitOps state file.\n",
                    "[VALID]".green()
                );
                if show_warnings && !result.warnings.is_empty() {
                    output.push_str("\nWarnings:\n");
                    for warning in &result.warnings {
                        let _ = writeln!(output, "  - {warning}");
                    }
                }
                output
            }
        }
    }

    /// Formats a validation failure.
    #[must_use]
    pub fn format_invalid(&self, error: &GitopsError) -> String {
        match self.format {
            OutputFormat::Json => json(&serde_json::json!({
                "valid": false,
                "error": error.to_string(),
            })),
            OutputFormat::Text => format!("{} {error}\n", "[INVALID]".red()),
        }
    }

    /// Formats a generated plan.
    #[must_use]
    pub fn format_plan(&self, outcome: &PlanOutcome) -> String {
        match self.format {
            OutputFormat::Json => json(&serde_json::json!({
                "upToDate": outcome.overview.is_empty(),
                "overview": outcome.overview,
                "plan": outcome.plan.to_changes_only(),
            })),
            OutputFormat::Text => {
                if outcome.overview.is_empty() {
                    return Self::up_to_date();
                }
                self.format_plan_text(&outcome.plan, outcome.overview)
            }
        }
    }

    /// Formats the result of an apply.
    #[must_use]
    pub fn format_apply(&self, outcome: &ApplyOutcome) -> String {
        match self.format {
            OutputFormat::Json => json(&serde_json::json!({
                "upToDate": outcome.applied.is_empty(),
                "applied": outcome.applied,
            })),
            OutputFormat::Text => {
                if outcome.applied.is_empty() {
                    return Self::up_to_date();
                }

                let mut output = String::new();
                for plan in self.visible_topics(&outcome.plan) {
                    Self::write_applied(&mut output, plan.action, |out| Self::write_topic(out, plan));
                }
                for plan in self.visible_acls(&outcome.plan) {
                    Self::write_applied(&mut output, plan.action, |out| Self::write_acl(out, plan));
                }
                let _ = writeln!(
                    output,
                    "{} Apply complete! Resources: {} created, {} updated, {} deleted.",
                    "[SUCCESS]".green(),
                    outcome.applied.add,
                    outcome.applied.update,
                    outcome.applied.remove
                );
                output
            }
        }
    }

    /// Formats an error raised while planning.
    #[must_use]
    pub fn format_plan_error(&self, error: &GitopsError) -> String {
        match self.format {
            OutputFormat::Json => json(&serde_json::json!({ "status": "error", "message": error.to_string() })),
            OutputFormat::Text => format!(
                "{} An error has occurred during the planning process. No plan was created.\n{error}\n",
                "[ERROR]".red()
            ),
        }
    }

    /// Formats an error raised while applying.
    #[must_use]
    pub fn format_apply_error(&self, error: &GitopsError) -> String {
        match self.format {
            OutputFormat::Json => json(&serde_json::json!({ "status": "error", "message": error.to_string() })),
            OutputFormat::Text => {
                let mut output = format!(
                    "{} An error has occurred during the apply process.\n{error}\n\n",
                    "[ERROR]".red()
                );
                if error.is_execution_error() {
                    output.push_str("The apply process has stopped in place. There is no rollback.\n");
                    output.push_str("Fix the error, re-create a plan, and apply the new plan to continue.\n");
                }
                output
            }
        }
    }

    /// Formats the result of account provisioning.
    #[must_use]
    pub fn format_accounts(&self, created: usize) -> String {
        match self.format {
            OutputFormat::Json => json(&serde_json::json!({ "created": created })),
            OutputFormat::Text => format!(
                "{} Service account creation complete! Created: {created} new service accounts.\n",
                "[SUCCESS]".green()
            ),
        }
    }

    fn up_to_date() -> String {
        format!(
            "{} There are no necessary changes; the actual state matches the desired state.\n",
            "[SUCCESS]".green()
        )
    }

    fn format_plan_text(&self, plan: &DesiredPlan, overview: PlanOverview) -> String {
        let mut output = String::from("An execution plan has been generated and is shown below.\n");
        output.push_str("Resource actions are indicated with the following symbols:\n");
        let _ = writeln!(output, "  {} create", "+".green());
        let _ = writeln!(output, "  {} update", "~".yellow());
        let _ = writeln!(output, "  {} delete", "-".red());
        output.push_str("\nThe following actions will be performed:\n");

        let mut rows = Vec::new();

        if !self.options.skip_topics {
            let topics = plan.topic_overview(self.options.delete_disabled);
            let _ = writeln!(output, "\nTopics: {topics}.\n");
            for topic in self.visible_topics(plan) {
                Self::write_topic(&mut output, topic);
                output.push('\n');
            }
            rows.push(SummaryRow::new("Topics", topics));
        }

        if !self.options.skip_acls {
            let acls = plan.acl_overview(self.options.delete_disabled);
            let _ = writeln!(output, "\nACLs: {acls}.\n");
            for acl in self.visible_acls(plan) {
                Self::write_acl(&mut output, acl);
                output.push('\n');
            }
            rows.push(SummaryRow::new("ACLs", acls));
        }

        output.push_str(&Table::new(rows).to_string());
        let _ = writeln!(output, "\n\nPlan: {overview}.");
        output
    }

    fn visible_topics<'p>(&self, plan: &'p DesiredPlan) -> impl Iterator<Item = &'p TopicPlan> {
        let options = self.options;
        plan.topic_plans
            .iter()
            .filter(move |p| !options.skip_topics && Self::is_visible(options, p.action))
    }

    fn visible_acls<'p>(&self, plan: &'p DesiredPlan) -> impl Iterator<Item = &'p AclPlan> {
        let options = self.options;
        plan.acl_plans
            .iter()
            .filter(move |p| !options.skip_acls && Self::is_visible(options, p.action))
    }

    const fn is_visible(options: PlanOptions, action: PlanAction) -> bool {
        match action {
            PlanAction::NoChange => false,
            PlanAction::Remove => !options.delete_disabled,
            PlanAction::Add | PlanAction::Update => true,
        }
    }

    fn write_applied(output: &mut String, action: PlanAction, entry: impl FnOnce(&mut String)) {
        let verb = match action {
            PlanAction::Add => "CREATE",
            PlanAction::Update => "UPDATE",
            PlanAction::Remove => "DELETE",
            PlanAction::NoChange => return,
        };
        let _ = writeln!(output, "Applying: [{verb}]\n");
        entry(output);
        let _ = writeln!(output, "\nSuccessfully applied.\n");
    }

    fn write_topic(output: &mut String, plan: &TopicPlan) {
        match plan.action {
            PlanAction::Add => {
                let _ = writeln!(output, "{} [TOPIC] {}", "+".green(), plan.name);
                if let Some(details) = &plan.topic_details {
                    let _ = writeln!(output, "\t{} partitions: {}", "+".green(), details.partitions);
                    if let Some(replication) = details.replication {
                        let _ = writeln!(output, "\t{} replication: {replication}", "+".green());
                    }
                    if !details.configs.is_empty() {
                        let _ = writeln!(output, "\t{} configs:", "+".green());
                        for (key, value) in &details.configs {
                            let _ = writeln!(output, "\t\t{} {key}: {value}", "+".green());
                        }
                    }
                }
            }
            PlanAction::Update => {
                let _ = writeln!(output, "{} [TOPIC] {}", "~".yellow(), plan.name);
                let _ = writeln!(output, "\t{} configs:", "~".yellow());
                for config in &plan.topic_config_plans {
                    let value = config.value.as_deref().unwrap_or_default();
                    match config.action {
                        PlanAction::Add => {
                            let _ = writeln!(output, "\t\t{} {}: {value}", "+".green(), config.key);
                        }
                        PlanAction::Update => {
                            let _ = writeln!(output, "\t\t{} {}: {value}", "~".yellow(), config.key);
                        }
                        PlanAction::Remove => {
                            let _ = writeln!(output, "\t\t{} {}", "-".red(), config.key);
                        }
                        PlanAction::NoChange => {}
                    }
                }
            }
            PlanAction::Remove => {
                let _ = writeln!(output, "{} [TOPIC] {}", "-".red(), plan.name);
            }
            PlanAction::NoChange => {}
        }
    }

    fn write_acl(output: &mut String, plan: &AclPlan) {
        let symbol = match plan.action {
            PlanAction::Add => "+".green(),
            PlanAction::Remove => "-".red(),
            PlanAction::Update | PlanAction::NoChange => return,
        };
        let acl = &plan.acl_details;
        let _ = writeln!(output, "{symbol} [ACL] {}", plan.name);
        let _ = writeln!(output, "\t {symbol} resource_name: {}", acl.name);
        let _ = writeln!(output, "\t {symbol} resource_type: {}", acl.resource_type);
        let _ = writeln!(output, "\t {symbol} resource_pattern: {}", acl.pattern);
        let _ = writeln!(output, "\t {symbol} resource_principal: {}", acl.principal);
        let _ = writeln!(output, "\t {symbol} host: {}", acl.host);
        let _ = writeln!(output, "\t {symbol} operation: {}", acl.operation);
        let _ = writeln!(output, "\t {symbol} permission: {}", acl.permission);
    }
}

fn json(value: &serde_json::Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_default()
}

//! Command execution logic.
//!
//! This module contains the implementation of all CLI commands.

use anyhow::Result;

use super::args::{
    CreateArgs, InitArgs, IssueAction, IssueArgs, ListArgs, ProjectAction, ProjectArgs,
    ProjectCreateArgs, SettingsArgs, UpdateArgs,
};
use crate::app::App;
use crate::domain::{
    IssueId, IssueUpdate, NewIssue, ProjectId, ProjectSettings, SettingsPatch, UserId,
};
use crate::output::{self, OutputConfig, OutputMode};

/// Execute the init command
pub async fn execute_init(args: &InitArgs, output_mode: OutputMode) -> Result<()> {
    use crate::commands::init;

    let current_dir = std::env::current_dir()?;
    let result = init::init(&current_dir, args.backend.into()).await?;

    match output_mode {
        OutputMode::Json => output::print_json(&serde_json::json!({
            "stint_dir": result.stint_dir.display().to_string(),
            "config_file": result.config_file.display().to_string(),
            "data_file": result.data_file.as_ref().map(|p| p.display().to_string()),
            "backend": result.backend,
        }))?,
        OutputMode::Text if !args.quiet => {
            println!("Initialized stint in {}", result.stint_dir.display());
            println!("  Config: {}", result.config_file.display());
            match &result.data_file {
                Some(data_file) => println!("  Database: {}", data_file.display()),
                None => println!("  Storage: in-memory (nothing is persisted)"),
            }
        }
        OutputMode::Text => {}
    }

    Ok(())
}

/// Execute a `project` subcommand
pub async fn execute_project(
    app: &App,
    actor: &UserId,
    args: &ProjectArgs,
    output_mode: OutputMode,
) -> Result<()> {
    let engine = app.engine();
    let project = match &args.action {
        ProjectAction::Create(create) => {
            engine
                .create_project(actor, &create.name, project_settings(create))
                .await?
        }
        ProjectAction::AddMember(add) => {
            engine
                .add_member(
                    actor,
                    &ProjectId::new(&add.project),
                    &UserId::new(&add.user),
                    add.role.into(),
                )
                .await?
        }
        ProjectAction::RemoveMember(remove) => {
            engine
                .remove_member(
                    actor,
                    &ProjectId::new(&remove.project),
                    &UserId::new(&remove.user),
                )
                .await?
        }
        ProjectAction::Settings(settings) => {
            engine
                .update_settings(
                    actor,
                    &ProjectId::new(&settings.project),
                    &settings_patch(settings),
                )
                .await?
        }
        ProjectAction::Show(show) => engine.project(actor, &ProjectId::new(&show.project)).await?,
    };

    output::print_project(&project, output_mode)?;
    Ok(())
}

/// Execute an `issue` subcommand
pub async fn execute_issue(
    app: &App,
    actor: &UserId,
    args: &IssueArgs,
    output_mode: OutputMode,
) -> Result<()> {
    let engine = app.engine();
    match &args.action {
        IssueAction::Create(create) => {
            let issue = engine.create_issue(actor, new_issue(create)).await?;
            if output_mode == OutputMode::Text {
                let config = OutputConfig::from_env();
                output::print_message(&output::success(
                    &format!("Created issue {}", issue.id),
                    &config,
                ))?;
            }
            output::print_issue(&issue, output_mode)?;
        }
        IssueAction::Update(update) => {
            let issue = engine
                .update_issue(actor, &IssueId::new(&update.issue_id), issue_update(update))
                .await?;
            output::print_issue(&issue, output_mode)?;
        }
        IssueAction::Move(mv) => {
            let scope = engine
                .move_issue(actor, &IssueId::new(&mv.issue_id), mv.direction.into())
                .await?;
            output::print_issues(&scope, output_mode)?;
        }
        IssueAction::Reparent(reparent) => {
            let issue = engine
                .reparent(
                    actor,
                    &IssueId::new(&reparent.issue_id),
                    &IssueId::new(&reparent.parent),
                )
                .await?;
            output::print_issue(&issue, output_mode)?;
        }
        IssueAction::Unparent(target) => {
            let issue = engine
                .remove_parent(actor, &IssueId::new(&target.issue_id))
                .await?;
            output::print_issue(&issue, output_mode)?;
        }
        IssueAction::Delete(target) => {
            let removed = engine
                .delete_issue(actor, &IssueId::new(&target.issue_id))
                .await?;
            match output_mode {
                OutputMode::Json => output::print_json(&serde_json::json!({
                    "deleted": target.issue_id,
                    "children_removed": removed,
                }))?,
                OutputMode::Text => output::print_message(&output::success(
                    &format!("Deleted {} ({removed} child issue(s) removed)", target.issue_id),
                    &OutputConfig::from_env(),
                ))?,
            }
        }
        IssueAction::List(list) => execute_list(app, actor, list, output_mode).await?,
        IssueAction::Show(target) => {
            let issue = engine.get_issue(actor, &IssueId::new(&target.issue_id)).await?;
            output::print_issue(&issue, output_mode)?;
        }
        IssueAction::Activity(target) => {
            let activities = engine
                .activities(actor, &IssueId::new(&target.issue_id))
                .await?;
            output::print_activities(&activities, output_mode)?;
        }
    }
    Ok(())
}

async fn execute_list(
    app: &App,
    actor: &UserId,
    args: &ListArgs,
    output_mode: OutputMode,
) -> Result<()> {
    let project = ProjectId::new(&args.project);
    if args.tree {
        let issues = app.engine().project_issues(actor, &project).await?;
        output::print_issue_tree(&issues, output_mode)?;
    } else {
        let parent = args.parent.as_ref().map(IssueId::new);
        let issues = app
            .engine()
            .scope_issues(actor, &project, parent.as_ref())
            .await?;
        output::print_issues(&issues, output_mode)?;
    }
    Ok(())
}

fn project_settings(args: &ProjectCreateArgs) -> ProjectSettings {
    let defaults = ProjectSettings::default();
    ProjectSettings {
        auto_assignment: args.auto_assign,
        assignment_method: args.method.map_or(defaults.assignment_method, Into::into),
        require_description: !args.optional_description,
        ..defaults
    }
}

fn settings_patch(args: &SettingsArgs) -> SettingsPatch {
    SettingsPatch {
        auto_assignment: args.auto_assign,
        assignment_method: args.method.map(Into::into),
        default_priority: args.default_priority.map(Into::into),
        default_status: args.default_status.map(Into::into),
        require_description: args.require_description,
    }
}

fn new_issue(args: &CreateArgs) -> NewIssue {
    NewIssue {
        project_id: ProjectId::new(&args.project),
        title: args.title.clone(),
        issue_type: args.issue_type.map(Into::into),
        priority: args.priority.map(Into::into),
        status: args.status.map(Into::into),
        assignee: args.assignee.as_ref().map(UserId::new),
        parent_id: args.parent.as_ref().map(IssueId::new),
        label: args.label.clone(),
        description: args.description.clone(),
        goal: args.goal.clone(),
        start_date: args.start,
        due_date: args.due,
    }
}

/// `--flag value` sets, `--clear-flag` clears, neither keeps.
fn set_or_clear<T: Clone>(value: Option<&T>, clear: bool) -> Option<Option<T>> {
    if clear {
        Some(None)
    } else {
        value.map(|v| Some(v.clone()))
    }
}

fn issue_update(args: &UpdateArgs) -> IssueUpdate {
    IssueUpdate {
        title: args.title.clone(),
        description: args.description.clone().map(Some),
        priority: args.priority.map(Into::into),
        issue_type: args.issue_type.map(Into::into),
        status: args.status.map(Into::into),
        assignee: set_or_clear(args.assignee.as_ref(), args.unassign)
            .map(|a| a.map(UserId::new)),
        reporter: args.reporter.as_ref().map(|r| Some(UserId::new(r))),
        label: args.label.clone().map(Some),
        goal: args.goal.clone().map(Some),
        parent_id: set_or_clear(args.parent.as_ref(), args.no_parent)
            .map(|p| p.map(IssueId::new)),
        start_date: None,
        due_date: set_or_clear(args.due.as_ref(), args.clear_due),
    }
}

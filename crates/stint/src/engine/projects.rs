//! Project creation, membership and settings.

use super::audit::record;
use super::{load_project, require_role, Engine};
use crate::domain::{
    ActivityType, Member, Project, ProjectId, ProjectSettings, RecentActivity, Role,
    SettingsPatch, Snapshot, UserId,
};
use crate::error::{Error, Result, ValidationError};
use chrono::Utc;
use tracing::info;

impl Engine {
    /// Create a project owned by `owner`, who becomes its first member.
    ///
    /// # Errors
    ///
    /// `Validation` for a blank name.
    pub async fn create_project(
        &self,
        owner: &UserId,
        name: &str,
        settings: ProjectSettings,
    ) -> Result<Project> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ValidationError::InvalidValue {
                field: "project name",
                value: String::new(),
            }
            .into());
        }

        let now = Utc::now();
        let project = Project {
            id: ProjectId::generate(),
            owner_id: owner.clone(),
            name: name.to_string(),
            settings,
            last_assigned_index: None,
            members: vec![Member {
                user_id: owner.clone(),
                role: Role::Owner,
            }],
            created_at: now,
            updated_at: now,
        };

        let mut tx = self.store.begin().await?;
        tx.insert_project(&project).await?;
        let activity = RecentActivity::new(owner, ActivityType::ProjectCreate)
            .for_project(&project.id)
            .with_new(Snapshot {
                name: Some(project.name.clone()),
                settings: Some(project.settings.clone()),
                ..Snapshot::default()
            });
        record(tx.as_mut(), &activity).await?;
        tx.commit().await?;

        info!(project = %project.id, owner = %owner, "Created project");
        Ok(project)
    }

    /// Add `user` to a project with `role`, or change their role.
    ///
    /// Requires Admin. New members join at the end of the member list, which
    /// is the rotation order of round-robin assignment.
    ///
    /// # Errors
    ///
    /// - `ProjectNotFound` / `PermissionDenied`
    /// - `Conflict` when demoting the project owner
    pub async fn add_member(
        &self,
        actor: &UserId,
        project_id: &ProjectId,
        user: &UserId,
        role: Role,
    ) -> Result<Project> {
        if user.is_empty() {
            return Err(ValidationError::InvalidValue {
                field: "user",
                value: user.to_string(),
            }
            .into());
        }

        let mut tx = self.store.begin().await?;
        let project = load_project(tx.as_mut(), project_id).await?;
        require_role(&project, actor, Role::Admin)?;
        if user == &project.owner_id && role != Role::Owner {
            return Err(Error::Conflict(
                "the project owner's role cannot change".to_string(),
            ));
        }

        let member = Member {
            user_id: user.clone(),
            role,
        };
        tx.upsert_member(&project.id, &member).await?;
        let activity = RecentActivity::new(actor, ActivityType::UserProjectUpdate)
            .for_project(&project.id)
            .with_old(Snapshot {
                member: Some(user.clone()),
                role: project.role_of(user),
                ..Snapshot::default()
            })
            .with_new(Snapshot {
                member: Some(user.clone()),
                role: Some(role),
                ..Snapshot::default()
            });
        record(tx.as_mut(), &activity).await?;

        let updated = load_project(tx.as_mut(), project_id).await?;
        tx.commit().await?;

        info!(project = %project_id, member = %user, %role, "Updated membership");
        Ok(updated)
    }

    /// Remove `user` from a project. Requires Admin.
    ///
    /// Auto-assignment stops picking the user from the next issue on; issues
    /// already assigned to them keep their assignee.
    ///
    /// # Errors
    ///
    /// - `ProjectNotFound` / `PermissionDenied`
    /// - `Conflict` when removing the project owner
    /// - `Validation` when `user` is not a member
    pub async fn remove_member(
        &self,
        actor: &UserId,
        project_id: &ProjectId,
        user: &UserId,
    ) -> Result<Project> {
        let mut tx = self.store.begin().await?;
        let project = load_project(tx.as_mut(), project_id).await?;
        require_role(&project, actor, Role::Admin)?;
        if user == &project.owner_id {
            return Err(Error::Conflict(
                "the project owner cannot be removed".to_string(),
            ));
        }
        let Some(role) = project.role_of(user) else {
            return Err(ValidationError::InvalidValue {
                field: "member",
                value: user.to_string(),
            }
            .into());
        };

        tx.remove_member(&project.id, user).await?;
        let activity = RecentActivity::new(actor, ActivityType::UserProjectDelete)
            .for_project(&project.id)
            .with_old(Snapshot {
                member: Some(user.clone()),
                role: Some(role),
                ..Snapshot::default()
            });
        record(tx.as_mut(), &activity).await?;

        let updated = load_project(tx.as_mut(), project_id).await?;
        tx.commit().await?;

        info!(project = %project_id, member = %user, "Removed member");
        Ok(updated)
    }

    /// Apply a partial settings update. Requires Admin.
    ///
    /// # Errors
    ///
    /// - `ProjectNotFound` / `PermissionDenied`
    /// - `Validation(Unchanged)` for an empty patch
    pub async fn update_settings(
        &self,
        actor: &UserId,
        project_id: &ProjectId,
        patch: &SettingsPatch,
    ) -> Result<Project> {
        if patch.is_empty() {
            return Err(ValidationError::Unchanged.into());
        }

        let mut tx = self.store.begin().await?;
        let mut project = load_project(tx.as_mut(), project_id).await?;
        require_role(&project, actor, Role::Admin)?;

        let before = project.settings.clone();
        patch.apply(&mut project.settings);
        tx.save_settings(&project.id, &project.settings).await?;

        let activity = RecentActivity::new(actor, ActivityType::ProjectUpdate)
            .for_project(&project.id)
            .with_old(Snapshot {
                settings: Some(before),
                ..Snapshot::default()
            })
            .with_new(Snapshot {
                settings: Some(project.settings.clone()),
                ..Snapshot::default()
            });
        record(tx.as_mut(), &activity).await?;
        tx.commit().await?;

        info!(project = %project.id, "Updated project settings");
        Ok(project)
    }

    /// Fetch a project with its members. Requires Viewer.
    ///
    /// # Errors
    ///
    /// `ProjectNotFound` or `PermissionDenied`.
    pub async fn project(&self, actor: &UserId, id: &ProjectId) -> Result<Project> {
        let mut tx = self.store.begin().await?;
        let project = load_project(tx.as_mut(), id).await?;
        require_role(&project, actor, Role::Viewer)?;
        Ok(project)
    }
}

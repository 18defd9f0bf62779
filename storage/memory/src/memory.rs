use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use steward_core::error::{Missing, StoreError};
use steward_core::model::{
    ActivityId, Backlog, BacklogId, Credentials, EntityKind, EntityRef, NewBacklog, NewProject, NewWork, PriorityId, Project, ProjectId,
    RelationKey, RoleId, StateId, TrackerId, UserId, Work, WorkId,
};
use steward_core::patch::{Column, FieldValue};
use steward_core::{FieldMask, Listing, RawJson, Store};
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::MemoryError;

struct User {
    name: String,
    password: String,
}

#[derive(Default)]
struct Tables {
    users: BTreeMap<UserId, User>,
    roles: BTreeMap<RoleId, String>,
    trackers: BTreeMap<TrackerId, String>,
    activities: BTreeMap<ActivityId, String>,
    priorities: BTreeMap<PriorityId, String>,
    states: BTreeMap<StateId, String>,

    projects: BTreeMap<ProjectId, Project>,
    backlogs: BTreeMap<BacklogId, Backlog>,
    works: BTreeMap<WorkId, Work>,

    project_roles: BTreeMap<(ProjectId, RoleId), BTreeSet<UserId>>,
    work_users: BTreeMap<WorkId, BTreeSet<UserId>>,

    last_id: i32,
}

pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self { Self::builder().build() }

    pub fn builder() -> MemoryStoreBuilder { MemoryStoreBuilder::default() }
}

impl Default for MemoryStore {
    fn default() -> Self { Self::new() }
}

/// Seeds users and lookup tables. Each table numbers its rows from 1 in the order they are added.
#[derive(Default)]
pub struct MemoryStoreBuilder {
    tables: Tables,
}

impl MemoryStoreBuilder {
    pub fn user(mut self, name: impl Into<String>, password: impl Into<String>) -> Self {
        let id = UserId(self.tables.users.len() as i32 + 1);
        self.tables.users.insert(id, User { name: name.into(), password: password.into() });
        self
    }

    pub fn role(mut self, name: impl Into<String>) -> Self {
        let id = RoleId(self.tables.roles.len() as i32 + 1);
        self.tables.roles.insert(id, name.into());
        self
    }

    pub fn tracker(mut self, name: impl Into<String>) -> Self {
        let id = TrackerId(self.tables.trackers.len() as i32 + 1);
        self.tables.trackers.insert(id, name.into());
        self
    }

    pub fn activity(mut self, name: impl Into<String>) -> Self {
        let id = ActivityId(self.tables.activities.len() as i32 + 1);
        self.tables.activities.insert(id, name.into());
        self
    }

    pub fn priority(mut self, name: impl Into<String>) -> Self {
        let id = PriorityId(self.tables.priorities.len() as i32 + 1);
        self.tables.priorities.insert(id, name.into());
        self
    }

    pub fn state(mut self, name: impl Into<String>) -> Self {
        let id = StateId(self.tables.states.len() as i32 + 1);
        self.tables.states.insert(id, name.into());
        self
    }

    pub fn build(self) -> MemoryStore { MemoryStore { tables: RwLock::new(self.tables) } }
}

// Reference checks

fn exists<K: Ord + std::fmt::Display, V>(table: &BTreeMap<K, V>, key: K) -> Result<(), StoreError> {
    if table.contains_key(&key) {
        Ok(())
    } else {
        Err(StoreError::Constraint(format!("{key} does not exist")))
    }
}

impl Tables {
    fn next_id(&mut self) -> i32 {
        self.last_id += 1;
        self.last_id
    }

    fn check_project(&self, project: &Project) -> Result<(), StoreError> {
        exists(&self.users, project.created_by)?;
        exists(&self.users, project.pic_id)
    }

    fn check_backlog(&self, backlog: &Backlog) -> Result<(), StoreError> {
        exists(&self.projects, backlog.project_id)?;
        exists(&self.users, backlog.created_by)?;
        exists(&self.users, backlog.pic_id)?;
        exists(&self.priorities, backlog.priority_id)
    }

    fn check_work(&self, work: &Work) -> Result<(), StoreError> {
        exists(&self.backlogs, work.backlog_id)?;
        if let Some(pic) = work.pic_id {
            exists(&self.users, pic)?;
        }
        exists(&self.states, work.current_state)?;
        exists(&self.users, work.created_by)?;
        exists(&self.priorities, work.priority_id)?;
        exists(&self.trackers, work.tracker_id)?;
        exists(&self.activities, work.activity_id)?;
        if work.estimated_hours < 0.0 {
            return Err(StoreError::Constraint("estimated hours must not be negative".to_owned()));
        }
        Ok(())
    }

    fn user_name(&self, id: UserId) -> Option<&str> { self.users.get(&id).map(|user| user.name.as_str()) }

    fn listing(&self, listing: Listing) -> Value {
        match listing {
            Listing::Projects => Value::Array(
                self.projects
                    .values()
                    .map(|p| {
                        json!({
                            "projectId": p.id,
                            "name": p.name,
                            "description": p.description,
                            "createdBy": p.created_by,
                            "startDate": p.start_date,
                            "targetDate": p.target_date,
                            "picId": p.pic_id,
                            "picName": self.user_name(p.pic_id),
                        })
                    })
                    .collect(),
            ),
            Listing::UserRoles(project) => Value::Array(
                self.project_roles
                    .range((project, RoleId(i32::MIN))..=(project, RoleId(i32::MAX)))
                    .flat_map(|((_, role), users)| {
                        users.iter().map(move |user| {
                            json!({
                                "userId": user,
                                "userName": self.user_name(*user),
                                "roleId": role,
                                "roleName": self.roles.get(role),
                            })
                        })
                    })
                    .collect(),
            ),
            Listing::Backlogs(project) => Value::Array(
                self.backlogs
                    .values()
                    .filter(|b| b.project_id == project)
                    .map(|b| {
                        json!({
                            "backlogId": b.id,
                            "projectId": b.project_id,
                            "name": b.name,
                            "description": b.description,
                            "startDate": b.start_date,
                            "targetDate": b.target_date,
                            "createdBy": b.created_by,
                            "picId": b.pic_id,
                            "picName": self.user_name(b.pic_id),
                            "priorityId": b.priority_id,
                            "priorityName": self.priorities.get(&b.priority_id),
                        })
                    })
                    .collect(),
            ),
            Listing::Works(backlog) => Value::Array(
                self.works
                    .values()
                    .filter(|w| w.backlog_id == backlog)
                    .map(|w| {
                        json!({
                            "workId": w.id,
                            "backlogId": w.backlog_id,
                            "name": w.name,
                            "description": w.description,
                            "startDate": w.start_date,
                            "targetDate": w.target_date,
                            "picId": w.pic_id,
                            "picName": w.pic_id.and_then(|pic| self.user_name(pic)),
                            "currentState": w.current_state,
                            "stateName": self.states.get(&w.current_state),
                            "createdBy": w.created_by,
                            "priorityId": w.priority_id,
                            "estimatedHours": w.estimated_hours,
                            "trackerId": w.tracker_id,
                            "activityId": w.activity_id,
                        })
                    })
                    .collect(),
            ),
            Listing::UserTodos(user) => {
                let mut todos: Vec<&Work> = self
                    .works
                    .values()
                    .filter(|w| w.pic_id == Some(user) || self.work_users.get(&w.id).is_some_and(|users| users.contains(&user)))
                    .collect();
                todos.sort_by_key(|w| (w.target_date, w.id));
                Value::Array(
                    todos
                        .into_iter()
                        .map(|w| {
                            json!({
                                "workId": w.id,
                                "backlogId": w.backlog_id,
                                "projectId": self.backlogs.get(&w.backlog_id).map(|b| b.project_id),
                                "name": w.name,
                                "targetDate": w.target_date,
                                "currentState": w.current_state,
                                "stateName": self.states.get(&w.current_state),
                                "priorityId": w.priority_id,
                            })
                        })
                        .collect(),
                )
            }
            Listing::WorkAssignees(work) => Value::Array(
                self.work_users
                    .get(&work)
                    .into_iter()
                    .flatten()
                    .map(|user| json!({ "userId": user, "userName": self.user_name(*user) }))
                    .collect(),
            ),
            Listing::Usernames => {
                let mut names: Vec<&str> = self.users.values().map(|user| user.name.as_str()).collect();
                names.sort_unstable();
                json!(names)
            }
            Listing::ProjectAssignees { project, role } => {
                let names: BTreeSet<&str> = self
                    .project_roles
                    .iter()
                    .filter(|((p, r), _)| *p == project && role.map_or(true, |role| *r == role))
                    .flat_map(|(_, users)| users.iter().filter_map(|user| self.user_name(*user)))
                    .collect();
                json!(names)
            }
            Listing::ReferenceData => json!({
                "trackers": lookup(&self.trackers),
                "activities": lookup(&self.activities),
                "priorities": lookup(&self.priorities),
                "states": lookup(&self.states),
            }),
        }
    }
}

fn lookup<K: Copy + Into<i32>>(table: &BTreeMap<K, String>) -> Value {
    Value::Array(
        table
            .iter()
            .map(|(id, name)| {
                let id: i32 = (*id).into();
                json!({ "id": id, "name": name })
            })
            .collect(),
    )
}

// Column application. Each function fails on a column the entity does not have, or a value of the
// wrong shape, without touching the entity.

fn text(column: Column, value: &FieldValue) -> Result<String, MemoryError> {
    match value {
        FieldValue::Text(text) => Ok(text.clone()),
        _ => Err(MemoryError::Mismatch { column, value: value.clone() }),
    }
}

fn optional_text(column: Column, value: &FieldValue) -> Result<Option<String>, MemoryError> {
    match value {
        FieldValue::Null => Ok(None),
        _ => text(column, value).map(Some),
    }
}

fn timestamp(column: Column, value: &FieldValue) -> Result<DateTime<Utc>, MemoryError> {
    match value {
        FieldValue::Timestamp(at) => Ok(*at),
        _ => Err(MemoryError::Mismatch { column, value: value.clone() }),
    }
}

fn id<T: From<i32>>(column: Column, value: &FieldValue) -> Result<T, MemoryError> {
    match value {
        FieldValue::Int(id) => Ok(T::from(*id)),
        _ => Err(MemoryError::Mismatch { column, value: value.clone() }),
    }
}

fn optional_id<T: From<i32>>(column: Column, value: &FieldValue) -> Result<Option<T>, MemoryError> {
    match value {
        FieldValue::Null => Ok(None),
        _ => id(column, value).map(Some),
    }
}

fn hours(column: Column, value: &FieldValue) -> Result<f64, MemoryError> {
    match value {
        FieldValue::Float(hours) => Ok(*hours),
        _ => Err(MemoryError::Mismatch { column, value: value.clone() }),
    }
}

fn apply_project(project: &mut Project, mask: &FieldMask) -> Result<(), MemoryError> {
    for (column, value) in mask {
        match column {
            Column::Name => project.name = text(*column, value)?,
            Column::Description => project.description = optional_text(*column, value)?,
            Column::StartDate => project.start_date = timestamp(*column, value)?,
            Column::TargetDate => project.target_date = timestamp(*column, value)?,
            Column::PicId => project.pic_id = id(*column, value)?,
            _ => return Err(MemoryError::UnknownColumn { entity: EntityKind::Project, column: *column }),
        }
    }
    Ok(())
}

fn apply_backlog(backlog: &mut Backlog, mask: &FieldMask) -> Result<(), MemoryError> {
    for (column, value) in mask {
        match column {
            Column::Name => backlog.name = text(*column, value)?,
            Column::Description => backlog.description = optional_text(*column, value)?,
            Column::StartDate => backlog.start_date = timestamp(*column, value)?,
            Column::TargetDate => backlog.target_date = timestamp(*column, value)?,
            Column::PicId => backlog.pic_id = id(*column, value)?,
            Column::PriorityId => backlog.priority_id = id(*column, value)?,
            _ => return Err(MemoryError::UnknownColumn { entity: EntityKind::Backlog, column: *column }),
        }
    }
    Ok(())
}

fn apply_work(work: &mut Work, mask: &FieldMask) -> Result<(), MemoryError> {
    for (column, value) in mask {
        match column {
            Column::Name => work.name = text(*column, value)?,
            Column::Description => work.description = optional_text(*column, value)?,
            Column::StartDate => work.start_date = timestamp(*column, value)?,
            Column::TargetDate => work.target_date = timestamp(*column, value)?,
            Column::PicId => work.pic_id = optional_id(*column, value)?,
            Column::CurrentState => work.current_state = id(*column, value)?,
            Column::PriorityId => work.priority_id = id(*column, value)?,
            Column::EstimatedHours => work.estimated_hours = hours(*column, value)?,
            Column::TrackerId => work.tracker_id = id(*column, value)?,
            Column::ActivityId => work.activity_id = id(*column, value)?,
        }
    }
    Ok(())
}

#[async_trait]
impl Store for MemoryStore {
    async fn lookup_credentials(&self, credentials: &Credentials) -> Result<RawJson, StoreError> {
        let tables = self.tables.read().await;
        debug!("MemoryStore.lookup_credentials({})", credentials.user_name);
        let (id, user) = tables
            .users
            .iter()
            .find(|(_, user)| user.name == credentials.user_name && user.password == credentials.password)
            .ok_or(StoreError::NotFound(Missing::Credentials))?;
        Ok(RawJson::from_value(&json!({ "userId": id, "userName": user.name })).map_err(MemoryError::from)?)
    }

    async fn insert_project(&self, project: &NewProject) -> Result<ProjectId, StoreError> {
        let mut tables = self.tables.write().await;
        let mut row = Project {
            id: ProjectId(0),
            name: project.name.clone(),
            description: project.description.clone(),
            created_by: project.created_by,
            start_date: project.start_date.unwrap_or_else(Utc::now),
            target_date: project.target_date,
            pic_id: project.pic_id,
        };
        tables.check_project(&row)?;

        row.id = ProjectId(tables.next_id());
        debug!("MemoryStore.insert_project: {}", row.id);
        let id = row.id;
        tables.projects.insert(id, row);
        Ok(id)
    }

    async fn insert_backlog(&self, backlog: &NewBacklog) -> Result<BacklogId, StoreError> {
        let mut tables = self.tables.write().await;
        let mut row = Backlog {
            id: BacklogId(0),
            project_id: backlog.project_id,
            name: backlog.name.clone(),
            description: backlog.description.clone(),
            start_date: backlog.start_date.unwrap_or_else(Utc::now),
            target_date: backlog.target_date,
            created_by: backlog.created_by,
            pic_id: backlog.pic_id,
            priority_id: backlog.priority_id,
        };
        tables.check_backlog(&row)?;

        row.id = BacklogId(tables.next_id());
        debug!("MemoryStore.insert_backlog: {}", row.id);
        let id = row.id;
        tables.backlogs.insert(id, row);
        Ok(id)
    }

    async fn insert_work(&self, work: &NewWork) -> Result<WorkId, StoreError> {
        let mut tables = self.tables.write().await;
        let mut row = Work {
            id: WorkId(0),
            backlog_id: work.backlog_id,
            name: work.name.clone(),
            description: work.description.clone(),
            start_date: work.start_date.unwrap_or_else(Utc::now),
            target_date: work.target_date,
            pic_id: work.pic_id,
            current_state: work.current_state,
            created_by: work.created_by,
            priority_id: work.priority_id,
            estimated_hours: work.estimated_hours,
            tracker_id: work.tracker_id,
            activity_id: work.activity_id,
        };
        tables.check_work(&row)?;

        row.id = WorkId(tables.next_id());
        debug!("MemoryStore.insert_work: {}", row.id);
        let id = row.id;
        tables.works.insert(id, row);
        Ok(id)
    }

    async fn update(&self, target: EntityRef, mask: &FieldMask) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        debug!("MemoryStore.update({}): {:?}", target, mask.columns().collect::<Vec<_>>());

        // Changes are applied to a copy and only written back once every reference checks out.
        match target {
            EntityRef::Project(id) => {
                let mut row = tables.projects.get(&id).cloned().ok_or(StoreError::NotFound(target.into()))?;
                apply_project(&mut row, mask)?;
                tables.check_project(&row)?;
                tables.projects.insert(id, row);
            }
            EntityRef::Backlog(id) => {
                let mut row = tables.backlogs.get(&id).cloned().ok_or(StoreError::NotFound(target.into()))?;
                apply_backlog(&mut row, mask)?;
                tables.check_backlog(&row)?;
                tables.backlogs.insert(id, row);
            }
            EntityRef::Work(id) => {
                let mut row = tables.works.get(&id).cloned().ok_or(StoreError::NotFound(target.into()))?;
                apply_work(&mut row, mask)?;
                tables.check_work(&row)?;
                tables.works.insert(id, row);
            }
        }
        Ok(())
    }

    async fn reconcile(&self, key: RelationKey, removed: &[UserId], added: &[UserId]) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        debug!("MemoryStore.reconcile({}): -{:?} +{:?}", key, removed, added);

        match key {
            RelationKey::ProjectRole { project, role } => {
                if !tables.projects.contains_key(&project) {
                    return Err(StoreError::NotFound(key.into()));
                }
                // the role is a foreign key of inserted rows only
                if !added.is_empty() {
                    exists(&tables.roles, role)?;
                }
            }
            RelationKey::Work { work } => {
                if !tables.works.contains_key(&work) {
                    return Err(StoreError::NotFound(key.into()));
                }
            }
        }
        for user in added {
            exists(&tables.users, *user)?;
        }

        let members = match key {
            RelationKey::ProjectRole { project, role } => tables.project_roles.entry((project, role)).or_default(),
            RelationKey::Work { work } => tables.work_users.entry(work).or_default(),
        };
        for user in removed {
            members.remove(user);
        }
        members.extend(added.iter().copied());
        Ok(())
    }

    async fn project(&self, id: ProjectId) -> Result<Project, StoreError> {
        self.tables.read().await.projects.get(&id).cloned().ok_or(StoreError::NotFound(Missing::Project(id)))
    }

    async fn backlog(&self, id: BacklogId) -> Result<Backlog, StoreError> {
        self.tables.read().await.backlogs.get(&id).cloned().ok_or(StoreError::NotFound(Missing::Backlog(id)))
    }

    async fn work(&self, id: WorkId) -> Result<Work, StoreError> {
        self.tables.read().await.works.get(&id).cloned().ok_or(StoreError::NotFound(Missing::Work(id)))
    }

    async fn members(&self, key: RelationKey) -> Result<BTreeSet<UserId>, StoreError> {
        let tables = self.tables.read().await;
        let members = match key {
            RelationKey::ProjectRole { project, role } => tables.project_roles.get(&(project, role)),
            RelationKey::Work { work } => tables.work_users.get(&work),
        };
        Ok(members.cloned().unwrap_or_default())
    }

    async fn list(&self, listing: Listing) -> Result<RawJson, StoreError> {
        let tables = self.tables.read().await;
        debug!("MemoryStore.list({})", listing);
        Ok(RawJson::from_value(&tables.listing(listing)).map_err(MemoryError::from)?)
    }
}

//! Task mutations: each function resolves whatever names it was given,
//! encodes one or more `maniphest.edit` calls and submits them in order.
//!
//! Batch operations are fail-fast without rollback, by design: a failure
//! aborts the remaining tasks, and tasks already mutated stay mutated.
//! Board moves are idempotent, so re-running the command is the recovery
//! path.

use serde_json::Value;
use thiserror::Error;

use crate::cache::IdentifierCache;
use crate::conduit::{ConduitError, Transport};
use crate::resolver::{ResolveError, Resolver};
use crate::task::{EnrichedTask, Priority, TaskData, TaskId, TaskStatus, TaskSummary};
use crate::transactions::{Field, TransactionSet};

#[derive(Debug, Error)]
pub enum OpsError {
    #[error(transparent)]
    Resolve(#[from] ResolveError),
    #[error(transparent)]
    Conduit(#[from] ConduitError),
    #[error("Server response to maniphest.edit carried no object id")]
    MissingObject,
}

/// Everything `create` needs. Tags fall back to the configured default
/// project when none are given.
#[derive(Debug, Clone)]
pub struct CreateSpec {
    pub title: String,
    pub description: String,
    pub priority: Priority,
    pub tags: Vec<String>,
    pub cc: Vec<String>,
    pub owner: Option<String>,
    pub parent: Option<TaskId>,
}

fn submit<T: Transport>(
    transport: &T,
    object: Option<&TaskId>,
    txns: &TransactionSet,
) -> Result<Value, OpsError> {
    let params = txns.encode(object);
    Ok(transport.call("maniphest.edit", &params)?)
}

/// The status transition implied by landing on a column, keyed on the
/// column's display name.
pub fn status_after_move(column_name: &str) -> Option<TaskStatus> {
    let name = column_name.trim();
    if name.eq_ignore_ascii_case("done") {
        Some(TaskStatus::Resolved)
    } else if name.eq_ignore_ascii_case("in progress") || name.eq_ignore_ascii_case("needs review")
    {
        Some(TaskStatus::Progress)
    } else {
        None
    }
}

/// Move a batch of tasks onto a named column of the base project's board,
/// or of its current milestone board. Board and column are resolved before
/// any task is touched, so a bad name never partially applies.
pub fn move_tasks<T: Transport>(
    transport: &T,
    cache: &mut IdentifierCache,
    base_project_phid: &str,
    milestone: bool,
    column_name: &str,
    task_ids: &[TaskId],
) -> Result<(), OpsError> {
    let mut resolver = Resolver::new(transport, cache);
    let board = resolver.board_or_milestone(milestone, base_project_phid)?;
    let column = resolver.column(&board, column_name)?;
    let follow_up = status_after_move(&column.name);

    for id in task_ids {
        let mut txns = TransactionSet::new();
        txns.push(Field::Column, vec![column.phid.clone()]);
        submit(transport, Some(id), &txns)?;
        if let Some(status) = follow_up {
            let mut txns = TransactionSet::new();
            txns.push(Field::Status, status.wire_value());
            submit(transport, Some(id), &txns)?;
        }
    }
    Ok(())
}

pub fn create_task<T: Transport>(
    transport: &T,
    cache: &mut IdentifierCache,
    default_project_phid: Option<&str>,
    spec: &CreateSpec,
) -> Result<TaskId, OpsError> {
    let mut resolver = Resolver::new(transport, cache);

    let mut txns = TransactionSet::new();
    txns.push(Field::Title, spec.title.clone());
    txns.push(Field::Description, spec.description.clone());
    txns.push(Field::Priority, spec.priority.wire_name());

    let mut project_phids = Vec::new();
    for tag in &spec.tags {
        project_phids.push(resolver.tag(tag)?.phid);
    }
    if project_phids.is_empty() {
        if let Some(phid) = default_project_phid {
            project_phids.push(phid.to_string());
        }
    }
    if !project_phids.is_empty() {
        txns.push(Field::ProjectsAdd, project_phids);
    }

    if let Some(owner) = &spec.owner {
        let user = resolver.user(owner)?;
        txns.push(Field::Owner, user.phid);
    }

    if let Some(parent) = spec.parent {
        let parent_task = resolver.task(parent)?;
        txns.push(Field::ParentsSet, vec![parent_task.phid]);
    }

    let mut cc_phids = Vec::new();
    for username in &spec.cc {
        cc_phids.push(resolver.user(username)?.phid);
    }
    if !cc_phids.is_empty() {
        txns.push(Field::SubscribersSet, cc_phids);
    }

    let result = submit(transport, None, &txns)?;
    let id = result
        .get("object")
        .and_then(|object| object.get("id"))
        .and_then(Value::as_u64)
        .ok_or(OpsError::MissingObject)?;
    Ok(TaskId(id))
}

pub fn comment<T: Transport>(
    transport: &T,
    task_id: TaskId,
    text: &str,
) -> Result<(), OpsError> {
    let mut txns = TransactionSet::new();
    txns.push(Field::Comment, text);
    submit(transport, Some(&task_id), &txns)?;
    Ok(())
}

pub fn assign<T: Transport>(
    transport: &T,
    task_ids: &[TaskId],
    user_phid: &str,
) -> Result<(), OpsError> {
    for id in task_ids {
        let mut txns = TransactionSet::new();
        txns.push(Field::Owner, user_phid);
        submit(transport, Some(id), &txns)?;
    }
    Ok(())
}

pub fn subscribe<T: Transport>(
    transport: &T,
    task_ids: &[TaskId],
    user_phid: &str,
) -> Result<(), OpsError> {
    for id in task_ids {
        let mut txns = TransactionSet::new();
        txns.push(Field::SubscribersAdd, vec![user_phid.to_string()]);
        submit(transport, Some(id), &txns)?;
    }
    Ok(())
}

pub fn set_status<T: Transport>(
    transport: &T,
    task_ids: &[TaskId],
    status: TaskStatus,
) -> Result<(), OpsError> {
    for id in task_ids {
        let mut txns = TransactionSet::new();
        txns.push(Field::Status, status.wire_value());
        submit(transport, Some(id), &txns)?;
    }
    Ok(())
}

pub fn set_parent<T: Transport>(
    transport: &T,
    task_ids: &[TaskId],
    parent_phid: &str,
) -> Result<(), OpsError> {
    for id in task_ids {
        let mut txns = TransactionSet::new();
        txns.push(Field::ParentsSet, vec![parent_phid.to_string()]);
        submit(transport, Some(id), &txns)?;
    }
    Ok(())
}

pub fn tag_tasks<T: Transport>(
    transport: &T,
    task_ids: &[TaskId],
    tag_phid: &str,
) -> Result<(), OpsError> {
    for id in task_ids {
        let mut txns = TransactionSet::new();
        txns.push(Field::ProjectsAdd, vec![tag_phid.to_string()]);
        submit(transport, Some(id), &txns)?;
    }
    Ok(())
}

pub fn show_task<T: Transport>(
    transport: &T,
    cache: &mut IdentifierCache,
    base_url: &str,
    id: TaskId,
) -> Result<EnrichedTask, OpsError> {
    let mut resolver = Resolver::new(transport, cache);
    let task = resolver.task(id)?;
    enrich_task(&mut resolver, base_url, task)
}

/// Decorate a raw search result with usernames, tag titles, parent and
/// subtasks for display.
pub fn enrich_task<T: Transport>(
    resolver: &mut Resolver<'_, T>,
    base_url: &str,
    task: TaskData,
) -> Result<EnrichedTask, OpsError> {
    let author = match &task.fields.author_phid {
        Some(phid) => resolver.username_for_phid(phid)?,
        None => None,
    };
    let owner = match &task.fields.owner_phid {
        Some(phid) => resolver.username_for_phid(phid)?,
        None => None,
    };
    let tags = resolver.project_titles(task.project_phids())?;
    let parent = resolver.parent_of(task.task_id())?.map(|parent| TaskSummary {
        id: parent.id,
        title: parent.fields.name,
        owner: None,
        resolved: parent.fields.status.value.as_str() == Some("resolved"),
    });
    let mut subtasks = Vec::new();
    for subtask in resolver.subtasks_of(task.task_id())? {
        let owner = match &subtask.fields.owner_phid {
            Some(phid) => resolver.username_for_phid(phid)?,
            None => None,
        };
        let resolved = subtask.is_resolved();
        subtasks.push(TaskSummary {
            id: subtask.id,
            title: subtask.fields.name,
            owner,
            resolved,
        });
    }
    Ok(EnrichedTask {
        id: task.id,
        url: format!("{}/T{}", base_url, task.id),
        title: task.fields.name,
        author,
        owner,
        tags,
        status: task.fields.status.name,
        priority: task.fields.priority.name,
        description: task
            .fields
            .description
            .map(|description| description.raw)
            .unwrap_or_default(),
        parent,
        subtasks,
    })
}

/// Enrich every task sitting in the source column, then move each to the
/// destination column. Used for weekly reports: the returned tasks are the
/// report body, the move marks them as reported.
pub fn report_done_tasks<T: Transport>(
    transport: &T,
    cache: &mut IdentifierCache,
    base_url: &str,
    base_project_phid: &str,
    milestone: bool,
    source: &str,
    destination: &str,
) -> Result<Vec<EnrichedTask>, OpsError> {
    let mut resolver = Resolver::new(transport, cache);
    let board = resolver.board_or_milestone(milestone, base_project_phid)?;
    let from = resolver.column(&board, source)?;
    let to = resolver.column(&board, destination)?;
    let tasks = resolver.tasks_in_column(&from.phid)?;

    let mut reported = Vec::with_capacity(tasks.len());
    for task in tasks {
        let id = task.task_id();
        reported.push(enrich_task(&mut resolver, base_url, task)?);
        let mut txns = TransactionSet::new();
        txns.push(Field::Column, vec![to.phid.clone()]);
        submit(transport, Some(&id), &txns)?;
    }
    Ok(reported)
}

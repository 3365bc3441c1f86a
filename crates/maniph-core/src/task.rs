use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Numeric Maniphest task id, displayed with the `T` monogram prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(pub u64);

#[derive(Debug, Error)]
#[error("Invalid task id '{0}': expected T123456 or 123456")]
pub struct TaskIdError(String);

impl FromStr for TaskId {
    type Err = TaskIdError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let digits = value
            .strip_prefix('T')
            .or_else(|| value.strip_prefix('t'))
            .unwrap_or(value);
        digits
            .parse::<u64>()
            .map(TaskId)
            .map_err(|_| TaskIdError(value.to_string()))
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "T{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Priority {
    Unbreaknow,
    High,
    Normal,
    Low,
    NeedsTriage,
}

impl Priority {
    pub fn wire_name(self) -> &'static str {
        match self {
            Priority::Unbreaknow => "unbreaknow",
            Priority::High => "high",
            Priority::Normal => "normal",
            Priority::Low => "low",
            Priority::NeedsTriage => "needs-triage",
        }
    }
}

#[derive(Debug, Error)]
#[error("Unknown priority '{0}': expected unbreaknow, high, normal, low or needs-triage")]
pub struct PriorityError(String);

impl FromStr for Priority {
    type Err = PriorityError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "unbreaknow" => Ok(Priority::Unbreaknow),
            "high" => Ok(Priority::High),
            "normal" => Ok(Priority::Normal),
            "low" => Ok(Priority::Low),
            "needs-triage" => Ok(Priority::NeedsTriage),
            other => Err(PriorityError(other.to_string())),
        }
    }
}

/// Workflow states accepted by the `status` transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    Open,
    Resolved,
    Progress,
    Stalled,
    Invalid,
    Declined,
}

impl TaskStatus {
    pub fn wire_value(self) -> &'static str {
        match self {
            TaskStatus::Open => "open",
            TaskStatus::Resolved => "resolved",
            TaskStatus::Progress => "progress",
            TaskStatus::Stalled => "stalled",
            TaskStatus::Invalid => "invalid",
            TaskStatus::Declined => "declined",
        }
    }
}

#[derive(Debug, Error)]
#[error("Unknown status '{0}': expected open, resolved, progress, stalled, invalid or declined")]
pub struct TaskStatusError(String);

impl FromStr for TaskStatus {
    type Err = TaskStatusError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "open" => Ok(TaskStatus::Open),
            "resolved" => Ok(TaskStatus::Resolved),
            "progress" => Ok(TaskStatus::Progress),
            "stalled" => Ok(TaskStatus::Stalled),
            "invalid" => Ok(TaskStatus::Invalid),
            "declined" => Ok(TaskStatus::Declined),
            other => Err(TaskStatusError(other.to_string())),
        }
    }
}

/// One task as returned by `maniphest.search`.
#[derive(Debug, Clone, Deserialize)]
pub struct TaskData {
    pub id: u64,
    pub phid: String,
    pub fields: TaskFields,
    #[serde(default)]
    pub attachments: TaskAttachments,
}

impl TaskData {
    pub fn task_id(&self) -> TaskId {
        TaskId(self.id)
    }

    pub fn is_resolved(&self) -> bool {
        self.fields.status.value.as_str() == Some("resolved")
    }

    pub fn project_phids(&self) -> &[String] {
        match &self.attachments.projects {
            Some(projects) => &projects.project_phids,
            None => &[],
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TaskFields {
    pub name: String,
    #[serde(default)]
    pub description: Option<RawText>,
    #[serde(rename = "authorPHID", default)]
    pub author_phid: Option<String>,
    #[serde(rename = "ownerPHID", default)]
    pub owner_phid: Option<String>,
    pub status: NamedValue,
    pub priority: NamedValue,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawText {
    pub raw: String,
}

/// `{name, value}` pair used by Conduit for status and priority: the name is
/// the display label, the value is the machine form (a string for statuses,
/// a number for priorities).
#[derive(Debug, Clone, Deserialize)]
pub struct NamedValue {
    pub name: String,
    #[serde(default)]
    pub value: Value,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TaskAttachments {
    #[serde(default)]
    pub projects: Option<ProjectsAttachment>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProjectsAttachment {
    #[serde(rename = "projectPHIDs", default)]
    pub project_phids: Vec<String>,
}

/// A task decorated with everything the presentation layer needs: usernames
/// instead of PHIDs, tag titles, parent and subtasks.
#[derive(Debug, Clone, Serialize)]
pub struct EnrichedTask {
    pub id: u64,
    pub url: String,
    pub title: String,
    pub author: Option<String>,
    pub owner: Option<String>,
    pub tags: Vec<String>,
    pub status: String,
    pub priority: String,
    pub description: String,
    pub parent: Option<TaskSummary>,
    pub subtasks: Vec<TaskSummary>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TaskSummary {
    pub id: u64,
    pub title: String,
    pub owner: Option<String>,
    pub resolved: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn task_id_parses_with_and_without_prefix() {
        assert_eq!("T123456".parse::<TaskId>().expect("parse"), TaskId(123456));
        assert_eq!("123456".parse::<TaskId>().expect("parse"), TaskId(123456));
        assert!("Txyz".parse::<TaskId>().is_err());
        assert!("".parse::<TaskId>().is_err());
    }

    #[test]
    fn task_id_displays_with_prefix() {
        assert_eq!(TaskId(42).to_string(), "T42");
    }

    #[test]
    fn priority_round_trips_wire_names() {
        for name in ["unbreaknow", "high", "normal", "low", "needs-triage"] {
            let priority = name.parse::<Priority>().expect("parse");
            assert_eq!(priority.wire_name(), name);
        }
        assert!("urgent".parse::<Priority>().is_err());
    }

    #[test]
    fn status_round_trips_wire_values() {
        for name in ["open", "resolved", "progress", "stalled", "invalid", "declined"] {
            let status = name.parse::<TaskStatus>().expect("parse");
            assert_eq!(status.wire_value(), name);
        }
    }

    #[test]
    fn task_data_deserializes_search_result() {
        let raw = json!({
            "id": 123456,
            "phid": "PHID-TASK-abc",
            "fields": {
                "name": "Fix the widget",
                "description": {"raw": "It is broken."},
                "authorPHID": "PHID-USER-author",
                "ownerPHID": null,
                "status": {"name": "Open", "value": "open"},
                "priority": {"name": "Normal", "value": 50},
            },
            "attachments": {
                "projects": {"projectPHIDs": ["PHID-PROJ-1", "PHID-PROJ-2"]},
            },
        });
        let task: TaskData = serde_json::from_value(raw).expect("deserialize");
        assert_eq!(task.task_id(), TaskId(123456));
        assert_eq!(task.fields.name, "Fix the widget");
        assert_eq!(task.fields.owner_phid, None);
        assert_eq!(task.project_phids().len(), 2);
        assert!(!task.is_resolved());
    }

    #[test]
    fn task_data_tolerates_missing_attachments() {
        let raw = json!({
            "id": 7,
            "phid": "PHID-TASK-x",
            "fields": {
                "name": "No attachments",
                "status": {"name": "Resolved", "value": "resolved"},
                "priority": {"name": "Low", "value": 25},
            },
        });
        let task: TaskData = serde_json::from_value(raw).expect("deserialize");
        assert!(task.project_phids().is_empty());
        assert!(task.is_resolved());
    }
}

use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use crate::cache::{IdentifierCache, LookupKind};
use crate::conduit::{ConduitError, Transport};
use crate::task::{TaskData, TaskId};

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("{kind} '{name}' not found")]
    NotFound { kind: &'static str, name: String },
    #[error("Project {project} has no current milestone")]
    NoMilestone { project: String },
    #[error("Malformed response from {method}: {source}")]
    Malformed {
        method: &'static str,
        #[source]
        source: serde_json::Error,
    },
    #[error(transparent)]
    Conduit(#[from] ConduitError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRef {
    pub phid: String,
    pub username: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectRef {
    pub phid: String,
    pub title: String,
}

/// A resolved column. Carries the board-side display name so callers can
/// apply name-keyed status side effects after a cache hit as well.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnRef {
    pub phid: String,
    pub name: String,
}

#[derive(Debug, Deserialize)]
struct ColumnData {
    phid: String,
    fields: ColumnFields,
}

#[derive(Debug, Deserialize)]
struct ColumnFields {
    name: String,
    #[serde(rename = "proxyPHID", default)]
    proxy_phid: Option<String>,
    #[serde(rename = "isHidden", default)]
    is_hidden: bool,
}

#[derive(Debug, Deserialize)]
struct ProjectData {
    phid: String,
    fields: ProjectFields,
}

#[derive(Debug, Deserialize)]
struct ProjectFields {
    name: String,
    #[serde(default)]
    parent: Option<ProjectParent>,
}

#[derive(Debug, Deserialize)]
struct ProjectParent {
    name: String,
}

/// Resolves human-facing names to PHIDs, consulting the identifier cache
/// before the remote search API. Positive results are cached; not-found is
/// deliberately never cached, so an entity created after a failed lookup is
/// picked up without a cache clear.
pub struct Resolver<'a, T: Transport> {
    transport: &'a T,
    cache: &'a mut IdentifierCache,
}

impl<'a, T: Transport> Resolver<'a, T> {
    pub fn new(transport: &'a T, cache: &'a mut IdentifierCache) -> Self {
        Self { transport, cache }
    }

    pub fn user(&mut self, username: &str) -> Result<UserRef, ResolveError> {
        let key = username.to_lowercase();
        if let Some(phid) = self.cache.get(LookupKind::User, &key) {
            return Ok(UserRef {
                phid: phid.to_string(),
                username: username.to_string(),
            });
        }
        let params = vec![(
            "constraints[usernames][0]".to_string(),
            username.to_string(),
        )];
        let result = self.transport.call("user.search", &params)?;
        let Some(hit) = data_array(&result).first().cloned() else {
            return Err(ResolveError::NotFound {
                kind: "user",
                name: username.to_string(),
            });
        };
        let phid = string_field(&hit, "phid").ok_or(ResolveError::NotFound {
            kind: "user",
            name: username.to_string(),
        })?;
        self.cache.put(LookupKind::User, &key, &phid);
        Ok(UserRef {
            phid,
            username: username.to_string(),
        })
    }

    /// The user behind the API token. Not cached: the cache file is keyed by
    /// name, and the token in use can change between invocations.
    pub fn current_user(&self) -> Result<UserRef, ResolveError> {
        let result = self.transport.call("user.whoami", &[])?;
        let phid = string_field(&result, "phid");
        let username = string_field(&result, "userName");
        match (phid, username) {
            (Some(phid), Some(username)) => Ok(UserRef { phid, username }),
            _ => Err(ResolveError::NotFound {
                kind: "user",
                name: "<current>".to_string(),
            }),
        }
    }

    /// Exact title match against `project.search`, scoped to a parent
    /// project when one is given.
    pub fn project(
        &mut self,
        title: &str,
        parent_phid: Option<&str>,
    ) -> Result<ProjectRef, ResolveError> {
        let title = title.trim();
        let key = match parent_phid {
            Some(parent) => format!("{}/{}", parent, title.to_lowercase()),
            None => title.to_lowercase(),
        };
        if let Some(phid) = self.cache.get(LookupKind::Project, &key) {
            return Ok(ProjectRef {
                phid: phid.to_string(),
                title: title.to_string(),
            });
        }
        let mut params = vec![("constraints[query]".to_string(), title.to_string())];
        if let Some(parent) = parent_phid {
            params.push(("constraints[parents][0]".to_string(), parent.to_string()));
        }
        let result = self.transport.call("project.search", &params)?;
        let projects: Vec<ProjectData> = parse_data(&result, "project.search")?;
        let Some(hit) = projects
            .into_iter()
            .find(|project| project.fields.name.trim() == title)
        else {
            return Err(ResolveError::NotFound {
                kind: "project",
                name: title.to_string(),
            });
        };
        self.cache.put(LookupKind::Project, &key, &hit.phid);
        Ok(ProjectRef {
            phid: hit.phid,
            title: hit.fields.name,
        })
    }

    /// A tag expression is either a flat project title or
    /// `PARENT (SUBPROJECT)`. In the two-level form the parent is resolved
    /// first with no parent filter, then the subproject scoped to it; both
    /// must succeed.
    pub fn tag(&mut self, expression: &str) -> Result<ProjectRef, ResolveError> {
        let re = Regex::new(r"^(?P<parent>[\w\s.-]+) \((?P<subproject>[\w\s+.-]+)\)$")
            .expect("regex");
        match re.captures(expression.trim()) {
            Some(caps) => {
                let parent = self.project(caps["parent"].trim(), None)?;
                self.project(caps["subproject"].trim(), Some(&parent.phid))
            }
            None => self.project(expression.trim(), None),
        }
    }

    /// Case-insensitive exact match against the board's column names.
    /// Column names are unique per board, so ties cannot happen.
    pub fn column(&mut self, board_phid: &str, name: &str) -> Result<ColumnRef, ResolveError> {
        let key = format!("{}/{}", board_phid, name.to_lowercase());
        if let Some(phid) = self.cache.get(LookupKind::Column, &key) {
            return Ok(ColumnRef {
                phid: phid.to_string(),
                name: name.to_string(),
            });
        }
        let columns = self.board_columns(board_phid)?;
        let Some(hit) = columns
            .into_iter()
            .find(|column| column.fields.name.eq_ignore_ascii_case(name.trim()))
        else {
            return Err(ResolveError::NotFound {
                kind: "column",
                name: name.to_string(),
            });
        };
        self.cache.put(LookupKind::Column, &key, &hit.phid);
        Ok(ColumnRef {
            phid: hit.phid,
            name: hit.fields.name,
        })
    }

    /// The board every column lookup is relative to: the base project
    /// itself, or its current milestone. The milestone is the board behind
    /// the first non-hidden column whose proxy PHID is set.
    pub fn board_or_milestone(
        &mut self,
        want_milestone: bool,
        base_phid: &str,
    ) -> Result<String, ResolveError> {
        if !want_milestone {
            return Ok(base_phid.to_string());
        }
        if let Some(phid) = self.cache.get(LookupKind::Milestone, base_phid) {
            return Ok(phid.to_string());
        }
        let columns = self.board_columns(base_phid)?;
        let Some(phid) = columns
            .iter()
            .filter(|column| !column.fields.is_hidden)
            .find_map(|column| column.fields.proxy_phid.clone())
        else {
            return Err(ResolveError::NoMilestone {
                project: base_phid.to_string(),
            });
        };
        self.cache.put(LookupKind::Milestone, base_phid, &phid);
        Ok(phid)
    }

    /// Fetch one task by id. Never cached: tasks are mutable.
    pub fn task(&self, id: TaskId) -> Result<TaskData, ResolveError> {
        let params = vec![
            ("constraints[ids][0]".to_string(), id.0.to_string()),
            ("attachments[projects]".to_string(), "true".to_string()),
        ];
        let result = self.transport.call("maniphest.search", &params)?;
        let tasks: Vec<TaskData> = parse_data(&result, "maniphest.search")?;
        tasks.into_iter().next().ok_or(ResolveError::NotFound {
            kind: "task",
            name: id.to_string(),
        })
    }

    pub fn tasks_in_column(&self, column_phid: &str) -> Result<Vec<TaskData>, ResolveError> {
        let params = vec![
            (
                "constraints[columnPHIDs][0]".to_string(),
                column_phid.to_string(),
            ),
            ("attachments[projects]".to_string(), "true".to_string()),
        ];
        let result = self.transport.call("maniphest.search", &params)?;
        parse_data(&result, "maniphest.search")
    }

    pub fn subtasks_of(&self, id: TaskId) -> Result<Vec<TaskData>, ResolveError> {
        let params = vec![("constraints[parentIDs][0]".to_string(), id.0.to_string())];
        let result = self.transport.call("maniphest.search", &params)?;
        parse_data(&result, "maniphest.search")
    }

    pub fn parent_of(&self, id: TaskId) -> Result<Option<TaskData>, ResolveError> {
        let params = vec![("constraints[subtaskIDs][0]".to_string(), id.0.to_string())];
        let result = self.transport.call("maniphest.search", &params)?;
        let tasks: Vec<TaskData> = parse_data(&result, "maniphest.search")?;
        Ok(tasks.into_iter().next())
    }

    /// Reverse lookup for display purposes. A PHID that no longer resolves
    /// (e.g. a disabled account) yields None instead of an error.
    pub fn username_for_phid(&self, phid: &str) -> Result<Option<String>, ResolveError> {
        let params = vec![("constraints[phids][0]".to_string(), phid.to_string())];
        let result = self.transport.call("user.search", &params)?;
        Ok(data_array(&result).first().and_then(|user| {
            user.get("fields")
                .and_then(|fields| fields.get("username"))
                .and_then(Value::as_str)
                .map(str::to_string)
        }))
    }

    /// Display titles for a set of project PHIDs, rendered as
    /// `Parent - Name` for subprojects and milestones.
    pub fn project_titles(&self, phids: &[String]) -> Result<Vec<String>, ResolveError> {
        if phids.is_empty() {
            return Ok(Vec::new());
        }
        let params: Vec<(String, String)> = phids
            .iter()
            .enumerate()
            .map(|(index, phid)| (format!("constraints[phids][{index}]"), phid.clone()))
            .collect();
        let result = self.transport.call("project.search", &params)?;
        let projects: Vec<ProjectData> = parse_data(&result, "project.search")?;
        Ok(projects
            .into_iter()
            .map(|project| match project.fields.parent {
                Some(parent) => format!("{} - {}", parent.name, project.fields.name),
                None => project.fields.name,
            })
            .collect())
    }

    fn board_columns(&self, board_phid: &str) -> Result<Vec<ColumnData>, ResolveError> {
        let params = vec![(
            "constraints[projects][0]".to_string(),
            board_phid.to_string(),
        )];
        let result = self.transport.call("project.column.search", &params)?;
        parse_data(&result, "project.column.search")
    }
}

fn data_array(result: &Value) -> Vec<Value> {
    result
        .get("data")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default()
}

fn parse_data<D: serde::de::DeserializeOwned>(
    result: &Value,
    method: &'static str,
) -> Result<Vec<D>, ResolveError> {
    let data = result.get("data").cloned().unwrap_or(Value::Array(Vec::new()));
    serde_json::from_value(data).map_err(|source| ResolveError::Malformed { method, source })
}

fn string_field(value: &Value, key: &str) -> Option<String> {
    value.get(key).and_then(Value::as_str).map(str::to_string)
}

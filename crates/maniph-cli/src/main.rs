use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use maniph_core::cache::IdentifierCache;
use maniph_core::conduit::Conduit;
use maniph_core::config::{self, Config};
use maniph_core::ops::{self, CreateSpec};
use maniph_core::resolver::Resolver;
use maniph_core::task::{Priority, TaskId, TaskStatus};

use crate::display::OutputFormat;

mod display;
mod input;

#[derive(Parser)]
#[command(
    name = "maniph",
    version,
    about = "Manage Phabricator tasks from the comfort of your terminal"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show task details
    Show {
        task_id: TaskId,
        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Plain)]
        format: OutputFormat,
    },
    /// Create a new task
    Create {
        /// Title of the task
        #[arg(long)]
        title: String,
        /// Task description or path to a file containing the description
        /// body. If not provided, an editor will be opened.
        #[arg(long)]
        description: Option<String>,
        /// Task description template file. If provided, an editor will be
        /// opened, pre-filled with the template file content.
        #[arg(long)]
        template: Option<PathBuf>,
        /// Priority level of the task
        #[arg(long, default_value = "normal")]
        priority: Priority,
        /// ID of parent task
        #[arg(long = "parent-id")]
        parent_id: Option<TaskId>,
        /// Tags to associate to the task. Accepts 'Project' or
        /// 'Project (Subproject)'.
        #[arg(long = "tags")]
        tags: Vec<String>,
        /// Subscribers to associate to the task
        #[arg(long = "cc")]
        cc: Vec<String>,
        /// The username of the task owner
        #[arg(long)]
        owner: Option<String>,
    },
    /// Assign one or multiple tasks to a username
    Assign {
        /// The username to assign the tasks to. Self-assign if not provided.
        #[arg(long)]
        username: Option<String>,
        #[arg(required = true)]
        task_ids: Vec<TaskId>,
    },
    /// Move one or several tasks on their project board
    Move {
        /// Name of the destination column
        #[arg(long)]
        column: String,
        /// Move onto the project's current milestone board instead of the
        /// project board itself
        #[arg(long)]
        milestone: bool,
        /// Operate on this project instead of the configured default
        #[arg(long = "project-phid")]
        project_phid: Option<String>,
        #[arg(required = true)]
        task_ids: Vec<TaskId>,
    },
    /// Add a comment to a task
    Comment {
        /// Comment text or path to a text file containing the comment body.
        /// If not provided, an editor will be opened.
        #[arg(long)]
        comment: Option<String>,
        task_id: TaskId,
    },
    /// Subscribe to one or multiple tasks
    Subscribe {
        #[arg(required = true)]
        task_ids: Vec<TaskId>,
    },
    /// Set the status of one or multiple tasks
    Status {
        /// One of open, resolved, progress, stalled, invalid, declined
        #[arg(long)]
        status: TaskStatus,
        #[arg(required = true)]
        task_ids: Vec<TaskId>,
    },
    /// Set the parent task of the argument tasks
    Parent {
        #[arg(long = "parent-id")]
        parent_id: TaskId,
        #[arg(required = true)]
        task_ids: Vec<TaskId>,
    },
    /// Add a tag on one or multiple tasks
    Tag {
        #[arg(long)]
        tag: String,
        #[arg(required = true)]
        task_ids: Vec<TaskId>,
    },
    /// Print the tasks in the source column and move them to the
    /// destination column
    ReportDoneTasks {
        #[arg(long)]
        milestone: bool,
        #[arg(long, default_value = "Done")]
        source: String,
        #[arg(long, default_value = "Reported")]
        destination: String,
        #[arg(long, value_enum, default_value_t = OutputFormat::Plain)]
        format: OutputFormat,
        #[arg(long = "project-phid")]
        project_phid: Option<String>,
    },
    /// Manage the internal cache
    Cache {
        #[command(subcommand)]
        command: CacheCommand,
    },
    /// Manage the maniph config
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[derive(Subcommand)]
enum CacheCommand {
    /// Display the location of the identifier cache
    Show,
    /// Delete the identifier cache file
    Clear,
}

#[derive(Subcommand)]
enum ConfigCommand {
    /// Display the location of the config file
    Show,
}

/// Client state for commands that talk to the server. The cache flushes
/// itself on drop, whichever way the command exits.
struct Session {
    conduit: Conduit,
    cache: IdentifierCache,
    config: Config,
}

impl Session {
    fn open() -> Result<Self> {
        let config = Config::load()?;
        let cache_path =
            config::cache_path().context("Could not determine a home directory for the cache")?;
        Ok(Self {
            conduit: Conduit::new(&config.url, &config.token),
            cache: IdentifierCache::load(cache_path),
            config,
        })
    }

    fn base_project(&self, override_phid: Option<&str>) -> Result<String> {
        override_phid
            .map(str::to_string)
            .or_else(|| self.config.default_project_phid.clone())
            .context(
                "No project given: pass --project-phid or set PHABRICATOR_DEFAULT_PROJECT_PHID",
            )
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Command::Show { task_id, format } => {
            let mut session = Session::open()?;
            let task = ops::show_task(
                &session.conduit,
                &mut session.cache,
                session.conduit.base_url(),
                task_id,
            )?;
            display::print_task(&task, format)?;
        }
        Command::Create {
            title,
            description,
            template,
            priority,
            parent_id,
            tags,
            cc,
            owner,
        } => {
            let description =
                input::text_from_arg_or_fs_or_editor(description.as_deref(), template.as_deref())?;
            let mut session = Session::open()?;
            let spec = CreateSpec {
                title,
                description,
                priority,
                tags,
                cc,
                owner,
                parent: parent_id,
            };
            let id = ops::create_task(
                &session.conduit,
                &mut session.cache,
                session.config.default_project_phid.as_deref(),
                &spec,
            )?;
            let task = ops::show_task(
                &session.conduit,
                &mut session.cache,
                session.conduit.base_url(),
                id,
            )?;
            display::print_task(&task, OutputFormat::Plain)?;
        }
        Command::Assign { username, task_ids } => {
            let mut session = Session::open()?;
            let user = {
                let mut resolver = Resolver::new(&session.conduit, &mut session.cache);
                match username {
                    Some(name) => resolver.user(&name)?,
                    None => resolver.current_user()?,
                }
            };
            ops::assign(&session.conduit, &task_ids, &user.phid)?;
        }
        Command::Move {
            column,
            milestone,
            project_phid,
            task_ids,
        } => {
            let mut session = Session::open()?;
            let project = session.base_project(project_phid.as_deref())?;
            ops::move_tasks(
                &session.conduit,
                &mut session.cache,
                &project,
                milestone,
                &column,
                &task_ids,
            )?;
        }
        Command::Comment { comment, task_id } => {
            let text = input::text_from_arg_or_fs_or_editor(comment.as_deref(), None)?;
            let session = Session::open()?;
            ops::comment(&session.conduit, task_id, &text)?;
        }
        Command::Subscribe { task_ids } => {
            let mut session = Session::open()?;
            let user = {
                let resolver = Resolver::new(&session.conduit, &mut session.cache);
                resolver.current_user()?
            };
            ops::subscribe(&session.conduit, &task_ids, &user.phid)?;
        }
        Command::Status { status, task_ids } => {
            let session = Session::open()?;
            ops::set_status(&session.conduit, &task_ids, status)?;
        }
        Command::Parent {
            parent_id,
            task_ids,
        } => {
            let mut session = Session::open()?;
            let parent = {
                let resolver = Resolver::new(&session.conduit, &mut session.cache);
                resolver.task(parent_id)?
            };
            ops::set_parent(&session.conduit, &task_ids, &parent.phid)?;
        }
        Command::Tag { tag, task_ids } => {
            let mut session = Session::open()?;
            let tag_ref = {
                let mut resolver = Resolver::new(&session.conduit, &mut session.cache);
                resolver.tag(&tag)?
            };
            ops::tag_tasks(&session.conduit, &task_ids, &tag_ref.phid)?;
        }
        Command::ReportDoneTasks {
            milestone,
            source,
            destination,
            format,
            project_phid,
        } => {
            let mut session = Session::open()?;
            let project = session.base_project(project_phid.as_deref())?;
            let tasks = ops::report_done_tasks(
                &session.conduit,
                &mut session.cache,
                session.conduit.base_url(),
                &project,
                milestone,
                &source,
                &destination,
            )?;
            display::print_tasks(&tasks, format)?;
        }
        Command::Cache { command } => {
            let path = config::cache_path()
                .context("Could not determine a home directory for the cache")?;
            match command {
                CacheCommand::Show => println!("{}", path.display()),
                CacheCommand::Clear => {
                    let mut cache = IdentifierCache::load(path);
                    cache.clear().context("Failed to delete the cache file")?;
                }
            }
        }
        Command::Config { command } => {
            let path = config::config_path()
                .context("Could not determine a home directory for the config")?;
            match command {
                ConfigCommand::Show => println!("{}", path.display()),
            }
        }
    }
    Ok(())
}

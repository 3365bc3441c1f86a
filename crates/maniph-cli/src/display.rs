use anyhow::Result;
use clap::ValueEnum;

use maniph_core::task::{EnrichedTask, TaskId, TaskSummary};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Plain,
    Json,
}

pub fn print_task(task: &EnrichedTask, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(task)?),
        OutputFormat::Plain => print_plain(task),
    }
    Ok(())
}

pub fn print_tasks(tasks: &[EnrichedTask], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(tasks)?),
        OutputFormat::Plain => {
            for task in tasks {
                println!("{}", "=".repeat(50));
                print_plain(task);
            }
        }
    }
    Ok(())
}

fn print_plain(task: &EnrichedTask) {
    println!("URL: {}", task.url);
    println!("Task: {}", TaskId(task.id));
    println!("Title: {}", task.title);
    if let Some(author) = &task.author {
        println!("Author: {author}");
    }
    if let Some(owner) = &task.owner {
        println!("Owner: {owner}");
    }
    if !task.tags.is_empty() {
        println!("Tags: {}", task.tags.join(", "));
    }
    println!("Status: {}", task.status);
    println!("Priority: {}", task.priority);
    println!("Description: {}", task.description);
    let parent = task
        .parent
        .as_ref()
        .map(|parent| format!("{} - {}", TaskId(parent.id), parent.title))
        .unwrap_or_default();
    println!("Parent: {parent}");
    println!("Subtasks:");
    for subtask in &task.subtasks {
        println!("{}", subtask_line(subtask));
    }
}

fn subtask_line(subtask: &TaskSummary) -> String {
    let marker = if subtask.resolved { "[x]" } else { "[ ]" };
    let owner = subtask.owner.as_deref().unwrap_or("");
    format!(
        "{} - {} - @{:<10} - {}",
        marker,
        TaskId(subtask.id),
        owner,
        subtask.title
    )
}

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use tasknest_core::domain::{Comment, CommentId, TaskFormData, TaskId, TaskPatch, TaskStatus};
use tasknest_core::impls::JsonTaskSource;
use tasknest_core::ports::Clock;
use tasknest_core::{Tracker, TrackerBuilder, TrackerConfig};

/// Load a task list, discuss a task and print the derived views.
#[derive(Debug, Parser)]
#[command(name = "tasknest", version)]
struct Args {
    /// JSON task list (array of task records). Demo tasks are created if omitted.
    #[arg(long, env = "TASKNEST_TASKS")]
    tasks: Option<PathBuf>,

    /// TOML config file.
    #[arg(long, env = "TASKNEST_CONFIG")]
    config: Option<PathBuf>,

    /// Print the calendar as JSON.
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Tracing is opt-in via RUST_LOG.
    let filter = std::env::var("RUST_LOG")
        .ok()
        .and_then(|raw| EnvFilter::try_new(raw.trim()).ok())
        .unwrap_or_else(|| EnvFilter::new("off"));
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => TrackerConfig::load(path)
            .await
            .with_context(|| format!("loading config {}", path.display()))?,
        None => TrackerConfig::default(),
    };
    let tracker = TrackerBuilder::new().config(config).build()?;
    let calendar = tracker.calendar()?;

    match &args.tasks {
        Some(path) => {
            let outcome = tracker
                .loader(JsonTaskSource::new(path))
                .load()
                .await
                .with_context(|| format!("loading tasks from {}", path.display()))?;
            println!("load: {outcome:?}");
        }
        None => seed_demo_tasks(&tracker)?,
    }

    info!(tasks = tracker.tasks.len(), "tracker ready");

    let Some(first) = tracker.tasks.tasks_by_deadline().into_iter().next() else {
        println!("no tasks");
        return Ok(());
    };
    tracker.tasks.set_selected_task(Some(&first.id));
    tracker
        .tasks
        .update_task(&first.id, TaskPatch::default().status(TaskStatus::InProgress));

    let count = tracker.comment_count(&first.id);
    let root = post_comment(&tracker, &first.id, "Hello", "Alice", None)?;
    let reply = post_comment(&tracker, &first.id, "  Reply  ", "Bob", Some(&root.id))?;
    post_comment(&tracker, &first.id, "Nested reply", "Alice", Some(&reply.id))?;

    for status in TaskStatus::ALL {
        println!("{status}: {}", tracker.tasks.tasks_by_status(status).len());
    }
    if let Some(selected) = tracker.tasks.selected_task() {
        println!("selected: {} [{}]", selected.title, selected.status);
    }
    println!("comments ({}):", count.get());
    for comment in tracker.comments.get_comments_by_task_id(&first.id) {
        print_thread(&comment, 1);
    }

    // let the deferred calendar refresh catch up
    if let Some(delay) = tracker.config.reaction_delay() {
        tokio::time::sleep(delay + Duration::from_millis(20)).await;
    }
    let events = calendar.events();
    if args.json {
        println!("{}", serde_json::to_string_pretty(&events)?);
    } else {
        println!("calendar ({} refreshes):", calendar.refreshes());
        for event in events {
            println!(
                "  {} {:<24} {} {}",
                event.start.format("%Y-%m-%d"),
                event.title,
                event.color,
                event.description
            );
        }
    }

    Ok(())
}

fn seed_demo_tasks(tracker: &Tracker) -> Result<()> {
    let now = tracker.clock().now();
    let validator = tracker.validator();
    let demo = [
        ("Draft release notes", "<p>Summarize the <b>new</b> features</p>", 3),
        ("Review pull requests", "<p>Two are waiting</p>", 1),
        ("Plan sprint", "<p>Pick the next batch of work</p>", 7),
    ];
    for (title, description, days) in demo {
        let data = TaskFormData {
            title: title.into(),
            description: description.into(),
            deadline: now + chrono::Duration::days(days),
            status: TaskStatus::Pending,
        };
        validator.task_form(&data, now)?;
        tracker.tasks.add_task(data);
    }
    Ok(())
}

/// Validate like a comment form would, then store.
fn post_comment(
    tracker: &Tracker,
    task_id: &TaskId,
    content: &str,
    author: &str,
    parent: Option<&CommentId>,
) -> Result<Comment> {
    let validator = tracker.validator();
    let content = validator.comment_content(content)?;
    if let Some(depth) = parent.and_then(|id| tracker.comments.depth_of(id)) {
        validator.reply_depth(depth)?;
    }
    Ok(tracker.comments.add_comment(task_id, content, author, parent)?)
}

fn print_thread(comment: &Comment, level: usize) {
    println!(
        "{}{}: {}",
        "  ".repeat(level),
        comment.author,
        comment.content
    );
    for reply in &comment.replies {
        print_thread(reply, level + 1);
    }
}

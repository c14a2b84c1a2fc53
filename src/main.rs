use clap::{Parser, Subcommand};
use colored::Colorize;
use eyre::{Result, WrapErr};
use std::path::PathBuf;
use std::process;
use tasklist::{Backend, Config, KvStore, SortOrder, Stats, Task, TaskFilter, TaskStore};
use tracing_subscriber::EnvFilter;

const EXIT_FAILURE: i32 = 1;
const EXIT_USER_ERROR: i32 = 2;

#[derive(Parser)]
#[command(name = "tasklist")]
#[command(about = "Task list - create, complete, filter, and sort tasks stored locally")]
#[command(version = env!("GIT_DESCRIBE"))]
struct Cli {
    /// Path to a YAML config file (default: platform config dir)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory holding stored tasks (overrides config)
    #[arg(short, long)]
    data_dir: Option<PathBuf>,

    /// Storage backend: file, sqlite (overrides config)
    #[arg(short, long)]
    backend: Option<Backend>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Add a new task
    Add {
        name: String,
        /// Due date, e.g. 2024-03-01
        due: String,
    },

    /// Change a task's name and due date
    Edit { id: String, name: String, due: String },

    /// Mark a task completed, or incomplete again
    Toggle { id: String },

    /// Delete a task
    Rm { id: String },

    /// List tasks
    List {
        /// all, completed, incomplete
        #[arg(short, long)]
        filter: Option<TaskFilter>,

        /// ascending, descending (by due date)
        #[arg(short, long)]
        sort: Option<SortOrder>,

        /// Flip the sort order
        #[arg(short, long)]
        reverse: bool,
    },

    /// Show a single task
    Show { id: String },
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(cli) {
        let user_error = e
            .downcast_ref::<tasklist::Error>()
            .is_some_and(tasklist::Error::is_user_error);

        if user_error {
            eprintln!("{} {}", "Error:".red().bold(), e);
            process::exit(EXIT_USER_ERROR);
        }

        eprintln!("{} {:#}", "Error:".red().bold(), e);
        process::exit(EXIT_FAILURE);
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<()> {
    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(dir) = cli.data_dir {
        config.data_dir = Some(dir);
    }
    if let Some(backend) = cli.backend {
        config.backend = backend;
    }

    let storage = config.open_storage()?;
    let mut store = TaskStore::hydrate(storage).wrap_err("Failed to load tasks")?;

    match cli.command {
        Commands::Add { name, due } => {
            let task = store.create(&name, &due)?;
            println!("{} {}", "Added".green(), task.name.bold());
            render_default(&store, &config);
        }
        Commands::Edit { id, name, due } => {
            let task = store.update(&id, &name, &due)?;
            println!("{} {}", "Updated".green(), task.name.bold());
            render_default(&store, &config);
        }
        Commands::Toggle { id } => {
            let task = store.toggle_completed(&id)?;
            let status = if task.completed { "completed" } else { "incomplete" };
            println!("{} {} as {}", "Marked".green(), task.name.bold(), status);
            render_default(&store, &config);
        }
        Commands::Rm { id } => {
            let task = store.delete(&id)?;
            println!("{} {}", "Deleted".green(), task.name.bold());
            render_default(&store, &config);
        }
        Commands::List { filter, sort, reverse } => {
            let filter = filter.unwrap_or(config.default_filter);
            let mut sort = sort.unwrap_or(config.default_sort);
            if reverse {
                sort = sort.toggled();
            }
            render(&store.view(filter, sort), store.stats(), filter, sort);
        }
        Commands::Show { id } => {
            let task = store.get(&id).ok_or_else(|| tasklist::Error::NotFound(id.clone()))?;
            render_detail(task);
        }
    }

    Ok(())
}

fn render_default<S: KvStore>(store: &TaskStore<S>, config: &Config) {
    let view = store.view(config.default_filter, config.default_sort);
    render(&view, store.stats(), config.default_filter, config.default_sort);
}

fn render(view: &[Task], stats: Stats, filter: TaskFilter, sort: SortOrder) {
    let heading = match sort {
        SortOrder::Ascending => "Earliest due date first",
        SortOrder::Descending => "Latest due date first",
    };
    println!();
    println!("{} ({}, {})", "Tasks".bold(), filter, heading.dimmed());

    if view.is_empty() {
        println!("  {}", "No tasks".dimmed());
    }

    for task in view {
        let line = format!("{}  due {}", task.name, task.due_date);
        if task.completed {
            println!("  {} {}  {}", "[x]".green(), line.green().dimmed(), task.id.dimmed());
        } else {
            println!("  {} {}  {}", "[ ]".yellow(), line, task.id.dimmed());
        }
    }

    println!(
        "{}",
        format!(
            "{} total, {} completed, {} incomplete",
            stats.total, stats.completed, stats.incomplete
        )
        .dimmed()
    );
}

fn render_detail(task: &Task) {
    let status = if task.completed {
        "Completed".green()
    } else {
        "Incomplete".yellow()
    };

    println!("{}", task.name.bold());
    println!("  Id:       {}", task.id);
    println!("  Due date: {}", task.due_date);
    println!("  Status:   {}", status);
    println!("  Priority: {}", task.priority);
}

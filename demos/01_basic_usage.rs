//! Example 01: Basic Usage
//!
//! This example walks through the task list lifecycle: create, view, toggle,
//! edit, delete, and reload from disk.
//!
//! Run with: cargo run --example 01_basic_usage

use eyre::Result;
use tasklist::{FileKv, SortOrder, TaskFilter, TaskStore};

fn main() -> Result<()> {
    // Create a temporary directory for this example
    let temp_dir = tempfile::tempdir()?;
    let data_dir = temp_dir.path().to_path_buf();

    println!("Task List Basic Usage Example");
    println!("=============================\n");
    println!("Data dir: {}\n", data_dir.display());

    let mut store = TaskStore::hydrate(FileKv::open(&data_dir)?)?;
    println!("Store hydrated with {} tasks.\n", store.len());

    // CREATE
    println!("1. CREATE - Adding two tasks...");
    let milk = store.create("Buy milk", "2024-03-01")?;
    let rent = store.create("Pay rent", "2024-02-15")?;
    println!("   Created {} ({})", milk.name, milk.id);
    println!("   Created {} ({})\n", rent.name, rent.id);

    // VIEW
    println!("2. VIEW - All tasks, earliest due date first:");
    for task in store.view(TaskFilter::All, SortOrder::Ascending) {
        println!("   - {} (due {})", task.name, task.due_date);
    }
    println!();

    // TOGGLE
    println!("3. TOGGLE - Completing '{}'...", rent.name);
    store.toggle_completed(&rent.id)?;
    println!("   Incomplete tasks:");
    for task in store.view(TaskFilter::Incomplete, SortOrder::Ascending) {
        println!("   - {} (due {})", task.name, task.due_date);
    }
    println!();

    // VALIDATION
    println!("4. VALIDATION - Adding a task with no name...");
    match store.create("", "2024-04-01") {
        Ok(_) => println!("   Unexpectedly accepted!"),
        Err(e) => println!("   Rejected: {}", e),
    }
    println!();

    // UPDATE
    println!("5. UPDATE - Renaming '{}'...", milk.name);
    let milk = store.update(&milk.id, "Buy oat milk", "2024-03-02")?;
    println!("   Now: {} (due {})\n", milk.name, milk.due_date);

    // DELETE
    println!("6. DELETE - Removing '{}'...", rent.name);
    store.delete(&rent.id)?;
    println!("   {} task(s) left\n", store.len());

    // RELOAD
    println!("7. RELOAD - Hydrating a fresh store from disk...");
    drop(store);
    let reloaded = TaskStore::hydrate(FileKv::open(&data_dir)?)?;
    for task in reloaded.tasks() {
        println!("   - {} (due {}, completed: {})", task.name, task.due_date, task.completed);
    }

    println!("\nExample completed successfully!");
    Ok(())
}

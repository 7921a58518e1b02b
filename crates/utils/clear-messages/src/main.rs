//! # Clear Messages Utility
//!
//! This binary deletes the whole chat log from the database, the same purge
//! `POST /delete-chat` performs, without needing the server to be running.
//!
//! **WARNING**: This is a destructive operation that cannot be undone.
//!
//! ## Usage
//!
//! ```bash
//! cargo run --package clear-messages --bin clear_messages
//! cargo run --package clear-messages --bin clear_messages -- --yes   # skip the prompt
//! ```
//!
//! The program will:
//! 1. Connect to the database named by `DATABASE_URL`
//! 2. Count stored messages
//! 3. Ask for confirmation (unless `--yes`)
//! 4. Delete all messages if confirmed
//! 5. Report the number of messages deleted
//!
//! The `userCount` counter is left alone, so new connections keep getting
//! fresh names.

use lib_core::model::store::{run_migrations, MessageRepository};
use lib_core::{create_pool, Config};
use lib_utils::get_env_or;
use std::io::{self, Write};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let skip_prompt = std::env::args().skip(1).any(|arg| arg == "--yes" || arg == "-y");
    let database_url = get_env_or("DATABASE_URL", &Config::default().database_url);

    println!("============================================");
    println!("  Clear Messages Utility");
    println!("============================================");
    println!();
    println!("WARNING: This will delete ALL chat messages from the database!");
    println!("This operation cannot be undone.");
    println!();

    // Connect to database
    println!("Connecting to {}...", database_url);
    let pool = create_pool(&database_url).await?;
    run_migrations(&pool).await?;
    println!("Connected successfully.");
    println!();

    let message_count = MessageRepository::count(&pool).await?;

    if message_count == 0 {
        println!("No messages found in the database.");
        println!("Nothing to delete.");
        return Ok(());
    }

    println!("Found {} message(s) in the database.", message_count);
    println!();

    if !skip_prompt {
        print!("Are you sure you want to delete all messages? (yes/no): ");
        io::stdout().flush()?;

        let mut confirmation = String::new();
        io::stdin().read_line(&mut confirmation)?;
        let confirmation = confirmation.trim().to_lowercase();

        if confirmation != "yes" && confirmation != "y" {
            println!("Operation cancelled.");
            return Ok(());
        }
        println!();
    }

    println!("Deleting all messages...");

    let deleted_count = MessageRepository::delete_all(&pool).await?;

    println!("Successfully deleted {} message(s).", deleted_count);
    println!();
    println!("Chat log cleared.");

    Ok(())
}

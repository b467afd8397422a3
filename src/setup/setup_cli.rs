use clap::{Parser, Subcommand};
use krishi_backend::client::seed;
use krishi_backend::config::Config;
use krishi_backend::models::db_operations::{activity_db_operations, resource_db_operations};
use krishi_backend::models::{
    CarouselSlide, Document, Factory, MailSubmission, MediaItem, Notice, Product, Resource, TeamMember,
};
use krishi_backend::setup::db_setup;
use rusqlite::Connection;
use redb::Database;
use std::fs;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "setup_cli", author, version, about = "A CLI for initial application setup.", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to the .env configuration file.
    #[arg(long, required = true, value_name = "FILE")]
    env_file: PathBuf,
}

#[derive(Subcommand, Debug)]
enum Commands {
    Db {
        #[command(subcommand)]
        action: DbAction,
    },
    Activity {
        #[command(subcommand)]
        action: ActivityCommand,
    },
}

#[derive(Subcommand, Debug)]
enum DbAction {
    /// Creates the resources (redb) and/or activity (sqlite) databases.
    Setup {
        db_type: Option<String>,
    },
    /// Loads the bundled sample content into every empty collection.
    Seed,
}

#[derive(Subcommand, Debug)]
enum ActivityCommand {
    List {
        #[arg(long, default_value_t = 20)]
        limit: u32,
    },
    Prune {
        #[arg(long)]
        keep: u32,
    },
}

fn main() {
    let cli = Cli::parse();

    let config = Config::from_env(&cli.env_file)
        .expect("FATAL: Failed to load or parse configuration.");

    match &cli.command {
        Commands::Db { action } => match action {
            DbAction::Setup { db_type } => match db_type.as_deref() {
                Some("resources") => setup_resources_database(&config),
                Some("activity") => setup_activity_database(&config),
                Some(other) => eprintln!("❌ Error: Unknown database type '{}'. Use 'resources' or 'activity'.", other),
                None => {
                    setup_resources_database(&config);
                    setup_activity_database(&config);
                }
            },
            DbAction::Seed => seed_resources_database(&config),
        },
        Commands::Activity { action } => match action {
            ActivityCommand::List { limit } => list_activity(&config, *limit),
            ActivityCommand::Prune { keep } => prune_activity(&config, *keep),
        },
    }
}

fn setup_activity_database(config: &Config) {
    let db_path = config.activity_db_path();
    if db_path.exists() {
        println!("ℹ️ Activity database already exists at '{}'. Skipping creation.", db_path.display());
        return;
    }
    println!("\nSetting up activity database at '{}'...", db_path.display());

    if let Some(parent_dir) = db_path.parent() {
        fs::create_dir_all(parent_dir).expect("Could not create database directory.");
    }

    let mut conn = Connection::open(&db_path).expect("Could not create activity database file.");
    match db_setup::setup_activity_db(&mut conn) {
        Ok(_) => println!("✅ Activity database setup completed successfully."),
        Err(e) => eprintln!("❌ Error setting up activity database: {}", e),
    }
}

fn setup_resources_database(config: &Config) {
    let db_path = config.resources_db_path();
    if db_path.exists() {
        println!("ℹ️ Resources database already exists at '{}'. Skipping creation.", db_path.display());
        return;
    }
    println!("\nSetting up resources database at '{}'...", db_path.display());

    if let Some(parent_dir) = db_path.parent() {
        fs::create_dir_all(parent_dir).expect("Could not create database directory.");
    }

    let db = Database::create(&db_path).expect("Failed to create resources database file.");
    match db_setup::setup_resources_db(&db) {
        Ok(_) => println!("✅ Resources database setup completed successfully."),
        Err(e) => eprintln!("❌ Error setting up resources database: {}", e),
    }
}

fn seed_kind<R: Resource>(db: &Database) {
    let module = R::KIND.module_name();
    match resource_db_operations::count::<R>(db) {
        Ok(0) => {}
        Ok(n) => {
            println!("ℹ️ {} already has {} record(s). Skipping.", module, n);
            return;
        }
        Err(e) => {
            eprintln!("❌ Error reading {}: {}", module, e);
            return;
        }
    }

    let records = match seed::seed_records::<R>() {
        Ok(records) => records,
        Err(e) => {
            eprintln!("❌ Bundled {} seed data is invalid: {}", module, e);
            return;
        }
    };

    let mut inserted = 0;
    for record in records {
        match resource_db_operations::create(db, record) {
            Ok(_) => inserted += 1,
            Err(e) => eprintln!("❌ Error inserting {} seed record: {}", module, e),
        }
    }
    println!("✅ Seeded {} {} record(s).", inserted, module);
}

fn seed_resources_database(config: &Config) {
    let db = match Database::open(config.resources_db_path()) {
        Ok(db) => db,
        Err(_) => {
            eprintln!("❌ Error: Resources database not found. Please run `setup_cli db setup` first.");
            return;
        }
    };
    seed_kind::<Product>(&db);
    seed_kind::<Document>(&db);
    seed_kind::<Notice>(&db);
    seed_kind::<TeamMember>(&db);
    seed_kind::<MediaItem>(&db);
    seed_kind::<CarouselSlide>(&db);
    seed_kind::<MailSubmission>(&db);
    seed_kind::<Factory>(&db);
}

fn open_activity_db(config: &Config) -> Option<Connection> {
    let db_path = config.activity_db_path();
    if !db_path.exists() {
        eprintln!("❌ Error: Activity database not found at '{}'. Please run `setup_cli db setup` first.", db_path.display());
        return None;
    }
    match Connection::open(&db_path) {
        Ok(conn) => Some(conn),
        Err(e) => {
            eprintln!("❌ Error opening activity database: {}", e);
            None
        }
    }
}

fn list_activity(config: &Config, limit: u32) {
    let Some(conn) = open_activity_db(config) else { return };
    match activity_db_operations::read_recent(&conn, limit) {
        Ok(entries) if entries.is_empty() => println!("No activity recorded yet."),
        Ok(entries) => {
            println!("Most recent activity:");
            for entry in entries {
                println!(
                    "- [{}] {} {:<10} {} ({})",
                    entry.timestamp.format("%Y-%m-%d %H:%M:%S"),
                    entry.action.as_str(),
                    entry.module,
                    entry.detail,
                    entry.actor
                );
            }
        }
        Err(e) => eprintln!("❌ Error fetching activity: {}", e),
    }
}

fn prune_activity(config: &Config, keep: u32) {
    let Some(conn) = open_activity_db(config) else { return };
    match activity_db_operations::prune(&conn, keep) {
        Ok(removed) => println!("✅ Removed {} activity entr{}; kept the newest {}.", removed, if removed == 1 { "y" } else { "ies" }, keep),
        Err(e) => eprintln!("❌ Error pruning activity: {}", e),
    }
}

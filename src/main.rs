//! Filemeta CLI - operator tool for the local file-metadata store

use anyhow::Context;
use clap::{Parser, Subcommand};
use filemeta::config::{self, FilemetaConfig};
use filemeta::manager::ListOptions;
use filemeta::ui::{self, Glyph, InsertProgress, Spinner};
use filemeta::{ChildOrder, FileEntity, ParentPolicy, SqliteStore, StorageManager};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "filemeta")]
#[command(version = "0.0.1")]
#[command(about = "Local file-metadata store for a cloud storage client")]
#[command(long_about = r#"
Filemeta mirrors the file/folder tree of one cloud account as local records:
  • Path lookups backed by a rebuildable path index
  • Atomic single and batched writes
  • Moves and renames that keep every descendant path consistent

Example usage:
  filemeta init --account alice@cloud.example.com
  filemeta mkdir /Photos/2024 --parents
  filemeta put /Photos/2024/beach.jpg --size 204800
  filemeta ls /Photos/2024
"#)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Print machine-readable JSON instead of styled output
    #[arg(long, global = true)]
    json: bool,

    /// Path to the config file (defaults to ./filemeta.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a config file and create the database with its root folder
    Init {
        /// Account the records belong to
        #[arg(short, long)]
        account: Option<String>,

        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },

    /// Create a folder
    Mkdir {
        path: String,

        /// Create missing parent folders
        #[arg(short, long)]
        parents: bool,
    },

    /// Insert or update a file record
    Put {
        path: String,

        /// Size in bytes
        #[arg(short, long, default_value = "0")]
        size: u64,

        #[arg(long)]
        etag: Option<String>,

        /// Server-assigned identifier
        #[arg(long)]
        remote_id: Option<String>,

        #[arg(long)]
        mime_type: Option<String>,

        /// Create missing parent folders
        #[arg(short, long)]
        parents: bool,
    },

    /// List the direct children of a folder
    Ls {
        #[arg(default_value = "/")]
        path: String,

        /// Include hidden names
        #[arg(short, long)]
        all: bool,

        /// Include soft-deleted rows
        #[arg(long)]
        deleted: bool,

        /// Ordering (name, name_desc, folders_first, newest_first, largest_first)
        #[arg(short, long)]
        order: Option<String>,
    },

    /// Show one record
    Stat {
        path: Option<String>,

        /// Look up by internal identifier instead of path
        #[arg(long, conflicts_with = "path")]
        id: Option<i64>,

        /// Look up by server identifier instead of path
        #[arg(long, conflicts_with_all = ["path", "id"])]
        remote_id: Option<String>,
    },

    /// Move or rename a record
    Mv {
        path: String,

        /// Existing folder to move into, or the new path
        dest: String,
    },

    /// Remove a record
    Rm {
        path: String,

        /// Remove a folder together with its subtree
        #[arg(short, long)]
        recursive: bool,

        /// Mark as deleted instead of removing
        #[arg(long)]
        soft: bool,
    },

    /// Remove all soft-deleted records
    Purge,

    /// Show record counts
    Stats,

    /// Verify that stored paths match the parent chain
    Check,

    /// Insert many files into one folder and list them back
    Bench {
        /// Number of files to insert
        #[arg(short = 'n', long, default_value = "20000")]
        count: usize,

        /// Folder receiving the files
        #[arg(long, default_value = "/bench")]
        folder: String,

        /// Run against the configured database instead of an in-memory one
        #[arg(long)]
        on_disk: bool,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = config::load_config(cli.config.as_deref())?.unwrap_or_default();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let json = cli.json;

    match cli.command {
        Commands::Init { account, force } => {
            let config_path = cli.config.clone().unwrap_or_else(config::default_config_path);
            let mut config = config;
            if let Some(account) = account {
                config.account.name = account;
            }
            config.validate()?;
            config::write_config(&config_path, &config, force)?;

            let manager = open_manager(&config)?;
            let root = manager.get_root()?;

            if json {
                print_json(&root)?;
            } else {
                ui::header("Initialized filemeta");
                ui::info("Config", &config_path.display().to_string());
                ui::info("Account", manager.account());
                ui::info("Database", &database_path(&config)?.display().to_string());
            }
        }

        Commands::Mkdir { path, parents } => {
            let manager = open_manager_with(&config, parents)?;
            let mut folder = FileEntity::folder(&path)?;
            manager.save_file(&mut folder)?;
            report_saved(&folder, json)?;
        }

        Commands::Put {
            path,
            size,
            etag,
            remote_id,
            mime_type,
            parents,
        } => {
            let manager = open_manager_with(&config, parents)?;
            let mut file = match manager.get_file_by_path(&path)? {
                Some(existing) if existing.is_folder => {
                    anyhow::bail!("{} is a folder", existing.path);
                }
                Some(existing) => existing,
                None => FileEntity::file(&path)?,
            };
            file.set_size(size);
            if let Some(etag) = etag {
                file.set_etag(etag);
            }
            if let Some(remote_id) = remote_id {
                file.set_remote_id(remote_id);
            }
            if let Some(mime_type) = mime_type {
                file.set_mime_type(mime_type);
            }
            manager.save_file(&mut file)?;
            report_saved(&file, json)?;
        }

        Commands::Ls {
            path,
            all,
            deleted,
            order,
        } => {
            let manager = open_manager(&config)?;
            let folder = manager
                .get_file_by_path(&path)?
                .with_context(|| format!("{} not found", path))?;
            let order = order.as_deref().map(str::parse::<ChildOrder>).transpose()?;
            let children = manager.list_folder(
                &folder,
                ListOptions {
                    include_hidden: all,
                    include_deleted: deleted,
                    order,
                },
            )?;

            if json {
                print_json(&children)?;
            } else if children.is_empty() {
                println!("{}", ui::dim("(empty)"));
            } else {
                println!("{}", ui::entries_table(&children));
                println!("{}", ui::dim(&format!("{} entries", children.len())));
            }
        }

        Commands::Stat { path, id, remote_id } => {
            let manager = open_manager(&config)?;
            let (entity, key) = if let Some(id) = id {
                (manager.get_file_by_id(id)?, format!("id {}", id))
            } else if let Some(remote_id) = remote_id {
                let found = manager.get_file_by_remote_id(&remote_id)?;
                (found, format!("remote id {}", remote_id))
            } else {
                let path = path.unwrap_or_else(|| "/".to_string());
                (manager.get_file_by_path(&path)?, path)
            };
            let entity = entity.with_context(|| format!("{} not found", key))?;

            if json {
                print_json(&entity)?;
            } else {
                print_entity(&entity);
            }
        }

        Commands::Mv { path, dest } => {
            let manager = open_manager(&config)?;
            let entity = manager
                .get_file_by_path(&path)?
                .with_context(|| format!("{} not found", path))?;

            let moved = match manager.get_file_by_path(&dest)? {
                Some(target) if target.is_folder => manager.move_file(&entity, &target)?,
                Some(target) => anyhow::bail!("{} already exists", target.path),
                None => {
                    let dest = filemeta::RemotePath::parse(&dest)?;
                    let dest_parent = dest.parent().context("cannot move onto the root")?;
                    let mut current = entity;
                    if current.path.parent().as_ref() != Some(&dest_parent) {
                        let target = manager
                            .get_file_by_path(dest_parent.as_str())?
                            .with_context(|| format!("{} not found", dest_parent))?;
                        current = manager.move_file(&current, &target)?;
                    }
                    manager.rename_file(&current, dest.name())?
                }
            };

            if json {
                print_json(&moved)?;
            } else {
                ui::success(&format!("{} → {}", path, moved.path));
            }
        }

        Commands::Rm {
            path,
            recursive,
            soft,
        } => {
            let manager = open_manager(&config)?;
            let entity = manager
                .get_file_by_path(&path)?
                .with_context(|| format!("{} not found", path))?;

            let count = if soft {
                manager.mark_file_deleted(&entity)?
            } else {
                manager.remove_file(&entity, recursive)?
            };

            if json {
                print_json(&serde_json::json!({ "path": path, "removed": count, "soft": soft }))?;
            } else {
                let verb = if soft { "Marked deleted" } else { "Removed" };
                ui::success(&format!("{} {} ({} records)", verb, path, count));
            }
        }

        Commands::Purge => {
            let manager = open_manager(&config)?;
            let purged = manager.purge_deleted()?;
            if json {
                print_json(&serde_json::json!({ "purged": purged }))?;
            } else {
                ui::success(&format!("Purged {} deleted records", purged));
            }
        }

        Commands::Stats => {
            let manager = open_manager(&config)?;
            let stats = manager.stats()?;

            if json {
                print_json(&stats)?;
            } else {
                ui::section(&format!("{} {}", Glyph::COUNTS, manager.account()));
                let files = stats.files.to_string();
                let folders = stats.folders.to_string();
                let deleted = stats.deleted.to_string();
                let cached = stats.cached_paths.to_string();
                println!(
                    "{}",
                    ui::stats_table(&[
                        ("Files", &files),
                        ("Folders", &folders),
                        ("Deleted", &deleted),
                        ("Cached paths", &cached),
                    ])
                );
            }
        }

        Commands::Check => {
            let manager = open_manager(&config)?;
            let spinner = Spinner::new("Checking parent chains");
            let problems = manager.check_consistency()?;
            spinner.finish_with_message("Done");

            if json {
                let problems: Vec<String> = problems.iter().map(ToString::to_string).collect();
                print_json(&problems)?;
            } else if problems.is_empty() {
                ui::success("Tree is consistent");
            } else {
                for problem in &problems {
                    ui::warn(&problem.to_string());
                }
            }
            if !problems.is_empty() {
                anyhow::bail!("{} inconsistencies found", problems.len());
            }
        }

        Commands::Bench {
            count,
            folder,
            on_disk,
        } => {
            let store = if on_disk {
                open_store(&config)?
            } else {
                Arc::new(SqliteStore::open_in_memory_with(
                    &config.account.name,
                    config.store_options(),
                )?)
            };
            let manager = StorageManager::new(store, config.manager_options()?);

            let mut target = FileEntity::folder(&folder)?;
            manager.save_file(&mut target)?;

            let batch_rows = config.storage.max_batch_rows.max(1);
            let progress = InsertProgress::new(count as u64);
            let start = Instant::now();

            let mut inserted = 0;
            while inserted < count {
                let upper = (inserted + batch_rows).min(count);
                let mut batch = Vec::with_capacity(upper - inserted);
                for i in inserted..upper {
                    let path = target.path.join(&format!("{}.txt", i))?;
                    batch.push(FileEntity::file(path.as_str())?.with_size(i as u64));
                }
                manager.save_files(&mut batch)?;
                progress.inc(batch.len() as u64);
                inserted = upper;
            }

            progress.set_message("Listing");
            let listed = manager.get_folder_content(&target, true)?.len();
            let elapsed = start.elapsed();

            if json {
                print_json(&serde_json::json!({
                    "inserted": inserted,
                    "listed": listed,
                    "millis": elapsed.as_millis() as u64,
                }))?;
            } else {
                progress.finish_with_summary(elapsed, inserted, listed);
            }
            if listed != count {
                anyhow::bail!("expected {} children, listed {}", count, listed);
            }
        }
    }

    Ok(())
}

fn database_path(config: &FilemetaConfig) -> anyhow::Result<PathBuf> {
    let base = std::env::current_dir()?;
    Ok(config.database_path(&base))
}

fn open_store(config: &FilemetaConfig) -> anyhow::Result<Arc<SqliteStore>> {
    let db = database_path(config)?;
    config::ensure_db_dir(&db)?;
    let store = SqliteStore::open(&db, &config.account.name, config.store_options())
        .with_context(|| format!("opening {}", db.display()))?;
    Ok(Arc::new(store))
}

fn open_manager(config: &FilemetaConfig) -> anyhow::Result<StorageManager> {
    open_manager_with(config, config.policy.create_missing_parents)
}

fn open_manager_with(config: &FilemetaConfig, create_parents: bool) -> anyhow::Result<StorageManager> {
    let mut options = config.manager_options()?;
    if create_parents {
        options.parent_policy = ParentPolicy::CreatePlaceholders;
    }
    Ok(StorageManager::new(open_store(config)?, options))
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn report_saved(entity: &FileEntity, json: bool) -> anyhow::Result<()> {
    if json {
        return print_json(entity);
    }
    let id = entity.id.map(|id| id.to_string()).unwrap_or_default();
    ui::success(&format!("Saved {} (#{})", entity.path, id));
    Ok(())
}

fn print_entity(entity: &FileEntity) {
    ui::entry_line(entity);
    let id = entity.id.map(|id| id.to_string()).unwrap_or_default();
    let parent = entity.parent_id.map(|id| id.to_string()).unwrap_or_else(|| "-".to_string());
    ui::summary_row("id", &id);
    ui::summary_row("path", entity.path.as_str());
    ui::summary_row("parent", &parent);
    ui::summary_row("kind", if entity.is_folder { "folder" } else { "file" });
    ui::summary_row("size", &ui::human_bytes(entity.size));
    ui::summary_row("modified", &entity.modification_timestamp.to_string());
    ui::summary_row("remote id", entity.remote_id.as_deref().unwrap_or("-"));
    ui::summary_row("etag", entity.etag.as_deref().unwrap_or("-"));
    ui::summary_row("mime type", entity.mime_type.as_deref().unwrap_or("-"));
}

use clap::{Args as ClapArgs, Parser, Subcommand};
use prefed_core::config::StoreLocation;
use prefed_core::{
    Backend, CommitOutcome, EditedValue, EditorSession, FileStore, ParseError, Selection,
    StoredValue, VariantKind, parse_for, parse_kind,
};
use std::path::{Path, PathBuf};
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "prefed-cli",
    about = "List and edit entries of a JSON preference store",
    version
)]
struct Cli {
    /// Store file (defaults to $PREFED_STORE or the platform config dir)
    #[arg(long, global = true)]
    store: Option<PathBuf>,
    #[command(subcommand)]
    cmd: Option<Cmd>,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// List entries as key, kind and preview
    List(ListArgs),
    /// Print the full preview of one entry
    Get(GetArgs),
    /// Set an entry, parsing the value for the entry's current kind
    Set(SetArgs),
    /// Remove one or more entries
    Remove(RemoveArgs),
    /// Print the whole store in its on-disk JSON form
    Dump,
    /// Add one sample value of every kind
    SeedDemo(SeedArgs),
    /// Zip a timestamped copy of the store file next to it
    Backup,
    /// List store files in a directory (defaults to the store's directory)
    Stores(StoresArgs),
}

#[derive(ClapArgs, Debug)]
struct ListArgs {
    /// Show multi-line previews in full instead of their first line
    #[arg(long, default_value_t = false)]
    full: bool,
}

#[derive(ClapArgs, Debug)]
struct GetArgs {
    key: String,
}

#[derive(ClapArgs, Debug)]
struct SetArgs {
    key: String,
    /// New value as text (hex for binary, RFC 3339 for timestamps, JSON for lists and maps)
    value: String,
    /// Kind to parse the value as; required to change an entry's kind
    #[arg(long)]
    kind: Option<VariantKind>,
    /// Zip the store file before writing
    #[arg(long, default_value_t = false)]
    backup: bool,
}

#[derive(ClapArgs, Debug)]
struct RemoveArgs {
    #[arg(required = true)]
    keys: Vec<String>,
    /// Zip the store file before writing
    #[arg(long, default_value_t = false)]
    backup: bool,
}

#[derive(ClapArgs, Debug)]
struct StoresArgs {
    dir: Option<PathBuf>,
}

#[derive(ClapArgs, Debug)]
struct SeedArgs {
    /// Overwrite keys that already exist
    #[arg(long, default_value_t = false)]
    force: bool,
}

fn main() {
    init_logging();
    let cli = Cli::parse();
    let location = StoreLocation::resolve(cli.store);
    debug!(path = %location.path.display(), source = ?location.source, "store resolved");
    let path = location.path;
    match cli.cmd.unwrap_or(Cmd::List(ListArgs { full: false })) {
        Cmd::List(a) => cmd_list(&path, a),
        Cmd::Get(a) => cmd_get(&path, a),
        Cmd::Set(a) => cmd_set(&path, a),
        Cmd::Remove(a) => cmd_remove(&path, a),
        Cmd::Dump => cmd_dump(&path),
        Cmd::SeedDemo(a) => cmd_seed(&path, a),
        Cmd::Backup => cmd_backup(&path),
        Cmd::Stores(a) => cmd_stores(&path, a),
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn open_session(path: &Path) -> EditorSession<FileStore> {
    let store = FileStore::open(path).unwrap_or_else(|e| {
        eprintln!("error: {}", e);
        std::process::exit(2);
    });
    EditorSession::new(store)
}

fn save(session: &mut EditorSession<FileStore>, backup: bool) {
    let store = session.backend_mut();
    if backup && store.path().is_file() {
        match prefed_core::zip_backup(store.path()) {
            Ok(zip) => eprintln!("backup: {}", zip.display()),
            Err(e) => {
                eprintln!("backup error: {}", e);
                std::process::exit(5);
            }
        }
    }
    store.synchronize().unwrap_or_else(|e| {
        eprintln!("error writing: {}", e);
        std::process::exit(5);
    });
}

fn cmd_list(path: &Path, args: ListArgs) {
    let session = open_session(path);
    for entry in session.entries().entries() {
        let preview = entry.preview();
        let shown = if args.full {
            preview.as_str()
        } else {
            preview.lines().next().unwrap_or_default()
        };
        println!("{}\t{}\t{}", entry.key, entry.variant.kind(), shown);
    }
}

fn cmd_get(path: &Path, args: GetArgs) {
    let session = open_session(path);
    match session.entries().get(&args.key) {
        Some(entry) => println!("{}", entry.preview()),
        None => {
            eprintln!("not found: {}", args.key);
            std::process::exit(3);
        }
    }
}

fn cmd_set(path: &Path, args: SetArgs) {
    let mut session = open_session(path);
    let mut failure: Option<ParseError> = None;
    let outcome = match args.kind {
        // Explicit kind: stored as parsed, no coercion toward the old kind.
        Some(kind) => match parse_kind(kind, &args.value) {
            Ok(v) => {
                session.backend_mut().write(&args.key, v);
                session.refresh();
                Some(CommitOutcome::Written)
            }
            Err(e) => {
                failure = Some(e);
                None
            }
        },
        None if session.entries().get(&args.key).is_some() => {
            let mut parse = |sel: &Selection| -> Option<EditedValue> {
                parse_for(&sel.target, &args.value)
                    .map_err(|e| failure = Some(e))
                    .ok()
            };
            session.edit_with(&args.key, &mut parse)
        }
        None => Some(session.commit(&args.key, StoredValue::String(args.value.clone()))),
    };
    if let Some(e) = failure {
        eprintln!("invalid value: {}", e);
        std::process::exit(3);
    }
    match outcome {
        Some(CommitOutcome::Discarded) => {
            eprintln!("edit discarded: value cannot be stored as JSON data");
            std::process::exit(4);
        }
        Some(_) => save(&mut session, args.backup),
        None => {}
    }
}

fn cmd_remove(path: &Path, args: RemoveArgs) {
    let mut session = open_session(path);
    let missing: Vec<&String> = args
        .keys
        .iter()
        .filter(|k| session.entries().get(k).is_none())
        .collect();
    if !missing.is_empty() {
        for k in &missing {
            eprintln!("not found: {}", k);
        }
        std::process::exit(3);
    }
    session.delete(&args.keys);
    save(&mut session, args.backup);
}

fn cmd_dump(path: &Path) {
    let session = open_session(path);
    println!(
        "{}",
        serde_json::to_string_pretty(&session.backend().to_json()).unwrap_or_default()
    );
}

fn cmd_seed(path: &Path, args: SeedArgs) {
    let mut session = open_session(path);
    let existing = session.backend().read();
    let mut added = 0usize;
    for (key, value) in prefed_core::sample::demo_store() {
        if args.force || !existing.contains_key(&key) {
            session.backend_mut().write(&key, value);
            added += 1;
        }
    }
    session.refresh();
    save(&mut session, false);
    println!("seeded {} entries", added);
}

fn cmd_backup(path: &Path) {
    match prefed_core::zip_backup(path) {
        Ok(zip) => println!("{}", zip.display()),
        Err(e) => {
            eprintln!("error: {}", e);
            std::process::exit(2);
        }
    }
}

fn cmd_stores(path: &Path, args: StoresArgs) {
    let dir = args
        .dir
        .unwrap_or_else(|| path.parent().unwrap_or(Path::new(".")).to_path_buf());
    let dir = if dir.as_os_str().is_empty() {
        PathBuf::from(".")
    } else {
        dir
    };
    for store in prefed_core::list_stores(&dir) {
        let marker = if store == path { "*" } else { " " };
        println!("{} {}", marker, store.display());
    }
}

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use dsgen::{
    BindingKind, BindingRef, CellAddress, DuplicateNamePolicy, FileNamingRule, FileStore,
    GenerationProgress, GeneratorOptions, PreviewWindow, ProfileStore, RelocationOutcome,
    Workspace,
};
use dsgen_common::decode_used_range;
use dsgen_workbook::{AnyTemplate, TemplateReader, ZipArchiver};
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "dsgen",
    version,
    about = "Bind template cells and batch-generate spreadsheets"
)]
struct Cli {
    /// Directory holding state.json and profiles.json.
    #[arg(long, global = true, env = "DSGEN_STATE_DIR", default_value = ".dsgen")]
    state_dir: PathBuf,

    /// Log at debug level (otherwise DSGEN_LOG / RUST_LOG, default warn).
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the sheets of a template.
    Sheets(TemplateArg),
    /// Print a sheet's used range with binding marks.
    Preview(PreviewArgs),
    /// GLOBAL bindings: one value for every output.
    #[command(subcommand)]
    Global(GlobalCommand),
    /// VARIABLE field mappings.
    #[command(subcommand)]
    Var(VarCommand),
    /// VARIABLE field value lists.
    #[command(subcommand)]
    Values(ValuesCommand),
    /// Move a binding to another cell.
    Move(MoveArgs),
    /// Show or set the field that drives the batch.
    KeyField { key: Option<String> },
    /// Show or set the file name prefix/suffix and preview the names.
    Naming(NamingArgs),
    /// Generate every output and bundle them into a zip.
    Generate(GenerateArgs),
    /// Named snapshots of the workspace.
    #[command(subcommand)]
    Profile(ProfileCommand),
    /// Print the saved workspace as JSON.
    Show,
    /// Drop every binding and restore defaults.
    Reset,
}

#[derive(Args, Debug)]
struct TemplateArg {
    /// Template workbook (.xlsx, .xlsm or .json).
    #[arg(long, short)]
    template: PathBuf,
}

#[derive(Args, Debug)]
struct PreviewArgs {
    #[command(flatten)]
    template: TemplateArg,
    /// Sheet to preview (defaults to the first sheet).
    #[arg(long)]
    sheet: Option<String>,
    /// Maximum rows shown (10..=2000).
    #[arg(long)]
    rows: Option<u32>,
    /// Maximum columns shown (5..=500).
    #[arg(long)]
    cols: Option<u32>,
    /// Widen the window to the sheet's whole used range.
    #[arg(long, conflicts_with_all = ["rows", "cols"])]
    fit: bool,
}

#[derive(Subcommand, Debug)]
enum GlobalCommand {
    /// Bind (or rebind) a cell to a value.
    Set { address: String, value: String },
    Unset { address: String },
    List,
    Clear,
}

#[derive(Subcommand, Debug)]
enum VarCommand {
    /// Map a cell to a field, creating the field if needed.
    Bind { key: String, address: String },
    Unbind { key: String, address: String },
    /// Remove a cell from every field.
    UnbindAt { address: String },
    /// Delete a field with its mappings and values.
    Delete { key: String },
    List,
}

#[derive(Subcommand, Debug)]
enum ValuesCommand {
    Add { key: String, value: String },
    /// Append values pasted from a spreadsheet (tab, newline, comma or semicolon separated).
    Paste {
        key: String,
        /// Text to parse; read from --file or stdin when omitted.
        text: Option<String>,
        #[arg(long)]
        file: Option<PathBuf>,
    },
    /// Delete the value at a 1-based position.
    Delete { key: String, position: usize },
    Clear { key: String },
    List { key: String },
}

#[derive(Args, Debug)]
struct MoveArgs {
    /// Current cell of the binding.
    from: String,
    /// Destination cell.
    to: String,
    /// Move the VARIABLE mapping of this field instead of the GLOBAL value.
    #[arg(long)]
    var: Option<String>,
}

#[derive(Args, Debug)]
struct NamingArgs {
    #[arg(long)]
    prefix: Option<String>,
    #[arg(long)]
    suffix: Option<String>,
}

#[derive(Args, Debug)]
struct GenerateArgs {
    #[command(flatten)]
    template: TemplateArg,
    /// Output zip path (defaults to the archive name in the current directory).
    #[arg(long, short)]
    out: Option<PathBuf>,
    /// Number duplicate file names instead of letting later items overwrite.
    #[arg(long)]
    number_duplicates: bool,
}

#[derive(Subcommand, Debug)]
enum ProfileCommand {
    /// Save the workspace under a new name.
    Save { name: String },
    /// Save the workspace, replacing a profile of the same name.
    Overwrite { name: String },
    /// Replace the workspace with a saved profile.
    Load { name: String },
    List,
    Delete { name: String },
    /// Write a profile as a standalone JSON document.
    Export {
        name: String,
        #[arg(long, short)]
        out: Option<PathBuf>,
    },
    /// Add a profile from an exported document.
    Import {
        file: PathBuf,
        /// Replace an existing profile of the same name.
        #[arg(long)]
        force: bool,
        /// Also load it into the workspace.
        #[arg(long)]
        apply: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let mut store = FileStore::new(&cli.state_dir);
    tracing::debug!(state_dir = %cli.state_dir.display(), "using state directory");

    match cli.command {
        Command::Sheets(args) => {
            let template = open_template(&args.template)?;
            for name in template.sheet_names() {
                println!("{name}");
            }
        }
        Command::Preview(args) => preview(&mut store, args)?,
        Command::Global(cmd) => {
            let mut ws = Workspace::load(&mut store)?;
            match cmd {
                GlobalCommand::Set { address, value } => {
                    let address = parse_address(&address)?;
                    println!("GLOBAL {address} = {value}");
                    ws.bind_global(address, value);
                }
                GlobalCommand::Unset { address } => {
                    let address = parse_address(&address)?;
                    if ws.unbind_global(&address).is_none() {
                        println!("no GLOBAL binding on {address}");
                    }
                }
                GlobalCommand::List => {
                    for (address, value) in ws.bindings().globals() {
                        println!("{address}\t{value}");
                    }
                    println!("{} GLOBAL binding(s)", ws.bindings().global_count());
                }
                GlobalCommand::Clear => ws.clear_all_global(),
            }
            ws.save(&mut store)?;
        }
        Command::Var(cmd) => {
            let mut ws = Workspace::load(&mut store)?;
            match cmd {
                VarCommand::Bind { key, address } => {
                    let address = parse_address(&address)?;
                    if !ws.bind_variable(&key, address.clone())? {
                        println!("{address} is already mapped to `{}`", key.trim());
                    }
                }
                VarCommand::Unbind { key, address } => {
                    let address = parse_address(&address)?;
                    if !ws.unbind_variable(&key, &address) {
                        println!("`{key}` has no mapping on {address}");
                    }
                }
                VarCommand::UnbindAt { address } => {
                    let address = parse_address(&address)?;
                    match ws.unbind_variable_at(&address) {
                        0 => println!("no VARIABLE mapping on {address}"),
                        n => println!("removed {address} from {n} field(s)"),
                    }
                }
                VarCommand::Delete { key } => {
                    if !ws.delete_field(&key) {
                        bail!("no VARIABLE field named `{key}`");
                    }
                }
                VarCommand::List => {
                    for field in ws.bindings().fields() {
                        let marker = if field.key() == ws.key_field() { "*" } else { " " };
                        let cells: Vec<String> =
                            field.mappings().iter().map(ToString::to_string).collect();
                        println!(
                            "{marker} {}\t{} value(s)\t{}",
                            field.key(),
                            field.values().len(),
                            cells.join(", ")
                        );
                    }
                }
            }
            ws.save(&mut store)?;
        }
        Command::Values(cmd) => {
            let mut ws = Workspace::load(&mut store)?;
            match cmd {
                ValuesCommand::Add { key, value } => ws.append(&key, &value)?,
                ValuesCommand::Paste { key, text, file } => {
                    let text = match (text, file) {
                        (Some(text), _) => text,
                        (None, Some(path)) => fs::read_to_string(&path)
                            .with_context(|| format!("reading {}", path.display()))?,
                        (None, None) => {
                            let mut buf = String::new();
                            std::io::stdin()
                                .read_to_string(&mut buf)
                                .context("reading stdin")?;
                            buf
                        }
                    };
                    let added = ws.bulk_append(&key, &text)?;
                    println!("added {added} value(s) to `{}`", key.trim());
                }
                ValuesCommand::Delete { key, position } => {
                    let removed = position
                        .checked_sub(1)
                        .and_then(|index| ws.delete_at(&key, index));
                    if removed.is_none() {
                        println!("`{key}` has no value at position {position}");
                    }
                }
                ValuesCommand::Clear { key } => {
                    println!("cleared {} value(s)", ws.clear_all(&key));
                }
                ValuesCommand::List { key } => {
                    let field = ws
                        .bindings()
                        .field(&key)
                        .with_context(|| format!("no VARIABLE field named `{key}`"))?;
                    for (i, value) in field.values().iter().enumerate() {
                        println!("{}\t{value}", i + 1);
                    }
                }
            }
            ws.save(&mut store)?;
        }
        Command::Move(args) => {
            let mut ws = Workspace::load(&mut store)?;
            let from = parse_address(&args.from)?;
            let to = parse_address(&args.to)?;
            let binding = match args.var {
                Some(key) => BindingRef::Variable {
                    key: key.trim().to_string(),
                    address: from,
                },
                None => BindingRef::Global(from),
            };
            match ws.relocate(binding, to) {
                RelocationOutcome::NotArmed | RelocationOutcome::Stale => {
                    bail!("no such binding on {}", args.from)
                }
                RelocationOutcome::Unchanged => println!("source and target are the same"),
                RelocationOutcome::Moved { from, to } => println!("moved {from} -> {to}"),
                RelocationOutcome::Merged { from, to } => {
                    println!("{to} was already mapped; removed {from}")
                }
            }
            ws.save(&mut store)?;
        }
        Command::KeyField { key } => {
            let mut ws = Workspace::load(&mut store)?;
            if let Some(key) = key {
                ws.set_key_field(&key)?;
                ws.save(&mut store)?;
            }
            println!("{} ({} value(s))", ws.key_field(), ws.key_values().len());
        }
        Command::Naming(args) => {
            let mut ws = Workspace::load(&mut store)?;
            if args.prefix.is_some() || args.suffix.is_some() {
                let current = ws.naming().clone();
                ws.set_naming(FileNamingRule::new(
                    args.prefix.unwrap_or(current.prefix),
                    args.suffix.unwrap_or(current.suffix),
                ));
                ws.save(&mut store)?;
            }
            let names = ws.file_name_preview(dsgen::generator::DEFAULT_EXTENSION);
            if names.is_empty() {
                println!("(no values for key field `{}`)", ws.key_field());
            }
            for name in names {
                println!("{name}");
            }
            println!("archive: {}", ws.archive_name());
        }
        Command::Generate(args) => generate(&mut store, args)?,
        Command::Profile(cmd) => profile(&mut store, cmd)?,
        Command::Show => {
            let ws = Workspace::load(&mut store)?;
            println!("{}", serde_json::to_string_pretty(&ws.to_state())?);
        }
        Command::Reset => {
            let mut ws = Workspace::load(&mut store)?;
            ws.reset(&mut store)?;
            println!("workspace reset");
        }
    }
    Ok(())
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_env("DSGEN_LOG")
            .or_else(|_| EnvFilter::try_from_default_env())
            .unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn open_template(path: &Path) -> Result<AnyTemplate> {
    AnyTemplate::open_path(path).with_context(|| format!("opening template {}", path.display()))
}

/// `Sheet!B3` or `'My Sheet'!B3`. `$` anchors are dropped, so `$B$3` binds `B3`.
fn parse_address(text: &str) -> Result<CellAddress> {
    let Some((sheet, cell)) = text.rsplit_once('!') else {
        bail!("`{text}` is not a SHEET!CELL address");
    };
    let sheet = sheet
        .strip_prefix('\'')
        .and_then(|s| s.strip_suffix('\''))
        .unwrap_or(sheet);
    let parsed =
        CellAddress::new(sheet, cell.trim()).with_context(|| format!("invalid address `{text}`"))?;
    Ok(CellAddress::from_coord(parsed.sheet(), parsed.coord())?)
}

fn preview(store: &mut FileStore, args: PreviewArgs) -> Result<()> {
    let template = open_template(&args.template.template)?;
    let sheet = match args.sheet {
        Some(sheet) => sheet,
        None => template
            .sheet_names()
            .into_iter()
            .next()
            .context("template has no sheets")?,
    };
    let mut ws = Workspace::load(&mut *store)?;
    let window = ws.preview_window();
    if args.fit {
        let descriptor = template.used_range(&sheet)?;
        ws.fit_preview(&decode_used_range(descriptor.as_deref())?);
    } else if args.rows.is_some() || args.cols.is_some() {
        let current = ws.preview_window();
        ws.set_preview_window(PreviewWindow::new(
            args.rows.unwrap_or(current.max_rows()),
            args.cols.unwrap_or(current.max_cols()),
        ));
    }

    let preview = ws
        .sheet_preview(&template, &sheet)
        .with_context(|| format!("previewing sheet `{sheet}`"))?;
    let region = preview.used_range.region();
    println!("{sheet} {}:{}", region.start, region.end);
    let mut row = None;
    let mut line = Vec::new();
    for cell in preview.cells() {
        if row != Some(cell.coord.row()) {
            if !line.is_empty() {
                println!("{}", line.join("\t"));
                line.clear();
            }
            row = Some(cell.coord.row());
        }
        let mark = match &cell.binding {
            BindingKind::Global => " [G]".to_string(),
            BindingKind::Variable(key) => format!(" [{key}]"),
            BindingKind::None => String::new(),
        };
        if cell.text.is_empty() && mark.is_empty() {
            continue;
        }
        line.push(format!("{}={}{mark}", cell.coord, cell.text));
    }
    if !line.is_empty() {
        println!("{}", line.join("\t"));
    }
    if preview.is_truncated() {
        println!(
            "(showing {} x {} of {} x {})",
            preview.shown.rows, preview.shown.cols, preview.used_range.rows, preview.used_range.cols
        );
    }
    if ws.preview_window() != window {
        ws.save(store)?;
    }
    Ok(())
}

fn generate(store: &mut FileStore, args: GenerateArgs) -> Result<()> {
    let template = open_template(&args.template.template)?;
    let ws = Workspace::load(store)?;

    let mut options = GeneratorOptions::default().with_extension(template.format().extension());
    if args.number_duplicates {
        options.duplicate_names = DuplicateNamePolicy::Suffix;
    }
    options.progress = Some(Box::new(|p: GenerationProgress<'_>| {
        eprintln!("[{}/{}] {}", p.completed, p.total, p.file_name);
    }));

    let mut zip = ZipArchiver::new();
    let summary = ws.generate_into(&template, &mut options, &mut zip)?;
    for sheet in &summary.skipped_sheets {
        eprintln!("warning: sheet `{sheet}` is not in the template; its bindings were skipped");
    }
    let out = args
        .out
        .unwrap_or_else(|| PathBuf::from(ws.archive_name()));
    zip.finish_to_path(&out)
        .with_context(|| format!("writing {}", out.display()))?;
    println!("{} file(s) -> {}", summary.file_names.len(), out.display());
    Ok(())
}

fn profile(store: &mut FileStore, cmd: ProfileCommand) -> Result<()> {
    let mut profiles = ProfileStore::open(&*store)?;
    match cmd {
        ProfileCommand::Save { name } => {
            let ws = Workspace::load(&mut *store)?;
            profiles.save(&name, ws.to_state())?;
            profiles.persist(store)?;
        }
        ProfileCommand::Overwrite { name } => {
            let ws = Workspace::load(&mut *store)?;
            profiles.overwrite(&name, ws.to_state())?;
            profiles.persist(store)?;
        }
        ProfileCommand::Load { name } => {
            let state = profiles.load(&name)?.clone();
            Workspace::from_state(state).save(store)?;
            println!("loaded profile `{name}`");
        }
        ProfileCommand::List => {
            for p in profiles.list() {
                println!("{}\t{}", p.name, p.updated_at.to_rfc3339());
            }
        }
        ProfileCommand::Delete { name } => {
            profiles.delete(&name)?;
            profiles.persist(store)?;
        }
        ProfileCommand::Export { name, out } => {
            let doc = profiles.export_document(&name)?;
            match out {
                Some(path) => fs::write(&path, doc)
                    .with_context(|| format!("writing {}", path.display()))?,
                None => println!("{}", String::from_utf8_lossy(&doc)),
            }
        }
        ProfileCommand::Import { file, force, apply } => {
            let data = fs::read(&file).with_context(|| format!("reading {}", file.display()))?;
            let profile = ProfileStore::import_document(&data)?;
            let name = profile.name.clone();
            let state = profile.state.clone();
            profiles.insert(profile, force)?;
            profiles.persist(store)?;
            if apply {
                Workspace::from_state(state).save(store)?;
            }
            println!("imported profile `{name}`");
        }
    }
    Ok(())
}

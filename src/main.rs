use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use compsheet::{
    config::IngestConfig,
    logging,
    mapping::DateConvention,
    schema::{save_template, Entity, Schema},
    session::{JsonSink, LogSink, SaveHandler, SessionState, UploadSession},
    validate::ExtraHeaderPolicy,
    UploadFile, Uploader,
};
use std::{
    fs::File,
    io::BufWriter,
    path::{Path, PathBuf},
};
use tracing::info;

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Validate and commit bulk schedule and rate-table spreadsheets"
)]
struct Cli {
    /// YAML config file.
    #[arg(long, global = true, env = "COMPSHEET_CONFIG")]
    config: Option<PathBuf>,
    /// How to read numeric dates such as 01/03/2025.
    #[arg(long, global = true, value_enum)]
    dates: Option<DateConvention>,
    /// Whether unrecognized headers block a commit.
    #[arg(long, global = true, value_enum)]
    extra_headers: Option<ExtraHeaderPolicy>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Decode, reconcile and validate a file without committing it.
    Check(FileArgs),
    /// Validate a file and hand its rows to a save handler.
    Commit {
        #[command(flatten)]
        file: FileArgs,
        /// Write the commit payload here as JSON; otherwise it is only logged.
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Write the blank upload template for an entity.
    Template {
        #[arg(long, value_enum)]
        entity: Entity,
        #[arg(long)]
        out: PathBuf,
    },
}

#[derive(Args)]
struct FileArgs {
    /// .csv, .xlsx or .xls file.
    file: PathBuf,
    #[arg(long, value_enum)]
    entity: Entity,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ─── 1) config + logging ────────────────────────────────────────
    let mut cfg = IngestConfig::resolve(cli.config.as_deref())?;
    if let Some(dates) = cli.dates {
        cfg.date_convention = dates;
    }
    if let Some(extra) = cli.extra_headers {
        cfg.extra_headers = extra;
    }
    logging::init(&cfg.log_filter);
    let schemas = cfg.schemas()?;

    match cli.command {
        Command::Template { entity, out } => {
            save_template(schemas.get(entity), entity.title(), &out)?;
            info!(entity = %entity, path = %out.display(), "template written");
            println!("wrote {}", out.display());
            Ok(())
        }
        Command::Check(args) => {
            let uploader = load(&args, schemas.get(args.entity), &cfg).await?;
            if uploader.with_session(|s| report(s)) {
                Ok(())
            } else {
                bail!("{} cannot be committed", args.file.display())
            }
        }
        Command::Commit { file, out } => {
            let uploader = load(&file, schemas.get(file.entity), &cfg).await?;
            if !uploader.with_session(|s| report(s)) {
                bail!("{} cannot be committed", file.file.display());
            }
            let count = match out {
                Some(path) => commit_to_file(&uploader, &path)?,
                None => uploader.commit(&mut LogSink)?,
            };
            println!("committed {} rows", count);
            Ok(())
        }
    }
}

// ─── 2) decode into a fresh session ─────────────────────────────────
async fn load(args: &FileArgs, schema: &Schema, cfg: &IngestConfig) -> Result<Uploader> {
    let file = UploadFile::open_within(&args.file, cfg.max_upload_bytes)?;
    let uploader = Uploader::new(UploadSession::new(
        schema.clone(),
        cfg.session_options(),
    ));
    let state = uploader.upload(file).await;
    info!(file = %args.file.display(), ?state, "upload finished");
    Ok(uploader)
}

fn commit_to_file(uploader: &Uploader, path: &Path) -> Result<usize> {
    let out = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    let mut sink = JsonSink::new(BufWriter::new(out));
    let handler: &mut dyn SaveHandler = &mut sink;
    Ok(uploader.commit(handler)?)
}

/// Print the session summary; true when it can be committed.
fn report(session: &UploadSession) -> bool {
    let file = session.file_name().unwrap_or("<unnamed>");
    match session.state() {
        SessionState::DecodeFailed => {
            if let Some(e) = session.decode_error() {
                println!("{}: {}", file, e);
            }
            return false;
        }
        SessionState::DecodedEmpty => {
            println!("{}: file is empty or contains no valid data", file);
            return false;
        }
        _ => {}
    }

    for warning in &session.table().warnings {
        println!("warning: {:?}", warning);
    }
    let mismatch = session.mismatch();
    if !mismatch.missing.is_empty() {
        println!("missing headers: {}", mismatch.missing.join(", "));
    }
    if !mismatch.extra.is_empty() {
        println!("unrecognized headers: {}", mismatch.extra.join(", "));
    }

    let validation = session.validation();
    for err in &validation.errors {
        println!("row {}: {}", err.display_row(), err.message);
    }
    println!(
        "{}: {} rows, {} errors, {}",
        file,
        session.rows().len(),
        validation.error_count(),
        if session.commit_enabled() { "ready to commit" } else { "not ready" }
    );
    session.commit_enabled()
}

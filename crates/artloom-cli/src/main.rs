mod studio;

use std::io::{self, ErrorKind, Write};
use std::path::PathBuf;

use anyhow::{bail, Result};
use artloom_contracts::commands::parse_command;
use artloom_contracts::events::EventLog;
use artloom_contracts::styles::DEFAULT_STYLE_ID;
use artloom_engine::config::{load_env_file, EngineConfig};
use artloom_engine::prompts::random_surprise_prompt;
use clap::{Parser, Subcommand};

use crate::studio::{default_events_path, Studio};

#[derive(Debug, Parser)]
#[command(name = "artloom", version, about = "Text-to-image studio with local history")]
struct Cli {
    /// Directory holding history, favorites, stored images and the event log.
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,
    #[arg(long, global = true)]
    events: Option<PathBuf>,
    /// Dotenv file to load before reading the environment.
    #[arg(long, global = true)]
    env_file: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Generate one image and add it to history.
    Generate(GenerateArgs),
    /// Generate again from a stored image's prompt and style.
    Regenerate { id: String },
    History,
    Favorites,
    /// Toggle an image's favorite status.
    Favorite { id: String },
    Delete { id: String },
    ClearHistory,
    ClearFavorites,
    Styles,
    /// Print a random prompt idea.
    Surprise,
    Download(DownloadArgs),
    Status,
    /// Interactive session; type /help for commands.
    Studio,
}

#[derive(Debug, Parser)]
struct GenerateArgs {
    #[arg(long)]
    prompt: Option<String>,
    #[arg(long, default_value = DEFAULT_STYLE_ID)]
    style: String,
    /// Use a random prompt idea instead of --prompt.
    #[arg(long)]
    surprise: bool,
}

#[derive(Debug, Parser)]
struct DownloadArgs {
    id: String,
    /// Destination path; defaults to ai-image-<id>.jpg.
    #[arg(long)]
    out: Option<PathBuf>,
}

fn main() {
    match run() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("artloom error: {err:#}");
            std::process::exit(1);
        }
    }
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    load_env_file(cli.env_file.as_deref())?;
    let config = EngineConfig::from_env(cli.data_dir.clone());
    for warning in &config.warnings {
        eprintln!("warning: {warning}");
    }
    let events = EventLog::new(default_events_path(&config, cli.events.clone()));
    let mut studio = Studio::open(config, events)?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    match cli.command {
        Command::Generate(args) => {
            let prompt = match (args.prompt, args.surprise) {
                (Some(_), true) => bail!("use either --prompt or --surprise, not both"),
                (Some(prompt), false) => prompt,
                (None, true) => random_surprise_prompt().to_string(),
                (None, false) => bail!("--prompt is required unless --surprise is set"),
            };
            let generated = studio.generate(&prompt, Some(&args.style), &mut out)?;
            return Ok(if generated.is_some() { 0 } else { 2 });
        }
        Command::Regenerate { id } => {
            if studio.regenerate(&id, &mut out)?.is_none() {
                return Ok(2);
            }
        }
        Command::History => studio.history(&mut out)?,
        Command::Favorites => studio.favorites(&mut out)?,
        Command::Favorite { id } => studio.toggle_favorite(&id, &mut out)?,
        Command::Delete { id } => studio.delete(&id, &mut out)?,
        Command::ClearHistory => studio.clear_history(&mut out)?,
        Command::ClearFavorites => studio.clear_favorites(&mut out)?,
        Command::Styles => studio.list_styles(&mut out)?,
        Command::Surprise => {
            studio.surprise(&mut out)?;
        }
        Command::Download(args) => studio.download(&args.id, args.out.as_deref(), &mut out)?,
        Command::Status => studio.status(&mut out)?,
        Command::Studio => {
            drop(out);
            run_studio(&mut studio)?;
        }
    }
    Ok(0)
}

fn run_studio(studio: &mut Studio) -> Result<()> {
    let stdin = io::stdin();
    let mut line = String::new();
    println!("Artloom studio started. Type a prompt to generate, or /help for commands.");

    loop {
        print!("[{}]> ", studio.style_id());
        io::stdout().flush()?;

        line.clear();
        let read = match stdin.read_line(&mut line) {
            Ok(read) => read,
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => return Err(err.into()),
        };
        if read == 0 {
            break;
        }

        let command = parse_command(line.trim_end_matches(['\n', '\r']));
        let mut out = io::stdout().lock();
        if !studio.handle(&command, &mut out)? {
            break;
        }
    }
    Ok(())
}

use std::io::{self, BufRead};
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use imsession_pinyin::{script, Config, JsonSink, SessionHost, TableEngine};
use tracing_subscriber::EnvFilter;

/// Console input method host: reads key scripts from stdin and prints
/// display operations as JSON lines.
#[derive(Debug, Parser)]
#[command(name = "imsession", version, about)]
struct Args {
    /// Configuration file (defaults to $XDG_CONFIG_HOME/imsession.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Dictionary file, overriding the configured one
    #[arg(long)]
    dict: Option<PathBuf>,

    /// Candidates per page
    #[arg(long)]
    page_size: Option<usize>,

    /// Sentence candidates per conversion
    #[arg(long)]
    nbest: Option<usize>,

    /// Fuzzy rules, comma separated (e.g. Z_ZH,C_CH)
    #[arg(long, value_delimiter = ',')]
    fuzzy: Vec<String>,
}

fn load_config(args: &Args) -> anyhow::Result<Config> {
    let mut config = match &args.config {
        Some(path) => Config::load_toml(path)?,
        None => Config::load_or_default(Config::default_path())?,
    };
    if let Some(dict) = &args.dict {
        config.dictionary = Some(dict.clone());
    }
    if let Some(page_size) = args.page_size {
        config.page_size = page_size;
    }
    if let Some(nbest) = args.nbest {
        config.nbest = nbest;
    }
    if !args.fuzzy.is_empty() {
        config.fuzzy_flags = args.fuzzy.clone();
    }
    Ok(config)
}

fn init_tracing(directive: &str) {
    let filter = EnvFilter::try_new(directive).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let config = load_config(&args)?;
    init_tracing(&config.log_directive());
    tracing::debug!(?config, "configuration loaded");

    let with_dictionary = config.dictionary.is_some();
    let host = SessionHost::new(config, move || {
        Ok(if with_dictionary {
            TableEngine::new()
        } else {
            TableEngine::demo()
        })
    });

    let stdout = io::stdout();
    let mut session = host
        .create_session(JsonSink::new(stdout.lock()))
        .context("failed to start input session")?;

    for line in io::stdin().lock().lines() {
        let line = line.context("failed to read stdin")?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        match script::parse_line(line) {
            Ok(commands) => {
                for command in &commands {
                    script::run(&mut session, command);
                }
            }
            Err(e) => tracing::error!(line, error = %e, "skipping script line"),
        }
    }

    Ok(())
}

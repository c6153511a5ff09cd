//! Template Groups CLI
//!
//! Usage:
//!   template-groups [OPTIONS] <NAME>...
//!
//! Options:
//!   -c, --config <FILE>       Group configuration file (TOML format)
//!   -r, --root <DIR>          Template root directory
//!       --delimiters <XY>     Expression delimiters, e.g. "$#"
//!       --encoding <ENC>      Source encoding: utf-8 or latin-1
//!   -i, --import <PATH>       Directory or .stg file searched after the root
//!   -d, --debug               Log resolution decisions
//!   -h, --help                Print help

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use template_groups::{CollectingListener, Encoding, GroupConfig, GroupOptions};

#[derive(Parser, Debug)]
#[command(name = "template-groups")]
#[command(about = "Resolve template names in a template group and print them")]
struct Cli {
    /// Template names to resolve, e.g. util/header
    #[arg(required = true)]
    names: Vec<String>,

    /// Group configuration file (TOML format)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Template root directory (overrides the config file)
    #[arg(short, long)]
    root: Option<PathBuf>,

    /// Expression delimiters as two characters, e.g. "$#"
    #[arg(long)]
    delimiters: Option<String>,

    /// Source encoding: utf-8 or latin-1
    #[arg(long)]
    encoding: Option<Encoding>,

    /// Directory or .stg file searched after the root; may repeat
    #[arg(short, long = "import")]
    imports: Vec<PathBuf>,

    /// Debug mode: log resolution decisions
    #[arg(short, long)]
    debug: bool,
}

fn init_tracing(debug: bool) {
    let filter = if debug {
        EnvFilter::new("template_groups=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("template_groups=warn"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn load_config(cli: &Cli) -> Result<GroupConfig, String> {
    let mut config = match (&cli.config, &cli.root) {
        (Some(path), _) => GroupConfig::from_file(path).map_err(|e| {
            format!("Error loading group config '{}': {}", path.display(), e)
        })?,
        (None, Some(root)) => GroupConfig::new(root),
        (None, None) => return Err("Error: either --root or --config is required".to_string()),
    };

    if let (Some(_), Some(root)) = (&cli.config, &cli.root) {
        config.root = root.clone();
    }
    if let Some(delimiters) = &cli.delimiters {
        config = config.with_delimiters(delimiters);
    }
    if let Some(encoding) = cli.encoding {
        config = config.with_encoding(encoding);
    }
    for import in &cli.imports {
        config = config.with_import(import);
    }
    Ok(config)
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.debug);

    tracing::debug!("template-groups starting with args: {:?}", cli);

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(message) => {
            eprintln!("{}", message);
            return ExitCode::FAILURE;
        }
    };

    let listener = Arc::new(CollectingListener::new());
    let options = GroupOptions::default().with_listener(listener.clone());
    let group = match config.build(options) {
        Ok(group) => group,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let mut missing = 0usize;
    for name in &cli.names {
        match group.lookup(name) {
            Some(template) => {
                println!("// {} ({})", template.name, template.source);
                println!("{}", template);
            }
            None => {
                eprintln!("Error: template '{}' not found in group '{}'", name, group.name());
                missing += 1;
            }
        }
    }

    for diagnostic in listener.take() {
        eprintln!("{}", diagnostic.render());
    }

    if missing > 0 {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

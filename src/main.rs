use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use unbed::diagnostics::render_error;
use unbed::loader::SourceMap;
use unbed::report::Reporter;

#[derive(Parser)]
#[command(name = "unbed", version, about = "Make implicit selections through an embedded field explicit")]
struct Cli {
    /// Container.Type.Field; Container may be a quoted import path
    spec: String,

    /// Workspace root
    #[arg(short = 'C', long, default_value = ".")]
    root: PathBuf,

    /// Identifier to insert instead of the embedded field's name
    #[arg(long = "as", value_name = "NAME")]
    insert_as: Option<String>,

    /// Analyze and report without writing files
    #[arg(short = 'n', long)]
    dry_run: bool,

    /// Print the edit plan as JSON on stdout
    #[arg(long)]
    json: bool,

    /// Raise log verbosity (repeatable)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_env("UNBED_LOG").unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_ansi(false)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let opts = unbed::Options { root: cli.root, spec: cli.spec, insert_as: cli.insert_as, dry_run: cli.dry_run };
    let mut sources = SourceMap::new();
    let mut reporter = Reporter::new(std::io::stderr());

    let plan = match unbed::run(&opts, &mut sources, &mut reporter) {
        Ok(plan) => plan,
        Err(err) => {
            render_error(&err, unbed::error_location(&err, &sources));
            std::process::exit(1);
        }
    };

    if cli.json {
        match serde_json::to_string_pretty(&plan) {
            Ok(json) => println!("{json}"),
            Err(e) => {
                eprintln!("error: could not serialize plan: {e}");
                std::process::exit(1);
            }
        }
    }
}

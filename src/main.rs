use clap::Parser;
use ghci_debugger::config::DebuggerConfig;
use ghci_debugger::debugger::DebugProcess;
use ghci_debugger::repl;
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(author, version, about = "Interactive debugger front end for ghci", long_about = None)]
struct Args {
    /// JSON configuration file.
    #[arg(long, env = "GHCI_DEBUGGER_CONFIG")]
    config: Option<PathBuf>,

    /// ghci executable.
    #[arg(long, env = "GHCI_DEBUGGER_GHCI")]
    ghci: Option<PathBuf>,

    /// Extra ghci arguments, split like a shell command line.
    #[arg(long, allow_hyphen_values = true, env = "GHCI_DEBUGGER_GHCI_ARGS")]
    ghci_args: Option<String>,

    /// Time to wait for each ghci answer.
    #[arg(long, env = "GHCI_DEBUGGER_TIMEOUT_MS")]
    timeout_ms: Option<u64>,

    /// Print results as JSON.
    #[arg(long)]
    json: bool,

    /// Haskell module to load.
    module: Option<PathBuf>,
}

fn load_config(args: &Args) -> ghci_debugger::Result<DebuggerConfig> {
    let mut config = match &args.config {
        Some(path) => DebuggerConfig::from_file(path)?,
        None => DebuggerConfig::default(),
    };
    if let Some(ghci) = &args.ghci {
        config.ghci_path = ghci.clone();
    }
    if let Some(line) = &args.ghci_args {
        config = config.with_args_line(line)?;
    }
    if let Some(timeout) = args.timeout_ms {
        config.response_timeout_ms = timeout;
    }
    config.validate()?;
    Ok(config)
}

fn main() -> ExitCode {
    env_logger::init();
    let args = Args::parse();

    let config = match load_config(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ {e}");
            return ExitCode::FAILURE;
        }
    };

    let mut process = DebugProcess::new(config, args.module.clone());
    if let Err(e) = process.start() {
        eprintln!("❌ Failed to start ghci: {e}");
        return ExitCode::FAILURE;
    }

    let stdin = io::stdin();
    let result = repl::run(&mut process, stdin.lock(), io::stdout(), args.json);
    process.stop();

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("❌ {e}");
            ExitCode::FAILURE
        }
    }
}

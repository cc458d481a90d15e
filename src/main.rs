mod cli;
mod protocol;
mod resource;
mod store;

use std::io;
use std::path::{Path, PathBuf};

use clap::{CommandFactory, Parser};
use clap_complete::generate;
use convergence::{DEFAULT_EXIT_TABLE, EngineError, ExitEntry, Instance, Resource, exit, ops};

use cli::{Cli, Command};
use store::Store;

/// An operation failure paired with its mapped process exit code
struct Failure {
    code: i32,
    error: EngineError,
}

impl Failure {
    fn new(table: &'static [ExitEntry], error: EngineError) -> Self {
        Self {
            code: exit::resolve(table, error.category()),
            error,
        }
    }

    /// For failures raised before a resource type was resolved
    fn early(error: EngineError) -> Self {
        Self::new(DEFAULT_EXIT_TABLE, error)
    }
}

fn main() {
    let cli = Cli::parse();

    // Initialize logging based on verbosity; all of it goes to stderr,
    // keeping stdout clean for the JSON protocol.
    let log_level = match cli.verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    env_logger::Builder::new()
        .filter_level(if cli.quiet {
            log::LevelFilter::Error
        } else {
            log_level
        })
        .format_timestamp(None)
        .init();

    if let Err(failure) = run(&cli) {
        // One diagnostic line on stderr, then the mapped non-zero code.
        log::error!("{}", failure.error);
        std::process::exit(failure.code);
    }
}

fn run(cli: &Cli) -> Result<(), Failure> {
    let store_dir = store_dir(cli)?;

    match &cli.command {
        Command::Get(args) => {
            let r = find_resource(&args.resource, &store_dir)?;
            let table = r.exit_codes();
            let desired = parse_input(r.as_ref(), args.input.as_deref())?;
            let actual =
                ops::get(r.as_ref(), &desired).map_err(|e| Failure::new(table, e))?;
            protocol::write_document(&actual).map_err(|e| Failure::new(table, e))
        }
        Command::Set(args) => {
            let r = find_resource(&args.resource, &store_dir)?;
            let table = r.exit_codes();
            let desired = parse_input(r.as_ref(), args.input.as_deref())?;
            let report =
                ops::set(r.as_ref(), &desired).map_err(|e| Failure::new(table, e))?;
            protocol::write_document(&report).map_err(|e| Failure::new(table, e))
        }
        Command::Test(args) => {
            let r = find_resource(&args.resource, &store_dir)?;
            let table = r.exit_codes();
            let desired = parse_input(r.as_ref(), args.input.as_deref())?;
            let actual =
                ops::test(r.as_ref(), &desired).map_err(|e| Failure::new(table, e))?;
            protocol::write_document(&actual).map_err(|e| Failure::new(table, e))
        }
        Command::Delete(args) => {
            let r = find_resource(&args.resource, &store_dir)?;
            let table = r.exit_codes();
            let desired = parse_input(r.as_ref(), args.input.as_deref())?;
            ops::delete(r.as_ref(), &desired).map_err(|e| Failure::new(table, e))
        }
        Command::Export(args) => {
            let r = find_resource(&args.resource, &store_dir)?;
            let table = r.exit_codes();
            let items = ops::export(r.as_ref()).map_err(|e| Failure::new(table, e))?;
            for item in items {
                let instance = item.map_err(|e| Failure::new(table, e))?;
                protocol::write_document(&instance).map_err(|e| Failure::new(table, e))?;
            }
            Ok(())
        }
        Command::Schema(args) => {
            let r = find_resource(&args.resource, &store_dir)?;
            let table = r.exit_codes();
            protocol::write_document(&r.schema().describe()).map_err(|e| Failure::new(table, e))
        }
        Command::List => {
            for r in resource::registry(&store_dir) {
                let schema = r.schema();
                println!(
                    "{} {} [{}]",
                    schema.type_name(),
                    schema.version(),
                    schema.capabilities().names().join(", ")
                );
            }
            Ok(())
        }
        Command::Completions { shell } => {
            let mut cmd = Cli::command();
            generate(*shell, &mut cmd, "verge", &mut io::stdout());
            Ok(())
        }
    }
}

fn store_dir(cli: &Cli) -> Result<PathBuf, Failure> {
    match &cli.store {
        Some(dir) => Ok(dir.clone()),
        None => Store::default_dir()
            .map_err(|err| Failure::early(EngineError::Internal(err.to_string()))),
    }
}

fn find_resource(name: &str, store_dir: &Path) -> Result<Box<dyn Resource>, Failure> {
    resource::find(name, store_dir).ok_or_else(|| {
        Failure::early(EngineError::InvalidArgument(format!(
            "unknown resource type '{name}'"
        )))
    })
}

fn parse_input(r: &dyn Resource, input: Option<&str>) -> Result<Instance, Failure> {
    let table = r.exit_codes();
    let payload = protocol::read_payload(input).map_err(|e| Failure::new(table, e))?;
    Instance::parse_desired(r.schema(), &payload).map_err(|e| Failure::new(table, e))
}

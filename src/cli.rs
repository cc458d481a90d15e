use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;

#[derive(Parser)]
#[command(name = "verge")]
#[command(version)]
#[command(about = "Declarative resource convergence runtime", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Directory holding the built-in resources' state files
    #[arg(long, global = true, env = "VERGE_STORE", value_name = "DIR")]
    pub store: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Retrieve the actual state of a unit
    Get(OpArgs),

    /// Converge a unit to its desired state
    Set(OpArgs),

    /// Report whether a unit is in its desired state
    Test(OpArgs),

    /// Remove a unit (succeeds if it is already absent)
    Delete(OpArgs),

    /// Enumerate every existing unit of a resource type
    Export(ResourceArg),

    /// Print a resource type's schema document
    Schema(ResourceArg),

    /// List the registered resource types
    List,

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Args)]
pub struct OpArgs {
    /// Resource type name (e.g. Verge/Group)
    #[arg(short, long)]
    pub resource: String,

    /// Desired state as one JSON document; read from stdin when omitted
    #[arg(short, long, value_name = "JSON")]
    pub input: Option<String>,
}

#[derive(Args)]
pub struct ResourceArg {
    /// Resource type name (e.g. Verge/Group)
    #[arg(short, long)]
    pub resource: String,
}

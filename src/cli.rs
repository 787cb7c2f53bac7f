// ABOUTME: Command-line interface definition using clap derive macros.
// ABOUTME: Defines all subcommands and their arguments.

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "dvm")]
#[command(about = "Containerized development workspaces over Docker, containerd and Colima")]
#[command(version)]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show which container platforms are present and which one wins
    Detect {
        /// List every matching platform, not just the winner
        #[arg(long)]
        all: bool,
    },

    /// Build a workspace image
    Build {
        /// Image name to tag the build with
        #[arg(short, long)]
        image: String,

        /// Build context directory (defaults to the current directory)
        #[arg(short, long)]
        context: Option<String>,

        /// Dockerfile path relative to the context
        #[arg(short, long, default_value = "Dockerfile")]
        file: String,

        /// Build args as KEY=VALUE
        #[arg(long = "build-arg")]
        build_args: Vec<String>,
    },

    /// Create and start a workspace container (idempotent)
    Start {
        /// Workspace name
        workspace: String,

        /// Image the workspace runs
        #[arg(short, long)]
        image: String,

        /// Application name (second-to-last name component)
        #[arg(short, long)]
        app: Option<String>,

        /// Domain name component
        #[arg(short, long)]
        domain: Option<String>,

        /// Ecosystem name component (requires --domain)
        #[arg(short, long)]
        ecosystem: Option<String>,

        /// Host path of the application checkout to mount at /workspace
        #[arg(short, long)]
        path: Option<String>,

        /// Forward the host SSH agent into the workspace
        #[arg(long)]
        ssh_agent: bool,

        /// Attach once the workspace is running
        #[arg(long)]
        attach: bool,
    },

    /// Open an interactive shell in a running workspace
    Attach {
        /// Container name of the workspace
        name: String,
    },

    /// Stop a workspace (graceful, then forced)
    Stop {
        /// Container name of the workspace
        name: String,
    },

    /// Stop every managed workspace
    StopAll,

    /// Show one workspace's status
    Status {
        /// Container name of the workspace
        name: String,
    },

    /// List all managed workspaces
    List,
}

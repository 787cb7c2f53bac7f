// ABOUTME: Entry point for the dvm CLI application.
// ABOUTME: Parses arguments and dispatches to appropriate command handlers.

mod cli;

use clap::Parser;
use cli::{Cli, Commands};
use dvm::config::Config;
use dvm::mounts::{MountPlanner, REPO_DESTINATION};
use dvm::platform::Detector;
use dvm::runtime::{
    BuildOptions, ContainerId, ContainerRuntime, StartOptions, WorkspaceStatus, create_runtime,
};
use std::collections::HashMap;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

type Result<T> = std::result::Result<T, Box<dyn std::error::Error>>;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize tracing subscriber based on verbose flag
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = Config::discover()?;

    match cli.command {
        Commands::Detect { all } => detect(&config, all),
        Commands::Build {
            image,
            context,
            file,
            build_args,
        } => {
            let runtime = connect(&config).await?;
            let build_context = match context {
                Some(c) => PathBuf::from(c),
                None => std::env::current_dir()?,
            };
            let opts = BuildOptions {
                app_path: build_context.clone(),
                image_name: image.clone(),
                dockerfile: file,
                build_context,
                tags: vec![image.clone()],
                build_args: parse_key_values(&build_args)?,
                ..Default::default()
            };
            runtime.build_image(&opts).await?;
            println!("Built {image}");
            runtime.close().await?;
            Ok(())
        }
        Commands::Start {
            workspace,
            image,
            app,
            domain,
            ecosystem,
            path,
            ssh_agent,
            attach,
        } => {
            let runtime = connect(&config).await?;

            let opts = StartOptions {
                image_name: image,
                workspace_name: workspace,
                ecosystem_name: ecosystem,
                domain_name: domain,
                app_name: app,
                app_path: path.map(PathBuf::from).unwrap_or_default(),
                working_dir: REPO_DESTINATION.to_string(),
                ssh_agent_forwarding: ssh_agent,
                ..Default::default()
            };
            let name = opts.compute_container_name()?;

            // All mount sources live under the workspace's own state
            // directory; an explicit --path replaces the default repo mount.
            let mut mounts = MountPlanner::new().plan(&name)?;
            if !opts.app_path.as_os_str().is_empty() {
                mounts.retain(|m| m.destination != REPO_DESTINATION);
                mounts.insert(
                    0,
                    dvm::mounts::Mount::bind(opts.app_path.clone(), REPO_DESTINATION, false),
                );
            }
            let opts = StartOptions { mounts, ..opts };

            let id = runtime.start_workspace(&opts).await?;
            println!("Workspace running: {id}");

            if attach {
                runtime.attach_to_workspace(&id).await?;
            }
            runtime.close().await?;
            Ok(())
        }
        Commands::Attach { name } => {
            let runtime = connect(&config).await?;
            runtime.attach_to_workspace(&ContainerId::new(name)).await?;
            runtime.close().await?;
            Ok(())
        }
        Commands::Stop { name } => {
            let runtime = connect(&config).await?;
            runtime.stop_workspace(&ContainerId::new(&name)).await?;
            println!("Stopped {name}");
            runtime.close().await?;
            Ok(())
        }
        Commands::StopAll => {
            let runtime = connect(&config).await?;
            let stopped = runtime.stop_all().await?;
            println!("Stopped {stopped} workspace(s)");
            runtime.close().await?;
            Ok(())
        }
        Commands::Status { name } => {
            let runtime = connect(&config).await?;
            let status = runtime.workspace_status(&ContainerId::new(name)).await?;
            println!("{status}");
            runtime.close().await?;
            if status == WorkspaceStatus::NotFound {
                std::process::exit(3);
            }
            Ok(())
        }
        Commands::List => {
            let runtime = connect(&config).await?;
            let workspaces = runtime.list_workspaces().await?;
            if workspaces.is_empty() {
                println!("No managed workspaces");
            }
            for ws in workspaces {
                println!(
                    "{:<40} {:<10} {:<30} app={} workspace={}",
                    ws.name,
                    ws.status,
                    ws.image,
                    ws.app.as_deref().unwrap_or("-"),
                    ws.workspace.as_deref().unwrap_or("-"),
                );
            }
            runtime.close().await?;
            Ok(())
        }
    }
}

/// Detect the platform and connect the right backend for it.
async fn connect(config: &Config) -> Result<Box<dyn ContainerRuntime>> {
    let choice = config.runtime_choice()?;
    let platform = detector(config).detect(config.platform_override()?)?;
    let runtime = create_runtime(platform, choice, config.stop.timeout).await?;
    tracing::debug!(
        platform = runtime.platform_name(),
        runtime = %runtime.runtime_type(),
        "connected"
    );
    Ok(runtime)
}

fn detector(config: &Config) -> Detector {
    Detector::new().with_colima_profile(config.colima_profile.clone())
}

fn detect(config: &Config, all: bool) -> Result<()> {
    let detector = detector(config);
    if all {
        let platforms = detector.detect_all();
        if platforms.is_empty() {
            println!("No container platforms found");
        }
        for p in platforms {
            println!("{:<16} {}", p.name, p.socket_path.display());
        }
        return Ok(());
    }

    let platform = detector.detect(config.platform_override()?)?;
    let backend = if platform.is_containerd() {
        "containerd"
    } else {
        "docker"
    };
    println!("Platform: {}", platform.name);
    println!("Socket:   {}", platform.socket_path.display());
    println!("Backend:  {backend}");
    if let Some(profile) = &platform.profile {
        println!("Profile:  {profile}");
    }
    Ok(())
}

fn parse_key_values(pairs: &[String]) -> Result<HashMap<String, String>> {
    let mut map = HashMap::new();
    for pair in pairs {
        let (key, value) = pair
            .split_once('=')
            .ok_or_else(|| format!("invalid build arg '{pair}', expected KEY=VALUE"))?;
        map.insert(key.to_string(), value.to_string());
    }
    Ok(map)
}

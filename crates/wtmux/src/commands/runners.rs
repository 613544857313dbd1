use std::collections::BTreeSet;

use clap::ArgMatches;
use tokio::sync::broadcast::error::RecvError;
use tracing::{error, info};

use wtmux_core::config::load_project_config;
use wtmux_core::runtime;
use wtmux_core::{
    Command, Event, Project, RunnerSelection, SessionId, Worktree, WorktreeId, WtmuxConfig,
};

pub(crate) fn handle_runners_command(matches: &ArgMatches) -> Result<(), Box<dyn std::error::Error>> {
    let raw_path = matches
        .get_one::<String>("path")
        .ok_or("Path argument is required")?;
    let path = std::fs::canonicalize(raw_path)
        .map_err(|e| format!("Cannot open '{}': {}", raw_path, e))?;

    let selection = if matches.get_flag("all") {
        RunnerSelection::All
    } else if let Some(name) = matches.get_one::<String>("name") {
        RunnerSelection::Named(name.clone())
    } else {
        RunnerSelection::Defaults
    };

    let project_config = load_project_config(&path);
    if project_config.run_configurations.is_empty() {
        println!(
            "No run configurations found in {}",
            path.join(".wtmux").join("config.json").display()
        );
        return Ok(());
    }
    if let RunnerSelection::Named(name) = &selection
        && project_config.run_configuration(name).is_none()
    {
        return Err(format!("No run configuration named '{}'", name).into());
    }

    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "project".to_string());
    let worktree = WorktreeId::new(name.clone());
    let project = Project::new(name.clone(), name.clone(), path.clone())
        .with_worktree(Worktree::new(name, path.clone(), String::new()))
        .with_config(project_config);

    info!(
        event = "cli.runners_started",
        path = %path.display(),
        selection = ?selection,
    );

    let config = WtmuxConfig::load_or_default();
    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    let result = rt.block_on(run_headless(config, project, worktree, selection));

    match &result {
        Ok(()) => info!(event = "cli.runners_completed"),
        Err(e) => error!(event = "cli.runners_failed", error = %e),
    }
    result
}

/// Launch, then print session events until every started runner has
/// exited or Ctrl-C is pressed.
async fn run_headless(
    config: WtmuxConfig,
    project: Project,
    worktree: WorktreeId,
    selection: RunnerSelection,
) -> Result<(), Box<dyn std::error::Error>> {
    let (handle, task) = runtime::start(config);
    let mut events = handle.subscribe();

    handle.dispatch(Command::RegisterProject { project }).await?;
    let launched = handle
        .dispatch(Command::LaunchRunners {
            worktree,
            selection,
        })
        .await?;

    let mut live: BTreeSet<SessionId> = BTreeSet::new();
    // The same events also arrive on the subscription and are printed there.
    for event in &launched {
        if let Event::RunnersLaunched { started, .. } = event {
            live.extend(started.iter().cloned());
        }
    }
    if live.is_empty() {
        launched.iter().for_each(print_event);
        println!("No runners started.");
    }

    while !live.is_empty() {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                println!();
                break;
            }
            event = events.recv() => match event {
                Ok(event) => {
                    print_event(&event);
                    if let Event::SessionExited { id, .. } = &event {
                        live.remove(id);
                    }
                }
                Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => break,
            },
        }
    }

    let stopped = handle.shutdown().await?;
    if stopped > 0 {
        println!("Stopped {} runner(s).", stopped);
    }
    task.await?;
    Ok(())
}

fn print_event(event: &Event) {
    match event {
        Event::SessionStarted { id, pid, .. } => match pid {
            Some(pid) => println!("started  {} (pid {})", id, pid),
            None => println!("started  {}", id),
        },
        Event::SessionFailedToStart { id, message } => {
            println!("failed   {}: {}", id, message)
        }
        Event::SessionExited {
            id,
            state,
            exit_code,
        } => println!("exited   {} {} (code {})", id, state, exit_code),
        Event::PortsChanged { id, ports } if !ports.is_empty() => {
            let ports: Vec<String> = ports.iter().map(|p| p.to_string()).collect();
            println!("ports    {} {}", id, ports.join(", "));
        }
        _ => {}
    }
}

use clap::ArgMatches;
use tracing::{error, info};

use wtmux_core::WtmuxConfig;
use wtmux_core::config::Paths;

pub(crate) fn handle_config_command(matches: &ArgMatches) -> Result<(), Box<dyn std::error::Error>> {
    let json_output = matches.get_flag("json");

    let config = match WtmuxConfig::load_hierarchy() {
        Ok(config) => config,
        Err(e) => {
            error!(event = "cli.config_failed", error = %e);
            return Err(e.into());
        }
    };
    let status_file = config.status.status_file(&Paths::new());

    let effective = serde_json::json!({
        "layout": {
            "max_columns": config.layout.max_columns(),
            "minimized_column_width": config.layout.minimized_column_width(),
        },
        "status": {
            "done_clear_secs": config.status.done_clear_after().as_secs(),
            "status_file": status_file,
        },
        "ports": {
            "enabled": config.ports.enabled(),
            "scan_interval_secs": config.ports.scan_interval().as_secs(),
        },
        "terminal": {
            "shell": config.terminal.shell(),
            "rows": config.terminal.rows(),
            "cols": config.terminal.cols(),
        },
    });

    if json_output {
        println!("{}", serde_json::to_string_pretty(&effective)?);
    } else {
        println!("[layout]");
        println!("max_columns = {}", config.layout.max_columns());
        println!("minimized_column_width = {}", config.layout.minimized_column_width());
        println!();
        println!("[status]");
        println!("done_clear_secs = {}", config.status.done_clear_after().as_secs());
        println!("status_file = {:?}", status_file.display().to_string());
        println!();
        println!("[ports]");
        println!("enabled = {}", config.ports.enabled());
        println!("scan_interval_secs = {}", config.ports.scan_interval().as_secs());
        println!();
        println!("[terminal]");
        println!("shell = {:?}", config.terminal.shell());
        println!("rows = {}", config.terminal.rows());
        println!("cols = {}", config.terminal.cols());
    }

    info!(event = "cli.config_completed", json_output = json_output);
    Ok(())
}

use clap::ArgMatches;
use tracing::{error, info};

use wtmux_core::WtmuxConfig;
use wtmux_core::config::Paths;
use wtmux_core::status::StatusError;
use wtmux_core::status::hook::read_status_file;

pub(crate) fn handle_status_command(matches: &ArgMatches) -> Result<(), Box<dyn std::error::Error>> {
    let json_output = matches.get_flag("json");

    info!(event = "cli.status_started", json_output = json_output);

    let config = WtmuxConfig::load_or_default();
    let path = config.status.status_file(&Paths::new());

    let record = match read_status_file(&path) {
        Ok(record) => record,
        Err(StatusError::ReadFailed { source, .. })
            if source.kind() == std::io::ErrorKind::NotFound =>
        {
            if json_output {
                println!("null");
            } else {
                println!("No agent status recorded yet.");
                println!("Expected at: {}", path.display());
            }
            return Ok(());
        }
        Err(e) => {
            error!(event = "cli.status_failed", error = %e);
            return Err(e.into());
        }
    };

    if json_output {
        println!("{}", serde_json::to_string_pretty(&record)?);
    } else {
        println!("Status:   {}", record.status);
        println!("Cwd:      {}", record.cwd);
        if let Some(session_id) = &record.session_id {
            println!("Session:  {}", session_id);
        }
        if let Some(column_id) = &record.column_id {
            println!("Column:   {}", column_id);
        }
        if let Some(at) = record
            .timestamp
            .and_then(|ts| chrono::DateTime::from_timestamp(ts, 0))
        {
            println!("Updated:  {}", at.to_rfc3339());
        }
    }

    info!(event = "cli.status_completed", status = %record.status);
    Ok(())
}

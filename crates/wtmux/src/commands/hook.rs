use std::io::Read;

use clap::ArgMatches;
use tracing::{error, info, warn};

use wtmux_core::WtmuxConfig;
use wtmux_core::config::Paths;
use wtmux_core::status::hook::{parse_hook_event, status_record, write_status_file};

/// Column the hook's terminal belongs to; set on every tab wtmux spawns.
const COLUMN_ENV: &str = "WTMUX_COLUMN_ID";

/// Never fails the agent: bad input and write errors are logged only.
pub(crate) fn handle_hook_command(_matches: &ArgMatches) -> Result<(), Box<dyn std::error::Error>> {
    let mut input = String::new();
    if let Err(e) = std::io::stdin().read_to_string(&mut input) {
        warn!(event = "cli.hook_read_failed", error = %e);
        return Ok(());
    }

    let event = match parse_hook_event(&input) {
        Ok(event) => event,
        Err(e) => {
            warn!(event = "cli.hook_parse_failed", error = %e);
            return Ok(());
        }
    };

    let column_id = std::env::var(COLUMN_ENV).ok().filter(|c| !c.is_empty());
    let record = status_record(&event, column_id, chrono::Utc::now().timestamp());

    let config = WtmuxConfig::load_or_default();
    let path = config.status.status_file(&Paths::new());
    if let Err(e) = write_status_file(&path, &record) {
        error!(event = "cli.hook_write_failed", error = %e);
        return Ok(());
    }

    info!(
        event = "cli.hook_completed",
        hook = %event.hook_event_name,
        status = %record.status,
    );
    Ok(())
}

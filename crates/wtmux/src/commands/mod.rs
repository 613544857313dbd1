use clap::ArgMatches;
use tracing::error;

use wtmux_core::events;

mod config;
mod hook;
mod runners;
mod status;
mod zone;

pub fn run_command(matches: &ArgMatches) -> Result<(), Box<dyn std::error::Error>> {
    events::log_app_startup(matches.subcommand_name().unwrap_or("none"));

    let result = match matches.subcommand() {
        Some(("hook", sub_matches)) => hook::handle_hook_command(sub_matches),
        Some(("status", sub_matches)) => status::handle_status_command(sub_matches),
        Some(("runners", sub_matches)) => runners::handle_runners_command(sub_matches),
        Some(("config", sub_matches)) => config::handle_config_command(sub_matches),
        Some(("zone", sub_matches)) => zone::handle_zone_command(sub_matches),
        _ => {
            error!(event = "cli.command_unknown");
            Err("Unknown command".into())
        }
    };

    if let Err(e) = &result {
        events::log_app_error(e.as_ref());
    }
    result
}

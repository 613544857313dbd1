use clap::{Arg, ArgAction, Command};

pub fn build_cli() -> Command {
    Command::new("wtmux")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Worktree-aware terminal multiplexer for AI coding agents")
        .long_about("WTMux arranges terminals for the git worktrees of your projects in windows, columns and panes, runs each worktree's dev servers, and shows what the coding agent in every worktree is doing. This CLI is the agent hook entry point and a headless front end to the same core.")
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Enable verbose logging output")
                .action(ArgAction::SetTrue)
                .global(true),
        )
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(
            Command::new("hook")
                .about("Record an agent hook event (reads the hook JSON on stdin)")
                .long_about(
                    "Maps a Claude Code hook event read from stdin to an agent status and writes it to the status file.\n\n\
                    Configure it as the command of every hook event. The pane's column is taken from WTMUX_COLUMN_ID when set."
                )
        )
        .subcommand(
            Command::new("status")
                .about("Show the last recorded agent status")
                .arg(
                    Arg::new("json")
                        .long("json")
                        .help("Output in JSON format")
                        .action(ArgAction::SetTrue)
                )
        )
        .subcommand(
            Command::new("runners")
                .about("Launch a repository's run configurations headlessly")
                .arg(
                    Arg::new("path")
                        .help("Repository or worktree root containing .wtmux/config.json")
                        .default_value(".")
                        .index(1)
                )
                .arg(
                    Arg::new("all")
                        .long("all")
                        .help("Start every run configuration, not only auto-start ones")
                        .action(ArgAction::SetTrue)
                        .conflicts_with("name")
                )
                .arg(
                    Arg::new("name")
                        .long("name")
                        .short('n')
                        .help("Start only the named run configuration")
                )
        )
        .subcommand(
            Command::new("config")
                .about("Show the effective configuration")
                .arg(
                    Arg::new("json")
                        .long("json")
                        .help("Output in JSON format")
                        .action(ArgAction::SetTrue)
                )
        )
        .subcommand(
            Command::new("zone")
                .about("Print the drop zone for a pointer position")
                .arg(
                    Arg::new("x")
                        .help("Pointer x offset within the target")
                        .required(true)
                        .allow_negative_numbers(true)
                        .value_parser(clap::value_parser!(f64))
                        .index(1)
                )
                .arg(
                    Arg::new("width")
                        .help("Target width")
                        .required(true)
                        .value_parser(clap::value_parser!(f64))
                        .index(2)
                )
        )
}

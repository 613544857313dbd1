use clap::ArgMatches;

use wtmux_core::DropZone;
use wtmux_core::layout::{Point, Size, zone};

pub(crate) fn handle_zone_command(matches: &ArgMatches) -> Result<(), Box<dyn std::error::Error>> {
    let x = *matches.get_one::<f64>("x").ok_or("missing x")?;
    let width = *matches.get_one::<f64>("width").ok_or("missing width")?;

    let zone = zone(Point { x, y: 0.0 }, Size { width, height: 1.0 });
    let label = match zone {
        DropZone::Left => "left",
        DropZone::Center => "center",
        DropZone::Right => "right",
        DropZone::None => "none",
    };
    println!("{}", label);
    Ok(())
}

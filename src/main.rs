mod capture;
mod config;
mod diff;
mod locate;
mod pixel;
mod registry;

use anyhow::{Context, Result};
use clap::{Arg, ArgAction, ArgMatches, Command};
use std::thread;
use std::time::Duration;

use crate::capture::XcapSource;
use crate::config::Config;
use crate::diff::SquareCoord;
use crate::locate::ScanParams;
use crate::pixel::Color;
use crate::registry::BoardRegistry;

fn main() -> Result<()> {
    // Parse CLI arguments
    let matches = Command::new("Zwischenzug-RS")
        .version("0.1.0")
        .about("Pure-Rust chessboard watcher: finds the board on any display and reports changed squares")
        .arg(
            Arg::new("site")
                .long("site")
                .value_name("SITE")
                .help("Chess site to target; omit to reuse board_config.json")
                .value_parser(["chesscom", "lichess", "custom"]),
        )
        .arg(
            Arg::new("light")
                .long("light")
                .value_name("HEX")
                .help("Light square color as rrggbb (overrides the site preset)"),
        )
        .arg(
            Arg::new("dark")
                .long("dark")
                .value_name("HEX")
                .help("Dark square color as rrggbb (overrides the site preset)"),
        )
        .arg(
            Arg::new("tolerance")
                .long("tolerance")
                .value_name("N")
                .help("Color match tolerance for anti-aliased captures (0 = exact)")
                .default_value("0")
                .value_parser(clap::value_parser!(u32)),
        )
        .arg(
            Arg::new("min-size")
                .long("min-size")
                .value_name("PX")
                .help("Smallest accepted board edge in pixels")
                .default_value("32")
                .value_parser(clap::value_parser!(u32)),
        )
        .arg(
            Arg::new("interval")
                .long("interval")
                .value_name("MS")
                .help("Polling interval in milliseconds")
                .default_value("500")
                .value_parser(clap::value_parser!(u64)),
        )
        .arg(
            Arg::new("once")
                .long("once")
                .action(ArgAction::SetTrue)
                .help("Locate the board, print it, and exit"),
        )
        .get_matches();

    let settings = resolve_settings(&matches)?;
    let (light, dark) = settings.colors()?;
    let mut params = ScanParams::new(light, dark);
    params.tolerance = settings.tolerance;
    params.minimum_size = settings.minimum_size;
    let interval = Duration::from_millis(settings.poll_interval_ms);

    println!("Zwischenzug-RS board watcher starting...");
    println!("Targeting site: {}", settings.site);
    println!("Press Ctrl+C to stop.");

    let mut registry = BoardRegistry::new(XcapSource);

    // Step 1: find the board, retrying until it shows up on some display
    while !registry.is_found() {
        match registry
            .locate_board(params)
            .context("Failed to scan displays for a board")?
        {
            Some(location) => {
                println!(
                    "Board found on display {}: {}x{} px at ({}, {})",
                    registry.screen_index().unwrap_or(0),
                    location.width,
                    location.height,
                    location.x,
                    location.y
                );
            }
            None => {
                println!("No board found on any display, retrying...");
                thread::sleep(interval);
            }
        }
    }

    if matches.get_flag("once") {
        if let Some(location) = registry.location() {
            let (field_width, field_height) = location.field_size();
            println!("Square size: {:.1}x{:.1} px", field_width, field_height);
        }
        return Ok(());
    }

    // Step 2: poll the registered rectangle for square changes
    loop {
        thread::sleep(interval);

        if !registry.is_found() {
            match registry
                .relocate()
                .context("Failed to rescan displays for the board")?
            {
                Some(location) => println!(
                    "Board found again: {}x{} px at ({}, {})",
                    location.width, location.height, location.x, location.y
                ),
                None => println!("Board lost, rescanning..."),
            }
            continue;
        }

        let changed = match registry.changed_squares() {
            Ok(changed) => changed,
            Err(err) => {
                // the display layout may have shifted under us; the next
                // tick rescans with the colors of the last attempt
                eprintln!("Snapshot diff failed: {:#}", err);
                registry
                    .relocate()
                    .context("Failed to rescan displays for the board")?;
                continue;
            }
        };

        if !changed.is_empty() {
            println!("Changed squares: {}", format_squares(&changed));
            registry
                .refresh_snapshot()
                .context("Failed to refresh the board snapshot")?;
        }
    }
}

/// Resolves run settings: an explicit `--site` builds a fresh profile and
/// persists it for the next run; with no `--site` a saved
/// board_config.json is reused before falling back to defaults.
fn resolve_settings(matches: &ArgMatches) -> Result<Config> {
    let tolerance = *matches.get_one::<u32>("tolerance").unwrap(); // safe due to default
    let minimum_size = *matches.get_one::<u32>("min-size").unwrap();
    let poll_interval_ms = *matches.get_one::<u64>("interval").unwrap();

    let Some(site) = matches.get_one::<String>("site") else {
        if let Some(saved) = config::load(config::CONFIG_PATH)? {
            println!("Reusing settings from {}", config::CONFIG_PATH);
            return Ok(saved);
        }
        return Ok(Config {
            tolerance,
            minimum_size,
            poll_interval_ms,
            ..Config::default()
        });
    };

    let (light_square, dark_square) = resolve_colors(site, matches)?;
    let settings = Config {
        site: site.clone(),
        light_square,
        dark_square,
        tolerance,
        minimum_size,
        poll_interval_ms,
    };
    config::save(&settings, config::CONFIG_PATH).context("Failed to write board_config.json")?;
    Ok(settings)
}

/// Square colors for a site: CLI overrides win, then the site preset,
/// then an interactive prompt for custom boards.
fn resolve_colors(site: &str, matches: &ArgMatches) -> Result<(String, String)> {
    let light_flag = matches.get_one::<String>("light").cloned();
    let dark_flag = matches.get_one::<String>("dark").cloned();

    if let Some((light, dark)) = config::site_preset(site) {
        return Ok((
            light_flag.unwrap_or_else(|| light.to_string()),
            dark_flag.unwrap_or_else(|| dark.to_string()),
        ));
    }

    let light = match light_flag {
        Some(value) => value,
        None => prompt_hex("Light square color (rrggbb)")?,
    };
    let dark = match dark_flag {
        Some(value) => value,
        None => prompt_hex("Dark square color (rrggbb)")?,
    };
    Ok((light, dark))
}

fn prompt_hex(prompt: &str) -> Result<String> {
    dialoguer::Input::new()
        .with_prompt(prompt)
        .validate_with(|input: &String| {
            Color::from_hex(input).map(|_| ()).map_err(|e| e.to_string())
        })
        .interact_text()
        .context("Failed to read color from terminal")
}

/// Renders changed squares in algebraic notation. Square (0, 0) is the
/// top-left of the capture, which is a8 with White at the bottom.
fn format_squares(changed: &[SquareCoord]) -> String {
    changed
        .iter()
        .map(|sq| {
            let file = shakmaty::File::new(sq.x as u32);
            let rank = shakmaty::Rank::new(7 - sq.y as u32);
            shakmaty::Square::from_coords(file, rank).to_string()
        })
        .collect::<Vec<_>>()
        .join(" ")
}

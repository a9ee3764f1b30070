use chrono::{DateTime, Local, Utc};
use clap::Subcommand;
use serde::Serialize;
use std::io::{self, Write};
use uuid::Uuid;

use super::{Engine, OutputFormat};
use planta_core::{days_until_due, Plant, SyncState};

#[derive(Subcommand)]
pub enum PlantCommand {
    /// List plants with their next watering date
    List {
        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Add a plant, watered now
    Add {
        /// Name of the plant
        name: String,

        /// Days between waterings
        #[arg(long, short)]
        interval: u32,
    },

    /// Record that a plant was watered now
    Water {
        /// Plant name, position in the list (1-based), or plant ID
        plant: String,
    },

    /// Delete a plant
    Delete {
        /// Plant name, position in the list (1-based), or plant ID
        plant: String,

        /// Skip confirmation prompt
        #[arg(long, short)]
        force: bool,
    },
}

impl PlantCommand {
    pub async fn run(&self, engine: &mut Engine) -> Result<(), Box<dyn std::error::Error>> {
        let mut changes = engine.subscribe();

        match self {
            PlantCommand::List { format } => {
                print_plants(engine.plants(), format, Utc::now())?;
                return Ok(());
            }

            PlantCommand::Add { name, interval } => {
                let plant = engine.create(name, *interval).await?;
                println!("Added '{}' ({})", plant.name, plant.sync);
            }

            PlantCommand::Water { plant } => {
                let local_id = resolve_plant(engine.plants(), plant)?;
                let watered = engine.water(local_id).await?;
                println!(
                    "Watered '{}'. Next watering: {}",
                    watered.name,
                    watered.next_due_in(&Local).format("%a %b %d %Y")
                );
                if let SyncState::SyncFailed(reason) = &watered.sync {
                    eprintln!("Warning: not saved remotely: {}", reason);
                }
            }

            PlantCommand::Delete { plant, force } => {
                let local_id = resolve_plant(engine.plants(), plant)?;
                let name = engine
                    .get(local_id)
                    .map(|p| p.name.clone())
                    .unwrap_or_default();

                // Confirm deletion unless --force is used
                if !force {
                    print!("Delete plant '{}'? [y/N] ", name);
                    io::stdout().flush()?;

                    let mut input = String::new();
                    io::stdin().read_line(&mut input)?;

                    if !input.trim().eq_ignore_ascii_case("y") {
                        println!("Deletion cancelled.");
                        return Ok(());
                    }
                }

                let removed = engine.delete(local_id).await?;
                println!("Deleted '{}'", removed.name);
            }
        }

        if matches!(changes.has_changed(), Ok(true)) {
            let plants = changes.borrow_and_update().clone();
            println!();
            print_plants(&plants, &OutputFormat::Text, Utc::now())?;
        }

        Ok(())
    }
}

/// Finds a plant by local ID, name, 1-based position, or remote ID.
///
/// Names match case-insensitively and must be unique. A name wins over a
/// position, so a plant called "2" is reachable by its name.
fn resolve_plant(plants: &[Plant], identifier: &str) -> Result<Uuid, String> {
    let identifier = identifier.trim();

    if let Ok(uuid) = Uuid::parse_str(identifier) {
        if plants.iter().any(|p| p.local_id == uuid) {
            return Ok(uuid);
        }
    }

    let matches: Vec<&Plant> = plants
        .iter()
        .filter(|p| p.name.eq_ignore_ascii_case(identifier))
        .collect();
    match matches.as_slice() {
        [plant] => return Ok(plant.local_id),
        [] => {}
        _ => {
            return Err(format!(
                "'{}' matches {} plants; use its position or ID instead",
                identifier,
                matches.len()
            ))
        }
    }

    if let Ok(position) = identifier.parse::<usize>() {
        return position
            .checked_sub(1)
            .and_then(|index| plants.get(index))
            .map(|p| p.local_id)
            .ok_or_else(|| format!("No plant at position {}", position));
    }

    plants
        .iter()
        .find(|p| p.remote_id.as_deref() == Some(identifier))
        .map(|p| p.local_id)
        .ok_or_else(|| format!("Plant not found: {}", identifier))
}

#[derive(Serialize)]
struct PlantRow<'a> {
    position: usize,
    #[serde(flatten)]
    plant: &'a Plant,
    next_due: DateTime<Utc>,
    days_until_due: i64,
}

fn print_plants(
    plants: &[Plant],
    format: &OutputFormat,
    now: DateTime<Utc>,
) -> Result<(), Box<dyn std::error::Error>> {
    match format {
        OutputFormat::Json => {
            let rows: Vec<PlantRow> = plants
                .iter()
                .enumerate()
                .map(|(i, plant)| PlantRow {
                    position: i + 1,
                    plant,
                    next_due: plant.next_due(),
                    days_until_due: days_until_due(&plant.next_due(), &now),
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&rows)?);
        }
        OutputFormat::Text => {
            if plants.is_empty() {
                println!("No plants yet. Add one with 'planta add <name> --interval <days>'");
                return Ok(());
            }

            let now = now.with_timezone(&Local);
            println!(
                "{:>3}  {:<24}  {:>6}  {:<15}  {:<16}  SYNC",
                "#", "NAME", "EVERY", "NEXT WATERING", "STATUS"
            );
            println!("{}", "-".repeat(84));
            for (i, plant) in plants.iter().enumerate() {
                let next_due = plant.next_due_in(&Local);
                let name = if plant.name.chars().count() > 24 {
                    format!("{}...", plant.name.chars().take(21).collect::<String>())
                } else {
                    plant.name.clone()
                };
                println!(
                    "{:>3}  {:<24}  {:>5}d  {:<15}  {:<16}  {}",
                    i + 1,
                    name,
                    plant.interval_days,
                    next_due.format("%a %b %d %Y"),
                    due_status(days_until_due(&next_due, &now)),
                    sync_marker(&plant.sync)
                );
            }
            println!("\nTotal: {} plant(s)", plants.len());
        }
    }
    Ok(())
}

fn due_status(days: i64) -> String {
    match days {
        d if d < 0 => format!("overdue {}d", -d),
        0 => "water today".to_string(),
        1 => "tomorrow".to_string(),
        d => format!("in {} days", d),
    }
}

fn sync_marker(sync: &SyncState) -> &'static str {
    match sync {
        SyncState::Synced => "✓",
        SyncState::LocalOnly => "local",
        SyncState::SyncFailed(_) => "✗ failed",
        SyncState::NoRemoteId => "no id",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plants() -> Vec<Plant> {
        vec![
            Plant::new("Fern", 3).unwrap().with_remote_id("r1"),
            Plant::new("Cactus", 14).unwrap(),
            Plant::new("fern", 2).unwrap(),
        ]
    }

    #[test]
    fn test_resolve_by_position() {
        let plants = plants();
        assert_eq!(resolve_plant(&plants, "2").unwrap(), plants[1].local_id);
        assert!(resolve_plant(&plants, "0").is_err());
        assert!(resolve_plant(&plants, "4").is_err());
    }

    #[test]
    fn test_resolve_by_local_and_remote_id() {
        let plants = plants();
        let id = plants[2].local_id.to_string();
        assert_eq!(resolve_plant(&plants, &id).unwrap(), plants[2].local_id);
        assert_eq!(resolve_plant(&plants, "r1").unwrap(), plants[0].local_id);
    }

    #[test]
    fn test_resolve_by_name() {
        let plants = plants();
        assert_eq!(resolve_plant(&plants, "CACTUS").unwrap(), plants[1].local_id);

        let err = resolve_plant(&plants, "fern").unwrap_err();
        assert!(err.contains("matches 2 plants"));

        let err = resolve_plant(&plants, "Monstera").unwrap_err();
        assert!(err.contains("not found"));
    }

    #[test]
    fn test_resolve_numeric_name_before_position() {
        let plants = vec![
            Plant::new("2", 3).unwrap(),
            Plant::new("Cactus", 14).unwrap(),
        ];
        assert_eq!(resolve_plant(&plants, "2").unwrap(), plants[0].local_id);
        assert_eq!(resolve_plant(&plants, "1").unwrap(), plants[0].local_id);
    }

    #[test]
    fn test_due_status() {
        assert_eq!(due_status(-2), "overdue 2d");
        assert_eq!(due_status(0), "water today");
        assert_eq!(due_status(1), "tomorrow");
        assert_eq!(due_status(5), "in 5 days");
    }

    #[test]
    fn test_json_row_flattens_plant() {
        let plant = Plant::new("Fern", 3).unwrap();
        let row = PlantRow {
            position: 1,
            plant: &plant,
            next_due: plant.next_due(),
            days_until_due: 3,
        };
        let value = serde_json::to_value(&row).unwrap();
        assert_eq!(value["position"], 1);
        assert_eq!(value["name"], "Fern");
        assert_eq!(value["interval_days"], 3);
        assert_eq!(value["sync"]["state"], "local_only");
    }
}

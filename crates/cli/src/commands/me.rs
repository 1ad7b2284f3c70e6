//! Show a player's score and the auto-feeders they own.

use anyhow::Result;
use shared::api::PlayerResponse;
use tabled::{Table, Tabled, settings::Style};

use crate::{api::Api, config::Config, ui};

#[derive(Tabled)]
struct HoldingRow {
    #[tabled(rename = "Type")]
    id: u32,
    #[tabled(rename = "Owned")]
    count: i64,
}

fn holdings_table(player: &PlayerResponse) -> Option<String> {
    let rows: Vec<HoldingRow> = player
        .auto_feeders
        .iter()
        .filter(|(_, count)| **count > 0)
        .map(|(id, count)| HoldingRow {
            id: *id,
            count: *count,
        })
        .collect();

    if rows.is_empty() {
        return None;
    }

    Some(Table::new(rows).with(Style::rounded()).to_string())
}

pub async fn run(config: &Config, name: &str) -> Result<()> {
    let api = Api::new(config.api_url.clone());
    let player = ui::spin("Fetching...", api.player(name)).await?;

    match player.score {
        Some(score) => println!("{}: {}", ui::bold(&player.name), ui::score(score)),
        None => {
            println!("{} has not played yet", ui::bold(&player.name));
            ui::hint("Start with: feeder feed");
        }
    }

    match holdings_table(&player) {
        Some(table) => println!("{table}"),
        None => println!("No auto-feeders"),
    }

    Ok(())
}

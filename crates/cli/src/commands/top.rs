//! Show the leaderboard.
//!
//! With `--watch` the table is redrawn on an interval until Ctrl+C, which is
//! handy for seeing auto-feeder income land once a minute.

use std::time::Duration;

use anyhow::Result;
use shared::api::ScoreBoardEntry;
use tabled::{Table, Tabled, settings::Style};

use crate::{api::Api, config::Config, ui};

#[derive(Tabled)]
struct ScoreRow {
    #[tabled(rename = "#")]
    rank: usize,
    #[tabled(rename = "Player")]
    name: String,
    #[tabled(rename = "Score")]
    score: String,
}

impl From<ScoreBoardEntry> for ScoreRow {
    fn from(entry: ScoreBoardEntry) -> Self {
        Self {
            rank: entry.rank,
            name: entry.name,
            score: ui::score(entry.value),
        }
    }
}

fn render(entries: Vec<ScoreBoardEntry>) -> String {
    if entries.is_empty() {
        return "No scores yet".to_string();
    }

    let rows: Vec<ScoreRow> = entries.into_iter().map(ScoreRow::from).collect();
    Table::new(rows).with(Style::rounded()).to_string()
}

pub async fn run(config: &Config) -> Result<()> {
    let api = Api::new(config.api_url.clone());
    let board = ui::spin("Fetching leaderboard...", api.top_scorers()).await?;

    println!("{}", render(board.elements));

    Ok(())
}

pub async fn watch(config: &Config, every: Duration) -> Result<()> {
    let api = Api::new(config.api_url.clone());
    let mut ticker = tokio::time::interval(every);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let board = api.top_scorers().await?;
                // Clear screen and move the cursor home before redrawing
                print!("\x1B[2J\x1B[H");
                println!("{}", render(board.elements));
                ui::hint(&format!(
                    "Refreshing every {}, Ctrl+C to stop",
                    humantime::format_duration(every)
                ));
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    Ok(())
}

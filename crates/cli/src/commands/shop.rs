//! List the auto-feeders for sale.

use anyhow::Result;
use shared::api::AutoFeederInfo;
use tabled::{Table, Tabled, settings::Style};

use crate::{api::Api, config::Config, ui};

#[derive(Tabled)]
struct ShopRow {
    #[tabled(rename = "Type")]
    id: u32,
    #[tabled(rename = "Cost")]
    cost: u64,
    #[tabled(rename = "Points / min")]
    income: u64,
}

impl From<AutoFeederInfo> for ShopRow {
    fn from(info: AutoFeederInfo) -> Self {
        Self {
            id: info.id,
            cost: info.cost,
            income: info.income_per_minute,
        }
    }
}

pub async fn run(config: &Config) -> Result<()> {
    let api = Api::new(config.api_url.clone());
    let catalog = ui::spin("Fetching catalog...", api.catalog()).await?;

    if catalog.is_empty() {
        println!("Nothing for sale");
        return Ok(());
    }

    let rows: Vec<ShopRow> = catalog.into_iter().map(ShopRow::from).collect();

    let table = Table::new(rows).with(Style::rounded()).to_string();
    println!("{table}");

    Ok(())
}

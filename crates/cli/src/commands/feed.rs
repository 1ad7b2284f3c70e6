//! Click the feeder by hand.
//!
//! Each click is one request and adds one point. Clicks are rate limited per
//! player on the server, so a long `--times` run without `--every` will hit
//! the limit and stop with an error.

use std::time::Duration;

use anyhow::Result;

use crate::{api::Api, config::Config, ui};

pub async fn run(
    config: &Config,
    player: &str,
    times: u32,
    every: Option<Duration>,
) -> Result<()> {
    let api = Api::new(config.api_url.clone());
    let times = times.max(1);

    let mut score = 0.0;
    for click in 1..=times {
        if click > 1
            && let Some(every) = every
        {
            tokio::time::sleep(every).await;
        }

        score = ui::spin("Feeding...", api.feed(player)).await?.score;

        if times > 1 {
            ui::info(&format!("{click}/{times}: score {}", ui::score(score)));
        }
    }

    ui::success(&format!(
        "{} now has {} points",
        ui::bold(player),
        ui::bold(&ui::score(score))
    ));

    Ok(())
}

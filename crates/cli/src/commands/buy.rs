//! Buy an auto-feeder.
//!
//! Not having enough score is reported, not treated as a failure: the server
//! answers normally and nothing is bought.

use anyhow::Result;

use crate::{api::Api, config::Config, ui};

pub async fn run(config: &Config, player: &str, feeder_type: u32) -> Result<()> {
    let api = Api::new(config.api_url.clone());
    let result = ui::spin("Buying...", api.build_auto_feeder(player, feeder_type)).await?;

    if result.purchased {
        ui::success(&format!(
            "Bought auto-feeder {} for {} points",
            ui::bold(&result.feeder_type.to_string()),
            result.cost
        ));
        if let Some(owned) = result.owned {
            ui::info(&format!("You now own {owned} of this type"));
        }
        if let Some(spent) = result.spent {
            ui::info(&format!("Spent {spent} points on this type so far"));
        }
    } else {
        ui::info(&format!(
            "Not enough points: auto-feeder {} costs {}, you have {}",
            result.feeder_type,
            result.cost,
            ui::score(result.score)
        ));
        ui::hint("Keep feeding: feeder feed --times 10");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{body_json, method, path},
    };

    #[tokio::test]
    async fn insufficient_score_is_not_an_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/build-auto-feeder"))
            .and(body_json(serde_json::json!({ "user": "alice", "type": 1 })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "purchased": false,
                "type": 1,
                "cost": 100,
                "score": 50.0
            })))
            .expect(1)
            .mount(&server)
            .await;

        let config = Config {
            api_url: server.uri(),
            player: None,
        };

        assert!(run(&config, "alice", 1).await.is_ok());
    }

    #[tokio::test]
    async fn unknown_type_is_an_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/build-auto-feeder"))
            .respond_with(
                ResponseTemplate::new(400).set_body_string("unknown auto-feeder type 9"),
            )
            .mount(&server)
            .await;

        let config = Config {
            api_url: server.uri(),
            player: None,
        };

        let err = run(&config, "alice", 9).await.unwrap_err();

        assert_eq!(err.to_string(), "unknown auto-feeder type 9");
    }
}

use anyhow::Result;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_api_url")]
    pub api_url: String,
    /// Default player name when `--player` is not given.
    #[serde(default)]
    pub player: Option<String>,
}

fn default_api_url() -> String {
    "http://localhost:8080".into()
}

impl Config {
    /// The player to act as: the flag wins over the environment.
    pub fn player(&self, flag: Option<String>) -> Result<String> {
        match flag.or_else(|| self.player.clone()) {
            Some(name) if !name.trim().is_empty() => Ok(name),
            _ => anyhow::bail!("No player name. Pass --player <name> or set FEEDER_PLAYER"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(vars: &[(&str, &str)]) -> Config {
        envy::prefixed("FEEDER_")
            .from_iter(vars.iter().map(|(k, v)| (k.to_string(), v.to_string())))
            .unwrap()
    }

    #[test]
    fn defaults_to_local_server() {
        let config = config(&[]);

        assert_eq!(config.api_url, "http://localhost:8080");
        assert_eq!(config.player, None);
    }

    #[test]
    fn flag_overrides_environment() {
        let config = config(&[("FEEDER_PLAYER", "alice")]);

        assert_eq!(config.player(Some("bob".into())).unwrap(), "bob");
        assert_eq!(config.player(None).unwrap(), "alice");
    }

    #[test]
    fn missing_player_is_an_error() {
        let err = config(&[]).player(None).unwrap_err();

        assert!(err.to_string().contains("No player name"));
    }

    #[test]
    fn blank_player_is_an_error() {
        assert!(config(&[]).player(Some("  ".into())).is_err());
    }
}

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

use super::provider::FixtureProvider;
use crate::models::Fixture;

/// Fixture provider backed by API-Football v3.
/// Docs: <https://www.api-football.com/documentation-v3>
pub struct ApiFootball {
    http: Client,
    api_key: String,
    base_url: String,
    live_timeout: Duration,
    scheduled_timeout: Duration,
    /// Value of the `next` query parameter for scheduled fixtures
    lookahead: u32,
}

impl ApiFootball {
    pub fn new(
        api_key: &str,
        base_url: &str,
        live_timeout: Duration,
        scheduled_timeout: Duration,
        lookahead: u32,
    ) -> Result<Self> {
        let http = Client::builder()
            .build()
            .context("Failed to build HTTP client")?;
        Ok(ApiFootball {
            http,
            api_key: api_key.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
            live_timeout,
            scheduled_timeout,
            lookahead,
        })
    }

    async fn get_fixtures(
        &self,
        query: &[(&str, String)],
        timeout: Duration,
    ) -> Result<Vec<Fixture>> {
        let url = format!("{}/fixtures", self.base_url);
        debug!("Fetching fixtures from {} {:?}", url, query);

        let resp = self
            .http
            .get(&url)
            .header("x-apisports-key", &self.api_key)
            .query(query)
            .timeout(timeout)
            .send()
            .await
            .context("API-Football request failed")?;

        if !resp.status().is_success() {
            anyhow::bail!("API-Football error: {}", resp.status());
        }

        let raw: serde_json::Value = resp
            .json()
            .await
            .context("Failed to parse API-Football response")?;

        parse_fixtures_response(&raw)
    }
}

#[async_trait]
impl FixtureProvider for ApiFootball {
    fn name(&self) -> &str {
        "API-Football"
    }

    async fn fetch_live(&self) -> Result<Vec<Fixture>> {
        self.get_fixtures(&[("live", "all".to_string())], self.live_timeout)
            .await
    }

    async fn fetch_scheduled(&self) -> Result<Vec<Fixture>> {
        self.get_fixtures(&[("next", self.lookahead.to_string())], self.scheduled_timeout)
            .await
    }
}

/// Extract fixtures from an API-Football `/fixtures` payload.
///
/// Quota, auth and rate-limit failures arrive as HTTP 200 with a non-empty
/// `errors` field and an empty `response`; those are errors, not an empty
/// fixture list. Entries without an id or team names are dropped; every other
/// field is optional.
pub(crate) fn parse_fixtures_response(raw: &serde_json::Value) -> Result<Vec<Fixture>> {
    let has_errors = match &raw["errors"] {
        serde_json::Value::Object(map) => !map.is_empty(),
        serde_json::Value::Array(list) => !list.is_empty(),
        _ => false,
    };
    if has_errors {
        anyhow::bail!("API-Football reported errors: {}", raw["errors"]);
    }

    let entries = match raw["response"].as_array() {
        Some(a) => a,
        None => return Ok(vec![]),
    };

    let fixtures: Vec<Fixture> = entries
        .iter()
        .filter_map(|entry| {
            let fixture = &entry["fixture"];
            let id = fixture["id"].as_u64()?;
            let home_team = entry["teams"]["home"]["name"].as_str()?.to_string();
            let away_team = entry["teams"]["away"]["name"].as_str()?.to_string();
            let league = entry["league"]["name"]
                .as_str()
                .unwrap_or("Unknown league")
                .to_string();

            let home_goals = goals(&entry["goals"]["home"]);
            let away_goals = goals(&entry["goals"]["away"]);

            // Non-integer minutes ("45+2" in some feeds) count as unknown
            let minute = fixture["status"]["elapsed"]
                .as_u64()
                .and_then(|m| u32::try_from(m).ok());

            let kickoff = fixture["date"]
                .as_str()
                .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
                .map(|dt| dt.with_timezone(&Utc))
                .or_else(|| {
                    fixture["timestamp"]
                        .as_i64()
                        .and_then(|ts| DateTime::from_timestamp(ts, 0))
                });

            Some(Fixture {
                id,
                league,
                home_team,
                away_team,
                home_goals,
                away_goals,
                minute,
                kickoff,
            })
        })
        .collect();

    Ok(fixtures)
}

fn goals(v: &serde_json::Value) -> Option<u32> {
    v.as_u64()
        .or_else(|| v.as_str().and_then(|s| s.parse().ok()))
        .and_then(|g| u32::try_from(g).ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn test_parse_live_fixture() {
        let raw = json!({
            "response": [{
                "fixture": {
                    "id": 868_123,
                    "date": "2024-05-12T15:00:00+00:00",
                    "status": { "short": "2H", "elapsed": 70 }
                },
                "league": { "name": "Premier League" },
                "teams": { "home": { "name": "Arsenal" }, "away": { "name": "Chelsea" } },
                "goals": { "home": 1, "away": 1 }
            }]
        });

        let fixtures = parse_fixtures_response(&raw).unwrap();
        assert_eq!(fixtures.len(), 1);
        let f = &fixtures[0];
        assert_eq!(f.id, 868_123);
        assert_eq!(f.league, "Premier League");
        assert_eq!(f.home_team, "Arsenal");
        assert_eq!(f.away_team, "Chelsea");
        assert_eq!(f.home_goals, Some(1));
        assert_eq!(f.away_goals, Some(1));
        assert_eq!(f.minute, Some(70));
        assert_eq!(
            f.kickoff,
            Some(Utc.with_ymd_and_hms(2024, 5, 12, 15, 0, 0).unwrap())
        );
    }

    #[test]
    fn test_missing_optional_fields_are_tolerated() {
        let raw = json!({
            "response": [{
                "fixture": { "id": 7, "status": { "elapsed": null } },
                "teams": { "home": { "name": "Roma" }, "away": { "name": "Lazio" } },
                "goals": { "home": null, "away": null }
            }]
        });

        let fixtures = parse_fixtures_response(&raw).unwrap();
        assert_eq!(fixtures.len(), 1);
        let f = &fixtures[0];
        assert_eq!(f.league, "Unknown league");
        assert_eq!(f.home_goals, None);
        assert_eq!(f.minute, None);
        assert_eq!(f.kickoff, None);
        assert_eq!(f.score(), None);
    }

    #[test]
    fn test_entries_without_id_are_dropped() {
        let raw = json!({
            "response": [
                { "fixture": {}, "teams": { "home": { "name": "A" }, "away": { "name": "B" } } },
                { "fixture": { "id": 2 }, "teams": { "home": { "name": "C" } } }
            ]
        });
        assert!(parse_fixtures_response(&raw).unwrap().is_empty());
    }

    #[test]
    fn test_non_integer_minute_is_unknown() {
        let raw = json!({
            "response": [{
                "fixture": { "id": 9, "status": { "elapsed": "45+2" } },
                "teams": { "home": { "name": "A" }, "away": { "name": "B" } },
                "goals": { "home": 0, "away": 0 }
            }]
        });
        assert_eq!(parse_fixtures_response(&raw).unwrap()[0].minute, None);
    }

    #[test]
    fn test_error_envelope_is_an_error() {
        let raw = json!({
            "errors": { "requests": "You have reached the request limit for the day" },
            "response": []
        });
        let err = parse_fixtures_response(&raw).unwrap_err();
        assert!(err.to_string().contains("request limit"));

        let raw = json!({ "errors": ["Error/Missing application key"], "response": [] });
        assert!(parse_fixtures_response(&raw).is_err());
    }

    #[test]
    fn test_empty_errors_with_empty_response_is_nothing_live() {
        let raw = json!({ "errors": [], "results": 0, "response": [] });
        assert!(parse_fixtures_response(&raw).unwrap().is_empty());

        let raw = json!({ "errors": {}, "response": [] });
        assert!(parse_fixtures_response(&raw).unwrap().is_empty());
    }
}

//! Message text for every notification the bot sends.

use chrono::{DateTime, Utc};

use crate::models::{Fixture, GoalEvent, Side};

pub const NO_DATA: &str = "😴 No data currently available. Try again in a minute.";

pub fn goal_message(event: &GoalEvent, bet_link: &str) -> String {
    let scorer = match event.side {
        Side::Home => &event.home_team,
        Side::Away => &event.away_team,
    };
    let minute = event
        .minute
        .map(|m| format!("{}'", m))
        .unwrap_or_else(|| "?".to_string());

    format!(
        "⚽ GOAL! {}\n\n\
         🏆 {}\n\
         {} — {}\n\
         📊 {} : {}\n\
         ⏱ {}\n\n\
         👉 {}",
        scorer,
        event.league,
        event.home_team,
        event.away_team,
        event.score.home,
        event.score.away,
        minute,
        bet_link
    )
}

pub fn reminder_message(fixtures: &[Fixture], now: DateTime<Utc>) -> String {
    let mut text = String::from("⏰ Kicking off soon:\n");
    for f in fixtures {
        let mins = f
            .kickoff
            .map(|k| (k - now).num_minutes().max(0))
            .unwrap_or_default();
        text.push_str(&format!(
            "\n🏆 {}\n{} — {} (in {} min)\n",
            f.league, f.home_team, f.away_team, mins
        ));
    }
    text
}

pub fn live_snapshot(fixtures: &[Fixture]) -> String {
    if fixtures.is_empty() {
        return NO_DATA.to_string();
    }
    let mut text = format!("🔴 Live now ({}):\n", fixtures.len());
    for f in fixtures {
        let score = match f.score() {
            Some(s) => format!("{} : {}", s.home, s.away),
            None => "– : –".to_string(),
        };
        let minute = f.minute.map(|m| format!(" ({}')", m)).unwrap_or_default();
        text.push_str(&format!(
            "\n{} — {}  {}{}\n🏆 {}\n",
            f.home_team, f.away_team, score, minute, f.league
        ));
    }
    text
}

pub fn upcoming_list(fixtures: &[Fixture]) -> String {
    if fixtures.is_empty() {
        return NO_DATA.to_string();
    }
    let mut text = String::from("📅 Upcoming matches:\n");
    for f in fixtures {
        let kickoff = f
            .kickoff
            .map(|k| k.format("%d.%m %H:%M UTC").to_string())
            .unwrap_or_else(|| "TBD".to_string());
        text.push_str(&format!(
            "\n{}  {} — {}\n🏆 {}\n",
            kickoff, f.home_team, f.away_team, f.league
        ));
    }
    text
}

use chrono::Duration;
use chrono::TimeZone;
use chrono::Utc;

use super::HistoryItem;
use crate::domain::models::Language;

fn item_at(timestamp: chrono::DateTime<Utc>) -> HistoryItem {
    return HistoryItem {
        id: timestamp.timestamp_millis().to_string(),
        prompt: "a function that adds two numbers".to_string(),
        language: Language::Javascript,
        code: "function add(a, b) {}".to_string(),
        timestamp,
    };
}

#[test]
fn it_describes_relative_age() {
    let now = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
    let cases = vec![
        (Duration::seconds(10), "just now"),
        (Duration::minutes(1), "1 minute ago"),
        (Duration::minutes(5), "5 minutes ago"),
        (Duration::hours(3), "3 hours ago"),
        (Duration::days(1), "1 day ago"),
        (Duration::days(65), "2 months ago"),
        (Duration::days(800), "2 years ago"),
    ];

    for (elapsed, expected) in cases {
        assert_eq!(item_at(now - elapsed).age(now), expected);
    }
}

#[test]
fn it_keeps_short_prompts_whole() {
    let item = item_at(Utc::now());
    assert_eq!(item.summary(), "a function that adds two numbers");
}

#[test]
fn it_serializes_timestamps_as_rfc3339() -> anyhow::Result<()> {
    let now = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
    let serialized = serde_json::to_string(&item_at(now))?;
    insta::assert_snapshot!(serialized, @r###"{"id":"1714564800000","prompt":"a function that adds two numbers","language":"javascript","code":"function add(a, b) {}","timestamp":"2024-05-01T12:00:00Z"}"###);

    return Ok(());
}

// tests/config_load.rs
use std::{env, fs};

use community_alerts::config::AppConfig;
use community_alerts::ChatId;

#[test]
fn full_file_parses() {
    let dir = tempfile::tempdir().unwrap();
    let p = dir.path().join("alerts.toml");
    fs::write(
        &p,
        r#"
state_path = "state/db.json"
community_name = "Builders Guild"

[feeds]
bounties = "https://example.test/api/listings"
events = "https://example.test/calendar.ics"
timeout_secs = 5

[schedule]
poll_minutes = 15

[digest]
time = "07:45"
timezone = "Europe/Berlin"
group_chat_id = -1009876

[opener]
enabled = false
"#,
    )
    .unwrap();

    let cfg = AppConfig::load_from(&p).unwrap();
    assert_eq!(cfg.community_name, "Builders Guild");
    assert_eq!(cfg.feeds.timeout_secs, 5);
    assert_eq!(cfg.schedule.poll_minutes, 15);
    assert_eq!(cfg.digest.time_of_day().format("%H:%M").to_string(), "07:45");
    assert_eq!(cfg.digest.tz(), chrono_tz::Europe::Berlin);
    assert_eq!(cfg.digest.group_chat_id, Some(ChatId(-1_009_876)));
    assert!(!cfg.opener.enabled);
    assert_eq!(cfg.opener.model, "gemini-1.5-flash");
}

#[test]
fn malformed_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let p = dir.path().join("alerts.toml");
    fs::write(&p, "[schedule\npoll_minutes = ").unwrap();
    assert!(AppConfig::load_from(&p).is_err());
}

#[serial_test::serial]
#[test]
fn default_uses_env_then_fallbacks() {
    // Isolate CWD so the repo's own config/ is not picked up.
    let old = env::current_dir().unwrap();
    let tmp = tempfile::tempdir().unwrap();
    env::set_current_dir(tmp.path()).unwrap();
    env::remove_var("ALERTS_CONFIG_PATH");

    // 1) Nothing on disk -> defaults
    let cfg = AppConfig::load_default().unwrap();
    assert_eq!(cfg.schedule.poll_minutes, 10);

    // 2) ./config/alerts.toml
    fs::create_dir_all(tmp.path().join("config")).unwrap();
    fs::write(
        tmp.path().join("config/alerts.toml"),
        "[schedule]\npoll_minutes = 20\n",
    )
    .unwrap();
    assert_eq!(AppConfig::load_default().unwrap().schedule.poll_minutes, 20);

    // 3) env wins
    let p_env = tmp.path().join("other.toml");
    fs::write(&p_env, "[schedule]\npoll_minutes = 30\n").unwrap();
    env::set_var("ALERTS_CONFIG_PATH", p_env.display().to_string());
    assert_eq!(AppConfig::load_default().unwrap().schedule.poll_minutes, 30);

    // 4) env pointing nowhere is an error
    env::set_var("ALERTS_CONFIG_PATH", tmp.path().join("missing.toml").display().to_string());
    assert!(AppConfig::load_default().is_err());
    env::remove_var("ALERTS_CONFIG_PATH");

    env::set_current_dir(&old).unwrap();
}

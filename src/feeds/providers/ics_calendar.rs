// src/feeds/providers/ics_calendar.rs
//! Upcoming events from an iCalendar feed. Parsing is left to `ical`; this
//! module maps DTSTART to an instant (IANA zone, the calendar's own VTIMEZONE,
//! or UTC) and picks a link for each event.

use std::io::BufReader;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chrono::{
    DateTime, Datelike, FixedOffset, NaiveDate, NaiveDateTime, TimeZone, Utc, Weekday,
};
use chrono_tz::Tz;
use ical::parser::ical::component::{IcalCalendar, IcalEvent, IcalTimeZone};
use ical::property::Property;
use ical::IcalParser;
use once_cell::sync::OnceCell;
use regex::Regex;

use crate::feeds::types::{EventFeed, EventRecord, FeedResult};

const NO_LINK: &str = "No link available";

fn prop<'a>(props: &'a [Property], name: &str) -> Option<&'a Property> {
    props.iter().find(|p| p.name.eq_ignore_ascii_case(name))
}

fn value<'a>(props: &'a [Property], name: &str) -> Option<&'a str> {
    prop(props, name)
        .and_then(|p| p.value.as_deref())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

fn param<'a>(p: &'a Property, key: &str) -> Option<&'a str> {
    p.params
        .as_ref()?
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(key))
        .and_then(|(_, vs)| vs.first())
        .map(|v| v.trim().trim_matches('"'))
}

/// Undo TEXT escaping (`\n`, `\,`, `\;`, `\\`).
fn unescape_text(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') | Some('N') => out.push('\n'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

/// `+0100`, `-0500`, `+053000`.
fn parse_utc_offset(s: &str) -> Option<FixedOffset> {
    let s = s.trim();
    let (sign, digits) = match s.as_bytes().first()? {
        b'+' => (1, &s[1..]),
        b'-' => (-1, &s[1..]),
        _ => return None,
    };
    if !(digits.len() == 4 || digits.len() == 6) || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let h: i32 = digits[0..2].parse().ok()?;
    let m: i32 = digits[2..4].parse().ok()?;
    let sec: i32 = digits.get(4..6).map_or(Some(0), |x| x.parse().ok())?;
    FixedOffset::east_opt(sign * (h * 3600 + m * 60 + sec))
}

fn weekday_code(code: &str) -> Option<Weekday> {
    Some(match code {
        "MO" => Weekday::Mon,
        "TU" => Weekday::Tue,
        "WE" => Weekday::Wed,
        "TH" => Weekday::Thu,
        "FR" => Weekday::Fri,
        "SA" => Weekday::Sat,
        "SU" => Weekday::Sun,
        _ => return None,
    })
}

/// Day picked by a yearly `BYMONTH=m;BYDAY=nWD` rule (`-1SU` = last Sunday).
fn nth_weekday(year: i32, month: u32, byday: &str) -> Option<NaiveDate> {
    let byday = byday.trim();
    let code = byday.get(byday.len().checked_sub(2)?..)?;
    let wd = weekday_code(code)?;
    let n: i32 = match &byday[..byday.len() - 2] {
        "" | "+" => 1,
        num => num.trim_start_matches('+').parse().ok()?,
    };
    if n > 0 {
        let first = NaiveDate::from_ymd_opt(year, month, 1)?;
        let shift = (7 + wd.num_days_from_monday() - first.weekday().num_days_from_monday()) % 7;
        first.checked_add_days(chrono::Days::new(u64::from(shift) + 7 * (n as u64 - 1)))
            .filter(|d| d.month() == month)
    } else {
        let next = if month == 12 {
            NaiveDate::from_ymd_opt(year + 1, 1, 1)?
        } else {
            NaiveDate::from_ymd_opt(year, month + 1, 1)?
        };
        let last = next.pred_opt()?;
        let shift = (7 + last.weekday().num_days_from_monday() - wd.num_days_from_monday()) % 7;
        last.checked_sub_days(chrono::Days::new(u64::from(shift) + 7 * (n.unsigned_abs() as u64 - 1)))
            .filter(|d| d.month() == month)
    }
}

/// One STANDARD/DAYLIGHT block, resolved to its onset in `year`.
fn onset_in_year(props: &[Property], year: i32) -> Option<(NaiveDateTime, FixedOffset)> {
    let offset = parse_utc_offset(value(props, "TZOFFSETTO")?)?;
    let start = NaiveDateTime::parse_from_str(value(props, "DTSTART")?, "%Y%m%dT%H%M%S").ok()?;
    let Some(rule) = value(props, "RRULE") else {
        // One-off transition: applies from its own start.
        return Some((start, offset));
    };
    let part = |key: &str| {
        rule.split(';')
            .filter_map(|kv| kv.split_once('='))
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v)
    };
    let month: u32 = part("BYMONTH").and_then(|m| m.parse().ok()).unwrap_or(start.month());
    let day = match part("BYDAY") {
        Some(byday) => nth_weekday(year, month, byday)?,
        None => NaiveDate::from_ymd_opt(year, month, start.day())?,
    };
    Some((day.and_time(start.time()), offset))
}

/// UTC offset a calendar-defined zone has at local time `local`.
fn vtimezone_offset(tz: &IcalTimeZone, local: NaiveDateTime) -> Option<FixedOffset> {
    let year = local.year();
    let mut onsets: Vec<(NaiveDateTime, FixedOffset)> = tz
        .transitions
        .iter()
        .filter_map(|t| onset_in_year(&t.properties, year))
        .collect();
    if onsets.is_empty() {
        return None;
    }
    onsets.sort_by_key(|(at, _)| *at);
    // Latest onset at or before `local`; before the first one of the year
    // the last rule of the previous year is still in force.
    onsets
        .iter()
        .rev()
        .find(|(at, _)| *at <= local)
        .or_else(|| onsets.last())
        .map(|(_, off)| *off)
}

/// Start instant for filtering/sorting plus the display string, rendered in
/// the event's own zone when it names one.
fn parse_start(dtstart: &Property, zones: &[IcalTimeZone]) -> Option<(DateTime<Utc>, String)> {
    let raw = dtstart.value.as_deref()?.trim();
    let is_date = param(dtstart, "VALUE").is_some_and(|v| v.eq_ignore_ascii_case("DATE"))
        || raw.len() == 8;

    if is_date {
        let d = NaiveDate::parse_from_str(raw, "%Y%m%d").ok()?;
        let start = Utc.from_utc_datetime(&d.and_hms_opt(0, 0, 0)?);
        return Some((start, d.format("%Y-%m-%d 00:00").to_string()));
    }

    if let Some(utc) = raw.strip_suffix('Z') {
        let ndt = NaiveDateTime::parse_from_str(utc, "%Y%m%dT%H%M%S").ok()?;
        let start = Utc.from_utc_datetime(&ndt);
        return Some((start, start.format("%Y-%m-%d %H:%M").to_string()));
    }

    let ndt = NaiveDateTime::parse_from_str(raw, "%Y%m%dT%H%M%S").ok()?;
    let shown = ndt.format("%Y-%m-%d %H:%M").to_string();
    let Some(tzid) = param(dtstart, "TZID") else {
        // Floating time: read as UTC.
        return Some((Utc.from_utc_datetime(&ndt), shown));
    };

    if let Ok(tz) = tzid.parse::<Tz>() {
        let local = tz.from_local_datetime(&ndt).earliest()?;
        return Some((local.with_timezone(&Utc), shown));
    }

    let defined = zones
        .iter()
        .find(|z| value(&z.properties, "TZID").is_some_and(|id| id.trim_matches('"') == tzid));
    match defined.and_then(|z| vtimezone_offset(z, ndt)) {
        Some(offset) => {
            let local = offset.from_local_datetime(&ndt).single()?;
            Some((local.with_timezone(&Utc), shown))
        }
        None => {
            tracing::debug!(tzid, "unknown TZID, reading as UTC");
            Some((Utc.from_utc_datetime(&ndt), shown))
        }
    }
}

fn link_in(text: &str) -> Option<String> {
    static RE_URL: OnceCell<Regex> = OnceCell::new();
    let re = RE_URL.get_or_init(|| Regex::new(r"https?://\S+").expect("url regex"));
    re.find(text).map(|m| m.as_str().to_string())
}

/// URL, then ATTACH, then the first http(s) link in DESCRIPTION.
fn event_link(ev: &IcalEvent) -> String {
    value(&ev.properties, "URL")
        .or_else(|| value(&ev.properties, "ATTACH"))
        .map(String::from)
        .or_else(|| value(&ev.properties, "DESCRIPTION").and_then(|d| link_in(&unescape_text(d))))
        .unwrap_or_else(|| NO_LINK.to_string())
}

fn read_calendars(text: &str) -> Result<Vec<IcalCalendar>> {
    let text = text.trim_start_matches('\u{feff}');
    if !text.trim_start().to_ascii_uppercase().starts_with("BEGIN:VCALENDAR") {
        bail!("not an iCalendar document");
    }
    let calendars = IcalParser::new(BufReader::new(text.as_bytes()))
        .collect::<Result<Vec<_>, _>>()
        .context("parsing iCalendar")?;
    if calendars.is_empty() {
        bail!("no VCALENDAR in document");
    }
    Ok(calendars)
}

/// Upcoming events (start >= `now`), soonest first, at most `limit`.
pub fn parse_upcoming(text: &str, now: DateTime<Utc>, limit: usize) -> Result<Vec<EventRecord>> {
    let mut upcoming: Vec<(DateTime<Utc>, EventRecord)> = Vec::new();
    for cal in read_calendars(text)? {
        for ev in &cal.events {
            let Some((start, date)) =
                prop(&ev.properties, "DTSTART").and_then(|p| parse_start(p, &cal.timezones))
            else {
                continue;
            };
            if start < now {
                continue;
            }
            let title = value(&ev.properties, "SUMMARY")
                .map(unescape_text)
                .unwrap_or_else(|| "Untitled event".to_string());
            upcoming.push((
                start,
                EventRecord {
                    title,
                    date,
                    link: event_link(ev),
                },
            ));
        }
    }

    upcoming.sort_by_key(|(start, _)| *start);
    Ok(upcoming.into_iter().take(limit).map(|(_, r)| r).collect())
}

pub struct IcsEventFeed {
    mode: Mode,
    limit: usize,
    now: Option<DateTime<Utc>>,
}

enum Mode {
    Fixture(String),
    Http { url: String, client: reqwest::Client },
}

impl IcsEventFeed {
    pub fn from_url(url: &str, timeout: Duration, limit: usize) -> Result<Self> {
        Ok(Self {
            mode: Mode::Http {
                url: url.to_string(),
                client: crate::feeds::http_client(timeout)?,
            },
            limit,
            now: None,
        })
    }

    pub fn from_fixture(body: &str, limit: usize) -> Self {
        Self {
            mode: Mode::Fixture(body.to_string()),
            limit,
            now: None,
        }
    }

    /// Pin "now" so fixtures with fixed dates stay upcoming.
    pub fn at(mut self, now: DateTime<Utc>) -> Self {
        self.now = Some(now);
        self
    }

    async fn fetch_body(&self) -> Result<String> {
        match &self.mode {
            Mode::Fixture(s) => Ok(s.clone()),
            Mode::Http { url, client } => client
                .get(url)
                .send()
                .await
                .context("calendar http get")?
                .error_for_status()
                .context("calendar http status")?
                .text()
                .await
                .context("calendar http body"),
        }
    }
}

#[async_trait]
impl EventFeed for IcsEventFeed {
    async fn fetch_events(&self) -> FeedResult<EventRecord> {
        let now = self.now.unwrap_or_else(Utc::now);
        let parsed = match self.fetch_body().await {
            Ok(body) => parse_upcoming(&body, now, self.limit),
            Err(e) => Err(e),
        };
        match parsed {
            Ok(items) => FeedResult::from_items(items),
            Err(e) => crate::feeds::unavailable(self.name(), e),
        }
    }

    fn name(&self) -> &'static str {
        "events"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dtstart(params: &[(&str, &str)], value: &str) -> Property {
        Property {
            name: "DTSTART".into(),
            params: (!params.is_empty()).then(|| {
                params
                    .iter()
                    .map(|(k, v)| (k.to_string(), vec![v.to_string()]))
                    .collect()
            }),
            value: Some(value.into()),
        }
    }

    #[test]
    fn text_escapes_are_decoded() {
        assert_eq!(
            unescape_text(r"Pizza\, drinks\; demos\nBring a laptop"),
            "Pizza, drinks; demos\nBring a laptop"
        );
    }

    #[test]
    fn start_forms() {
        let utc = dtstart(&[], "20250307T170000Z");
        assert_eq!(parse_start(&utc, &[]).unwrap().1, "2025-03-07 17:00");

        let date = dtstart(&[("VALUE", "DATE")], "20250307");
        assert_eq!(parse_start(&date, &[]).unwrap().1, "2025-03-07 00:00");

        // Dublin is UTC+1 in summer.
        let zoned = dtstart(&[("TZID", "Europe/Dublin")], "20250707T180000");
        let (start, shown) = parse_start(&zoned, &[]).unwrap();
        assert_eq!(shown, "2025-07-07 18:00");
        assert_eq!(start.format("%H:%M").to_string(), "17:00");
    }

    #[test]
    fn offsets_and_rule_days() {
        assert_eq!(parse_utc_offset("+0100"), FixedOffset::east_opt(3600));
        assert_eq!(parse_utc_offset("-053000"), FixedOffset::west_opt(5 * 3600 + 1800));
        assert_eq!(parse_utc_offset("0100"), None);

        // Last Sunday of March 2025 and first Sunday of November 2025.
        assert_eq!(nth_weekday(2025, 3, "-1SU"), NaiveDate::from_ymd_opt(2025, 3, 30));
        assert_eq!(nth_weekday(2025, 11, "1SU"), NaiveDate::from_ymd_opt(2025, 11, 2));
    }

    #[test]
    fn windows_zone_resolved_from_vtimezone() {
        let ics = "BEGIN:VCALENDAR\r\n\
VERSION:2.0\r\n\
BEGIN:VTIMEZONE\r\n\
TZID:GMT Standard Time\r\n\
BEGIN:STANDARD\r\n\
DTSTART:16011028T020000\r\n\
TZOFFSETFROM:+0100\r\n\
TZOFFSETTO:+0000\r\n\
RRULE:FREQ=YEARLY;BYDAY=-1SU;BYMONTH=10\r\n\
END:STANDARD\r\n\
BEGIN:DAYLIGHT\r\n\
DTSTART:16010325T010000\r\n\
TZOFFSETFROM:+0000\r\n\
TZOFFSETTO:+0100\r\n\
RRULE:FREQ=YEARLY;BYDAY=-1SU;BYMONTH=3\r\n\
END:DAYLIGHT\r\n\
END:VTIMEZONE\r\n\
BEGIN:VEVENT\r\n\
DTSTART;TZID=\"GMT Standard Time\":20250704T180000\r\n\
SUMMARY:Talent Hub\r\n\
END:VEVENT\r\n\
BEGIN:VEVENT\r\n\
DTSTART;TZID=\"GMT Standard Time\":20250104T180000\r\n\
SUMMARY:Winter Social\r\n\
END:VEVENT\r\n\
END:VCALENDAR\r\n";

        // 18:00 local in July is 17:00 UTC; already started at 17:30 UTC.
        let now = Utc.with_ymd_and_hms(2025, 7, 4, 17, 30, 0).unwrap();
        assert!(parse_upcoming(ics, now, 5).unwrap().is_empty());

        // 18:00 local in January is 18:00 UTC.
        let now = Utc.with_ymd_and_hms(2025, 1, 4, 17, 30, 0).unwrap();
        let got = parse_upcoming(ics, now, 5).unwrap();
        assert_eq!(got.len(), 2);
        assert_eq!(got[0].title, "Winter Social");
        assert_eq!(got[0].date, "2025-01-04 18:00");
    }

    #[test]
    fn rejects_non_calendar() {
        assert!(parse_upcoming("<html></html>", Utc::now(), 5).is_err());
    }
}

// src/messages.rs
//! Message templates (Telegram HTML parse mode). Every feed-supplied string
//! is escaped before it is embedded.

use html_escape::{encode_double_quoted_attribute, encode_text};

use crate::feeds::types::{BountyRecord, EventRecord, FeedResult};

pub const DEFAULT_DIGEST_BOUNTIES: usize = 5;

fn esc(s: &str) -> String {
    encode_text(s).to_string()
}

/// Links become anchors only when they look like URLs; placeholders such as
/// "#" or "No link available" are printed as text.
fn link_line(link: &str) -> String {
    let trimmed = link.trim();
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        format!(
            "🔗 <a href=\"{}\">{}</a>",
            encode_double_quoted_attribute(trimmed),
            esc(trimmed)
        )
    } else if trimmed.is_empty() || trimmed == "#" {
        "🔗 No link available".to_string()
    } else {
        format!("🔗 {}", esc(trimmed))
    }
}

fn deadline_text(b: &BountyRecord) -> String {
    b.deadline
        .as_deref()
        .filter(|d| !d.trim().is_empty())
        .map(esc)
        .unwrap_or_else(|| "N/A".to_string())
}

pub fn bounty_alert(b: &BountyRecord) -> String {
    format!(
        "🏆 <b>New Bounty!</b>\n\n<b>{}</b>\n💰 Reward: {}\n⏳ Deadline: {}\n{}",
        esc(&b.title),
        esc(&b.reward),
        deadline_text(b),
        link_line(&b.link)
    )
}

pub fn event_alert(e: &EventRecord) -> String {
    format!(
        "📌 <b>New Event!</b>\n\n<b>{}</b>\n📅 {}\n{}",
        esc(&e.title),
        esc(&e.date),
        link_line(&e.link)
    )
}

/// On-demand bounty listing. Unavailable reads the same as empty.
pub fn bounty_list(bounties: &FeedResult<BountyRecord>) -> String {
    let items = bounties.items();
    if items.is_empty() {
        return "No open bounties found.".to_string();
    }
    items
        .iter()
        .map(|b| {
            format!(
                "🏆 <b>{}</b>\n💰 Reward: {}\n⏳ Deadline: {}\n{}",
                esc(&b.title),
                esc(&b.reward),
                deadline_text(b),
                link_line(&b.link)
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// On-demand event listing.
pub fn event_list(events: &FeedResult<EventRecord>) -> String {
    match events {
        FeedResult::Unavailable(_) => "⚠️ Could not fetch events".to_string(),
        FeedResult::Items(list) if !list.is_empty() => list
            .iter()
            .map(|e| {
                format!(
                    "📌 <b>{}</b>\n📅 {}\n{}",
                    esc(&e.title),
                    esc(&e.date),
                    link_line(&e.link)
                )
            })
            .collect::<Vec<_>>()
            .join("\n\n"),
        _ => "No upcoming events found.".to_string(),
    }
}

pub fn welcome(community: &str) -> String {
    let c = esc(community);
    format!(
        "👋 <b>Welcome to the {c} Bot!</b>\n\n\
I’m here to keep you in the loop with everything happening in our community:\n\
• 📅 Show upcoming community <b>events</b>\n\
• 🏆 List open <b>bounties</b> and opportunities\n\
• 🔔 Send you alerts when new bounties or events go live\n\n\
Type /help anytime to see how to use me.\n\n\
<i>Together, we build, learn, and grow the Web3 future ☘️</i>"
    )
}

pub fn help() -> String {
    "🛠️ <b>Here’s how you can use me:</b>\n\n\
• <code>/events</code> → See the next 5 upcoming events\n\
• <code>/bounties</code> → Check the latest live bounties (with rewards &amp; deadlines)\n\
• <code>/subscribe</code> → Get DM alerts when new bounties/events drop\n\
• <code>/unsubscribe</code> → Stop alerts anytime"
        .to_string()
}

/// Daily brief: opener, next event (if any), then up to `max_bounties`
/// open bounties. Empty and unavailable feeds get a friendly line instead.
pub fn digest(
    community: &str,
    opener: &str,
    events: &FeedResult<EventRecord>,
    bounties: &FeedResult<BountyRecord>,
    max_bounties: usize,
) -> String {
    let mut parts = vec![format!(
        "{}\n\n<b>{} — Daily Brief</b>",
        esc(opener),
        esc(community)
    )];

    match events {
        FeedResult::Items(list) if !list.is_empty() => {
            let e = &list[0];
            parts.push("— <b>Next Event</b> —".to_string());
            parts.push(format!(
                "📌 <b>{}</b>\n📅 {}\n{}",
                esc(&e.title),
                esc(&e.date),
                link_line(&e.link)
            ));
        }
        FeedResult::Unavailable(_) => {
            parts.push("— <b>Next Event</b> —\nThe event calendar is unavailable right now.".to_string());
        }
        _ => parts.push("— <b>Next Event</b> —\nNo upcoming events yet.".to_string()),
    }

    let open = bounties.items();
    if open.is_empty() {
        parts.push("\nNo open bounties right now. Check back later!".to_string());
    } else {
        parts.push("\n— <b>Open Bounties</b> —".to_string());
        for b in open.iter().take(max_bounties) {
            parts.push(format!(
                "🏆 <b>{}</b>\n💰 {}\n⏳ {}\n{}",
                esc(&b.title),
                esc(&b.reward),
                deadline_text(b),
                link_line(&b.link)
            ));
        }
    }

    parts.join("\n\n")
}

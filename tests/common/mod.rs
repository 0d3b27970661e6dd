// tests/common/mod.rs
// Shared fakes for integration tests.
#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use community_alerts::feeds::types::{BountyFeed, BountyRecord, EventFeed, EventRecord, FeedResult};
use community_alerts::notify::RecordingSender;
use community_alerts::opener::FixedOpener;
use community_alerts::{AlertService, ChatId, Parts, Store};
use tempfile::TempDir;

/// Feed whose next result can be swapped between cycles.
pub struct ScriptedFeed<T> {
    next: Mutex<FeedResult<T>>,
}

impl<T: Clone> ScriptedFeed<T> {
    pub fn new(first: FeedResult<T>) -> Arc<Self> {
        Arc::new(Self {
            next: Mutex::new(first),
        })
    }

    pub fn set(&self, r: FeedResult<T>) {
        *self.next.lock().unwrap() = r;
    }

    fn current(&self) -> FeedResult<T> {
        self.next.lock().unwrap().clone()
    }
}

#[async_trait]
impl BountyFeed for ScriptedFeed<BountyRecord> {
    async fn fetch_bounties(&self) -> FeedResult<BountyRecord> {
        self.current()
    }
    fn name(&self) -> &'static str {
        "scripted-bounties"
    }
}

#[async_trait]
impl EventFeed for ScriptedFeed<EventRecord> {
    async fn fetch_events(&self) -> FeedResult<EventRecord> {
        self.current()
    }
    fn name(&self) -> &'static str {
        "scripted-events"
    }
}

pub fn bounty(title: &str, deadline: Option<&str>) -> BountyRecord {
    BountyRecord {
        title: title.to_string(),
        reward: "500 USDC".to_string(),
        deadline: deadline.map(String::from),
        link: "https://x/1".to_string(),
    }
}

pub fn event(title: &str, date: &str) -> EventRecord {
    EventRecord {
        title: title.to_string(),
        date: date.to_string(),
        link: "https://lu.ma/x".to_string(),
    }
}

pub async fn temp_store() -> (TempDir, Arc<Store>) {
    let dir = tempfile::tempdir().unwrap();
    let store = Store::open(dir.path().join("db.json")).await.unwrap();
    (dir, Arc::new(store))
}

pub struct Harness {
    pub _dir: TempDir,
    pub store: Arc<Store>,
    pub bounties: Arc<ScriptedFeed<BountyRecord>>,
    pub events: Arc<ScriptedFeed<EventRecord>>,
    pub sender: Arc<RecordingSender>,
    pub service: AlertService,
}

pub const GROUP: ChatId = ChatId(-100_777);

pub async fn harness(bounties: FeedResult<BountyRecord>, events: FeedResult<EventRecord>) -> Harness {
    let (dir, store) = temp_store().await;
    let bounties = ScriptedFeed::new(bounties);
    let events = ScriptedFeed::new(events);
    let sender = Arc::new(RecordingSender::new());
    let service = AlertService::new(Parts {
        store: store.clone(),
        bounties: bounties.clone(),
        events: events.clone(),
        sender: sender.clone(),
        opener: Arc::new(FixedOpener::new("Good morning, builders.")),
        community: "Superteam Ireland".to_string(),
        max_bounties: 5,
        default_destination: Some(GROUP),
    });
    Harness {
        _dir: dir,
        store,
        bounties,
        events,
        sender,
        service,
    }
}

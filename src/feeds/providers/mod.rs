// src/feeds/providers/mod.rs
pub mod earn_api;
pub mod ics_calendar;

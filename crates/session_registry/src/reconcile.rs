use std::collections::{BTreeSet, HashMap};

use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

use crate::schema::{default_display_name, SessionRecord};

/// Server-reported view of one session. Carries no user-chosen names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerSession {
    pub id: String,
    pub updated_at: Option<String>,
    pub message_count: Option<u32>,
}

/// Merge the authoritative server list into the cached one.
///
/// Per id present server-side, the server's `updated_at` and `message_count`
/// win when present, while a cached `display_name` is always preserved.
/// Sessions known only locally (just created, not yet hydrated) are appended
/// after the merged set. The result is ordered by `updated_at` descending;
/// records without a parseable timestamp sort as `now`. Missing display names
/// are filled with positional defaults afterwards, so reapplying the same
/// server list is idempotent.
#[must_use]
pub fn merge_sessions(
    cached: &[SessionRecord],
    server: &[ServerSession],
    now: OffsetDateTime,
) -> Vec<SessionRecord> {
    let cached_by_id: HashMap<&str, &SessionRecord> = cached
        .iter()
        .map(|record| (record.id.as_str(), record))
        .collect();
    let server_ids: BTreeSet<&str> = server.iter().map(|entry| entry.id.as_str()).collect();

    let mut merged = Vec::with_capacity(cached.len().max(server.len()));

    for entry in server {
        match cached_by_id.get(entry.id.as_str()) {
            Some(known) => {
                let mut record = (*known).clone();
                record.updated_at = entry
                    .updated_at
                    .clone()
                    .or_else(|| record.updated_at.clone());
                record.message_count = entry.message_count.unwrap_or(record.message_count);
                merged.push(record);
            }
            None => {
                let created_at = entry
                    .updated_at
                    .clone()
                    .unwrap_or_else(|| format_or_empty(now));
                merged.push(SessionRecord {
                    id: entry.id.clone(),
                    display_name: None,
                    created_at,
                    updated_at: entry.updated_at.clone(),
                    message_count: entry.message_count.unwrap_or(0),
                });
            }
        }
    }

    for record in cached {
        if !server_ids.contains(record.id.as_str()) {
            merged.push(record.clone());
        }
    }

    merged.sort_by(|a, b| sort_key(b, now).cmp(&sort_key(a, now)));

    for (index, record) in merged.iter_mut().enumerate() {
        let missing = record
            .display_name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .is_none();
        if missing {
            record.display_name = Some(default_display_name(index + 1));
        }
    }

    merged
}

fn sort_key(record: &SessionRecord, now: OffsetDateTime) -> OffsetDateTime {
    record
        .updated_at
        .as_deref()
        .and_then(|value| OffsetDateTime::parse(value, &Rfc3339).ok())
        .unwrap_or(now)
}

fn format_or_empty(now: OffsetDateTime) -> String {
    now.format(&Rfc3339).unwrap_or_default()
}

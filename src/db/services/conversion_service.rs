use chrono::Duration;
use futures::TryStreamExt;
use mongodb::{
    bson::{doc, Document},
    Database,
};
use serde::Serialize;

use super::collection;
use crate::db::{self, entities::conversion_event::ConversionEvent, timestamp};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventTypeCount {
    pub event_type: String,
    pub count: i64,
    pub unique_sessions: i64,
}

pub async fn insert(db: &Database, event: &ConversionEvent) -> mongodb::error::Result<()> {
    collection::<ConversionEvent>(db, db::CONVERSION_EVENTS)
        .insert_one(event)
        .await?;
    Ok(())
}

/// Event counts per type over the trailing `days`.
pub async fn stats_by_type(db: &Database, days: i64) -> mongodb::error::Result<Vec<EventTypeCount>> {
    let since = timestamp::format(&(timestamp::now() - Duration::days(days)));
    let pipeline = vec![
        doc! { "$match": { "createdAt": { "$gte": since } } },
        doc! { "$group": {
            "_id": "$eventType",
            "count": { "$sum": 1 },
            "sessions": { "$addToSet": "$sessionId" },
        } },
        doc! { "$project": {
            "count": 1,
            "uniqueSessions": { "$size": "$sessions" },
        } },
        doc! { "$sort": { "count": -1 } },
    ];

    let mut cursor = collection::<Document>(db, db::CONVERSION_EVENTS)
        .aggregate(pipeline)
        .await?;

    let mut stats = Vec::new();
    while let Some(row) = cursor.try_next().await? {
        stats.push(EventTypeCount {
            event_type: row.get_str("_id").unwrap_or("unknown").to_string(),
            count: number_field(&row, "count"),
            unique_sessions: number_field(&row, "uniqueSessions"),
        });
    }
    Ok(stats)
}

fn number_field(row: &Document, key: &str) -> i64 {
    row.get_i64(key)
        .or_else(|_| row.get_i32(key).map(i64::from))
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_number_field_accepts_both_widths() {
        let row = doc! { "a": 3_i32, "b": 4_i64, "c": "x" };
        assert_eq!(number_field(&row, "a"), 3);
        assert_eq!(number_field(&row, "b"), 4);
        assert_eq!(number_field(&row, "c"), 0);
        assert_eq!(number_field(&row, "missing"), 0);
    }
}

use mongodb::{
    bson::doc,
    options::{ClientOptions, IndexOptions},
    Client, Database, IndexModel,
};
use tracing::info;

use crate::server::config::ServerConfig;

pub mod entities;
pub mod enums;
pub mod services;
pub mod timestamp;

// --- Collection names ---

pub const USERS: &str = "users";
pub const STUDENTS: &str = "students";
pub const ONLINE_COURSES: &str = "online_courses";
pub const NEWS: &str = "news";
pub const COLLECTED_NEWS: &str = "collected_news";
pub const NEWS_COLLECTION_LOGS: &str = "news_collection_logs";
pub const FAQS: &str = "faqs";
pub const NEWSLETTER_SUBSCRIBERS: &str = "newsletter_subscribers";
pub const NEWSLETTERS: &str = "newsletters";
pub const CONSULTATIONS: &str = "consultations";
pub const REGISTRATIONS: &str = "registrations";
pub const PAYMENTS: &str = "payments";
pub const POPUPS: &str = "popups";
pub const CONVERSION_EVENTS: &str = "conversion_events";

/// Builds the shared client. The driver keeps its own connection pool and
/// connects lazily, so this succeeds even while the server is unreachable.
pub async fn connect(config: &ServerConfig) -> Result<Database, mongodb::error::Error> {
    let mut options = ClientOptions::parse(&config.database_url).await?;
    options.app_name = Some("academy-server".to_string());
    options.max_pool_size = Some(10);
    let client = Client::with_options(options)?;
    Ok(client.database(&config.database_name))
}

/// Generates a fresh document id.
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

fn unique_index(keys: mongodb::bson::Document, name: &str) -> IndexModel {
    IndexModel::builder()
        .keys(keys)
        .options(
            IndexOptions::builder()
                .unique(true)
                .name(name.to_string())
                .build(),
        )
        .build()
}

/// Creates the unique indexes the handlers rely on for duplicate detection.
pub async fn init_indexes(db: &Database) -> Result<(), mongodb::error::Error> {
    let indexes: [(&str, IndexModel); 4] = [
        (USERS, unique_index(doc! { "username": 1 }, "username_unique")),
        (COLLECTED_NEWS, unique_index(doc! { "url": 1 }, "url_unique")),
        (
            NEWSLETTER_SUBSCRIBERS,
            unique_index(doc! { "email": 1 }, "email_unique"),
        ),
        (PAYMENTS, unique_index(doc! { "paymentId": 1 }, "payment_id_unique")),
    ];

    for (collection, index) in indexes {
        db.collection::<mongodb::bson::Document>(collection)
            .create_index(index)
            .await?;
        info!(collection = collection, "Index ensured.");
    }
    Ok(())
}

//! Runs against a live MongoDB. Set `ACADEMY_TEST_MONGODB_URI` and run with
//! `cargo test -- --ignored`.

use academy_server::db::{
    self, entities::collected_news::CollectedNewsArticle, services::{collected_news_service, PageRequest},
};
use chrono::Utc;
use mongodb::Database;

const MONGODB_URI_VAR: &str = "ACADEMY_TEST_MONGODB_URI";

async fn scratch_database() -> Database {
    let uri = std::env::var(MONGODB_URI_VAR)
        .unwrap_or_else(|_| panic!("{MONGODB_URI_VAR} must point at a test MongoDB"));
    let client = mongodb::Client::with_uri_str(&uri).await.unwrap();
    let database = client.database(&format!("academy_test_{}", db::new_id().replace('-', "")));
    db::init_indexes(&database).await.unwrap();
    database
}

fn article(url: &str, title: &str) -> CollectedNewsArticle {
    CollectedNewsArticle {
        id: db::new_id(),
        title: title.to_string(),
        description: "지역 초등학교 코딩교육 확대".to_string(),
        url: url.to_string(),
        source: "news.example.kr".to_string(),
        keyword: "코딩교육".to_string(),
        published_at: None,
        relevance_score: 80,
        collected_at: Utc::now(),
    }
}

#[tokio::test]
#[ignore]
async fn test_same_url_is_stored_once() {
    let database = scratch_database().await;
    let url = "https://news.example.kr/article/1";

    let first = collected_news_service::insert_if_new(&database, &article(url, "첫 기사")).await.unwrap();
    let second = collected_news_service::insert_if_new(&database, &article(url, "같은 기사 재수집"))
        .await
        .unwrap();

    assert!(first);
    assert!(!second);
    assert_eq!(collected_news_service::count_by_url(&database, url).await.unwrap(), 1);

    // The first copy wins; the resubmission does not overwrite it.
    let (stored, total) = collected_news_service::list(&database, None, None, PageRequest::new(None, None))
        .await
        .unwrap();
    assert_eq!(total, 1);
    assert_eq!(stored[0].title, "첫 기사");

    let other = "https://news.example.kr/article/2";
    assert!(collected_news_service::insert_if_new(&database, &article(other, "다른 기사")).await.unwrap());
    assert_eq!(collected_news_service::count_by_url(&database, other).await.unwrap(), 1);

    database.drop().await.unwrap();
}

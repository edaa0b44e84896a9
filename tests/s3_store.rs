use axum::{
    extract::{Path, RawQuery, State},
    http::{header, StatusCode},
    response::IntoResponse,
    routing::get,
    Router,
};
use bucketdrop::{
    config::Config,
    storage::{ObjectStore, S3Store, MAX_KEYS},
};
use std::{
    collections::HashMap,
    net::SocketAddr,
    sync::{Arc, Mutex},
};
use tokio::net::TcpListener;

const EMPTY_LISTING: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<ListBucketResult xmlns="http://s3.amazonaws.com/doc/2006-03-01/">
  <Name>empty</Name>
  <Prefix></Prefix>
  <KeyCount>0</KeyCount>
  <MaxKeys>1000</MaxKeys>
  <IsTruncated>false</IsTruncated>
</ListBucketResult>"#;

const TRUNCATED_LISTING: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<ListBucketResult xmlns="http://s3.amazonaws.com/doc/2006-03-01/">
  <Name>mybucket</Name>
  <Prefix></Prefix>
  <KeyCount>2</KeyCount>
  <MaxKeys>1000</MaxKeys>
  <IsTruncated>true</IsTruncated>
  <NextContinuationToken>next-page</NextContinuationToken>
  <Contents>
    <Key>a/b.txt</Key>
    <LastModified>2024-05-01T12:00:00.000Z</LastModified>
    <ETag>"5eb63bbbe01eeed093cb22bb8f5acdc3"</ETag>
    <Size>11</Size>
    <StorageClass>STANDARD</StorageClass>
  </Contents>
  <Contents>
    <Key>empty.bin</Key>
    <LastModified>2024-05-02T08:30:15.000Z</LastModified>
    <ETag>"d41d8cd98f00b204e9800998ecf8427e"</ETag>
    <Size>0</Size>
    <StorageClass>STANDARD</StorageClass>
  </Contents>
</ListBucketResult>"#;

#[derive(Clone, Default)]
struct Recorded {
    queries: Arc<Mutex<Vec<(String, String)>>>,
}

async fn list_bucket(
    State(recorded): State<Recorded>,
    Path(bucket): Path<String>,
    RawQuery(query): RawQuery,
) -> impl IntoResponse {
    recorded
        .queries
        .lock()
        .unwrap()
        .push((bucket.clone(), query.unwrap_or_default()));

    let body = match bucket.as_str() {
        "empty" => EMPTY_LISTING,
        "mybucket" => TRUNCATED_LISTING,
        _ => return (StatusCode::NOT_FOUND, [(header::CONTENT_TYPE, "application/xml")], "").into_response(),
    };

    ([(header::CONTENT_TYPE, "application/xml")], body).into_response()
}

async fn fake_s3() -> (SocketAddr, Recorded) {
    let recorded = Recorded::default();
    let app = Router::new()
        .route("/:bucket", get(list_bucket))
        .route("/:bucket/", get(list_bucket))
        .with_state(recorded.clone());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });

    (addr, recorded)
}

fn store_for(addr: SocketAddr) -> S3Store {
    let vars: HashMap<&str, String> = HashMap::from([
        ("AWS_ACCESS_KEY_ID", "AKIDEXAMPLE".to_string()),
        ("AWS_SECRET_ACCESS_KEY", "secret".to_string()),
        ("S3_ENDPOINT", format!("http://{}", addr)),
        ("BUCKET", "mybucket".to_string()),
        ("S3_FORCE_PATH_STYLE", "true".to_string()),
    ]);
    let config = Config::from_lookup(|name| vars.get(name).cloned()).unwrap();
    S3Store::new(&config.s3).unwrap()
}

#[tokio::test]
async fn lists_empty_bucket() {
    let (addr, recorded) = fake_s3().await;
    let store = store_for(addr);

    let listing = store.list_objects("empty", MAX_KEYS).await.unwrap();

    assert!(listing.objects.is_empty());
    assert!(!listing.truncated);

    let queries = recorded.queries.lock().unwrap();
    assert_eq!(queries.len(), 1);
    assert_eq!(queries[0].0, "empty");
    assert!(queries[0].1.contains("list-type=2"), "{}", queries[0].1);
    assert!(queries[0].1.contains("max-keys=1000"), "{}", queries[0].1);
}

#[tokio::test]
async fn maps_listing_fields_and_reports_truncation() {
    let (addr, recorded) = fake_s3().await;
    let store = store_for(addr);

    let listing = store.list_objects("mybucket", MAX_KEYS).await.unwrap();

    assert!(listing.truncated);
    assert_eq!(listing.objects.len(), 2);

    let first = serde_json::to_value(&listing.objects[0]).unwrap();
    assert_eq!(first["Key"], "a/b.txt");
    assert_eq!(first["Size"], 11);
    assert_eq!(first["LastModified"], "2024-05-01T12:00:00Z");

    let second = serde_json::to_value(&listing.objects[1]).unwrap();
    assert_eq!(second["Key"], "empty.bin");
    assert_eq!(second["Size"], 0);
    assert_eq!(second["LastModified"], "2024-05-02T08:30:15Z");

    // A single page: the continuation token is never followed.
    let queries = recorded.queries.lock().unwrap();
    assert_eq!(queries.len(), 1);
    assert!(queries[0].1.contains("max-keys=1000"), "{}", queries[0].1);
}

#[tokio::test]
async fn missing_bucket_becomes_store_error() {
    let (addr, _) = fake_s3().await;
    let store = store_for(addr);

    let err = store.list_objects("nope", MAX_KEYS).await.unwrap_err();

    assert!(matches!(err, bucketdrop::Error::Store(_)), "{:?}", err);
}

//! Integration tests for table operations against a mock API server.

mod support;

use std::time::{Duration, Instant};

use airtable_client::{ClientError, ErrorKind, QuerySpec, Record, Sort};
use futures_util::{StreamExt, TryStreamExt};
use serde_json::json;
use support::{API_KEY, TABLE_PATH, Task, page_json, record_json};
use wiremock::matchers::{body_json, header, method, path, query_param, query_param_is_missing};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn names(records: &[Record<Task>]) -> Vec<String> {
    records.iter().map(|r| r.fields.name.clone()).collect()
}

#[tokio::test]
async fn test_list_all_follows_cursor_across_pages() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(TABLE_PATH))
        .and(query_param_is_missing("offset"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(page_json(&[("rec1", "a"), ("rec2", "b")], Some("abc"))),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path(TABLE_PATH))
        .and(query_param("offset", "abc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page_json(&[("rec3", "c")], None)))
        .expect(1)
        .mount(&mock_server)
        .await;

    let table = support::table::<Task>(&mock_server);
    let records = table.collect_all(QuerySpec::default()).await.unwrap();

    assert_eq!(names(&records), vec!["a", "b", "c"]);
    assert_eq!(records[2].id(), "rec3");
}

#[tokio::test]
async fn test_list_sends_query_parameters_on_every_page() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(TABLE_PATH))
        .and(query_param("fields[]", "Name"))
        .and(query_param("view", "Grid view"))
        .and(query_param("pageSize", "100"))
        .and(query_param("sort[0][field]", "Name"))
        .and(query_param("sort[0][direction]", "desc"))
        .and(query_param_is_missing("offset"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(page_json(&[("rec1", "b")], Some("next"))),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path(TABLE_PATH))
        .and(query_param("view", "Grid view"))
        .and(query_param("pageSize", "100"))
        .and(query_param("offset", "next"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page_json(&[("rec2", "a")], None)))
        .expect(1)
        .mount(&mock_server)
        .await;

    let query = QuerySpec::builder()
        .field("Name")
        .view("Grid view")
        .page_size(250)
        .sort(Sort::desc("Name"))
        .build();
    let table = support::table::<Task>(&mock_server);
    let records = table.collect_all(query).await.unwrap();

    assert_eq!(names(&records), vec!["b", "a"]);
}

#[tokio::test]
async fn test_list_page_does_not_follow_cursor() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(TABLE_PATH))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(page_json(&[("rec1", "a")], Some("abc"))),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let page = support::table::<Task>(&mock_server).list_page().await.unwrap();

    assert!(page.has_next());
    assert_eq!(page.offset.as_deref(), Some("abc"));
    assert_eq!(names(&page.records), vec!["a"]);
}

#[tokio::test]
async fn test_second_page_decode_failure_after_first_page_records() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(TABLE_PATH))
        .and(query_param_is_missing("offset"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(page_json(&[("rec1", "a"), ("rec2", "b")], Some("abc"))),
        )
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path(TABLE_PATH))
        .and(query_param("offset", "abc"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&mock_server)
        .await;

    let mut records = support::table::<Task>(&mock_server).list_all();

    assert_eq!(records.next().await.unwrap().unwrap().fields.name, "a");
    assert_eq!(records.next().await.unwrap().unwrap().fields.name, "b");
    let error = records.next().await.unwrap().unwrap_err();
    assert_eq!(error.kind(), ErrorKind::Mapping);
    assert!(records.next().await.is_none());
}

#[tokio::test]
async fn test_create_posts_fields_with_headers_once() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(TABLE_PATH))
        .and(header("content-type", "application/json"))
        .and(body_json(json!({"fields": {"Name": "x"}})))
        .respond_with(ResponseTemplate::new(200).set_body_json(record_json("recNew", "x")))
        .expect(1)
        .mount(&mock_server)
        .await;

    let table = support::table::<Task>(&mock_server);
    let created = table.create(&Task::named("x")).await.unwrap();

    assert_eq!(created.id(), "recNew");
    assert_eq!(created.fields, Task::named("x"));
    assert!(created.created_time.is_some());

    let requests = mock_server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    let headers = &requests[0].headers;
    let authorization: Vec<_> = headers.get_all("authorization").iter().collect();
    assert_eq!(authorization.len(), 1);
    assert_eq!(authorization[0], format!("Bearer {API_KEY}").as_str());
    let accept: Vec<_> = headers.get_all("accept").iter().collect();
    assert_eq!(accept.len(), 1);
    assert_eq!(accept[0], "application/json");
    let content_type: Vec<_> = headers.get_all("content-type").iter().collect();
    assert_eq!(content_type.len(), 1);
    assert_eq!(content_type[0], "application/json");
}

#[tokio::test]
async fn test_update_patches_record() {
    let mock_server = MockServer::start().await;

    Mock::given(method("PATCH"))
        .and(path(format!("{TABLE_PATH}/rec1")))
        .and(body_json(json!({"fields": {"Name": "y"}})))
        .respond_with(ResponseTemplate::new(200).set_body_json(record_json("rec1", "y")))
        .expect(1)
        .mount(&mock_server)
        .await;

    let updated = support::table::<Task>(&mock_server)
        .update("rec1", &Task::named("y"))
        .await
        .unwrap();

    assert_eq!(updated.id(), "rec1");
    assert_eq!(updated.fields.name, "y");
}

#[tokio::test]
async fn test_delete_returns_deleted_flag() {
    let mock_server = MockServer::start().await;

    Mock::given(method("DELETE"))
        .and(path(format!("{TABLE_PATH}/rec1")))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"deleted": true, "id": "rec1"})),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let deleted = support::table::<Task>(&mock_server)
        .delete("rec1")
        .await
        .unwrap();

    assert!(deleted);
}

#[tokio::test]
async fn test_find_missing_record_is_server_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(format!("{TABLE_PATH}/recMissing")))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "error": {"type": "NOT_FOUND", "message": "Could not find what you are looking for"}
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let error = support::table::<Task>(&mock_server)
        .find("recMissing")
        .await
        .unwrap_err();

    assert_eq!(error.status(), Some(404));
    let api_error = error.api_error().unwrap();
    assert_eq!(api_error.error_type, "NOT_FOUND");
    assert_eq!(api_error.message, "Could not find what you are looking for");
}

#[tokio::test]
async fn test_server_error_with_structured_body() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(format!("{TABLE_PATH}/rec1")))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({
            "error": {"type": "SERVER_ERROR", "message": "boom"}
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let error = support::table::<Task>(&mock_server)
        .find("rec1")
        .await
        .unwrap_err();

    match error {
        ClientError::Server {
            status,
            status_text,
            error: Some(api_error),
            source: None,
        } => {
            assert_eq!(status, 500);
            assert_eq!(status_text, "Internal Server Error");
            assert_eq!(api_error.error_type, "SERVER_ERROR");
            assert_eq!(api_error.message, "boom");
        }
        other => panic!("expected server error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_server_error_with_unstructured_body() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(format!("{TABLE_PATH}/rec1")))
        .respond_with(ResponseTemplate::new(500).set_body_string("whatever"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let error = support::table::<Task>(&mock_server)
        .find("rec1")
        .await
        .unwrap_err();

    assert_eq!(error.status(), Some(500));
    let api_error = error.api_error().unwrap();
    assert_eq!(api_error.error_type, "UNDEFINED_ERROR");
    assert_eq!(api_error.message, "whatever");
}

#[tokio::test]
async fn test_non_200_success_status_is_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(TABLE_PATH))
        .respond_with(ResponseTemplate::new(201).set_body_json(record_json("rec1", "x")))
        .expect(1)
        .mount(&mock_server)
        .await;

    let error = support::table::<Task>(&mock_server)
        .create(&Task::named("x"))
        .await
        .unwrap_err();

    assert_eq!(error.status(), Some(201));
}

#[tokio::test]
async fn test_rate_limited_request_is_retried_after_wait() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(format!("{TABLE_PATH}/rec1")))
        .respond_with(ResponseTemplate::new(429).set_body_json(json!({
            "error": {"type": "TOO_MANY_REQUESTS", "message": "slow down"}
        })))
        .up_to_n_times(1)
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path(format!("{TABLE_PATH}/rec1")))
        .respond_with(ResponseTemplate::new(200).set_body_json(record_json("rec1", "a")))
        .expect(1)
        .mount(&mock_server)
        .await;

    let started = Instant::now();
    let record = support::table::<Task>(&mock_server)
        .find("rec1")
        .await
        .unwrap();

    assert_eq!(record.fields.name, "a");
    assert!(
        started.elapsed() >= Duration::from_secs(1),
        "retry should wait at least the minimum window"
    );
}

#[tokio::test]
async fn test_rate_limit_retries_exhausted_returns_429() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(format!("{TABLE_PATH}/rec1")))
        .respond_with(ResponseTemplate::new(429).set_body_string("{}"))
        .expect(2)
        .mount(&mock_server)
        .await;

    let error = support::table::<Task>(&mock_server)
        .find("rec1")
        .await
        .unwrap_err();

    assert_eq!(error.status(), Some(429));
}

#[tokio::test]
async fn test_other_server_errors_are_not_retried() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(format!("{TABLE_PATH}/rec1")))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&mock_server)
        .await;

    let error = support::table::<Task>(&mock_server)
        .find("rec1")
        .await
        .unwrap_err();

    assert_eq!(error.status(), Some(503));
}

#[tokio::test]
async fn test_connection_failure_is_server_500_with_cause() {
    let airtable =
        airtable_client::Airtable::new(support::config_for("http://127.0.0.1:1/v0")).unwrap();
    let table = airtable
        .table::<Task>(support::BASE_ID, support::TABLE)
        .unwrap();

    let error = table.find("rec1").await.unwrap_err();

    match &error {
        ClientError::Server {
            status,
            status_text,
            error: None,
            source: Some(_),
        } => {
            assert_eq!(*status, 500);
            assert_eq!(status_text, "Internal server error");
        }
        other => panic!("expected transport failure, got {other:?}"),
    }
}

#[tokio::test]
async fn test_concurrent_operations_share_one_client() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(format!("{TABLE_PATH}/rec1")))
        .respond_with(ResponseTemplate::new(200).set_body_json(record_json("rec1", "a")))
        .expect(8)
        .mount(&mock_server)
        .await;

    let table = support::table::<Task>(&mock_server);
    let handles: Vec<_> = (0..8)
        .map(|_| {
            let table = table.clone();
            tokio::spawn(async move { table.find("rec1").await })
        })
        .collect();

    for handle in handles {
        let record = handle.await.unwrap().unwrap();
        assert_eq!(record.id(), "rec1");
    }
}

#[tokio::test]
async fn test_base_memoized_tables_share_requests() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(TABLE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(page_json(&[("rec1", "a")], None)))
        .expect(2)
        .mount(&mock_server)
        .await;

    let base = support::airtable(&mock_server).base(support::BASE_ID);
    let first = base.table::<Task>(support::TABLE).unwrap();
    let second = base.table::<Task>(support::TABLE).unwrap();

    assert_eq!(base.cached_tables(), 1);
    let from_first: Vec<_> = first.list_all().try_collect().await.unwrap();
    let from_second: Vec<_> = second.list_all().try_collect().await.unwrap();
    assert_eq!(from_first, from_second);
}

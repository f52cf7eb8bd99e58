mod common;

use common::{FakeApi, TotalStyle, param, sample_tasks, spawn_fake_api};
use std::net::TcpListener;
use std::time::Duration;
use task_dashboard::client::{ClientOptions, TaskApiClient};
use task_dashboard::errors::FetchError;
use task_dashboard::paginate::{PageOptions, fetch_all, fetch_all_joined};
use task_dashboard::query::TaskQuery;

fn client(base_url: &str) -> TaskApiClient {
    TaskApiClient::new(
        base_url,
        ClientOptions {
            timeout: Duration::from_secs(5),
            ..ClientOptions::default()
        },
    )
    .unwrap()
}

fn group_query(label: &str) -> TaskQuery {
    TaskQuery::new(label)
        .filter("GROUP_ID", 174)
        .select(["ID", "TITLE", "DURATION_PLAN"])
}

#[tokio::test]
async fn total_of_120_takes_three_sequential_pages() {
    let api = FakeApi::with_tasks(sample_tasks(120));
    let url = spawn_fake_api(api.clone()).await;

    let tasks = fetch_all(&client(&url), &group_query("all"), PageOptions::default())
        .await
        .unwrap();

    assert_eq!(api.starts(), vec!["0", "50", "100"]);
    assert_eq!(tasks.len(), 120);
    let ids: Vec<i64> = tasks.iter().filter_map(|t| t.id).collect();
    assert_eq!(ids, (1..=120).collect::<Vec<_>>());

    for request in api.requests() {
        assert_eq!(param(&request, "filter[GROUP_ID]").as_deref(), Some("174"));
        let selected = request.iter().filter(|(k, _)| k == "select[]").count();
        assert_eq!(selected, 3);
    }
}

#[tokio::test]
async fn configured_page_size_does_not_change_offsets() {
    for page_size in [20, 100] {
        let api = FakeApi::with_tasks(sample_tasks(120));
        let url = spawn_fake_api(api.clone()).await;
        let options = PageOptions {
            page_size,
            ..PageOptions::default()
        };

        let tasks = fetch_all(&client(&url), &group_query("all"), options)
            .await
            .unwrap();

        assert_eq!(api.starts(), vec!["0", "50", "100"], "page_size {page_size}");
        let ids: Vec<i64> = tasks.iter().filter_map(|t| t.id).collect();
        assert_eq!(ids, (1..=120).collect::<Vec<_>>(), "page_size {page_size}");
    }
}

#[tokio::test]
async fn larger_page_size_without_total_still_reads_everything() {
    let api = FakeApi {
        total: TotalStyle::Absent,
        ..FakeApi::with_tasks(sample_tasks(120))
    };
    let url = spawn_fake_api(api.clone()).await;
    let options = PageOptions {
        page_size: 100,
        ..PageOptions::default()
    };

    let tasks = fetch_all(&client(&url), &group_query("all"), options)
        .await
        .unwrap();

    assert_eq!(tasks.len(), 120);
    assert_eq!(api.starts(), vec!["0", "50", "100"]);
}

#[tokio::test]
async fn listing_that_ends_before_its_total_is_an_error() {
    let api = FakeApi {
        stop_after: Some(50),
        ..FakeApi::with_tasks(sample_tasks(120))
    };
    let url = spawn_fake_api(api.clone()).await;

    let err = fetch_all(&client(&url), &group_query("all"), PageOptions::default())
        .await
        .unwrap_err();

    assert!(matches!(
        err.source,
        FetchError::Truncated {
            fetched: 50,
            total: 120
        }
    ));
    assert_eq!(api.starts(), vec!["0", "50"]);
}

#[tokio::test]
async fn nested_total_is_honored() {
    let api = FakeApi {
        total: TotalStyle::Nested,
        ..FakeApi::with_tasks(sample_tasks(100))
    };
    let url = spawn_fake_api(api.clone()).await;

    let tasks = fetch_all(&client(&url), &group_query("all"), PageOptions::default())
        .await
        .unwrap();

    assert_eq!(tasks.len(), 100);
    assert_eq!(api.starts(), vec!["0", "50"]);
}

#[tokio::test]
async fn short_page_ends_fetch_when_no_total_is_reported() {
    let api = FakeApi {
        total: TotalStyle::Absent,
        ..FakeApi::with_tasks(sample_tasks(70))
    };
    let url = spawn_fake_api(api.clone()).await;

    let tasks = fetch_all(&client(&url), &group_query("all"), PageOptions::default())
        .await
        .unwrap();

    assert_eq!(tasks.len(), 70);
    assert_eq!(api.starts(), vec!["0", "50"]);
}

#[tokio::test]
async fn server_next_cursor_drives_pagination() {
    let api = FakeApi {
        total: TotalStyle::Absent,
        with_next: true,
        ..FakeApi::with_tasks(sample_tasks(150))
    };
    let url = spawn_fake_api(api.clone()).await;

    let tasks = fetch_all(&client(&url), &group_query("all"), PageOptions::default())
        .await
        .unwrap();

    // the third page is full and carries no cursor; the empty fourth ends it
    assert_eq!(tasks.len(), 150);
    assert_eq!(api.starts(), vec!["0", "50", "100", "150"]);
}

#[tokio::test]
async fn server_error_on_second_page_aborts_whole_fetch() {
    let api = FakeApi {
        fail_start: Some("50".to_string()),
        ..FakeApi::with_tasks(sample_tasks(120))
    };
    let url = spawn_fake_api(api.clone()).await;

    let err = fetch_all(&client(&url), &group_query("all"), PageOptions::default())
        .await
        .unwrap_err();

    assert_eq!(err.label, "all");
    match &err.source {
        FetchError::Http { status, description } => {
            assert_eq!(*status, 500);
            assert_eq!(description.as_deref(), Some("boom"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(err.to_string(), "fetch 'all' failed: HTTP 500: boom");
    assert_eq!(api.starts(), vec!["0", "50"]);
}

#[tokio::test]
async fn error_field_in_success_body_is_surfaced() {
    let api = FakeApi {
        api_error: true,
        ..FakeApi::default()
    };
    let url = spawn_fake_api(api).await;

    let err = fetch_all(&client(&url), &group_query("all"), PageOptions::default())
        .await
        .unwrap_err();

    assert!(matches!(err.source, FetchError::Api { .. }));
    assert!(err.to_string().contains("Нет доступа"));
}

#[tokio::test]
async fn non_json_body_is_malformed() {
    let api = FakeApi {
        raw_body: Some("<html>maintenance</html>"),
        ..FakeApi::default()
    };
    let url = spawn_fake_api(api).await;

    let err = fetch_all(&client(&url), &group_query("all"), PageOptions::default())
        .await
        .unwrap_err();

    assert!(matches!(err.source, FetchError::MalformedBody { .. }));
}

#[tokio::test]
async fn unreachable_api_is_a_transport_error() {
    let port = {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let url = format!("http://127.0.0.1:{port}/rest");

    let err = fetch_all(&client(&url), &group_query("all"), PageOptions::default())
        .await
        .unwrap_err();

    assert!(matches!(
        err.source,
        FetchError::Transport { .. } | FetchError::Timeout
    ));
}

#[tokio::test]
async fn joined_fetches_return_in_query_order() {
    let api = FakeApi::with_tasks(sample_tasks(120));
    let url = spawn_fake_api(api).await;
    let queries = [
        group_query("all"),
        group_query("milling").filter("TITLE", "фр."),
        group_query("turning").filter("TITLE", "ток."),
    ];

    let results = fetch_all_joined(&client(&url), &queries, PageOptions::default())
        .await
        .unwrap();

    assert_eq!(results.len(), 3);
    assert_eq!(results[0].len(), 120);
    assert_eq!(results[1].len(), 40);
    assert!(results[1].iter().all(|t| t.title.ends_with("фр.")));
    assert_eq!(results[2].len(), 40);
}

#[tokio::test]
async fn one_failed_fetch_fails_the_join() {
    let api = FakeApi {
        fail_title: Some("ток.".to_string()),
        ..FakeApi::with_tasks(sample_tasks(120))
    };
    let url = spawn_fake_api(api).await;
    let queries = [
        group_query("all"),
        group_query("turning").filter("TITLE", "ток."),
    ];

    let err = fetch_all_joined(&client(&url), &queries, PageOptions::default())
        .await
        .unwrap_err();

    assert_eq!(err.label, "turning");
}

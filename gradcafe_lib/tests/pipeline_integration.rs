use std::time::Duration;

use gradcafe_lib::{
    MemorySink, Pipeline, PipelineConfig, PipelineError, RunStats, SqliteSink,
};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn entry_rows(href: &str, university: &str, details: &str) -> String {
    format!(
        "<tr><td>{university}</td>\
         <td><span>Computer Science</span><span>PhD</span></td>\
         <td>January 31, 2026</td><td>Accepted on 28 Jan</td>\
         <td><a href=\"{href}\">Open</a></td></tr>\
         <tr><td colspan=\"5\">{details}</td></tr>"
    )
}

fn listing_page(rows: &str) -> String {
    format!(
        "<html><body><table>\
         <thead><tr><th>University</th><th>Program</th><th>Added On</th>\
         <th>Decision</th><th></th></tr></thead>\
         <tbody>{rows}</tbody></table></body></html>"
    )
}

fn empty_listing() -> String {
    listing_page("")
}

fn detail_page(notes: &str) -> String {
    format!(
        "<html><body><dl>\
         <dt>Institution</dt><dd>Stanford University</dd>\
         <dt>Notes</dt><dd>{notes}</dd>\
         </dl></body></html>"
    )
}

fn test_config(server: &MockServer, limit: usize) -> PipelineConfig {
    PipelineConfig {
        base_url: server.uri(),
        start_page: 1,
        limit,
        max_empty_pages: 1,
        enrich: true,
        min_delay: Duration::ZERO,
    }
}

async fn mount_listing(server: &MockServer, page: u32, body: String) {
    Mock::given(method("GET"))
        .and(path("/survey/"))
        .and(query_param("page", page.to_string()))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}

#[tokio::test]
async fn scrapes_and_normalizes_a_full_record() {
    let server = MockServer::start().await;
    let rows = entry_rows(
        "/survey/result/12345",
        "Stanford University",
        "Fall 2026 International GPA 3.89 GRE 327 GRE V 161 AW 4.50",
    );
    mount_listing(&server, 1, listing_page(&rows)).await;
    mount_listing(&server, 2, empty_listing()).await;
    Mock::given(method("GET"))
        .and(path("/survey/result/12345"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string(detail_page("<p>Great   funding</p>")),
        )
        .mount(&server)
        .await;

    let mut pipeline = Pipeline::new(test_config(&server, 10)).unwrap();
    let record = pipeline.next_record().await.unwrap().expect("one record");

    assert_eq!(record.external_id, 12345);
    assert_eq!(record.university.as_deref(), Some("Stanford University"));
    assert_eq!(record.program_name.as_deref(), Some("Computer Science"));
    assert_eq!(record.degree.as_deref(), Some("PhD"));
    assert_eq!(record.applicant_status.as_deref(), Some("Accepted"));
    assert_eq!(record.start_term.as_deref(), Some("Fall 2026"));
    assert_eq!(record.citizenship.as_deref(), Some("International"));
    assert_eq!(record.gpa, Some(3.89));
    assert_eq!(record.gre_total, Some(327.0));
    assert_eq!(record.gre_verbal, Some(161.0));
    assert_eq!(record.gre_analytical_writing, Some(4.5));
    assert_eq!(record.comments.as_deref(), Some("Great funding"));
    assert_eq!(
        record.date_posted.map(|d| d.to_string()).as_deref(),
        Some("2026-01-31")
    );

    assert!(pipeline.next_record().await.unwrap().is_none());
}

#[tokio::test]
async fn rerun_reports_only_duplicates() {
    let server = MockServer::start().await;
    let rows = format!(
        "{}{}",
        entry_rows("/survey/result/1", "MIT", "Fall 2026"),
        entry_rows("/survey/result/2", "Cornell", "Spring 2026"),
    );
    mount_listing(&server, 1, listing_page(&rows)).await;
    mount_listing(&server, 2, empty_listing()).await;

    let mut sink = SqliteSink::open_in_memory().unwrap();
    sink.init().unwrap();

    let mut config = test_config(&server, 10);
    config.enrich = false;

    let first = Pipeline::new(config.clone())
        .unwrap()
        .run_into_sink(&mut sink)
        .await
        .unwrap();
    assert_eq!(
        first,
        RunStats {
            inserted: 2,
            duplicates: 0,
            skipped_invalid: 0
        }
    );

    let second = Pipeline::new(config)
        .unwrap()
        .run_into_sink(&mut sink)
        .await
        .unwrap();
    assert_eq!(
        second,
        RunStats {
            inserted: 0,
            duplicates: 2,
            skipped_invalid: 0
        }
    );
    assert_eq!(sink.count().unwrap(), 2);
}

#[tokio::test]
async fn detail_failure_falls_back_to_listing_comment() {
    let server = MockServer::start().await;
    let rows = format!(
        "{}{}",
        entry_rows(
            "/survey/result/31",
            "MIT",
            "Fall 2026 Really hoping for funding news soon",
        ),
        entry_rows("/survey/result/32", "Cornell", "Spring 2026"),
    );
    mount_listing(&server, 1, listing_page(&rows)).await;
    mount_listing(&server, 2, empty_listing()).await;
    // No detail mocks mounted: detail fetches get 404 and enrichment backs off.

    let mut pipeline = Pipeline::new(test_config(&server, 10)).unwrap();
    let first = pipeline.next_record().await.unwrap().expect("record 31");
    assert_eq!(
        first.comments.as_deref(),
        Some("Really hoping for funding news soon")
    );

    // The run keeps going past the failed enrichment.
    let second = pipeline.next_record().await.unwrap().expect("record 32");
    assert_eq!(second.external_id, 32);
    assert!(pipeline.next_record().await.unwrap().is_none());
}

#[tokio::test]
async fn consecutive_empty_pages_end_the_run() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/survey/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(empty_listing()))
        .expect(3)
        .mount(&server)
        .await;

    let mut config = test_config(&server, 100);
    config.max_empty_pages = 3;
    config.enrich = false;

    let mut sink = MemorySink::new();
    let stats = Pipeline::new(config)
        .unwrap()
        .run_into_sink(&mut sink)
        .await
        .unwrap();
    assert_eq!(stats, RunStats::default());
    assert!(sink.is_empty());
}

#[tokio::test]
async fn unreachable_first_page_is_fatal() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/survey/"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let mut pipeline = Pipeline::new(test_config(&server, 10)).unwrap();
    match pipeline.next_record().await {
        Err(PipelineError::FirstPageUnavailable(_)) => {}
        other => panic!("expected FirstPageUnavailable, got {:?}", other.map(|_| ())),
    }
}

#[tokio::test]
async fn later_page_failure_keeps_partial_results() {
    let server = MockServer::start().await;
    let rows = entry_rows("/survey/result/77", "UCLA", "Fall 2026");
    mount_listing(&server, 1, listing_page(&rows)).await;
    // Page 2 is unmocked and 404s: the run ends early, keeping page 1's record.

    let mut config = test_config(&server, 100);
    config.enrich = false;

    let mut sink = MemorySink::new();
    let stats = Pipeline::new(config)
        .unwrap()
        .run_into_sink(&mut sink)
        .await
        .unwrap();
    assert_eq!(stats.inserted, 1);
    assert_eq!(sink.len(), 1);
}

#[tokio::test]
async fn unidentifiable_records_are_counted_not_yielded() {
    let server = MockServer::start().await;
    let rows = format!(
        "{}{}{}",
        entry_rows("/survey/result/41", "MIT", "Fall 2026"),
        // Permalink present but with no numeric id segment.
        entry_rows("/survey/result/abc", "Ghost University", "Fall 2026"),
        // No result anchor at all.
        "<tr><td>Linkless University</td><td><span>CS</span></td><td>d</td><td>Rejected</td>\
         <td><a href=\"/survey/index\">x</a></td></tr>\
         <tr><td colspan=\"5\">Fall 2026</td></tr>",
    );
    mount_listing(&server, 1, listing_page(&rows)).await;
    mount_listing(&server, 2, empty_listing()).await;

    let mut config = test_config(&server, 10);
    config.enrich = false;

    let mut sink = MemorySink::new();
    let mut pipeline = Pipeline::new(config).unwrap();
    let stats = pipeline.run_into_sink(&mut sink).await.unwrap();

    assert_eq!(stats.inserted, 1);
    assert_eq!(stats.skipped_invalid, 2);
    assert_eq!(sink.len(), 1);
}

#[tokio::test]
async fn limit_stops_pagination() {
    let server = MockServer::start().await;
    let rows = format!(
        "{}{}",
        entry_rows("/survey/result/51", "MIT", "Fall 2026"),
        entry_rows("/survey/result/52", "Cornell", "Fall 2026"),
    );
    mount_listing(&server, 1, listing_page(&rows)).await;

    let mut config = test_config(&server, 1);
    config.enrich = false;

    let mut pipeline = Pipeline::new(config).unwrap();
    let record = pipeline.next_record().await.unwrap().expect("one record");
    assert_eq!(record.external_id, 51);
    // Limit of one: the run ends without touching page 2.
    assert!(pipeline.next_record().await.unwrap().is_none());
}

#[tokio::test]
async fn cancellation_stops_between_pages() {
    let server = MockServer::start().await;
    let rows = format!(
        "{}{}",
        entry_rows("/survey/result/61", "MIT", "Fall 2026"),
        entry_rows("/survey/result/62", "Cornell", "Fall 2026"),
    );
    mount_listing(&server, 1, listing_page(&rows)).await;
    Mock::given(method("GET"))
        .and(path("/survey/"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_string(empty_listing()))
        .expect(0)
        .mount(&server)
        .await;

    let mut config = test_config(&server, 100);
    config.enrich = false;

    let cancel = gradcafe_lib::CancelToken::new();
    let mut pipeline = Pipeline::new(config).unwrap().with_cancel_token(cancel.clone());

    let first = pipeline.next_record().await.unwrap().expect("record 61");
    assert_eq!(first.external_id, 61);
    cancel.cancel();

    // Already-buffered records from page 1 still come through; the stop
    // takes effect before the next page fetch.
    let second = pipeline.next_record().await.unwrap().expect("record 62");
    assert_eq!(second.external_id, 62);
    assert!(pipeline.next_record().await.unwrap().is_none());
}

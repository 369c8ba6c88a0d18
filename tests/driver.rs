mod common;

use common::{FakePageSource, Harness};
use meeting_archive::documents::DocumentMirror;
use meeting_archive::driver::{RunDriver, RunSummary};
use meeting_archive::extract::LinkExtractor;
use std::fs;
use std::time::Duration;

const PAGE_1: &str = "https://meetings.example/PublishPage?p=1";
const PAGE_2: &str = "https://meetings.example/PublishPage?p=2";

const HTML_1: &str = r#"
    <html><body>
      <a href="https://storage.sheenomo.live/v/1113.mp4">
        <img alt="November 13, 2025 City Council Regular Meeting at 6:00 PM">
      </a>
      <a href="https://storage.sheenomo.live/v/1113.mp4">Watch</a>
      <a href="https://storage.sheenomo.live/v/1023.mp4">
        <img alt="October 23, 2025 Planning Commission at 5:30 PM">
      </a>
      <a href="/adaHtmlDocument/index?id=1">
        <img alt="HTML Agenda for November 13, 2025 City Council Regular Meeting at 6:00 PM">
      </a>
      <a href="https://elsewhere.example/video.mp4"><img alt="Not ours"></a>
    </body></html>
"#;

const HTML_2: &str = r#"
    <html><body>
      <a href="https://storage.sheenomo.live/v/0901.mp4">
        <img alt="Sept. 1, 2025 Budget Workshop at 10:00 AM">
      </a>
    </body></html>
"#;

fn driver(harness: &Harness, source: FakePageSource, pages: &[&str]) -> RunDriver {
    RunDriver::new(
        Box::new(source),
        LinkExtractor::new("storage.sheenomo.live"),
        harness.pipeline(),
        pages.iter().map(|p| p.to_string()).collect(),
    )
}

#[tokio::test]
async fn test_run_processes_every_record_once() {
    let harness = Harness::new();
    let source = FakePageSource::default()
        .with_page(PAGE_1, HTML_1)
        .with_page(PAGE_2, HTML_2);

    let summary = driver(&harness, source, &[PAGE_1, PAGE_2])
        .run()
        .await
        .unwrap();

    assert_eq!(
        summary,
        RunSummary {
            pages_fetched: 2,
            pages_failed: 0,
            records: 3,
            completed: 3,
            already_done: 0,
            failed: 0,
            chunks_backfilled: 0,
        }
    );
    assert_eq!(harness.counters.downloads.get(), 3);

    let names = harness.file_names(&harness.layout.transcript_dir);
    assert!(names.contains(&"2025-11-13T1800_City_Council_Regular_Meeting.txt".to_string()));
    assert!(names.contains(&"2025-10-23T1730_Planning_Commission.txt".to_string()));
    assert!(names.contains(&"2025-09-01T1000_Budget_Workshop.txt".to_string()));
}

#[tokio::test]
async fn test_rerun_is_a_no_op() {
    let harness = Harness::new();
    let pages = [PAGE_1, PAGE_2];
    let source = || {
        FakePageSource::default()
            .with_page(PAGE_1, HTML_1)
            .with_page(PAGE_2, HTML_2)
    };

    driver(&harness, source(), &pages).run().await.unwrap();
    let before = harness.file_names(&harness.layout.transcript_dir);

    let summary = driver(&harness, source(), &pages).run().await.unwrap();

    assert_eq!(summary.already_done, 3);
    assert_eq!(summary.completed, 0);
    assert_eq!(harness.counters.downloads.get(), 3);
    assert_eq!(harness.counters.transcribes.get(), 3);
    assert_eq!(harness.file_names(&harness.layout.transcript_dir), before);
}

#[tokio::test]
async fn test_failed_page_is_skipped() {
    let harness = Harness::new();
    let source = FakePageSource::default().with_page(PAGE_2, HTML_2);

    let summary = driver(&harness, source, &[PAGE_1, PAGE_2])
        .run()
        .await
        .unwrap();

    assert_eq!(summary.pages_failed, 1);
    assert_eq!(summary.pages_fetched, 1);
    assert_eq!(summary.completed, 1);
}

#[tokio::test]
async fn test_run_chunks_transcripts_left_without_chunks() {
    let harness = Harness::new();
    let transcripts = &harness.layout.transcript_dir;
    let id = "2025-11-13T1800_City_Council_Regular_Meeting";
    fs::write(transcripts.join(format!("{id}.txt")), "motion to adjourn carried").unwrap();
    let html = r#"<a href="https://storage.sheenomo.live/v/1113.mp4">
        <img alt="November 13, 2025 City Council Regular Meeting at 6:00 PM"></a>"#;
    let source = FakePageSource::default().with_page(PAGE_1, html);

    let summary = driver(&harness, source, &[PAGE_1]).run().await.unwrap();

    assert_eq!(summary.already_done, 1);
    assert_eq!(summary.chunks_backfilled, 1);
    assert_eq!(harness.counters.transcribes.get(), 0);
    assert_eq!(
        fs::read_to_string(transcripts.join(format!("{id}_chunk_1.txt"))).unwrap(),
        "motion to"
    );
    assert_eq!(
        fs::read_to_string(transcripts.join(format!("{id}_chunk_2.txt"))).unwrap(),
        "adjourn carried"
    );
}

#[tokio::test]
async fn test_all_pages_failing_is_fatal() {
    let harness = Harness::new();

    let result = driver(&harness, FakePageSource::default(), &[PAGE_1, PAGE_2])
        .run()
        .await;

    assert!(result.is_err());
    assert_eq!(harness.counters.downloads.get(), 0);
}

#[tokio::test]
async fn test_record_failure_does_not_stop_run() {
    let mut harness = Harness::new();
    harness.download_fail_on = Some("1023".to_string());
    let source = FakePageSource::default()
        .with_page(PAGE_1, HTML_1)
        .with_page(PAGE_2, HTML_2);

    let summary = driver(&harness, source, &[PAGE_1, PAGE_2])
        .run()
        .await
        .unwrap();

    assert_eq!(summary.failed, 1);
    assert_eq!(summary.completed, 2);
}

#[tokio::test]
async fn test_run_creates_storage_directories() {
    let harness = Harness::new();
    fs::remove_dir_all(&harness.layout.media_dir).unwrap();
    fs::remove_dir_all(&harness.layout.transcript_dir).unwrap();
    let source = FakePageSource::default().with_page(PAGE_2, HTML_2);

    driver(&harness, source, &[PAGE_2]).run().await.unwrap();

    assert!(harness.layout.media_dir.is_dir());
    assert!(harness
        .layout
        .transcript_dir
        .join("2025-09-01T1000_Budget_Workshop.txt")
        .is_file());
}

#[tokio::test]
async fn test_documents_mirror_saves_and_combines() {
    let harness = Harness::new();
    let docs = harness.dir.path().join("scraped_content");
    let combined = harness.dir.path().join("combined.txt");
    let agenda_url = "https://meetings.example/adaHtmlDocument/index?id=1";
    let source = FakePageSource::default()
        .with_page(PAGE_1, HTML_1)
        .with_page(
            agenda_url,
            "<html><body><nav>Menu</nav><p>1. Call to order</p></body></html>",
        );
    let requested = source.requested.clone();

    let mirror = DocumentMirror::new(Box::new(source), &docs, &combined, PAGE_1)
        .with_pause(Duration::ZERO);
    let summary = mirror.run(&[PAGE_1.to_string()]).await.unwrap();

    assert_eq!(summary.links, 1);
    assert_eq!(summary.saved, 1);
    assert_eq!(summary.combined, 1);
    let saved = fs::read_to_string(
        docs.join("2025-11-13T1800_City_Council_Regular_Meeting_agenda.txt"),
    )
    .unwrap();
    assert!(saved.starts_with("DOCUMENT TYPE: HTML Agenda\n"));
    assert!(saved.contains("1. Call to order"));
    assert!(!saved.contains("Menu"));
    assert!(fs::read_to_string(&combined).unwrap().contains("1. Call to order"));

    // Second pass finds the file already saved and does not fetch it again.
    let second = DocumentMirror::new(
        Box::new(FakePageSource::default().with_page(PAGE_1, HTML_1)),
        &docs,
        &combined,
        PAGE_1,
    )
    .with_pause(Duration::ZERO);
    let summary = second.run(&[PAGE_1.to_string()]).await.unwrap();
    assert_eq!(summary.existing, 1);
    assert_eq!(summary.saved, 0);
    assert_eq!(requested.lock().unwrap().len(), 2);
}

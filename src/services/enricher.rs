//! Enrichment run: pagination, resolution, write-back, aggregation
//!
//! Walks every requested library's series listing page by page, resolves a
//! missing ASIN for each book it encounters, pushes resolved identifiers
//! back to the origin server, and accumulates the two output views. Fully
//! sequential: one library, one page, one series, one book at a time.

use crate::models::rows::{NO_POSITION, NO_SUBTITLE, UNKNOWN_ASIN, UNKNOWN_SERIES, UNKNOWN_TITLE};
use crate::models::{AllAsinRow, Book, FirstAsinRow, LibraryRef, Series};
use crate::services::asin_cache::AsinCache;
use crate::services::asin_resolver::{AsinLookup, AsinResolver};
use crate::services::media_server::{MediaServer, UpstreamError};

/// Hard ceiling on pages fetched per library, in case the upstream keeps
/// returning non-empty pages without honoring its own reported total
const MAX_PAGES_PER_LIBRARY: u64 = 10_000;

/// The two aggregated views over the enriched series data
#[derive(Debug, Default)]
pub struct EnrichmentOutput {
    pub series_first_asin: Vec<FirstAsinRow>,
    pub series_all_asin: Vec<AllAsinRow>,
}

/// Pagination cursor for one library's series listing
///
/// The total is captured from the first page that reports one and never
/// overwritten. A listing that never reports a total stops after its first
/// page; an empty page always stops.
struct PageCursor {
    page: u64,
    total: Option<u64>,
}

impl PageCursor {
    fn new() -> Self {
        Self {
            page: 0,
            total: None,
        }
    }

    fn observe_total(&mut self, reported: Option<u64>) {
        if self.total.is_none() {
            self.total = reported;
        }
    }

    fn advance(&mut self) {
        self.page += 1;
    }

    fn finished(&self, rows_produced: u64, last_page_empty: bool) -> bool {
        if last_page_empty || self.page >= MAX_PAGES_PER_LIBRARY {
            return true;
        }
        match self.total {
            Some(total) => rows_produced >= total,
            None => true,
        }
    }
}

/// Sequential enrichment over borrowed transports
pub struct Enricher<'a> {
    media: &'a dyn MediaServer,
    lookup: &'a dyn AsinLookup,
    resolver: &'a AsinResolver,
}

impl<'a> Enricher<'a> {
    pub fn new(
        media: &'a dyn MediaServer,
        lookup: &'a dyn AsinLookup,
        resolver: &'a AsinResolver,
    ) -> Self {
        Self {
            media,
            lookup,
            resolver,
        }
    }

    /// Run the full enrichment for a set of libraries
    ///
    /// Any page-fetch failure aborts the whole run; per-book lookup and
    /// write-back failures are absorbed.
    pub async fn run(
        &self,
        cache: &mut AsinCache,
        server_url: &str,
        token: &str,
        libraries: &[LibraryRef],
    ) -> Result<EnrichmentOutput, UpstreamError> {
        let mut output = EnrichmentOutput::default();

        for library in libraries {
            let library_id = match library.id.as_deref() {
                Some(id) if !id.is_empty() => id,
                _ => continue,
            };

            let rows_at_start = output.series_first_asin.len() as u64;
            let mut cursor = PageCursor::new();

            loop {
                let page = self
                    .media
                    .fetch_series_page(server_url, token, library_id, cursor.page)
                    .await?;
                cursor.observe_total(page.total);

                let page_empty = page.results.is_empty();
                for series in page.results {
                    self.process_series(cache, server_url, token, series, &mut output)
                        .await;
                }

                cursor.advance();
                let produced = output.series_first_asin.len() as u64 - rows_at_start;
                if cursor.finished(produced, page_empty) {
                    break;
                }
            }

            tracing::info!(
                library_id = %library_id,
                pages = cursor.page,
                series = output.series_first_asin.len() as u64 - rows_at_start,
                "Library enrichment complete"
            );
        }

        Ok(output)
    }

    /// Resolve and write back missing ASINs for one series, then append its
    /// rows to both output views
    async fn process_series(
        &self,
        cache: &mut AsinCache,
        server_url: &str,
        token: &str,
        mut series: Series,
        output: &mut EnrichmentOutput,
    ) {
        let series_name = series
            .name
            .clone()
            .unwrap_or_else(|| UNKNOWN_SERIES.to_string());

        for book in series.books.iter_mut() {
            let meta = &book.media.metadata;
            if !meta.asin_missing() {
                continue;
            }
            let title = match meta.title.as_deref() {
                Some(title) if !title.is_empty() => title.to_string(),
                _ => continue,
            };
            let author = meta.author_name.clone().unwrap_or_default();

            let resolved = self
                .resolver
                .resolve(cache, self.lookup, &title, &author)
                .await;
            if let Some(asin) = resolved {
                // The output reflects the resolved value even when the
                // write-back does not take effect server-side.
                book.media.metadata.asin = Some(asin.clone());
                if let Some(item_id) = book.id.as_deref() {
                    self.media
                        .write_back_asin(server_url, token, item_id, &asin)
                        .await;
                }
            }
        }

        // Aggregation reads post-resolution values
        if let Some(first) = series.books.first() {
            output
                .series_first_asin
                .push(first_asin_row(&series_name, first));
        }
        for book in &series.books {
            output.series_all_asin.push(all_asin_row(&series_name, book));
        }
    }
}

fn first_asin_row(series_name: &str, book: &Book) -> FirstAsinRow {
    let meta = &book.media.metadata;
    FirstAsinRow {
        series: series_name.to_string(),
        title: meta.title.clone().unwrap_or_else(|| UNKNOWN_TITLE.to_string()),
        asin: meta.asin.clone().unwrap_or_else(|| UNKNOWN_ASIN.to_string()),
    }
}

fn all_asin_row(series_name: &str, book: &Book) -> AllAsinRow {
    let meta = &book.media.metadata;
    AllAsinRow {
        series: series_name.to_string(),
        title: meta.title.clone().unwrap_or_else(|| UNKNOWN_TITLE.to_string()),
        asin: meta.asin.clone().unwrap_or_else(|| UNKNOWN_ASIN.to_string()),
        subtitle: meta
            .subtitle
            .clone()
            .unwrap_or_else(|| NO_SUBTITLE.to_string()),
        series_position: series_position(meta.series_name.as_deref()),
    }
}

/// Position of a book within its series, from the book's own series-name
/// metadata: the substring after the first `#`, trimmed. No `#` (or no
/// series name at all) yields the "N/A" sentinel.
fn series_position(series_name: Option<&str>) -> String {
    match series_name.and_then(|name| name.split_once('#')) {
        Some((_, position)) => position.trim().to_string(),
        None => NO_POSITION.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BookMetadata, Media, SeriesPage};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// Scripted origin server: pages keyed by (library, page number)
    struct FakeMediaServer {
        pages: HashMap<(String, u64), Result<SeriesPage, (u16, String)>>,
        fetches: AtomicUsize,
        write_backs: Mutex<Vec<(String, String)>>,
        accept_write_backs: bool,
    }

    impl FakeMediaServer {
        fn new() -> Self {
            Self {
                pages: HashMap::new(),
                fetches: AtomicUsize::new(0),
                write_backs: Mutex::new(Vec::new()),
                accept_write_backs: true,
            }
        }

        fn with_page(mut self, library_id: &str, page: u64, result: SeriesPage) -> Self {
            self.pages.insert((library_id.to_string(), page), Ok(result));
            self
        }

        fn with_failure(mut self, library_id: &str, page: u64, status: u16, body: &str) -> Self {
            self.pages
                .insert((library_id.to_string(), page), Err((status, body.to_string())));
            self
        }

        fn rejecting_write_backs(mut self) -> Self {
            self.accept_write_backs = false;
            self
        }

        fn fetch_count(&self) -> usize {
            self.fetches.load(Ordering::SeqCst)
        }

        fn recorded_write_backs(&self) -> Vec<(String, String)> {
            self.write_backs.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl MediaServer for FakeMediaServer {
        async fn fetch_series_page(
            &self,
            _server_url: &str,
            _token: &str,
            library_id: &str,
            page: u64,
        ) -> Result<SeriesPage, UpstreamError> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            match self.pages.get(&(library_id.to_string(), page)) {
                Some(Ok(page)) => Ok(page.clone()),
                Some(Err((status, body))) => Err(UpstreamError::Status {
                    status: *status,
                    body: body.clone(),
                    library_id: library_id.to_string(),
                    page,
                }),
                None => Ok(SeriesPage::default()),
            }
        }

        async fn write_back_asin(
            &self,
            _server_url: &str,
            _token: &str,
            item_id: &str,
            asin: &str,
        ) -> bool {
            self.write_backs
                .lock()
                .unwrap()
                .push((item_id.to_string(), asin.to_string()));
            self.accept_write_backs
        }
    }

    /// Catalog fake returning the same body for every query
    struct FakeLookup {
        body: String,
        calls: AtomicUsize,
    }

    impl FakeLookup {
        fn returning(body: &str) -> Self {
            Self {
                body: body.to_string(),
                calls: AtomicUsize::new(0),
            }
        }

        fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl AsinLookup for FakeLookup {
        async fn search(
            &self,
            _query: &str,
        ) -> Result<String, crate::services::asin_resolver::LookupError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.body.clone())
        }
    }

    fn book(id: &str, title: &str, author: &str, asin: Option<&str>, series_name: Option<&str>) -> Book {
        Book {
            id: Some(id.to_string()),
            media: Media {
                metadata: BookMetadata {
                    title: Some(title.to_string()),
                    author_name: Some(author.to_string()),
                    asin: asin.map(str::to_string),
                    subtitle: None,
                    series_name: series_name.map(str::to_string),
                },
            },
        }
    }

    fn series(name: &str, books: Vec<Book>) -> Series {
        Series {
            name: Some(name.to_string()),
            books,
        }
    }

    fn libraries(ids: &[&str]) -> Vec<LibraryRef> {
        ids.iter()
            .map(|id| LibraryRef {
                id: Some(id.to_string()),
            })
            .collect()
    }

    fn test_cache(dir: &TempDir) -> AsinCache {
        AsinCache::load(&dir.path().join("asin_cache.json"))
    }

    fn numbered_series(start: usize, count: usize) -> Vec<Series> {
        (start..start + count)
            .map(|n| {
                series(
                    &format!("Series {}", n),
                    vec![book(
                        &format!("li_{}", n),
                        &format!("Book {}", n),
                        "A. Writer",
                        Some("B0EXISTING"),
                        None,
                    )],
                )
            })
            .collect()
    }

    #[test]
    fn series_position_extracts_after_hash() {
        assert_eq!(series_position(Some("Fooverse #3")), "3");
        assert_eq!(series_position(Some("Fooverse # 3.5 ")), "3.5");
        assert_eq!(series_position(Some("Fooverse")), "N/A");
        assert_eq!(series_position(None), "N/A");
    }

    #[tokio::test]
    async fn resolves_writes_back_and_aggregates() {
        let dir = TempDir::new().unwrap();
        let mut cache = test_cache(&dir);

        let page = SeriesPage {
            results: vec![series(
                "Fooverse",
                vec![book("li_1", "Foo", "A. Writer", None, Some("Fooverse #3"))],
            )],
            total: Some(1),
        };
        let media = FakeMediaServer::new().with_page("lib_1", 0, page);
        let lookup = FakeLookup::returning(r#"<li data-asin="B0ABCDEFGH">"#);
        let resolver = AsinResolver::new(0);

        let output = Enricher::new(&media, &lookup, &resolver)
            .run(&mut cache, "http://abs", "tok", &libraries(&["lib_1"]))
            .await
            .unwrap();

        assert_eq!(
            media.recorded_write_backs(),
            vec![("li_1".to_string(), "B0ABCDEFGH".to_string())]
        );
        assert_eq!(cache.len(), 1);
        assert_eq!(
            output.series_first_asin,
            vec![FirstAsinRow {
                series: "Fooverse".to_string(),
                title: "Foo".to_string(),
                asin: "B0ABCDEFGH".to_string(),
            }]
        );
        assert_eq!(
            output.series_all_asin,
            vec![AllAsinRow {
                series: "Fooverse".to_string(),
                title: "Foo".to_string(),
                asin: "B0ABCDEFGH".to_string(),
                subtitle: "No Subtitle".to_string(),
                series_position: "3".to_string(),
            }]
        );
    }

    #[tokio::test]
    async fn warm_cache_skips_catalog_entirely() {
        let dir = TempDir::new().unwrap();
        let cache_path = dir.path().join("asin_cache.json");

        let page = SeriesPage {
            results: vec![series(
                "Fooverse",
                vec![book("li_1", "Foo", "A. Writer", None, None)],
            )],
            total: Some(1),
        };
        let lookup = FakeLookup::returning(r#"data-asin="B0ABCDEFGH""#);
        let resolver = AsinResolver::new(0);

        let first = {
            let media = FakeMediaServer::new().with_page("lib_1", 0, page.clone());
            let mut cache = AsinCache::load(&cache_path);
            Enricher::new(&media, &lookup, &resolver)
                .run(&mut cache, "http://abs", "tok", &libraries(&["lib_1"]))
                .await
                .unwrap()
        };
        assert_eq!(lookup.call_count(), 1);

        // Second run against the persisted cache: identical output, no
        // further catalog traffic.
        let media = FakeMediaServer::new().with_page("lib_1", 0, page);
        let mut cache = AsinCache::load(&cache_path);
        let second = Enricher::new(&media, &lookup, &resolver)
            .run(&mut cache, "http://abs", "tok", &libraries(&["lib_1"]))
            .await
            .unwrap();

        assert_eq!(lookup.call_count(), 1);
        assert_eq!(second.series_first_asin, first.series_first_asin);
        assert_eq!(second.series_all_asin, first.series_all_asin);
    }

    #[tokio::test]
    async fn existing_asin_never_hits_resolver() {
        let dir = TempDir::new().unwrap();
        let mut cache = test_cache(&dir);

        let page = SeriesPage {
            results: vec![series(
                "Fooverse",
                vec![book("li_1", "Foo", "A. Writer", Some("B0EXISTING"), None)],
            )],
            total: Some(1),
        };
        let media = FakeMediaServer::new().with_page("lib_1", 0, page);
        let lookup = FakeLookup::returning(r#"data-asin="B0ABCDEFGH""#);
        let resolver = AsinResolver::new(0);

        Enricher::new(&media, &lookup, &resolver)
            .run(&mut cache, "http://abs", "tok", &libraries(&["lib_1"]))
            .await
            .unwrap();

        assert_eq!(lookup.call_count(), 0);
        assert!(media.recorded_write_backs().is_empty());
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn no_match_yields_sentinel_and_negative_cache() {
        let dir = TempDir::new().unwrap();
        let mut cache = test_cache(&dir);

        let page = SeriesPage {
            results: vec![series(
                "Fooverse",
                vec![book("li_1", "Foo", "A. Writer", None, None)],
            )],
            total: Some(1),
        };
        let media = FakeMediaServer::new().with_page("lib_1", 0, page);
        let lookup = FakeLookup::returning("<html>nothing here</html>");
        let resolver = AsinResolver::new(0);

        let output = Enricher::new(&media, &lookup, &resolver)
            .run(&mut cache, "http://abs", "tok", &libraries(&["lib_1"]))
            .await
            .unwrap();

        assert_eq!(output.series_first_asin[0].asin, "Unknown ASIN");
        assert_eq!(output.series_all_asin[0].asin, "Unknown ASIN");
        assert!(media.recorded_write_backs().is_empty());
        assert_eq!(cache.len(), 1);
        assert_eq!(
            cache.lookup("Foo", "A. Writer"),
            Some(crate::services::asin_cache::CacheHit::NoMatch)
        );
    }

    #[tokio::test]
    async fn pagination_fetches_ceil_of_total_over_limit() {
        let dir = TempDir::new().unwrap();
        let mut cache = test_cache(&dir);

        // 45 series: pages of 20, 20, 5
        let media = FakeMediaServer::new()
            .with_page(
                "lib_1",
                0,
                SeriesPage {
                    results: numbered_series(0, 20),
                    total: Some(45),
                },
            )
            .with_page(
                "lib_1",
                1,
                SeriesPage {
                    results: numbered_series(20, 20),
                    total: Some(45),
                },
            )
            .with_page(
                "lib_1",
                2,
                SeriesPage {
                    results: numbered_series(40, 5),
                    total: Some(45),
                },
            );
        let lookup = FakeLookup::returning("");
        let resolver = AsinResolver::new(0);

        let output = Enricher::new(&media, &lookup, &resolver)
            .run(&mut cache, "http://abs", "tok", &libraries(&["lib_1"]))
            .await
            .unwrap();

        assert_eq!(media.fetch_count(), 3);
        assert_eq!(output.series_first_asin.len(), 45);
        assert_eq!(output.series_all_asin.len(), 45);
    }

    #[tokio::test]
    async fn missing_total_stops_after_first_page() {
        let dir = TempDir::new().unwrap();
        let mut cache = test_cache(&dir);

        let media = FakeMediaServer::new().with_page(
            "lib_1",
            0,
            SeriesPage {
                results: numbered_series(0, 20),
                total: None,
            },
        );
        let lookup = FakeLookup::returning("");
        let resolver = AsinResolver::new(0);

        let output = Enricher::new(&media, &lookup, &resolver)
            .run(&mut cache, "http://abs", "tok", &libraries(&["lib_1"]))
            .await
            .unwrap();

        assert_eq!(media.fetch_count(), 1);
        assert_eq!(output.series_first_asin.len(), 20);
    }

    #[tokio::test]
    async fn bookless_series_terminates_on_empty_page() {
        let dir = TempDir::new().unwrap();
        let mut cache = test_cache(&dir);

        // One bookless series: it produces no first row, so the reported
        // total can never be reached; the empty follow-up page must stop
        // the loop.
        let media = FakeMediaServer::new().with_page(
            "lib_1",
            0,
            SeriesPage {
                results: vec![series("Empty", vec![])],
                total: Some(1),
            },
        );
        let lookup = FakeLookup::returning("");
        let resolver = AsinResolver::new(0);

        let output = Enricher::new(&media, &lookup, &resolver)
            .run(&mut cache, "http://abs", "tok", &libraries(&["lib_1"]))
            .await
            .unwrap();

        assert_eq!(media.fetch_count(), 2);
        assert!(output.series_first_asin.is_empty());
        assert!(output.series_all_asin.is_empty());
    }

    #[tokio::test]
    async fn upstream_failure_aborts_with_raw_body() {
        let dir = TempDir::new().unwrap();
        let mut cache = test_cache(&dir);

        let media = FakeMediaServer::new().with_failure("lib_1", 0, 503, "maintenance window");
        let lookup = FakeLookup::returning("");
        let resolver = AsinResolver::new(0);

        let err = Enricher::new(&media, &lookup, &resolver)
            .run(&mut cache, "http://abs", "tok", &libraries(&["lib_1"]))
            .await
            .unwrap_err();

        match err {
            UpstreamError::Status {
                status,
                body,
                library_id,
                page,
            } => {
                assert_eq!(status, 503);
                assert_eq!(body, "maintenance window");
                assert_eq!(library_id, "lib_1");
                assert_eq!(page, 0);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn rejected_write_back_keeps_local_value() {
        let dir = TempDir::new().unwrap();
        let mut cache = test_cache(&dir);

        let page = SeriesPage {
            results: vec![series(
                "Fooverse",
                vec![book("li_1", "Foo", "A. Writer", None, None)],
            )],
            total: Some(1),
        };
        let media = FakeMediaServer::new()
            .with_page("lib_1", 0, page)
            .rejecting_write_backs();
        let lookup = FakeLookup::returning(r#"data-asin="B0ABCDEFGH""#);
        let resolver = AsinResolver::new(0);

        let output = Enricher::new(&media, &lookup, &resolver)
            .run(&mut cache, "http://abs", "tok", &libraries(&["lib_1"]))
            .await
            .unwrap();

        assert_eq!(output.series_first_asin[0].asin, "B0ABCDEFGH");
    }

    #[tokio::test]
    async fn libraries_without_id_are_skipped() {
        let dir = TempDir::new().unwrap();
        let mut cache = test_cache(&dir);

        let media = FakeMediaServer::new();
        let lookup = FakeLookup::returning("");
        let resolver = AsinResolver::new(0);

        let libs = vec![
            LibraryRef { id: None },
            LibraryRef {
                id: Some(String::new()),
            },
        ];
        let output = Enricher::new(&media, &lookup, &resolver)
            .run(&mut cache, "http://abs", "tok", &libs)
            .await
            .unwrap();

        assert_eq!(media.fetch_count(), 0);
        assert!(output.series_first_asin.is_empty());
    }
}

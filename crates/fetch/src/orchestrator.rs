//! Concurrent detail fetching over a bounded pool.
//!
//! One task per book, at most `workers` in flight. Results are collected in
//! completion order; a failed book is logged and reported, never fatal.

use std::collections::BTreeMap;
use std::sync::Arc;

use harvest_core::BookRecord;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

use crate::detail::DetailFetcher;
use crate::error::{Error, Result};

/// Input position of a book and what its task produced.
type Outcome = (usize, Result<BookRecord>);

/// A book whose detail could not be fetched.
#[derive(Debug)]
pub struct DetailFailure {
    /// The record as discovered in the listing, without detail.
    pub book: BookRecord,
    pub error: Error,
}

/// Outcome of a detail batch. `books` is in completion order.
#[derive(Debug, Default)]
pub struct DetailReport {
    pub books: Vec<BookRecord>,
    pub failures: Vec<DetailFailure>,
}

impl DetailReport {
    /// Succeeded books, plus the failed ones without detail when `keep_failed`.
    pub fn into_books(self, keep_failed: bool) -> Vec<BookRecord> {
        let mut books = self.books;
        if keep_failed {
            books.extend(self.failures.into_iter().map(|f| f.book));
        }
        books
    }

    fn fail(&mut self, book: BookRecord, error: Error) {
        warn!(url = %book.url, title = %book.title, error = %error, "Abandoning book");
        self.failures.push(DetailFailure { book, error });
    }
}

/// Fetch the detail of every book with at most `workers` requests in flight.
///
/// A `workers` of zero is treated as one.
pub async fn fetch_details(
    fetcher: &DetailFetcher,
    books: Vec<BookRecord>,
    workers: usize,
) -> DetailReport {
    let workers = workers.max(1);
    let total = books.len();
    info!(total, workers, "Fetching book details");

    let permits = Arc::new(Semaphore::new(workers));
    let mut pending = BTreeMap::new();
    let mut tasks = JoinSet::new();

    for (index, book) in books.into_iter().enumerate() {
        pending.insert(index, book.clone());
        tasks.spawn(fetch_one(fetcher.clone(), Arc::clone(&permits), index, book));
    }

    let report = collect(tasks, pending).await;
    info!(
        total,
        fetched = report.books.len(),
        failed = report.failures.len(),
        "Detail fetch complete"
    );
    report
}

async fn fetch_one(
    fetcher: DetailFetcher,
    permits: Arc<Semaphore>,
    index: usize,
    book: BookRecord,
) -> Outcome {
    let Ok(_permit) = permits.acquire_owned().await else {
        return (index, Err(Error::task_aborted(book.url, "worker pool closed")));
    };
    (index, fetcher.fetch(book).await)
}

/// Drain `tasks`; any book still in `pending` afterwards never got a result.
async fn collect(
    mut tasks: JoinSet<Outcome>,
    mut pending: BTreeMap<usize, BookRecord>,
) -> DetailReport {
    let mut report = DetailReport::default();

    while let Some(joined) = tasks.join_next().await {
        let (index, result) = match joined {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(error = %e, "Detail task did not complete");
                continue;
            }
        };
        let Some(book) = pending.remove(&index) else {
            continue;
        };
        match result {
            Ok(detailed) => report.books.push(detailed),
            Err(e) => report.fail(book, e),
        }
    }

    for book in pending.into_values() {
        let error = Error::task_aborted(book.url.as_str(), "task panicked or was cancelled");
        report.fail(book, error);
    }
    report
}

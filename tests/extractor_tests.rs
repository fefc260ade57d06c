mod common;

use common::*;
use historical_backfill::counts::{count_by_date, CountLedger};
use historical_backfill::extract::Extractor;
use historical_backfill::query_builder::{LiteralRangeQuery, RangeQueryBuilder};
use historical_backfill::windowing::Interval;

fn january() -> Interval {
    Interval::new(date(2023, 1, 1), date(2023, 2, 1)).unwrap()
}

#[tokio::test]
async fn test_extract_returns_rows_in_window_and_releases_connection() {
    let table = orders_table(&[(date(2023, 1, 3), 2), (date(2023, 2, 3), 5)]);
    let provider = provider_for(table);
    let query = LiteralRangeQuery.build("orders", "created_at", january(), None);

    let batch = Extractor.run(&provider, &query).await.unwrap();

    assert_eq!(batch.row_count(), 2);
    assert_eq!(batch.columns(), ["id", "created_at", "amount"]);
    assert_eq!(provider.source.acquired(), 1);
    assert_eq!(provider.source.closed(), 1);
}

#[tokio::test]
async fn test_extract_zero_rows_yields_empty_batch() {
    let provider = provider_for(orders_table(&[(date(2023, 5, 1), 1)]));
    let query = LiteralRangeQuery.build("orders", "created_at", january(), None);

    let batch = Extractor.run(&provider, &query).await.unwrap();

    assert!(batch.is_empty());
    assert!(batch.columns().is_empty());
    assert_eq!(provider.source.closed(), 1);
}

#[tokio::test]
async fn test_query_failure_still_closes_connection() {
    let provider = InMemoryProvider::new(
        InMemorySource::new(orders_table(&[(date(2023, 1, 3), 1)]), "created_at")
            .failing_on_query(1),
    );
    let query = LiteralRangeQuery.build("orders", "created_at", january(), None);

    let err = Extractor.run(&provider, &query).await.unwrap_err();

    assert_eq!(err.kind(), "extraction");
    assert_eq!(provider.source.acquired(), 1);
    assert_eq!(provider.source.closed(), 1);
}

#[tokio::test]
async fn test_acquire_failure_is_a_connection_error() {
    let query = LiteralRangeQuery.build("orders", "created_at", january(), None);
    let err = Extractor.run(&UnreachableProvider, &query).await.unwrap_err();
    assert_eq!(err.kind(), "connection");
}

#[tokio::test]
async fn test_row_totals_match_reference_filter() {
    let days = [
        (date(2022, 12, 31), 4),
        (date(2023, 1, 1), 1),
        (date(2023, 1, 15), 7),
        (date(2023, 1, 31), 2),
        (date(2023, 2, 1), 3),
    ];
    let provider = provider_for(orders_table(&days));
    let query = LiteralRangeQuery.build("orders", "created_at", january(), None);

    let batch = Extractor.run(&provider, &query).await.unwrap();
    let reference: usize = days
        .iter()
        .filter(|(day, _)| january().contains(*day))
        .map(|(_, n)| n)
        .sum();
    assert_eq!(batch.row_count(), reference);

    let mut ledger = CountLedger::new();
    ledger.merge(&count_by_date(&batch, "created_at").unwrap());
    assert_eq!(ledger.total(), reference as u64);
    assert_eq!(ledger.get(date(2023, 1, 15)), Some(7));
}

use bigdecimal::BigDecimal;
use bullion_console::db::RecordStore;
use bullion_console::export::{pdf, xlsx, ExportFormat, TableLayout};
use bullion_console::models::{
    ExchangeFields, Field, FilterCriteria, Numeric, RecordKind, RecordPayload, SaleFields, StoreRef,
    TokenFields, TransactionRecord,
};
use bullion_console::service::aggregator::TotalValue;
use bullion_console::service::{dispatch_queue, ExportSource, StoreNotificationChannel, WebhookMessenger};
use bullion_console::{AppConfig, MemoryStore, ReportService};
use chrono::{NaiveDate, TimeZone, Utc};
use std::sync::Arc;

const STORE: &str = "store-1";

fn service(store: Arc<MemoryStore>) -> ReportService {
    let channel = Arc::new(StoreNotificationChannel::new(WebhookMessenger::new(None), store.clone()));
    let (dispatcher, _worker, _rx) = dispatch_queue(channel, 16);
    ReportService::new(store.clone(), store.clone(), store, dispatcher, AppConfig::default())
}

fn sale(id: &str, date: &str, amount: i64) -> TransactionRecord {
    TransactionRecord {
        id: id.to_string(),
        store_id: STORE.to_string(),
        date: date.to_string(),
        created_at: None,
        payload: RecordPayload::Sale(SaleFields {
            sale_type: Some("Retail".to_string()),
            amount: Some(Numeric::from(amount)),
            payment_type: Some("Cash".to_string()),
            employee: Some("Ravi".to_string()),
            ..Default::default()
        }),
    }
}

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 4, 20).unwrap()
}

async fn seeded_sales() -> (Arc<MemoryStore>, ReportService) {
    let store = Arc::new(MemoryStore::new());
    let service = service(store.clone());
    let now = Utc.with_ymd_and_hms(2024, 4, 20, 10, 0, 0).unwrap();
    for record in [
        sale("s1", "01/03/2024", 100),
        sale("s2", "15/03/2024", 200),
        sale("s3", "02/04/2024", 50),
    ] {
        service.record_transaction(record, now).await.unwrap();
    }
    (store, service)
}

fn march() -> FilterCriteria {
    FilterCriteria {
        month: "3-2024".parse().unwrap(),
        ..FilterCriteria::all()
    }
}

#[tokio::test]
async fn march_sales_sum_to_three_hundred() {
    let (_store, service) = seeded_sales().await;

    let page = service.query(STORE, RecordKind::Sale, &march(), today()).await.unwrap();

    let ids: Vec<_> = page.records.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec!["s1", "s2"]);
    assert_eq!(page.summary.record_count, 2);
    assert_eq!(page.summary.sums[&Field::Amount], BigDecimal::from(300));
    assert_eq!(page.category_totals["Retail"], BigDecimal::from(300));
}

#[tokio::test]
async fn spreadsheet_pdf_and_csv_totals_agree() {
    let (_store, service) = seeded_sales().await;
    let page = service.query(STORE, RecordKind::Sale, &march(), today()).await.unwrap();
    let layout = TableLayout::for_records(&page.records, &page.columns);

    let sheet_total = xlsx::plan(&layout, "Sale Report", "Store: Main")
        .cells
        .into_iter()
        .find_map(|c| match c.value {
            xlsx::CellValue::Decimal(text) => Some(text),
            _ => None,
        })
        .unwrap();

    let pages = pdf::plan(&layout, "Sale Report", "20/04/2024");
    let pdf_texts: Vec<_> = pages.last().unwrap().texts().map(str::to_string).collect();
    let label = pdf_texts.iter().position(|t| t == "TOTAL:").unwrap();

    assert_eq!(sheet_total, "300.00");
    assert_eq!(pdf_texts[label + 1], sheet_total);

    let store = StoreRef::new(STORE, "Main");
    let csv = service
        .export(&store, ExportSource::Kind(RecordKind::Sale), ExportFormat::Csv, &march(), today())
        .await
        .unwrap();
    let text = String::from_utf8(csv.bytes).unwrap();
    assert!(text.contains("TOTAL:,300.00"));
    assert_eq!(csv.file_name, "sale_report_20240420.csv");
}

#[tokio::test]
async fn binary_exports_render() {
    let (_store, service) = seeded_sales().await;
    let store = StoreRef::new(STORE, "Main");

    let sheet = service
        .export(&store, ExportSource::Kind(RecordKind::Sale), ExportFormat::Xlsx, &march(), today())
        .await
        .unwrap();
    assert_eq!(&sheet.bytes[..2], b"PK");

    let doc = service
        .export(&store, ExportSource::Kind(RecordKind::Sale), ExportFormat::Pdf, &march(), today())
        .await
        .unwrap();
    assert!(doc.bytes.starts_with(b"%PDF"));
    assert_eq!(doc.content_type, "application/pdf");
}

#[tokio::test]
async fn combined_view_interleaves_tokens_and_exchanges() {
    let store = Arc::new(MemoryStore::new());
    let service = service(store.clone());
    let created = Utc.with_ymd_and_hms(2024, 4, 1, 0, 0, 0).unwrap();

    let token = |id: &str, date: &str, fine: &str| TransactionRecord {
        id: id.to_string(),
        store_id: STORE.to_string(),
        date: date.to_string(),
        created_at: Some(created),
        payload: RecordPayload::Token(TokenFields {
            name: Some("Anil".to_string()),
            fine: Some(Numeric::from(fine)),
            ..Default::default()
        }),
    };
    let exchange = |id: &str, date: &str, fine: &str| TransactionRecord {
        id: id.to_string(),
        store_id: STORE.to_string(),
        date: date.to_string(),
        created_at: Some(created),
        payload: RecordPayload::Exchange(ExchangeFields {
            name: Some("Bina".to_string()),
            fine: Some(Numeric::from(fine)),
            ..Default::default()
        }),
    };

    store.insert(&token("t1", "03/04/2024", "1.5")).await.unwrap();
    store.insert(&token("t2", "01/04/2024", "2")).await.unwrap();
    store.insert(&exchange("e1", "02/04/2024", "4g")).await.unwrap();

    let view = service.combined(STORE, None, &FilterCriteria::all(), today()).await.unwrap();

    let order: Vec<_> = view.rows.iter().map(|r| (r.origin, r.record.id.as_str())).collect();
    assert_eq!(
        order,
        vec![
            (RecordKind::Token, "t1"),
            (RecordKind::Exchange, "e1"),
            (RecordKind::Token, "t2"),
        ]
    );
    assert_eq!(
        view.grand_total.values[&Field::Fine],
        TotalValue::Sum("7.5".parse().unwrap())
    );
    assert_eq!(view.grand_total.values[&Field::Name], TotalValue::Distinct(2));
    assert_eq!(view.totals_a.label, "Token Total");
}

#[tokio::test]
async fn missing_index_still_returns_newest_first() {
    let store = Arc::new(MemoryStore::new());
    let service = service(store.clone());

    for (id, day) in [("a", Some(1)), ("b", None), ("c", Some(3)), ("d", Some(2))] {
        let mut record = sale(id, "10/03/2024", 10);
        record.created_at = day.map(|d| Utc.with_ymd_and_hms(2024, 3, d, 0, 0, 0).unwrap());
        store.insert(&record).await.unwrap();
    }
    store.drop_index(RecordKind::Sale);

    let page = service
        .query(STORE, RecordKind::Sale, &FilterCriteria::all(), today())
        .await
        .unwrap();
    let ids: Vec<_> = page.records.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec!["c", "d", "a", "b"]);
}

#[tokio::test]
async fn backend_failure_propagates_from_query() {
    let (store, service) = seeded_sales().await;
    store.fail_kind(RecordKind::Sale);

    let result = service.query(STORE, RecordKind::Sale, &march(), today()).await;
    assert!(result.is_err());
}

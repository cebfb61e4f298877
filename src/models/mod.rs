pub mod criteria;
pub mod ledger;
pub mod notification;
pub mod numeric;
pub mod record;

pub use criteria::{CategoryFilter, FilterCriteria, MonthFilter, ReportSessionState};
pub use ledger::ReserveLedgerEntry;
pub use notification::{InAppNotification, Priority, StoreRef};
pub use numeric::{format_2dp, parse_number, Numeric};
pub use record::{
    CashMovementFields, ExchangeFields, Field, FieldShape, FieldValue, OrderFields,
    PurchaseFields, RecordKind, RecordPayload, SaleFields, TokenFields, TransactionRecord,
};

use bigdecimal::{BigDecimal, Zero};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// 储备台账 (每个门店 + 储备类型一行, 合并更新, 不参与数据清理)
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReserveLedgerEntry {
    pub store_id: String,
    pub reserve_type: String,
    pub available_in_grams: BigDecimal,
    pub added_in_grams: BigDecimal,
    pub total_in_grams: BigDecimal,
    pub updated_at: DateTime<Utc>,
}

impl ReserveLedgerEntry {
    /// 合并一次审批通过的入库:
    /// 首次 available = 0; 之后把上次的 total 计入 available, added 记为本次克数
    pub fn merge_addition(
        existing: Option<&ReserveLedgerEntry>,
        store_id: &str,
        reserve_type: &str,
        added: BigDecimal,
        now: DateTime<Utc>,
    ) -> ReserveLedgerEntry {
        let available = existing
            .map(|e| e.total_in_grams.clone())
            .unwrap_or_else(BigDecimal::zero);
        let total = &available + &added;

        ReserveLedgerEntry {
            store_id: store_id.to_string(),
            reserve_type: reserve_type.to_string(),
            available_in_grams: available,
            added_in_grams: added,
            total_in_grams: total,
            updated_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_addition_creates_entry() {
        let e = ReserveLedgerEntry::merge_addition(None, "s1", "gold", BigDecimal::from(50), Utc::now());
        assert_eq!(e.available_in_grams, BigDecimal::zero());
        assert_eq!(e.total_in_grams, BigDecimal::from(50));
    }

    #[test]
    fn later_additions_fold_previous_total() {
        let first = ReserveLedgerEntry::merge_addition(None, "s1", "gold", BigDecimal::from(50), Utc::now());
        let second = ReserveLedgerEntry::merge_addition(Some(&first), "s1", "gold", BigDecimal::from(20), Utc::now());
        assert_eq!(second.available_in_grams, BigDecimal::from(50));
        assert_eq!(second.added_in_grams, BigDecimal::from(20));
        assert_eq!(
            second.total_in_grams,
            &second.available_in_grams + &second.added_in_grams
        );
    }
}

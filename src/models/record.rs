use super::numeric::Numeric;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

/// 记录类别 (每种对应一个集合/表)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RecordKind {
    Token,
    Exchange,
    Purchase,
    Sale,
    CashMovement,
    Order,
}

impl RecordKind {
    pub const ALL: [RecordKind; 6] = [
        RecordKind::Token,
        RecordKind::Exchange,
        RecordKind::Purchase,
        RecordKind::Sale,
        RecordKind::CashMovement,
        RecordKind::Order,
    ];

    /// 集合名 (Postgres 表名)
    pub fn collection(&self) -> &'static str {
        match self {
            RecordKind::Token => "tokens",
            RecordKind::Exchange => "exchanges",
            RecordKind::Purchase => "purchases",
            RecordKind::Sale => "sales",
            RecordKind::CashMovement => "cash_movements",
            RecordKind::Order => "orders",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            RecordKind::Token => "Token",
            RecordKind::Exchange => "Exchange",
            RecordKind::Purchase => "Purchase",
            RecordKind::Sale => "Sale",
            RecordKind::CashMovement => "Cash",
            RecordKind::Order => "Order",
        }
    }

    /// 报表默认列
    pub fn default_columns(&self) -> Vec<Field> {
        use Field::*;
        match self {
            RecordKind::Token => vec![Date, TokenNo, Name, Type, Weight, Touch, Less, Fine, Amount, Change, Employee],
            RecordKind::Exchange => vec![Date, TokenNo, Name, Type, Weight, Touch, Less, Fine, Employee],
            RecordKind::Purchase => vec![Date, MainType, SubType, Source, Weight, Touch, Less, Fine, Rate, Amount, PaymentType, Employee],
            RecordKind::Sale => vec![Date, SaleType, Type, Weight, Touch, Fine, Rate, Amount, PaymentType, Employee],
            RecordKind::CashMovement => vec![Date, CashMode, Purpose, PaymentType, Amount, Employee],
            RecordKind::Order => vec![Date, Name, Type, Weight, PaymentType, Amount, Employee],
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for RecordKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "token" | "tokens" => Ok(RecordKind::Token),
            "exchange" | "exchanges" => Ok(RecordKind::Exchange),
            "purchase" | "purchases" => Ok(RecordKind::Purchase),
            "sale" | "sales" => Ok(RecordKind::Sale),
            "cash" | "cashmovement" | "cash_movements" => Ok(RecordKind::CashMovement),
            "order" | "orders" => Ok(RecordKind::Order),
            other => Err(format!("unknown record kind: {}", other)),
        }
    }
}

/// 字段值的形态: 数值字段参与求和, 文本字段统计去重数量
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldShape {
    Numeric,
    Text,
}

/// 所有记录字段 (导出列 / 汇总字段)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Field {
    Date,
    TokenNo,
    Name,
    Type,
    Source,
    MainType,
    SubType,
    SaleType,
    CashMode,
    Purpose,
    Weight,
    Touch,
    Less,
    Fine,
    Rate,
    Amount,
    Change,
    PaymentType,
    Employee,
}

impl Field {
    pub const ALL: [Field; 19] = [
        Field::Date,
        Field::TokenNo,
        Field::Name,
        Field::Type,
        Field::Source,
        Field::MainType,
        Field::SubType,
        Field::SaleType,
        Field::CashMode,
        Field::Purpose,
        Field::Weight,
        Field::Touch,
        Field::Less,
        Field::Fine,
        Field::Rate,
        Field::Amount,
        Field::Change,
        Field::PaymentType,
        Field::Employee,
    ];

    pub fn shape(&self) -> FieldShape {
        match self {
            Field::Weight
            | Field::Touch
            | Field::Less
            | Field::Fine
            | Field::Rate
            | Field::Amount
            | Field::Change => FieldShape::Numeric,
            _ => FieldShape::Text,
        }
    }

    pub fn is_numeric(&self) -> bool {
        self.shape() == FieldShape::Numeric
    }

    /// 表头文字
    pub fn header(&self) -> &'static str {
        match self {
            Field::Date => "Date",
            Field::TokenNo => "Token No",
            Field::Name => "Name",
            Field::Type => "Type",
            Field::Source => "Source",
            Field::MainType => "Main Type",
            Field::SubType => "Sub Type",
            Field::SaleType => "Sale Type",
            Field::CashMode => "Mode",
            Field::Purpose => "Purpose",
            Field::Weight => "Weight",
            Field::Touch => "Touch",
            Field::Less => "Less",
            Field::Fine => "Fine",
            Field::Rate => "Rate",
            Field::Amount => "Amount",
            Field::Change => "Change",
            Field::PaymentType => "Payment",
            Field::Employee => "Employee",
        }
    }
}

/// 单个字段的取值
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue<'a> {
    Text(&'a str),
    Number(&'a Numeric),
}

impl FieldValue<'_> {
    pub fn display(&self) -> String {
        match self {
            FieldValue::Text(s) => s.to_string(),
            FieldValue::Number(n) => n.to_string(),
        }
    }
}

fn value_text(value: serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::Null => None,
        serde_json::Value::String(s) => Some(s),
        other => Some(other.to_string()),
    }
}

/// 文本字段宽松解码: 旧数据中的数字 / 布尔值按字符串保留
fn lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(value_text(serde_json::Value::deserialize(deserializer)?))
}

fn lenient_date<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(lenient_text(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenFields {
    #[serde(default, deserialize_with = "lenient_text")]
    pub token_no: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub name: Option<String>,
    #[serde(default, rename = "type", deserialize_with = "lenient_text")]
    pub metal_type: Option<String>,
    #[serde(default)]
    pub weight: Option<Numeric>,
    #[serde(default)]
    pub touch: Option<Numeric>,
    #[serde(default)]
    pub less: Option<Numeric>,
    #[serde(default)]
    pub fine: Option<Numeric>,
    #[serde(default)]
    pub amount: Option<Numeric>,
    #[serde(default)]
    pub change: Option<Numeric>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub employee: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExchangeFields {
    #[serde(default, deserialize_with = "lenient_text")]
    pub token_no: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub name: Option<String>,
    #[serde(default, rename = "type", deserialize_with = "lenient_text")]
    pub metal_type: Option<String>,
    #[serde(default)]
    pub weight: Option<Numeric>,
    #[serde(default)]
    pub touch: Option<Numeric>,
    #[serde(default)]
    pub less: Option<Numeric>,
    #[serde(default)]
    pub fine: Option<Numeric>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub employee: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseFields {
    #[serde(default, deserialize_with = "lenient_text")]
    pub main_type: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub sub_type: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub source: Option<String>,
    #[serde(default)]
    pub weight: Option<Numeric>,
    #[serde(default)]
    pub touch: Option<Numeric>,
    #[serde(default)]
    pub less: Option<Numeric>,
    #[serde(default)]
    pub fine: Option<Numeric>,
    #[serde(default)]
    pub rate: Option<Numeric>,
    #[serde(default)]
    pub amount: Option<Numeric>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub payment_type: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub employee: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaleFields {
    #[serde(default, deserialize_with = "lenient_text")]
    pub sale_type: Option<String>,
    #[serde(default, rename = "type", deserialize_with = "lenient_text")]
    pub metal_type: Option<String>,
    #[serde(default)]
    pub weight: Option<Numeric>,
    #[serde(default)]
    pub touch: Option<Numeric>,
    #[serde(default)]
    pub fine: Option<Numeric>,
    #[serde(default)]
    pub rate: Option<Numeric>,
    #[serde(default)]
    pub amount: Option<Numeric>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub payment_type: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub employee: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CashMovementFields {
    #[serde(default, deserialize_with = "lenient_text")]
    pub cash_mode: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub purpose: Option<String>,
    #[serde(default)]
    pub amount: Option<Numeric>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub payment_type: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub employee: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderFields {
    #[serde(default, deserialize_with = "lenient_text")]
    pub name: Option<String>,
    #[serde(default, rename = "type", deserialize_with = "lenient_text")]
    pub metal_type: Option<String>,
    #[serde(default)]
    pub weight: Option<Numeric>,
    #[serde(default)]
    pub amount: Option<Numeric>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub payment_type: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub employee: Option<String>,
}

/// 按类别区分的字段载荷
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum RecordPayload {
    Token(TokenFields),
    Exchange(ExchangeFields),
    Purchase(PurchaseFields),
    Sale(SaleFields),
    CashMovement(CashMovementFields),
    Order(OrderFields),
}

/// 交易记录 (公共字段 + 类别载荷)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRecord {
    pub id: String,
    pub store_id: String,
    /// 原始日期字符串 (D/M/YYYY 或 M/D/YYYY 或 ISO)
    #[serde(default, deserialize_with = "lenient_date")]
    pub date: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub payload: RecordPayload,
}

fn text(v: &Option<String>) -> Option<FieldValue<'_>> {
    v.as_deref().map(FieldValue::Text)
}

fn num(v: &Option<Numeric>) -> Option<FieldValue<'_>> {
    v.as_ref().map(FieldValue::Number)
}

impl TransactionRecord {
    pub fn kind(&self) -> RecordKind {
        match &self.payload {
            RecordPayload::Token(_) => RecordKind::Token,
            RecordPayload::Exchange(_) => RecordKind::Exchange,
            RecordPayload::Purchase(_) => RecordKind::Purchase,
            RecordPayload::Sale(_) => RecordKind::Sale,
            RecordPayload::CashMovement(_) => RecordKind::CashMovement,
            RecordPayload::Order(_) => RecordKind::Order,
        }
    }

    /// 读取字段, 该类别没有此字段时返回 None
    pub fn field(&self, field: Field) -> Option<FieldValue<'_>> {
        if field == Field::Date {
            return Some(FieldValue::Text(&self.date));
        }

        match &self.payload {
            RecordPayload::Token(p) => match field {
                Field::TokenNo => text(&p.token_no),
                Field::Name => text(&p.name),
                Field::Type => text(&p.metal_type),
                Field::Weight => num(&p.weight),
                Field::Touch => num(&p.touch),
                Field::Less => num(&p.less),
                Field::Fine => num(&p.fine),
                Field::Amount => num(&p.amount),
                Field::Change => num(&p.change),
                Field::Employee => text(&p.employee),
                _ => None,
            },
            RecordPayload::Exchange(p) => match field {
                Field::TokenNo => text(&p.token_no),
                Field::Name => text(&p.name),
                Field::Type => text(&p.metal_type),
                Field::Weight => num(&p.weight),
                Field::Touch => num(&p.touch),
                Field::Less => num(&p.less),
                Field::Fine => num(&p.fine),
                Field::Employee => text(&p.employee),
                _ => None,
            },
            RecordPayload::Purchase(p) => match field {
                Field::MainType => text(&p.main_type),
                Field::SubType => text(&p.sub_type),
                Field::Source => text(&p.source),
                Field::Weight => num(&p.weight),
                Field::Touch => num(&p.touch),
                Field::Less => num(&p.less),
                Field::Fine => num(&p.fine),
                Field::Rate => num(&p.rate),
                Field::Amount => num(&p.amount),
                Field::PaymentType => text(&p.payment_type),
                Field::Employee => text(&p.employee),
                _ => None,
            },
            RecordPayload::Sale(p) => match field {
                Field::SaleType => text(&p.sale_type),
                Field::Type => text(&p.metal_type),
                Field::Weight => num(&p.weight),
                Field::Touch => num(&p.touch),
                Field::Fine => num(&p.fine),
                Field::Rate => num(&p.rate),
                Field::Amount => num(&p.amount),
                Field::PaymentType => text(&p.payment_type),
                Field::Employee => text(&p.employee),
                _ => None,
            },
            RecordPayload::CashMovement(p) => match field {
                Field::CashMode => text(&p.cash_mode),
                Field::Purpose => text(&p.purpose),
                Field::Amount => num(&p.amount),
                Field::PaymentType => text(&p.payment_type),
                Field::Employee => text(&p.employee),
                _ => None,
            },
            RecordPayload::Order(p) => match field {
                Field::Name => text(&p.name),
                Field::Type => text(&p.metal_type),
                Field::Weight => num(&p.weight),
                Field::Amount => num(&p.amount),
                Field::PaymentType => text(&p.payment_type),
                Field::Employee => text(&p.employee),
                _ => None,
            },
        }
    }

    /// 类型筛选所用的分类字段
    pub fn type_category(&self) -> Option<&str> {
        match &self.payload {
            RecordPayload::Token(p) => p.metal_type.as_deref(),
            RecordPayload::Exchange(p) => p.metal_type.as_deref(),
            RecordPayload::Purchase(p) => p.main_type.as_deref(),
            RecordPayload::Sale(p) => p.sale_type.as_deref(),
            RecordPayload::CashMovement(p) => p.cash_mode.as_deref(),
            RecordPayload::Order(p) => p.metal_type.as_deref(),
        }
    }

    /// 来源筛选所用的分类字段
    pub fn source_category(&self) -> Option<&str> {
        match &self.payload {
            RecordPayload::Purchase(p) => p.source.as_deref(),
            RecordPayload::Sale(p) => p.payment_type.as_deref(),
            RecordPayload::CashMovement(p) => p.payment_type.as_deref(),
            RecordPayload::Token(_) | RecordPayload::Exchange(_) | RecordPayload::Order(_) => None,
        }
    }

    /// 全字段拼接 (用于关键字搜索)
    pub fn search_text(&self) -> String {
        let mut parts = vec![self.id.clone(), self.store_id.clone()];
        parts.extend(Field::ALL.iter().filter_map(|f| self.field(*f)).map(|v| v.display()));
        parts.join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sale() -> TransactionRecord {
        TransactionRecord {
            id: "s1".to_string(),
            store_id: "store-1".to_string(),
            date: "01/03/2024".to_string(),
            created_at: None,
            payload: RecordPayload::Sale(SaleFields {
                sale_type: Some("Retail".to_string()),
                metal_type: Some("Gold".to_string()),
                amount: Some(Numeric::from("100")),
                payment_type: Some("Cash".to_string()),
                ..Default::default()
            }),
        }
    }

    #[test]
    fn reads_kind_specific_fields() {
        let r = sale();
        assert_eq!(r.kind(), RecordKind::Sale);
        assert_eq!(r.field(Field::SaleType), Some(FieldValue::Text("Retail")));
        assert_eq!(r.field(Field::TokenNo), None);
        assert_eq!(r.type_category(), Some("Retail"));
        assert_eq!(r.source_category(), Some("Cash"));
    }

    #[test]
    fn deserializes_stored_document_shape() {
        let json = r#"{
            "id": "t9",
            "storeId": "store-2",
            "date": "15/03/2024",
            "kind": "Token",
            "tokenNo": "T-12",
            "type": "Silver",
            "amount": 250,
            "weight": "10.5"
        }"#;
        let r: TransactionRecord = serde_json::from_str(json).unwrap();
        assert_eq!(r.kind(), RecordKind::Token);
        assert_eq!(r.created_at, None);
        assert_eq!(r.type_category(), Some("Silver"));
        assert_eq!(r.field(Field::Weight).map(|v| v.display()), Some("10.5".to_string()));
    }

    #[test]
    fn numeric_text_fields_decode_as_strings() {
        let json = r#"{"id":"t1","storeId":"s1","date":"01/03/2024","kind":"Token","tokenNo":12,"name":null}"#;
        let r: TransactionRecord = serde_json::from_str(json).unwrap();
        assert_eq!(r.field(Field::TokenNo), Some(FieldValue::Text("12")));
        assert_eq!(r.field(Field::Name), None);
    }

    #[test]
    fn malformed_amount_is_kept_and_sums_as_zero() {
        let json = r#"{"id":"s9","storeId":"s1","date":20240301,"kind":"Sale","amount":true,"employee":false}"#;
        let r: TransactionRecord = serde_json::from_str(json).unwrap();
        assert_eq!(r.date, "20240301");
        assert_eq!(r.field(Field::Employee), Some(FieldValue::Text("false")));
        match r.field(Field::Amount) {
            Some(FieldValue::Number(n)) => assert_eq!(n.to_decimal(), bigdecimal::BigDecimal::from(0)),
            other => panic!("unexpected amount: {:?}", other),
        }
    }

    #[test]
    fn search_text_covers_every_value() {
        let text = sale().search_text();
        assert!(text.contains("s1"));
        assert!(text.contains("store-1"));
        assert!(text.contains("01/03/2024"));
        assert!(text.contains("Retail"));
        assert!(text.contains("100"));
    }
}

use super::record::RecordKind;
use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// 分类筛选 ("ALL" 或精确值)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum CategoryFilter {
    #[default]
    All,
    Only(String),
}

impl CategoryFilter {
    pub fn matches(&self, value: Option<&str>) -> bool {
        match self {
            CategoryFilter::All => true,
            CategoryFilter::Only(expected) => value == Some(expected.as_str()),
        }
    }
}

impl From<&str> for CategoryFilter {
    fn from(s: &str) -> Self {
        if s.is_empty() || s.eq_ignore_ascii_case("ALL") {
            CategoryFilter::All
        } else {
            CategoryFilter::Only(s.to_string())
        }
    }
}

impl fmt::Display for CategoryFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CategoryFilter::All => f.write_str("ALL"),
            CategoryFilter::Only(v) => f.write_str(v),
        }
    }
}

/// 月份筛选: "ALL" / "LAST_YEAR" / "M-YYYY"
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MonthFilter {
    #[default]
    All,
    LastYear,
    Month { month: u32, year: i32 },
}

impl FromStr for MonthFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() || s.eq_ignore_ascii_case("ALL") {
            return Ok(MonthFilter::All);
        }
        if s.eq_ignore_ascii_case("LAST_YEAR") {
            return Ok(MonthFilter::LastYear);
        }

        let (m, y) = s
            .split_once('-')
            .ok_or_else(|| format!("invalid month key: {}", s))?;
        let month: u32 = m.parse().map_err(|_| format!("invalid month in key: {}", s))?;
        let year: i32 = y.parse().map_err(|_| format!("invalid year in key: {}", s))?;
        if !(1..=12).contains(&month) {
            return Err(format!("month out of range in key: {}", s));
        }
        Ok(MonthFilter::Month { month, year })
    }
}

impl fmt::Display for MonthFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MonthFilter::All => f.write_str("ALL"),
            MonthFilter::LastYear => f.write_str("LAST_YEAR"),
            MonthFilter::Month { month, year } => write!(f, "{}-{}", month, year),
        }
    }
}

impl Serialize for CategoryFilter {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for CategoryFilter {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(CategoryFilter::from(raw.as_str()))
    }
}

impl Serialize for MonthFilter {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for MonthFilter {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// 筛选条件 (纯值对象)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterCriteria {
    #[serde(default)]
    pub search: String,
    #[serde(default, rename = "type")]
    pub type_filter: CategoryFilter,
    #[serde(default, rename = "source")]
    pub source_filter: CategoryFilter,
    #[serde(default)]
    pub month: MonthFilter,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
}

impl FilterCriteria {
    /// 全部放行的默认条件
    pub fn all() -> Self {
        Self::default()
    }

    pub fn is_default(&self) -> bool {
        *self == Self::default()
    }
}

/// 报表会话状态: 编辑中的条件 (staged) 与已生效的条件 (applied)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportSessionState {
    pub store_id: String,
    pub kind: RecordKind,
    pub staged: FilterCriteria,
    pub applied: FilterCriteria,
}

impl ReportSessionState {
    pub fn new(store_id: impl Into<String>, kind: RecordKind) -> Self {
        Self {
            store_id: store_id.into(),
            kind,
            staged: FilterCriteria::all(),
            applied: FilterCriteria::all(),
        }
    }

    /// 修改编辑中的条件, 不影响当前视图
    pub fn stage(self, staged: FilterCriteria) -> Self {
        Self { staged, ..self }
    }

    /// 显式应用: staged -> applied
    pub fn apply(self) -> Self {
        Self {
            applied: self.staged.clone(),
            ..self
        }
    }

    /// 清空两份条件
    pub fn reset(self) -> Self {
        Self {
            staged: FilterCriteria::all(),
            applied: FilterCriteria::all(),
            ..self
        }
    }

    /// 切换记录类别时条件重置
    pub fn switch_kind(self, kind: RecordKind) -> Self {
        Self { kind, ..self }.reset()
    }
}

use bigdecimal::{BigDecimal, Zero};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 数值字段 (可能是 JSON 数字, 也可能是数字样式的字符串)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Numeric {
    Number(serde_json::Number),
    Text(String),
    /// 布尔 / 对象 / 数组等无法识别的值, 汇总时按 0
    Other(serde_json::Value),
}

impl Numeric {
    /// 转换为十进制, 无法解析时按 0 处理 (仅用于汇总, 记录本身保留)
    pub fn to_decimal(&self) -> BigDecimal {
        match self {
            Numeric::Number(n) => BigDecimal::from_str(&n.to_string()).unwrap_or_else(|_| BigDecimal::zero()),
            Numeric::Text(s) => parse_number(s),
            Numeric::Other(_) => BigDecimal::zero(),
        }
    }
}

impl fmt::Display for Numeric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Numeric::Number(n) => write!(f, "{}", n),
            Numeric::Text(s) => f.write_str(s),
            Numeric::Other(v) => write!(f, "{}", v),
        }
    }
}

impl From<i64> for Numeric {
    fn from(v: i64) -> Self {
        Numeric::Number(v.into())
    }
}

impl From<&str> for Numeric {
    fn from(v: &str) -> Self {
        Numeric::Text(v.to_string())
    }
}

/// 取字符串开头的数字部分解析 ("12.5g" -> 12.5, "abc" -> 0)
pub fn parse_number(raw: &str) -> BigDecimal {
    let s = raw.trim();
    let mut end = 0;
    let mut seen_digit = false;
    let mut seen_dot = false;

    for (idx, ch) in s.char_indices() {
        match ch {
            '+' | '-' if idx == 0 => {}
            '0'..='9' => seen_digit = true,
            '.' if !seen_dot => seen_dot = true,
            _ => break,
        }
        end = idx + ch.len_utf8();
    }

    if !seen_digit {
        return BigDecimal::zero();
    }

    let prefix = s[..end].trim_end_matches('.');
    BigDecimal::from_str(prefix).unwrap_or_else(|_| BigDecimal::zero())
}

/// 金额格式化为两位小数
pub fn format_2dp(value: &BigDecimal) -> String {
    value.round(2).with_scale(2).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_numbers_and_numeric_strings() {
        assert_eq!(Numeric::from(100).to_decimal(), BigDecimal::from(100));
        assert_eq!(Numeric::from("200").to_decimal(), BigDecimal::from(200));
        assert_eq!(Numeric::from(" 12.5g ").to_decimal(), BigDecimal::from_str("12.5").unwrap());
        assert_eq!(Numeric::from("-3").to_decimal(), BigDecimal::from(-3));
    }

    #[test]
    fn unparsable_values_count_as_zero() {
        assert_eq!(parse_number(""), BigDecimal::zero());
        assert_eq!(parse_number("abc"), BigDecimal::zero());
        assert_eq!(parse_number("-"), BigDecimal::zero());
        assert_eq!(parse_number("."), BigDecimal::zero());
    }

    #[test]
    fn formats_two_decimals() {
        assert_eq!(format_2dp(&BigDecimal::from(300)), "300.00");
        assert_eq!(format_2dp(&BigDecimal::from_str("12.345").unwrap()), "12.35");
        assert_eq!(format_2dp(&BigDecimal::from_str("0.1").unwrap()), "0.10");
    }

    #[test]
    fn deserializes_either_shape() {
        let n: Numeric = serde_json::from_str("42.5").unwrap();
        assert_eq!(n.to_decimal(), BigDecimal::from_str("42.5").unwrap());
        let t: Numeric = serde_json::from_str("\"42.5\"").unwrap();
        assert_eq!(t, Numeric::Text("42.5".to_string()));
    }

    #[test]
    fn unexpected_json_shapes_are_kept_and_sum_as_zero() {
        let b: Numeric = serde_json::from_str("true").unwrap();
        assert_eq!(b, Numeric::Other(serde_json::Value::Bool(true)));
        assert_eq!(b.to_decimal(), BigDecimal::zero());
        assert_eq!(b.to_string(), "true");

        let o: Numeric = serde_json::from_str(r#"{"value": 3}"#).unwrap();
        assert_eq!(o.to_decimal(), BigDecimal::zero());
    }
}

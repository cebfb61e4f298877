use chrono::{DateTime, NaiveDate, NaiveDateTime};

/// 解析日期字符串
///
/// 依次尝试:
/// 1. `D/M/YYYY` (日在前)
/// 2. `M/D/YYYY` (日在前无效时, 如月份 > 12)
/// 3. ISO (`YYYY-MM-DD`, RFC 3339, `YYYY-MM-DDTHH:MM:SS`)
///
/// 全部失败返回 None。调用方必须把 None 视为"通过筛选" (fail-open)。
/// `05/06/2024` 这类本身有歧义的日期始终按日在前解析。
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    let parts: Vec<&str> = raw.split('/').collect();
    if parts.len() == 3 {
        let nums: Option<Vec<i64>> = parts.iter().map(|p| p.trim().parse::<i64>().ok()).collect();
        if let Some(nums) = nums {
            let (a, b, year) = (nums[0], nums[1], nums[2]);
            if let Some(date) = ymd(year, b, a).or_else(|| ymd(year, a, b)) {
                return Some(date);
            }
        }
    }

    parse_iso(raw)
}

fn ymd(year: i64, month: i64, day: i64) -> Option<NaiveDate> {
    let year = i32::try_from(year).ok()?;
    let month = u32::try_from(month).ok()?;
    let day = u32::try_from(day).ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

fn parse_iso(raw: &str) -> Option<NaiveDate> {
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(date);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.date_naive());
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|dt| dt.date())
}

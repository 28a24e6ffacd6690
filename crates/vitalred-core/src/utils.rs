//! 通用工具函数

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use uuid::Uuid;

use crate::error::{Result, VitalRedError};

/// 生成带前缀的唯一记录ID
pub fn generate_id(prefix: &str) -> String {
    format!("{}_{}", prefix, Uuid::new_v4().simple())
}

/// 解析 `YYYY-MM-DD` 格式的出生日期
pub fn parse_birth_date(value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|e| VitalRedError::validation(format!("Invalid birth date '{}': {}", value, e)))
}

/// 根据出生日期计算周岁
///
/// 比较月、日两个日历分量，今年生日未到则减一岁。出生日期晚于参考日期时返回0。
pub fn calculate_age(birth_date: NaiveDate, today: NaiveDate) -> u32 {
    if birth_date > today {
        return 0;
    }

    let mut age = today.year() - birth_date.year();
    if (today.month(), today.day()) < (birth_date.month(), birth_date.day()) {
        age -= 1;
    }

    age.max(0) as u32
}

/// 以当前UTC日期计算周岁
pub fn age_today(birth_date: NaiveDate) -> u32 {
    calculate_age(birth_date, Utc::now().date_naive())
}

/// 计算BMI: 体重(kg) / 身高(m)²
///
/// 体重或身高非正数时返回 `None`。
pub fn calculate_bmi(weight_kg: f64, height_cm: f64) -> Option<f64> {
    if !(weight_kg > 0.0 && height_cm > 0.0) {
        return None;
    }

    let height_m = height_cm / 100.0;
    Some(weight_kg / (height_m * height_m))
}

/// 四舍五入到两位小数
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// BMI分类 (WHO)
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BmiCategory {
    Underweight,
    Normal,
    Overweight,
    Obese,
}

impl BmiCategory {
    pub fn from_bmi(bmi: f64) -> Self {
        if bmi < 18.5 {
            BmiCategory::Underweight
        } else if bmi < 25.0 {
            BmiCategory::Normal
        } else if bmi < 30.0 {
            BmiCategory::Overweight
        } else {
            BmiCategory::Obese
        }
    }
}

/// 大小写不敏感的子串匹配
pub fn contains_ignore_case(haystack: &str, needle_lower: &str) -> bool {
    haystack.to_lowercase().contains(needle_lower)
}

/// 当前时间
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_calculate_age_before_birthday() {
        assert_eq!(calculate_age(date(2000, 6, 15), date(2024, 6, 14)), 23);
    }

    #[test]
    fn test_calculate_age_on_and_after_birthday() {
        assert_eq!(calculate_age(date(2000, 6, 15), date(2024, 6, 15)), 24);
        assert_eq!(calculate_age(date(2000, 6, 15), date(2024, 12, 31)), 24);
    }

    #[test]
    fn test_calculate_age_future_birth_date() {
        assert_eq!(calculate_age(date(2030, 1, 1), date(2024, 1, 1)), 0);
    }

    #[test]
    fn test_calculate_bmi() {
        let bmi = calculate_bmi(70.0, 175.0).unwrap();
        assert!((bmi - 22.86).abs() < 0.01);
        assert_eq!(round2(bmi), 22.86);
        assert_eq!(BmiCategory::from_bmi(bmi), BmiCategory::Normal);
    }

    #[test]
    fn test_calculate_bmi_invalid_input() {
        assert!(calculate_bmi(70.0, 0.0).is_none());
        assert!(calculate_bmi(-1.0, 170.0).is_none());
        assert!(calculate_bmi(f64::NAN, 170.0).is_none());
    }

    #[test]
    fn test_parse_birth_date() {
        assert_eq!(parse_birth_date("2000-06-15").unwrap(), date(2000, 6, 15));
        assert!(parse_birth_date("15/06/2000").is_err());
    }

    #[test]
    fn test_generate_id() {
        let id = generate_id("pat");
        assert!(id.starts_with("pat_"));
        assert_ne!(id, generate_id("pat"));
    }
}

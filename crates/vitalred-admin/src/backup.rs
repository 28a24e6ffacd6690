//! 数据备份
//!
//! 备份内容就是 `export_data` 的输出，恢复走 `import_data`，
//! 因此备份文件与手动导出文件格式完全一致。

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Datelike, Duration, FixedOffset, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use vitalred_core::VitalRedError;
use vitalred_store::DataStore;

const BACKUP_PREFIX: &str = "vitalred-backup-";

/// 备份频率
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackupFrequency {
    Daily,
    Weekly,
    Monthly,
}

/// 备份计划
///
/// 时刻按 `utc_offset_hours` 所在时区解释；`weekday` 仅用于每周（1=周一），
/// `day_of_month` 仅用于每月，遇到短月份取当月最后一天。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackupSchedule {
    pub frequency: BackupFrequency,
    pub hour: u32,
    pub minute: u32,
    pub weekday: u32,
    pub day_of_month: u32,
    pub utc_offset_hours: i32,
}

impl Default for BackupSchedule {
    fn default() -> Self {
        Self {
            frequency: BackupFrequency::Daily,
            hour: 2,
            minute: 0,
            weekday: 1,
            day_of_month: 1,
            utc_offset_hours: -5,
        }
    }
}

fn days_in_month(year: i32, month: u32) -> u32 {
    let (next_year, next_month) = if month == 12 { (year + 1, 1) } else { (year, month + 1) };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .and_then(|d| d.pred_opt())
        .map(|d| d.day())
        .unwrap_or(28)
}

impl BackupSchedule {
    pub fn validate(&self) -> vitalred_core::Result<()> {
        if self.hour > 23 || self.minute > 59 {
            return Err(VitalRedError::Config(format!(
                "Invalid backup time {:02}:{:02}",
                self.hour, self.minute
            )));
        }
        if !(1..=7).contains(&self.weekday) {
            return Err(VitalRedError::Config(format!(
                "Backup weekday must be 1..=7, got {}",
                self.weekday
            )));
        }
        if !(1..=31).contains(&self.day_of_month) {
            return Err(VitalRedError::Config(format!(
                "Backup day of month must be 1..=31, got {}",
                self.day_of_month
            )));
        }
        if !(-12..=14).contains(&self.utc_offset_hours) {
            return Err(VitalRedError::Config(format!(
                "UTC offset out of range: {}",
                self.utc_offset_hours
            )));
        }
        Ok(())
    }

    fn offset(&self) -> vitalred_core::Result<FixedOffset> {
        FixedOffset::east_opt(self.utc_offset_hours * 3600).ok_or_else(|| {
            VitalRedError::Config(format!("UTC offset out of range: {}", self.utc_offset_hours))
        })
    }

    fn at(&self, offset: &FixedOffset, date: NaiveDate) -> vitalred_core::Result<DateTime<Utc>> {
        let naive = date
            .and_hms_opt(self.hour, self.minute, 0)
            .ok_or_else(|| VitalRedError::Config("Invalid backup time".to_string()))?;
        offset
            .from_local_datetime(&naive)
            .single()
            .map(|dt| dt.with_timezone(&Utc))
            .ok_or_else(|| VitalRedError::Internal("Ambiguous local backup time".to_string()))
    }

    fn monthly_date(&self, year: i32, month: u32) -> vitalred_core::Result<NaiveDate> {
        let day = self.day_of_month.min(days_in_month(year, month));
        NaiveDate::from_ymd_opt(year, month, day)
            .ok_or_else(|| VitalRedError::Internal(format!("Invalid date {}-{}-{}", year, month, day)))
    }

    /// 严格晚于 `now` 的下一次备份时间
    pub fn next_after(&self, now: DateTime<Utc>) -> vitalred_core::Result<DateTime<Utc>> {
        self.validate()?;
        let offset = self.offset()?;
        let today = now.with_timezone(&offset).date_naive();

        match self.frequency {
            BackupFrequency::Daily => {
                let candidate = self.at(&offset, today)?;
                if candidate > now {
                    Ok(candidate)
                } else {
                    self.at(&offset, today + Duration::days(1))
                }
            }
            BackupFrequency::Weekly => {
                let current = today.weekday().number_from_monday();
                let days_ahead = (self.weekday + 7 - current) % 7;
                let candidate = self.at(&offset, today + Duration::days(days_ahead as i64))?;
                if candidate > now {
                    Ok(candidate)
                } else {
                    self.at(&offset, today + Duration::days(days_ahead as i64 + 7))
                }
            }
            BackupFrequency::Monthly => {
                let candidate =
                    self.at(&offset, self.monthly_date(today.year(), today.month())?)?;
                if candidate > now {
                    return Ok(candidate);
                }
                let (year, month) = if today.month() == 12 {
                    (today.year() + 1, 1)
                } else {
                    (today.year(), today.month() + 1)
                };
                self.at(&offset, self.monthly_date(year, month)?)
            }
        }
    }

    /// 自 `last_backup` 以来是否已经错过一次计划
    pub fn is_due(&self, last_backup: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
        match last_backup {
            None => true,
            Some(last) => match self.next_after(last) {
                Ok(next) => next <= now,
                Err(e) => {
                    warn!("Cannot evaluate backup schedule: {}", e);
                    false
                }
            },
        }
    }
}

/// 把当前文档导出到备份目录，返回备份文件路径
pub fn write_backup(store: &DataStore, directory: &Path, now: DateTime<Utc>) -> Result<PathBuf> {
    std::fs::create_dir_all(directory)
        .with_context(|| format!("Failed to create backup directory {}", directory.display()))?;

    let json = store.export_data().context("Failed to export data for backup")?;
    let path = directory.join(format!("{}{}.json", BACKUP_PREFIX, now.format("%Y%m%dT%H%M%SZ")));
    std::fs::write(&path, json)
        .with_context(|| format!("Failed to write backup {}", path.display()))?;

    info!("Backup written to {}", path.display());
    Ok(path)
}

/// 目录中最新的备份文件
pub fn latest_backup(directory: &Path) -> Result<Option<PathBuf>> {
    if !directory.exists() {
        return Ok(None);
    }

    let mut backups = Vec::new();
    for entry in std::fs::read_dir(directory)
        .with_context(|| format!("Failed to read backup directory {}", directory.display()))?
    {
        let path = entry?.path();
        let is_backup = path
            .file_name()
            .and_then(|n| n.to_str())
            .map(|n| n.starts_with(BACKUP_PREFIX) && n.ends_with(".json"))
            .unwrap_or(false);
        if is_backup {
            backups.push(path);
        }
    }

    // 时间戳格式固定，按文件名排序即按时间排序
    backups.sort();
    debug!("Found {} backups in {}", backups.len(), directory.display());
    Ok(backups.pop())
}

/// 从备份文件恢复，失败时存储保持原状
pub fn restore_backup(store: &DataStore, path: &Path) -> Result<()> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read backup {}", path.display()))?;
    if !store.import_data(&json) {
        anyhow::bail!("Backup {} is not a valid data document", path.display());
    }
    info!("Restored data from {}", path.display());
    Ok(())
}

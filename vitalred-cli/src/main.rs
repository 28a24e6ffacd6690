//! VITAL RED 命令行工具
//!
//! 在文件存储上执行统计、搜索、导入导出与备份等维护操作。

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use tracing::{error, info, warn};
use vitalred_admin::{
    init_logging, latest_backup, restore_backup, write_backup, ConfigManager, VitalRedConfig,
};
use vitalred_core::ViewName;
use vitalred_integration::{ApiClient, ProgressPoller};
use vitalred_referral::FormRepository;
use vitalred_store::{DataStore, Language, LanguagePreference, PersistenceAdapter};
use vitalred_views::queries::data_stats;

/// 命令行参数
#[derive(Parser, Debug)]
#[command(name = "vitalred")]
#[command(about = "VITAL RED 临床数据存储维护工具")]
struct Args {
    /// 配置文件路径
    #[arg(short, long)]
    config: Option<String>,

    /// 覆盖配置中的数据目录
    #[arg(short, long)]
    data_dir: Option<String>,

    /// 覆盖配置中的日志级别
    #[arg(short, long)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// 显示记录统计
    Stats {
        /// 以JSON输出
        #[arg(long)]
        json: bool,
    },
    /// 全局搜索
    Search { query: String },
    /// 导出完整数据文档
    Export {
        /// 输出文件，缺省写到标准输出
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// 从JSON文件导入数据文档
    Import { file: PathBuf },
    /// 清空全部数据
    Clear {
        /// 跳过确认
        #[arg(long)]
        yes: bool,
    },
    /// 列出视图及其记录数和最后访问时间
    Views,
    /// 轮询文档提取任务直到结束
    PollExtraction {
        job_id: String,
        /// 轮询间隔（毫秒），缺省取配置
        #[arg(long)]
        interval_ms: Option<u64>,
    },
    /// 立即写一份备份
    Backup,
    /// 从备份恢复，缺省使用最新备份
    Restore { file: Option<PathBuf> },
    /// 显示下一次计划备份时间
    NextBackup,
    /// 查看或设置界面语言
    Language { value: Option<String> },
    /// 显示最近一次提交的转诊表单
    LastReferral,
}

fn open_store(config: &VitalRedConfig) -> Result<DataStore> {
    let backend = config.open_backend()?;
    Ok(DataStore::open(PersistenceAdapter::new(
        backend,
        config.storage.global_key.clone(),
    )))
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let manager = ConfigManager::new(args.config.as_deref())?;
    let mut config = manager.get_config().await;
    if let Some(data_dir) = args.data_dir {
        config.storage.data_dir = data_dir;
    }
    if let Some(level) = args.log_level {
        config.logging.level = level;
    }

    // 初始化日志
    init_logging(&config.logging)?;

    if let Err(e) = run(args.command, &config).await {
        error!("命令执行失败: {:#}", e);
        return Err(e);
    }
    Ok(())
}

async fn run(command: Command, config: &VitalRedConfig) -> Result<()> {
    match command {
        Command::Stats { json } => {
            let store = open_store(config)?;
            let stats = data_stats(&store.get_data());
            let analytics = store.get_analytics();

            if json {
                println!("{}", serde_json::to_string_pretty(&stats)?);
                return Ok(());
            }

            println!("总记录数: {}", stats.total_records);
            println!("数据完整: {}", analytics.data_integrity);
            println!("最后更新: {}", analytics.last_updated.to_rfc3339());
            for (collection, count) in &stats.collection_counts {
                println!("  {:<24} {}", collection.as_str(), count);
            }
            println!("活动急诊: {}", stats.active_emergencies);
            println!("床位 占用/空闲: {}/{}", stats.occupied_beds, stats.available_beds);
            println!("低库存物品: {}", stats.low_stock_items);
            println!("待处理入院申请: {}", stats.pending_admissions);
        }
        Command::Search { query } => {
            let store = open_store(config)?;
            let results = store.search(&query);
            if results.is_empty() {
                println!("没有匹配 '{}' 的记录", query);
                return Ok(());
            }

            for patient in &results.patients {
                println!("[patient] {} {} ({})", patient.id, patient.full_name, patient.identification_number);
            }
            for medication in &results.medications {
                println!("[medication] {} {} {}", medication.id, medication.name, medication.dosage);
            }
            for appointment in &results.appointments {
                println!("[appointment] {} {} {}", appointment.id, appointment.doctor_name, appointment.reason);
            }
            for lab_test in &results.lab_tests {
                println!("[lab_test] {} {}", lab_test.id, lab_test.test_type);
            }
            for emergency in &results.emergencies {
                println!("[emergency] {} {} {}", emergency.id, emergency.code, emergency.location);
            }
            println!("共 {} 条结果", results.total());
        }
        Command::Export { output } => {
            let store = open_store(config)?;
            let json = store.export_data()?;
            match output {
                Some(path) => {
                    std::fs::write(&path, json)
                        .with_context(|| format!("Failed to write {}", path.display()))?;
                    info!("Exported data to {}", path.display());
                }
                None => println!("{}", json),
            }
        }
        Command::Import { file } => {
            let store = open_store(config)?;
            let json = std::fs::read_to_string(&file)
                .with_context(|| format!("Failed to read {}", file.display()))?;
            if !store.import_data(&json) {
                anyhow::bail!("{} is not a valid data document", file.display());
            }
            println!("导入完成，共 {} 条记录", store.get_analytics().total_records);
        }
        Command::Clear { yes } => {
            if !yes {
                anyhow::bail!("Refusing to clear all data without --yes");
            }
            let store = open_store(config)?;
            store.clear_all_data();
            warn!("All data cleared");
        }
        Command::Views => {
            let store = open_store(config)?;
            let document = store.get_data();
            for view in ViewName::ALL {
                let accessed = document
                    .metadata
                    .views_last_accessed
                    .get(&view)
                    .map(|at| at.to_rfc3339())
                    .unwrap_or_else(|| "-".to_string());
                println!(
                    "{:<24} {:>6}  {}",
                    view.as_str(),
                    document.view_data.len_of(view),
                    accessed
                );
            }
        }
        Command::PollExtraction { job_id, interval_ms } => {
            let client = ApiClient::new(config.api_client_config())?;
            let interval = interval_ms
                .map(Duration::from_millis)
                .unwrap_or_else(|| config.poll_interval());

            let poller = ProgressPoller::new(Arc::new(client))
                .with_interval(interval)
                .with_max_failures(config.integration.max_poll_failures);
            let handle = poller.start(job_id.clone(), |progress| {
                println!(
                    "{} {:?} {}% {}",
                    progress.job_id,
                    progress.status,
                    progress.progress,
                    progress.message.as_deref().unwrap_or("")
                );
            });

            match handle.wait().await {
                Some(progress) => info!("Job {} ended with {:?}", job_id, progress.status),
                None => anyhow::bail!("Polling for job {} stopped before completion", job_id),
            }
        }
        Command::Backup => {
            let store = open_store(config)?;
            let path = write_backup(&store, Path::new(&config.backup.directory), Utc::now())?;
            println!("{}", path.display());
        }
        Command::Restore { file } => {
            let path = match file {
                Some(path) => path,
                None => latest_backup(Path::new(&config.backup.directory))?
                    .context("No backups found")?,
            };
            let store = open_store(config)?;
            restore_backup(&store, &path)?;
            println!("已从 {} 恢复", path.display());
        }
        Command::NextBackup => {
            let next = config.backup.schedule.next_after(Utc::now())?;
            if !config.backup.enabled {
                warn!("Automatic backups are disabled");
            }
            println!("{}", next.to_rfc3339());
        }
        Command::LastReferral => {
            let repository = FormRepository::with_key(
                config.open_backend()?,
                config.storage.referral_form_key.clone(),
            );
            match repository.load() {
                Some(submission) => println!("{}", serde_json::to_string_pretty(&submission)?),
                None => println!("没有已提交的转诊表单"),
            }
        }
        Command::Language { value } => {
            let preference = LanguagePreference::new(config.open_backend()?);
            match value {
                Some(value) => {
                    let language: Language = value.parse()?;
                    preference.set(language)?;
                    println!("{}", language);
                }
                None => println!("{}", preference.get()),
            }
        }
    }

    Ok(())
}

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{info, warn};

use question_pipeline::clients::AlocClient;
use question_pipeline::config::Config;
use question_pipeline::infrastructure::RateLimiter;
use question_pipeline::models::loaders::load_all_seed_files;
use question_pipeline::orchestrator::BackfillScheduler;
use question_pipeline::services::QuestionStore;
use question_pipeline::utils::logging;

#[tokio::main]
async fn main() -> Result<()> {
    // 初始化日志
    logging::init();

    // 加载配置
    let config = Config::from_env();
    logging::log_startup(
        config.backfill_start_year,
        config.backfill_end_year,
        config.backfill_delay_ms,
    );

    // 加载题库快照
    let store = Arc::new(
        QuestionStore::load(&config.store_snapshot_path)
            .await
            .context("加载题库快照失败")?,
    );

    // 导入种子题目（给空库时的生成层提供模板）
    let seeds = load_all_seed_files(&config.seed_folder)
        .await
        .context("加载种子题目失败")?;
    if !seeds.is_empty() {
        let (inserted, duplicates) = store.insert_many(seeds).await;
        info!("🌱 种子题目导入: 新增 {} 条, 重复 {} 条", inserted, duplicates);
    }

    // Ctrl+C -> 置位取消标志, 调度器在下一次外部调用前收尾
    let cancel = Arc::new(AtomicBool::new(false));
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("🛑 收到 Ctrl+C, 将在当前调用完成后停止");
                cancel.store(true, Ordering::Relaxed);
            }
        });
    }

    // 全进程共享的限速器和题源客户端
    let limiter = Arc::new(RateLimiter::fixed_interval(config.backfill_delay_ms));
    let source = Arc::new(AlocClient::new(&config, limiter).context("创建题源客户端失败")?);

    // 执行回填
    let scheduler = BackfillScheduler::new(&config, source, store.clone(), cancel);
    let report = scheduler
        .run(config.backfill_start_year, config.backfill_end_year)
        .await;

    // 写回快照
    store.flush().await.context("写入题库快照失败")?;
    info!(
        "📦 题库当前共有 {} 道题目 (本轮新增 {} 条)",
        store.count().await,
        report.inserted
    );

    Ok(())
}

//! APK 抓取队列 - 编排层
//!
//! ## 职责
//!
//! 1. **认领循环**：反复认领待处理记录，直到队列为空
//! 2. **会话管理**：每轮外层循环打开一个数据库会话，结束时关闭
//! 3. **冷却**：阶段异常后短冷却并重开会话；会话层失败后长冷却，无限重试
//! 4. **统计**：按最终状态汇总
//!
//! 记录严格逐条处理，不并发。

use std::sync::Arc;
use std::time::Duration;

use tokio::time::sleep;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::error::AppResult;
use crate::models::Sentinel;
use crate::store::{RecordStore, StoreConnector};
use crate::workflow::{ApkFlow, ApkOutcome};

/// 按最终状态统计
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct QueueStats {
    pub processed: usize,
    pub downloaded: usize,
    pub timed_out: usize,
    pub unmatched: usize,
    pub no_search_result: usize,
    pub no_detail: usize,
    pub stage_errors: usize,
    /// 会话层失败次数
    pub session_errors: usize,
}

impl QueueStats {
    fn record(&mut self, outcome: &ApkOutcome) {
        self.processed += 1;
        match outcome {
            ApkOutcome::Downloaded(_) => self.downloaded += 1,
            ApkOutcome::DownloadTimedOut => self.timed_out += 1,
            ApkOutcome::Unmatched => self.unmatched += 1,
            ApkOutcome::Failed(Sentinel::NoSearchResult) => self.no_search_result += 1,
            ApkOutcome::Failed(Sentinel::NoDetail) => self.no_detail += 1,
            ApkOutcome::Failed(Sentinel::ProcessingError) => self.stage_errors += 1,
        }
    }
}

/// 一个会话结束的原因
enum SessionEnd {
    /// 队列已空
    Drained,
    /// 阶段异常后需要重开会话
    Reopen,
}

pub struct WorkQueueDriver {
    connector: Arc<dyn StoreConnector>,
    flow: ApkFlow,
    record_cooldown: Duration,
    connection_cooldown: Duration,
}

impl WorkQueueDriver {
    pub fn new(config: &Config, connector: Arc<dyn StoreConnector>, flow: ApkFlow) -> Self {
        Self {
            connector,
            flow,
            record_cooldown: config.record_cooldown(),
            connection_cooldown: config.connection_cooldown(),
        }
    }

    /// 运行直到没有待处理记录
    pub async fn run(&self) -> QueueStats {
        let mut stats = QueueStats::default();
        loop {
            match self.run_session(&mut stats).await {
                Ok(SessionEnd::Drained) => break,
                Ok(SessionEnd::Reopen) => info!("🔄 重新打开数据库会话"),
                Err(e) => {
                    stats.session_errors += 1;
                    error!(
                        "❌ 数据库会话失败: {}，{:?} 后重试",
                        e, self.connection_cooldown
                    );
                    sleep(self.connection_cooldown).await;
                }
            }
        }
        info!("✓ 队列已处理完毕，共 {} 条记录", stats.processed);
        stats
    }

    async fn run_session(&self, stats: &mut QueueStats) -> AppResult<SessionEnd> {
        let store = self.connector.open().await?;
        let end = self.claim_loop(store.as_ref(), stats).await;
        store.close().await;
        end
    }

    async fn claim_loop(
        &self,
        store: &dyn RecordStore,
        stats: &mut QueueStats,
    ) -> AppResult<SessionEnd> {
        while let Some(record) = store.claim_next_pending().await? {
            let app_id = record.app_id.clone();
            let outcome = self.flow.run(store, record).await?;
            stats.record(&outcome);

            if outcome.is_stage_exception() {
                warn!("⚠️ {} 阶段异常，冷却 {:?}", app_id, self.record_cooldown);
                sleep(self.record_cooldown).await;
                return Ok(SessionEnd::Reopen);
            }
        }
        Ok(SessionEnd::Drained)
    }
}

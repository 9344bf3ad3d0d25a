//! 日志工具模块
//!
//! 提供日志格式化和输出的辅助函数

use std::fs;

use crate::error::{AppError, AppResult, FileError};
use tracing::info;

/// 初始化运行日志文件，写入标题和时间
pub fn init_log_file(log_file_path: &str, title: &str) -> AppResult<()> {
    let log_header = format!(
        "{}\n{} - {}\n{}\n\n",
        "=".repeat(60),
        title,
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
        "=".repeat(60)
    );
    fs::write(log_file_path, log_header).map_err(|e| {
        AppError::File(FileError::WriteFailed {
            path: log_file_path.to_string(),
            source: Box::new(e),
        })
    })?;
    Ok(())
}

/// 记录程序启动信息
///
/// # 参数
/// - `stage`: 运行阶段名称
/// - `database_url`: 数据库地址
pub fn log_startup(stage: &str, database_url: &str) {
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - {}", stage);
    info!("🗄️ 数据库: {}", database_url);
    info!("{}", "=".repeat(60));
}

/// 打印最终统计信息
///
/// # 参数
/// - `title`: 统计标题
/// - `rows`: (名称, 数量) 列表
/// - `log_file_path`: 日志文件路径
pub fn print_final_stats(title: &str, rows: &[(&str, usize)], log_file_path: &str) {
    info!("\n{}", "=".repeat(60));
    info!("📊 {}", title);
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
    for (name, count) in rows {
        info!("{}: {}", name, count);
    }
    info!("{}", "=".repeat(60));
    info!("\n日志已保存至: {}", log_file_path);
}

/// 截断长文本用于日志显示
///
/// # 参数
/// - `text`: 原始文本
/// - `max_len`: 最大长度
///
/// # 返回
/// 返回截断后的文本
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}

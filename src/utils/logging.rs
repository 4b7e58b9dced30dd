/// 日志工具模块
///
/// 提供日志初始化、格式化和输出的辅助函数
use tracing::info;
use tracing_subscriber::EnvFilter;

/// 初始化 tracing 日志（环境变量 RUST_LOG 可覆盖级别）
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

/// 记录程序启动信息
pub fn log_startup(provider: &str, model: &str, max_concurrent: usize) {
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - 批量文献筛选模式");
    info!("🤖 分类后端: {} / 模型: {}", provider, model);
    info!("📊 最大并发数: {}", max_concurrent);
    info!("{}", "=".repeat(60));
}

/// 记录待筛选记录加载信息
pub fn log_records_loaded(total: usize, max_concurrent: usize) {
    info!("✓ 找到 {} 条待筛选记录", total);
    info!("📋 将以每波 {} 条的方式处理", max_concurrent);
    info!("💡 每波完成后再开始下一波\n");
}

/// 记录并发波开始信息
pub fn log_wave_start(wave_num: usize, total_waves: usize, start: usize, end: usize, total: usize) {
    info!("\n{}", "=".repeat(60));
    info!("📦 开始处理第 {}/{} 波", wave_num, total_waves);
    info!("📄 本波记录: {}-{} / 共 {} 条", start, end, total);
    info!("{}", "=".repeat(60));
}

/// 记录并发波完成信息
pub fn log_wave_complete(wave_num: usize, classified: usize, total: usize) {
    info!("\n{}", "─".repeat(60));
    info!("✓ 第 {} 波完成: 成功 {}/{}", wave_num, classified, total);
    info!("{}", "─".repeat(60));
}

/// 打印最终统计信息
pub fn print_final_stats(included: usize, excluded: usize, failed: usize, total: usize) {
    info!("\n{}", "=".repeat(60));
    info!("📊 全部筛选完成统计");
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
    info!("✅ 纳入: {}", included);
    info!("🚫 排除: {}", excluded);
    info!("❌ 失败: {}", failed);
    info!("📄 总计: {}", total);
    info!("{}", "=".repeat(60));
}

/// 截断长文本用于日志显示
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}

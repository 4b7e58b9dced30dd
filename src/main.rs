use anyhow::Result;

use article_screener::utils::logging;
use article_screener::{App, Config};

#[tokio::main]
async fn main() -> Result<()> {
    // 初始化日志
    logging::init();

    // 加载配置：TOML 文件（若存在）+ 环境变量覆盖
    let config = Config::load("screener.toml")?;

    // 初始化并运行应用
    App::initialize(config).await?.run().await?;

    Ok(())
}

use anyhow::Result;
use clap::Parser;
use colored::Colorize;
use tracing::error;
use tracing_subscriber::fmt;

use turbo_blog::cli;

#[tokio::main]
async fn main() -> Result<()> {
    // 初始化日志系统，日志写到 stderr，避免混进 render/query 的输出
    fmt()
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    // 解析命令行参数
    let cli = cli::Cli::parse();

    // 打印欢迎信息
    eprintln!("{} {}", "Turbo Blog".bright_cyan(), env!("CARGO_PKG_VERSION").bright_green());
    eprintln!("{}", "Blog listing engine with filters and pagination".bright_white());
    eprintln!();

    // 执行命令
    if let Err(e) = cli::execute(cli).await {
        error!("Error: {}", e);

        // 打印错误链
        let mut source = e.source();
        while let Some(e) = source {
            error!("Caused by: {}", e);
            source = e.source();
        }

        std::process::exit(1);
    }

    Ok(())
}

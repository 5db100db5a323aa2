//! MirrorBot 命令行对话
//!
//! 入口：初始化日志、构建编排器，在 stdin/stdout 上运行单会话 REPL。
//! 输入 `/quit` 退出；`/location <城市>` 设置本会话的地点。

use std::sync::Arc;

use anyhow::Context;
use mirrorbot::memory::InMemoryHistoryStore;
use mirrorbot::prompts::EntrySource;
use mirrorbot::{observability, OrchestratorBuilder, TurnOrchestrator};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    observability::init();

    let orchestrator = OrchestratorBuilder::from_config_path(None)
        .with_history(Arc::new(InMemoryHistoryStore::new()))
        .build()
        .context("Failed to build turn pipeline")?;

    let session_id = TurnOrchestrator::new_session_id();
    let greeting = orchestrator
        .open_session(&session_id, EntrySource::Direct, None)
        .await;

    let mut stdout = tokio::io::stdout();
    stdout
        .write_all(format!("MirrorMe: {greeting}\n> ").as_bytes())
        .await?;
    stdout.flush().await?;

    let mut location: Option<String> = None;
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let input = line.trim();
        if input == "/quit" {
            break;
        }
        if let Some(loc) = input.strip_prefix("/location") {
            location = Some(loc.trim().to_string()).filter(|l| !l.is_empty());
            stdout.write_all(b"> ").await?;
            stdout.flush().await?;
            continue;
        }
        if input.is_empty() {
            stdout.write_all(b"> ").await?;
            stdout.flush().await?;
            continue;
        }

        let outcome = orchestrator
            .process_turn(&session_id, input, location.as_deref())
            .await;
        stdout
            .write_all(format!("MirrorMe: {}\n> ", outcome.reply).as_bytes())
            .await?;
        stdout.flush().await?;
    }

    Ok(())
}

use anyhow::Context;
use clap::Parser;
use donation_scraper::{checkpoint, cli, config, export, logging, runner, scrape};
use checkpoint::ScrapeState;
use cli::{Cli, Commands};
use config::Config;
use std::path::{Path, PathBuf};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut config = Config::load().context("設定ファイルを読み込めません")?;

    match cli.command {
        Commands::Run {
            mode,
            campaign,
            output_dir,
            max_pages,
            headless,
            unattended,
            no_page_dumps,
        } => {
            if let Some(campaign) = campaign {
                config.campaign = campaign;
            }
            if let Some(dir) = output_dir {
                config.output_dir = dir;
            }
            if let Some(max) = max_pages {
                config.max_pages_initial = max;
                config.max_pages_update = max;
            }
            config.headless |= headless;
            config.save_page_dumps &= !no_page_dumps;
            config.validate()?;

            let _guard = logging::init(cli.verbose, Some(config.output_dir.as_path()));
            println!("💰 donation-scraper - 寄付履歴の収集 ({})\n", config.campaign);
            println!("  モード: {}", mode);
            println!("  作業ディレクトリ: {}", config.output_dir.display());

            runner::run(&config, mode, unattended).await?;
        }

        Commands::Export { output_dir, output } => {
            let _guard = logging::init(cli.verbose, None);
            let dir = output_dir.unwrap_or_else(|| config.output_dir.clone());
            let output = output.unwrap_or_else(|| dir.join(config::CSV_FILE_NAME));

            println!("📄 donation-scraper - CSV出力\n");
            let state = ScrapeState::load(&dir)?;
            export::export_csv(&state.donations, &output, &config.export_rules())?;
        }

        Commands::Status { output_dir } => {
            let _guard = logging::init(cli.verbose, None);
            let dir = output_dir.unwrap_or_else(|| config.output_dir.clone());
            show_status(&dir)?;
        }

        Commands::Stop { output_dir, clear } => {
            let dir = output_dir.unwrap_or_else(|| config.output_dir.clone());
            let stop_file = dir.join(config::STOP_FILE_NAME);

            if clear {
                if stop_file.exists() {
                    std::fs::remove_file(&stop_file)?;
                    println!("✔ 停止ファイルを削除しました: {}", stop_file.display());
                } else {
                    println!("停止ファイルはありません: {}", stop_file.display());
                }
            } else {
                std::fs::create_dir_all(&dir)?;
                std::fs::write(&stop_file, "")?;
                println!("✔ 停止ファイルを作成しました: {}", stop_file.display());
                println!("  実行中の収集は現在のページの後に停止します");
            }
        }

        Commands::Reset { output_dir, dumps } => {
            let dir = output_dir.unwrap_or_else(|| config.output_dir.clone());

            if ScrapeState::clear(&dir)? {
                println!("✔ チェックポイントを削除しました");
            } else {
                println!("チェックポイントは存在しません");
            }

            if dumps {
                let removed = scrape::dump::remove_page_dumps(&dir)?;
                println!("✔ ページダンプを削除しました ({}件)", removed);
            }
        }

        Commands::Config { set_campaign, show } => {
            if let Some(campaign) = set_campaign {
                config.set_campaign(campaign)?;
                println!("✔ キャンペーンを設定しました");
            }

            if show {
                println!("設定: {}", Config::config_path()?.display());
                println!("  キャンペーン: {}", config.campaign);
                println!("  URL: {}", config.page_url(0));
                println!("  作業ディレクトリ: {}", config.output_dir.display());
                println!(
                    "  最大ページ数: 全件 {} / 差分 {}",
                    config.max_pages_initial, config.max_pages_update
                );
                println!("  チェックポイント間隔: {}ページ", config.checkpoint_interval);
                println!("  ヘッドレス: {}", if config.headless { "有効" } else { "無効" });
                println!(
                    "  ブラウザ: {}",
                    config
                        .chrome_executable
                        .as_deref()
                        .map(|p| p.display().to_string())
                        .unwrap_or_else(|| "自動検出".into())
                );
            }
        }
    }

    Ok(())
}

fn show_status(dir: &Path) -> anyhow::Result<()> {
    let checkpoint_path: PathBuf = ScrapeState::checkpoint_path(dir);
    if !checkpoint_path.exists() {
        println!("チェックポイントが存在しません: {}", checkpoint_path.display());
        return Ok(());
    }

    let state = ScrapeState::load(dir)?;
    println!("チェックポイント情報:");
    println!("  パス: {}", checkpoint_path.display());
    println!("  件数: {}", state.len());
    println!(
        "  全件取得: {}",
        if state.initial_scrape_complete { "完了" } else { "未完了" }
    );
    if !state.initial_scrape_complete && !state.is_empty() {
        println!("  再開ページ: {}", state.resume_page());
    }
    println!("  最新ID: {}", state.newest_donation_id.as_deref().unwrap_or("-"));
    println!("  最古ID: {}", state.last_donation_id.as_deref().unwrap_or("-"));
    if let Some(updated_at) = &state.updated_at {
        println!("  更新日時: {}", updated_at);
    }

    let dumps = scrape::dump::page_dumps(dir);
    println!("  ページダンプ: {}件", dumps.len());
    if dir.join(config::STOP_FILE_NAME).exists() {
        println!("  ⚠ 停止ファイルがあります（`stop --clear` で削除）");
    }
    Ok(())
}

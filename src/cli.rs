use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "donation-scraper")]
#[command(about = "募金サイトの寄付履歴を収集してCSVに出力するツール", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// 詳細ログを出力
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// 寄付を収集してCSVを出力（初回は全件、以降は差分）
    Run {
        /// 取得モード (auto/full/update)
        #[arg(short, long, value_enum, default_value = "auto")]
        mode: ScrapeMode,

        /// キャンペーン名（設定ファイルより優先）
        #[arg(short, long)]
        campaign: Option<String>,

        /// 作業ディレクトリ
        #[arg(short = 'd', long)]
        output_dir: Option<PathBuf>,

        /// 取得する最大ページ数
        #[arg(long)]
        max_pages: Option<u32>,

        /// ブラウザを非表示で起動
        #[arg(long)]
        headless: bool,

        /// チャレンジページで手動操作を待たない
        #[arg(long)]
        unattended: bool,

        /// ページごとのJSONダンプを保存しない
        #[arg(long)]
        no_page_dumps: bool,
    },

    /// チェックポイントからCSVを再生成
    Export {
        /// 作業ディレクトリ
        #[arg(short = 'd', long)]
        output_dir: Option<PathBuf>,

        /// 出力CSVファイル（デフォルト: 作業ディレクトリ/all_donations.csv）
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// チェックポイントの状態を表示
    Status {
        /// 作業ディレクトリ
        #[arg(short = 'd', long)]
        output_dir: Option<PathBuf>,
    },

    /// 実行中の収集に停止を要求（停止ファイルを作成）
    Stop {
        /// 作業ディレクトリ
        #[arg(short = 'd', long)]
        output_dir: Option<PathBuf>,

        /// 停止ファイルを削除
        #[arg(long)]
        clear: bool,
    },

    /// チェックポイントを削除
    Reset {
        /// 作業ディレクトリ
        #[arg(short = 'd', long)]
        output_dir: Option<PathBuf>,

        /// ページダンプも削除
        #[arg(long)]
        dumps: bool,
    },

    /// 設定を表示/編集
    Config {
        /// キャンペーン名を設定
        #[arg(long)]
        set_campaign: Option<String>,

        /// 設定を表示
        #[arg(long)]
        show: bool,
    },
}

/// 取得モード
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum ScrapeMode {
    /// チェックポイントの状態で自動判定
    #[default]
    Auto,
    /// 全件取得
    Full,
    /// 差分取得
    Update,
}

impl std::fmt::Display for ScrapeMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScrapeMode::Auto => write!(f, "auto"),
            ScrapeMode::Full => write!(f, "full"),
            ScrapeMode::Update => write!(f, "update"),
        }
    }
}

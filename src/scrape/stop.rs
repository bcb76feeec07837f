//! 停止要求
//!
//! Ctrl+C 等によるフラグと、作業ディレクトリの停止ファイルの2経路。
//! どちらかが立っていれば次のページに進まない。

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[derive(Debug, Clone, Default)]
pub struct StopSignal {
    requested: Arc<AtomicBool>,
    stop_file: Option<PathBuf>,
}

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// 停止ファイルの監視を追加
    pub fn with_stop_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.stop_file = Some(path.into());
        self
    }

    pub fn request(&self) {
        self.requested.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.requested.load(Ordering::SeqCst)
            || self.stop_file.as_deref().is_some_and(Path::exists)
    }

    pub fn stop_file(&self) -> Option<&Path> {
        self.stop_file.as_deref()
    }
}

//! 运行结果汇总.

use mr_berry::prelude::{SeriesReport, SynthesisError};

/// 整个运行的序列级结果. 单个序列失败不影响其余序列,
/// 最终在这里统一汇报.
pub struct RunReport {
    data: Vec<(String, Result<SeriesReport, SynthesisError>)>,
}

impl RunReport {
    /// 创建空结果集.
    pub fn new() -> Self {
        Self { data: Vec::new() }
    }

    /// 记录一个序列的结果.
    pub fn push(&mut self, label: &str, result: Result<SeriesReport, SynthesisError>) {
        if let Err(e) = &result {
            log::error!("序列 {label} 失败: {e}");
        }
        self.data.push((label.to_owned(), result));
    }

    /// 成功序列个数.
    pub fn succeeded(&self) -> usize {
        self.data.iter().filter(|(_, r)| r.is_ok()).count()
    }

    /// 失败序列个数.
    pub fn failed(&self) -> usize {
        self.data.len() - self.succeeded()
    }

    /// 分析运行结果并逐条汇报.
    pub fn analyze(&self) {
        for (label, result) in &self.data {
            match result {
                Ok(report) => {
                    log::info!(
                        "序列 {label}: {} 张切片, series uid {}",
                        report.slices,
                        report.series_uid
                    );
                }
                Err(e) => log::warn!("序列 {label}: 失败 ({e})"),
            }
        }
        log::info!("共 {} 个序列, {} 成功, {} 失败", self.data.len(), self.succeeded(), self.failed());
    }
}

impl Default for RunReport {
    fn default() -> Self {
        Self::new()
    }
}

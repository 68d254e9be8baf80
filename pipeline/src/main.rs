//! 流水线入口: 读取基准目录, 运行后处理, 汇报结果.

use std::path::PathBuf;
use std::process::ExitCode;

mod report;
mod runner;
mod stages;

/// 获取运行基准目录.
///
/// 1. 若给出第一个命令行参数, 则使用它;
/// 2. 否则, 若环境变量 `$MR_PIPELINE_DATA` 非空, 则使用其值;
/// 3. 否则, 回退到部署约定的 `/data`.
fn base_dir_from_args_or_env() -> PathBuf {
    if let Some(arg) = std::env::args().nth(1) {
        return PathBuf::from(arg);
    }
    if let Ok(dir) = std::env::var("MR_PIPELINE_DATA") {
        if !dir.is_empty() {
            return PathBuf::from(dir);
        }
    }
    PathBuf::from("/data")
}

fn main() -> ExitCode {
    simple_logger::init_with_level(log::Level::Info).expect("日志初始化失败");

    let base = base_dir_from_args_or_env();
    log::info!("基准目录: {}", base.display());

    match runner::run(&base) {
        Ok(report) => {
            report.analyze();
            if report.failed() == 0 {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            }
        }
        Err(e) => {
            log::error!("流水线终止: {e}");
            ExitCode::FAILURE
        }
    }
}

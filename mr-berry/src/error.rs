//! 运行时错误.

use std::path::PathBuf;

/// 切片序列合成的运行时错误.
///
/// 缺失的 **可选** 模态不是错误: 调用方直接跳过即可.
/// 下标越界等编程错误依旧直接 panic, 不进入该类型.
#[derive(Debug, thiserror::Error)]
pub enum SynthesisError {
    /// 必需输入文件不存在.
    #[error("required input does not exist: {0}")]
    MissingInput(PathBuf),

    /// nifti 文件读取失败.
    #[error("failed to read nifti volume: {0}")]
    Nifti(#[from] nifti::NiftiError),

    /// 体数据秩不符 (仅支持 3D, 或取首帧的 4D).
    #[error("volume rank {0} is not supported (expect 3 or 4)")]
    BadRank(usize),

    /// 体数据某一轴超过规范化立方体上限.
    #[error("volume shape {shape:?} exceeds the {limit} cube extent")]
    Oversize {
        /// 原始形状.
        shape: (usize, usize, usize),
        /// 立方体上限.
        limit: usize,
    },

    /// 掩膜与背景切片数不一致. 该错误必须在写出任何实例之前报告.
    #[error("mask has {mask} slices but background has {background}")]
    SliceCountMismatch {
        /// 掩膜切片数.
        mask: usize,
        /// 背景切片数.
        background: usize,
    },

    /// DICOM 模板读取失败.
    #[error("failed to read dicom template: {0}")]
    DicomRead(#[from] dicom::object::ReadError),

    /// DICOM 文件元信息构建失败.
    #[error("failed to build dicom file meta: {0}")]
    DicomMeta(String),

    /// DICOM 实例写出失败. 单个切片写失败即视为整个序列失败.
    #[error("failed to write dicom instance: {0}")]
    DicomWrite(#[from] dicom::object::WriteError),

    /// 其他输出 I/O 错误.
    #[error("output i/o error: {0}")]
    Io(#[from] std::io::Error),
}

/// 本 crate 通用 `Result`.
pub type Result<T, E = SynthesisError> = std::result::Result<T, E>;

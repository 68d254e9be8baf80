//! 分阶段目录布局与外部协作步骤边界.
//!
//! 配准、颅骨剥离、模型推理等步骤由外部工具完成, 本程序只声明它们的
//! 输入/输出位置并检查就绪信号, 绝不调用其内部实现.

use std::path::{Path, PathBuf};

/// 一次运行的分阶段目录布局, 全部挂在一个基准目录下.
pub struct StageLayout {
    base: PathBuf,
}

impl StageLayout {
    /// 以 `base` 为基准目录创建布局.
    pub fn new<P: AsRef<Path>>(base: P) -> Self {
        Self {
            base: base.as_ref().to_owned(),
        }
    }

    /// 原始 DICOM 输入目录.
    #[inline]
    pub fn input_dir(&self) -> PathBuf {
        self.base.join("1-input")
    }

    /// DICOM 转 NIfTI 的输出目录.
    #[inline]
    pub fn nifti_dir(&self) -> PathBuf {
        self.base.join("2-nifti")
    }

    /// 配准输出目录.
    #[inline]
    pub fn coreg_dir(&self) -> PathBuf {
        self.base.join("3-coreg")
    }

    /// 颅骨剥离输出目录.
    #[inline]
    pub fn skullstrip_dir(&self) -> PathBuf {
        self.base.join("4-skull-strip")
    }

    /// 分割推理输出目录.
    #[inline]
    pub fn seg_dir(&self) -> PathBuf {
        self.base.join("5-seg")
    }

    /// 最终 DICOM 序列输出目录.
    #[inline]
    pub fn output_dir(&self) -> PathBuf {
        self.base.join("6-output")
    }
}

/// 外部协作步骤. 每一步由外部工具在本程序运行之前完成,
/// 其输出落在布局内约定好的目录.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ExternalStage {
    /// dcm2niix 风格的 DICOM -> NIfTI 转换.
    DicomToNifti,

    /// 刚体 + 仿射配准.
    Coregistration,

    /// 颅骨剥离.
    SkullStrip,

    /// 胶质瘤分割推理.
    Segmentation,
}

impl ExternalStage {
    /// 全部外部步骤, 按执行顺序.
    pub const ALL: [Self; 4] = [
        Self::DicomToNifti,
        Self::Coregistration,
        Self::SkullStrip,
        Self::Segmentation,
    ];

    /// 步骤名.
    pub fn name(&self) -> &'static str {
        match self {
            Self::DicomToNifti => "dicom-to-nifti",
            Self::Coregistration => "coregistration",
            Self::SkullStrip => "skull-strip",
            Self::Segmentation => "segmentation",
        }
    }

    /// 该步骤的输出目录.
    pub fn output_dir(&self, layout: &StageLayout) -> PathBuf {
        match self {
            Self::DicomToNifti => layout.nifti_dir(),
            Self::Coregistration => layout.coreg_dir(),
            Self::SkullStrip => layout.skullstrip_dir(),
            Self::Segmentation => layout.seg_dir(),
        }
    }

    /// 就绪信号: 输出目录存在且非空; 分割步骤还要求全肿瘤掩膜落盘.
    pub fn outputs_ready(&self, layout: &StageLayout) -> bool {
        let dir = self.output_dir(layout);
        let populated = std::fs::read_dir(&dir)
            .map(|mut it| it.next().is_some())
            .unwrap_or(false);
        match self {
            Self::Segmentation => populated && whole_mask_path(layout).is_some(),
            _ => populated,
        }
    }
}

/// 在分割输出目录中寻找全肿瘤掩膜 (`*_whole.nii.gz`).
pub fn whole_mask_path(layout: &StageLayout) -> Option<PathBuf> {
    let entries = std::fs::read_dir(layout.seg_dir()).ok()?;
    let mut candidates: Vec<PathBuf> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| {
            p.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.ends_with("_whole.nii.gz"))
        })
        .collect();
    candidates.sort();
    candidates.into_iter().next()
}

/// 在输入目录中选择模板 DICOM 文件 (字典序第一个 `.dcm`).
pub fn template_dicom_path(layout: &StageLayout) -> Option<PathBuf> {
    let entries = std::fs::read_dir(layout.input_dir()).ok()?;
    let mut candidates: Vec<PathBuf> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| {
            p.extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e.eq_ignore_ascii_case("dcm"))
        })
        .collect();
    candidates.sort();
    candidates.into_iter().next()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_layout(name: &str) -> StageLayout {
        let base = std::env::temp_dir().join("mr-pipeline-stages-test").join(name);
        if base.exists() {
            std::fs::remove_dir_all(&base).unwrap();
        }
        std::fs::create_dir_all(&base).unwrap();
        StageLayout::new(base)
    }

    #[test]
    fn test_stage_dirs_follow_layout() {
        let layout = StageLayout::new("/data");
        assert_eq!(layout.input_dir(), PathBuf::from("/data/1-input"));
        assert_eq!(layout.seg_dir(), PathBuf::from("/data/5-seg"));
        assert_eq!(layout.output_dir(), PathBuf::from("/data/6-output"));
    }

    #[test]
    fn test_outputs_ready_requires_populated_dir() {
        let layout = temp_layout("ready");
        let stage = ExternalStage::Coregistration;
        // 目录不存在 -> 未就绪.
        assert!(!stage.outputs_ready(&layout));

        std::fs::create_dir_all(layout.coreg_dir()).unwrap();
        assert!(!stage.outputs_ready(&layout));

        std::fs::write(layout.coreg_dir().join("brain_t1ce.nii.gz"), b"x").unwrap();
        assert!(stage.outputs_ready(&layout));
    }

    #[test]
    fn test_segmentation_ready_needs_whole_mask() {
        let layout = temp_layout("seg");
        std::fs::create_dir_all(layout.seg_dir()).unwrap();
        std::fs::write(layout.seg_dir().join("tumor_volume.csv"), b"unit,cm3\n").unwrap();
        assert!(!ExternalStage::Segmentation.outputs_ready(&layout));

        std::fs::write(layout.seg_dir().join("seg_whole.nii.gz"), b"x").unwrap();
        assert!(ExternalStage::Segmentation.outputs_ready(&layout));
        assert!(whole_mask_path(&layout)
            .unwrap()
            .ends_with("seg_whole.nii.gz"));
    }

    #[test]
    fn test_template_picks_first_dcm() {
        let layout = temp_layout("template");
        std::fs::create_dir_all(layout.input_dir()).unwrap();
        assert!(template_dicom_path(&layout).is_none());

        std::fs::write(layout.input_dir().join("b.dcm"), b"x").unwrap();
        std::fs::write(layout.input_dir().join("a.dcm"), b"x").unwrap();
        std::fs::write(layout.input_dir().join("note.txt"), b"x").unwrap();
        assert!(template_dicom_path(&layout).unwrap().ends_with("a.dcm"));
    }
}

//! 端到端运行序列: 按模态依次合成 DICOM 序列并聚合统计.
//!
//! 单个序列的失败只记录, 不影响其余序列已经或将要写出的结果;
//! 只有外部协作步骤未就绪这类全局前置条件才让整次运行终止.

use std::path::Path;

use mr_berry::canonical::{canonicalize_mask, canonicalize_scan, CanonicalOptions};
use mr_berry::prelude::*;
use mr_berry::stats::is_intensity_modality;

use crate::report::RunReport;
use crate::stages::{template_dicom_path, whole_mask_path, ExternalStage, StageLayout};

/// 带掩膜序列的固定模态集合.
const MASKED_MODALITIES: [&str; 4] = ["t1ce", "flair", "diffusion", "perfusion"];

/// 可选的、不参与配准的模态 (直接来自转换输出目录).
const OPTIONAL_MODALITIES: [&str; 2] = ["perfusion", "diffusion"];

/// 弥散重采样开关的环境变量名. 实验性路径, 默认关闭.
const RESAMPLE_ENV: &str = "MR_RESAMPLE_DIFFUSION";

/// 读取一个 nii 体数据并规范化后合成普通序列.
fn plain_from_path(
    path: &Path,
    opts: &CanonicalOptions,
    template: &DicomTemplate,
    out_dir: &Path,
    label: &str,
) -> Result<SeriesReport> {
    let scan = canonicalize_scan(MrVolume::open(path)?, opts)?;
    plain_series(&scan, template, out_dir, label)
}

/// 弥散模态的规范化选项, 由环境变量控制重采样开关.
fn diffusion_options(modality: &str) -> CanonicalOptions {
    CanonicalOptions {
        resample_by_spacing: modality == "diffusion"
            && std::env::var(RESAMPLE_ENV).is_ok_and(|v| v == "1"),
    }
}

/// 运行整条后处理流水线.
///
/// 前置条件: 四个外部协作步骤 (转换/配准/颅骨剥离/分割)
/// 已在各自目录落盘. 任一步骤未就绪即终止, 不产生部分输出.
pub fn run(base: &Path) -> Result<RunReport> {
    let layout = StageLayout::new(base);

    for stage in ExternalStage::ALL {
        if !stage.outputs_ready(&layout) {
            log::error!("外部步骤 {} 未就绪", stage.name());
            return Err(SynthesisError::MissingInput(stage.output_dir(&layout)));
        }
    }

    // 模态名称表: 启动时加载一次, 此后只读.
    let table = ModalityTable::from_json_file_or_builtin(layout.input_dir().join("task.json"))?;

    let template_path = template_dicom_path(&layout)
        .ok_or_else(|| SynthesisError::MissingInput(layout.input_dir()))?;
    log::info!("模板实例: {}", template_path.display());
    let template = DicomTemplate::open(&template_path)?;

    let accession = template
        .accession_number()
        .unwrap_or_else(|| "output".to_owned());
    let out_dir = layout.output_dir().join(accession);
    std::fs::create_dir_all(&out_dir)?;

    let scheme = LabelScheme::msnet();
    let mask_path =
        whole_mask_path(&layout).ok_or_else(|| SynthesisError::MissingInput(layout.seg_dir()))?;

    let tumor_volume = match TumorVolumeRecord::read_csv(layout.seg_dir().join("tumor_volume.csv"))
    {
        Ok(record) => record,
        Err(e) => {
            log::warn!("肿瘤体积记录缺失 ({e}), 体积类掩膜序列将被跳过");
            TumorVolumeRecord::default()
        }
    };

    let mut report = RunReport::new();
    let mut aggregate = StatsAggregate::new();

    // 全肿瘤掩膜自身作为普通灰度序列输出.
    report.push(
        "mask",
        plain_from_path(
            &mask_path,
            &CanonicalOptions::default(),
            &template,
            &out_dir,
            "mask",
        ),
    );

    // 可选模态: 缺失时静默跳过, 不记入结果与统计.
    for modality in OPTIONAL_MODALITIES {
        let path = layout.nifti_dir().join(format!("brain_{modality}.nii.gz"));
        if !path.is_file() {
            log::info!("可选模态 {modality} 缺失, 跳过");
            continue;
        }
        report.push(
            modality,
            plain_from_path(
                &path,
                &diffusion_options(modality),
                &template,
                &out_dir,
                modality,
            ),
        );
    }

    // 配准目录下发现的每个模态都输出普通序列.
    for modality in discover_coreg_modalities(&layout) {
        if !table.is_known(&modality) {
            log::warn!("配准目录中发现未知模态 {modality}, 仍按原名输出");
        }
        let path = layout.coreg_dir().join(format!("brain_{modality}.nii.gz"));
        report.push(
            &modality,
            plain_from_path(
                &path,
                &CanonicalOptions::default(),
                &template,
                &out_dir,
                &modality,
            ),
        );
    }

    // 固定模态集合的掩膜序列. 掩膜只规范化一次, 各模态复用.
    // 掩膜加载失败只终结掩膜序列, 已写出的普通序列保持原样.
    match MaskVolume::open(&mask_path).and_then(canonicalize_mask) {
        Ok(mask) => {
            for modality in MASKED_MODALITIES {
                let source = if is_intensity_modality(modality) {
                    layout.nifti_dir()
                } else {
                    layout.coreg_dir()
                };
                let path = source.join(format!("brain_{modality}.nii.gz"));
                if !path.is_file() {
                    log::info!("掩膜序列跳过缺失模态 {modality}");
                    continue;
                }

                let label = format!("masked_{modality}");
                let result = masked_for_modality(
                    &path, &mask, scheme, modality, &tumor_volume, &template, &out_dir, &label,
                );
                match result {
                    Ok(Some((series, stats))) => {
                        aggregate.merge(&stats);
                        report.push(&label, Ok(series));
                    }
                    Ok(None) => {
                        log::warn!("模态 {modality} 缺少体积统计记录, 掩膜序列跳过");
                    }
                    Err(e) => report.push(&label, Err(e)),
                }
            }
        }
        Err(e) => log::error!("掩膜规范化失败, 全部掩膜序列跳过: {e}"),
    }

    // 聚合统计一次性落盘. 被跳过的模态不产生键.
    if !aggregate.is_empty() {
        aggregate.write_csv(out_dir.join("statistics.csv"))?;
    }

    Ok(report)
}

/// 从配准目录文件名 (`brain_{模态}.nii.gz`) 收集模态名, 去重排序.
fn discover_coreg_modalities(layout: &StageLayout) -> Vec<String> {
    let Ok(entries) = std::fs::read_dir(layout.coreg_dir()) else {
        return Vec::new();
    };
    let mut modalities: Vec<String> = entries
        .filter_map(|e| e.ok())
        .filter_map(|e| e.file_name().into_string().ok())
        .filter_map(|name| {
            name.strip_prefix("brain_")?
                .strip_suffix(".nii.gz")
                .map(str::to_owned)
        })
        .collect();
    modalities.sort();
    modalities.dedup();
    modalities
}

/// 为单个模态合成掩膜序列, 并返回它的区域统计.
///
/// 强度类模态的统计就地计算; 其余模态从外部体积记录透传,
/// 记录缺失时返回 `Ok(None)` 表示跳过.
#[allow(clippy::too_many_arguments)]
fn masked_for_modality(
    background_path: &Path,
    mask: &AxialMask,
    scheme: LabelScheme,
    modality: &str,
    tumor_volume: &TumorVolumeRecord,
    template: &DicomTemplate,
    out_dir: &Path,
    label: &str,
) -> Result<Option<(SeriesReport, RegionStatistics)>> {
    let scan = canonicalize_scan(
        MrVolume::open(background_path)?,
        &CanonicalOptions::default(),
    )?;

    let stats = if is_intensity_modality(modality) {
        mean_intensity_stats(&scan, mask, &scheme, modality)
    } else {
        match tumor_volume.volumetric_stats(modality) {
            Some(stats) => stats,
            None => return Ok(None),
        }
    };

    let series = masked_series(mask, &scan, scheme, &stats, template, out_dir, label)?;
    Ok(Some((series, stats)))
}

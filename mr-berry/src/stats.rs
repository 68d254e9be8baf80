//! 区域统计: 按模态计算或透传肿瘤亚区的定量摘要.
//!
//! 两代统计口径并存, 按模态类别区分, 绝不混用:
//! 强度类模态 (弥散/灌注) 计算区域内正值背景的平均强度;
//! 其余模态透传外部给出的体积量, 并携带固定的显示不确定度.

use std::collections::BTreeMap;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use ndarray::Zip;

use crate::config::LabelScheme;
use crate::consts::is_positive_intensity;
use crate::consts::stats::*;
use crate::data::{AxialMask, AxialScan};
use crate::error::Result;

/// 统计口径.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum StatsKind {
    /// 区域内正值背景体素的平均强度. 无不确定度.
    MeanIntensity,

    /// 外部推理给出的体积量. 携带固定显示不确定度.
    Volumetric,
}

/// 一个模态的三亚区统计记录.
#[derive(Clone, Debug)]
pub struct RegionStatistics {
    /// 模态名.
    pub modality: String,

    /// 水肿区 (全肿瘤区) 统计值.
    pub edema: f64,

    /// 增强区统计值.
    pub enhancing: f64,

    /// 非增强区 (肿瘤核心区) 统计值.
    pub non_enhancing: f64,

    /// 单位字符串.
    pub unit: String,

    /// 统计口径.
    pub kind: StatsKind,
}

/// 模态是否属于强度统计类?
#[inline]
pub fn is_intensity_modality(modality: &str) -> bool {
    matches!(modality, "diffusion" | "perfusion")
}

/// 强度类模态的固定单位.
#[inline]
pub fn intensity_unit(modality: &str) -> Option<&'static str> {
    match modality {
        "diffusion" => Some(UNIT_DIFFUSION),
        "perfusion" => Some(UNIT_PERFUSION),
        _ => None,
    }
}

/// 保留三位小数.
#[inline]
fn round3(v: f64) -> f64 {
    (v * 1000.0).round() / 1000.0
}

/// 区域内正值背景体素的平均强度.
///
/// 区域为空或区域内没有正值体素时, 均值无定义, 返回 NaN.
/// 这是可显示的非致命情形, 调用方按原样展示, 不得静默替换为零.
fn masked_mean(scan: &AxialScan, mask: &AxialMask, code: u8) -> f64 {
    let mut sum = 0.0f64;
    let mut count = 0u64;
    Zip::from(scan.data()).and(mask.data()).for_each(|&v, &m| {
        if m == code && is_positive_intensity(v) {
            sum += v as f64;
            count += 1;
        }
    });
    sum / count as f64
}

/// 计算强度类模态的区域统计.
///
/// 两个体数据必须同形 (规范化保证), 否则 panic.
pub fn mean_intensity_stats(
    scan: &AxialScan,
    mask: &AxialMask,
    scheme: &LabelScheme,
    modality: &str,
) -> RegionStatistics {
    assert_eq!(scan.shape(), mask.shape(), "背景与掩膜形状不一致");
    let unit = intensity_unit(modality)
        .unwrap_or_else(|| panic!("模态 `{modality}` 不属于强度统计类"));

    let stats = RegionStatistics {
        modality: modality.to_owned(),
        edema: round3(masked_mean(scan, mask, scheme.whole)),
        enhancing: round3(masked_mean(scan, mask, scheme.enhancing)),
        non_enhancing: round3(masked_mean(scan, mask, scheme.core)),
        unit: unit.to_owned(),
        kind: StatsKind::MeanIntensity,
    };
    if stats.edema.is_nan() || stats.enhancing.is_nan() || stats.non_enhancing.is_nan() {
        log::warn!("模态 {modality} 存在空亚区, 对应统计值为 NaN");
    }
    stats
}

impl RegionStatistics {
    /// 统计值的显示形式. NaN 按原样显示为 `NaN`.
    pub fn display_value(&self, value: f64) -> String {
        if value.is_nan() {
            "NaN".to_owned()
        } else {
            match self.kind {
                StatsKind::MeanIntensity => format!("{value:.3}"),
                StatsKind::Volumetric => format!("{value}"),
            }
        }
    }

    /// 区域统计行的显示形式: 值 + 可选不确定度 + 单位.
    fn display_line(&self, value: f64, uncertainty: &'static str) -> String {
        match self.kind {
            StatsKind::MeanIntensity => {
                format!("{} {}", self.display_value(value), self.unit)
            }
            StatsKind::Volumetric => {
                format!("{}{} {}", self.display_value(value), uncertainty, self.unit)
            }
        }
    }

    /// 水肿区图例文字.
    #[inline]
    pub fn edema_line(&self) -> String {
        format!("Edema      {}", self.display_line(self.edema, UNCERTAINTY_EDEMA))
    }

    /// 增强区图例文字.
    #[inline]
    pub fn enhancing_line(&self) -> String {
        format!(
            "Enhancing  {}",
            self.display_line(self.enhancing, UNCERTAINTY_ENHANCING)
        )
    }

    /// 非增强区图例文字 (首行; 次行固定为 `Enhancing`).
    #[inline]
    pub fn non_enhancing_line(&self) -> String {
        format!(
            "Non-       {}",
            self.display_line(self.non_enhancing, UNCERTAINTY_NON_ENHANCING)
        )
    }
}

/// 外部推理落盘的肿瘤体积记录 (`tumor_volume.csv`).
#[derive(Clone, Debug, Default)]
pub struct TumorVolumeRecord {
    map: BTreeMap<String, String>,
}

impl TumorVolumeRecord {
    /// 从 `key,value` 行格式的 csv 文件读取记录.
    pub fn read_csv<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = std::fs::File::open(path.as_ref())?;
        let mut map = BTreeMap::new();
        for line in BufReader::new(file).lines() {
            let line = line?;
            if let Some((key, value)) = line.split_once(',') {
                map.insert(key.trim().to_owned(), value.trim().to_owned());
            }
        }
        Ok(Self { map })
    }

    /// 获取给定键的值.
    #[inline]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.map.get(key).map(String::as_str)
    }

    /// 按体积量口径转换为 `modality` 的区域统计.
    ///
    /// 任一必要键缺失或无法解析时返回 `None`.
    pub fn volumetric_stats(&self, modality: &str) -> Option<RegionStatistics> {
        let num = |key: &str| self.get(key)?.parse::<f64>().ok();
        Some(RegionStatistics {
            modality: modality.to_owned(),
            edema: num("total vasogenic edema volume")?,
            enhancing: num("enhancing portion")?,
            non_enhancing: num("non enhancing portion")?,
            unit: self.get("unit")?.to_owned(),
            kind: StatsKind::Volumetric,
        })
    }
}

/// 整个流水线的统计聚合, 键为 `"{模态} {亚区}"`, 按键有序.
///
/// 被跳过的模态不产生任何键.
#[derive(Clone, Debug, Default)]
pub struct StatsAggregate {
    entries: BTreeMap<String, String>,
}

impl StatsAggregate {
    /// 创建空聚合.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// 合并一个模态的区域统计.
    pub fn merge(&mut self, stats: &RegionStatistics) {
        let m = &stats.modality;
        self.entries
            .insert(format!("{m} edema"), stats.display_value(stats.edema));
        self.entries
            .insert(format!("{m} enhancing"), stats.display_value(stats.enhancing));
        self.entries.insert(
            format!("{m} non_enhancing"),
            stats.display_value(stats.non_enhancing),
        );
        self.entries.insert(format!("{m} unit"), stats.unit.clone());
    }

    /// 聚合是否为空?
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 获取给定键的值.
    #[inline]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// 迭代全部键值对.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// 按 `key,value` 行格式一次性写出.
    pub fn write_csv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = std::fs::File::create(path.as_ref())?;
        let mut w = BufWriter::new(file);
        for (key, value) in self.iter() {
            writeln!(w, "{key},{value}")?;
        }
        w.flush()?;
        Ok(())
    }
}

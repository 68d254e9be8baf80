//! 序列装配: 把一个体数据 (或体数据 + 掩膜) 驱动成完整的磁盘 DICOM 序列.
//!
//! 每个序列生成一次序列 UID, 每张切片生成独立实例 UID.
//! 切片之间没有依赖, 开启 `rayon` feature 时按切片号并行合成与写出;
//! 任何一张切片写失败都判整个序列失败, 绝不静默丢片.

use std::path::Path;

use ndarray::ArrayView2;

use crate::canonical::{normalize_intensity, to_gray_u8};
use crate::composite::MaskedSliceSeq;
use crate::config::LabelScheme;
use crate::data::{AxialMask, AxialScan, RgbSlice};
use crate::dicom::{new_uid, synthesize_instance, write_instance, DicomTemplate};
use crate::error::Result;
use crate::legend::LegendBitmap;
use crate::stats::RegionStatistics;

cfg_if::cfg_if! {
    if #[cfg(feature = "rayon")] {
        use rayon::iter::{IntoParallelIterator, ParallelIterator};
    }
}

/// 一个已完成序列的摘要.
#[derive(Clone, Debug)]
pub struct SeriesReport {
    /// 序列标签 (文件名前缀).
    pub label: String,

    /// 该序列共享的序列 UID.
    pub series_uid: String,

    /// 写出的切片实例个数.
    pub slices: usize,
}

/// 将灰度切片复制为三通道 RGB.
fn gray_to_rgb(gray: ArrayView2<'_, u8>) -> RgbSlice {
    let (h, w) = gray.dim();
    RgbSlice::new(ndarray::Array3::from_shape_fn((h, w, 3), |(i, j, _)| {
        gray[(i, j)]
    }))
}

/// 对所有切片号运行 `op`. 开启 `rayon` feature 时并行执行.
#[cfg(feature = "rayon")]
fn for_each_slice<F>(len: usize, op: F) -> Result<()>
where
    F: Fn(usize) -> Result<()> + Sync + Send,
{
    (0..len).into_par_iter().try_for_each(op)
}

/// 对所有切片号依次运行 `op`.
#[cfg(not(feature = "rayon"))]
fn for_each_slice<F>(len: usize, op: F) -> Result<()>
where
    F: Fn(usize) -> Result<()> + Sync + Send,
{
    (0..len).try_for_each(op)
}

/// 把一个规范化体数据合成为普通 (无掩膜) 实例序列.
///
/// 切片按 **整卷** 强度范围归一化, 灰度复制为 RGB 后走统一的实例合成契约.
pub fn plain_series(
    scan: &AxialScan,
    template: &DicomTemplate,
    out_dir: &Path,
    label: &str,
) -> Result<SeriesReport> {
    std::fs::create_dir_all(out_dir)?;
    let series_uid = new_uid();
    let (min, max) = scan.intensity_range();

    for_each_slice(scan.len_z(), |i| {
        let mut slice = scan.slice_at(i).to_owned();
        normalize_intensity(slice.view_mut(), min, max);
        let rgb = gray_to_rgb(to_gray_u8(slice.view()).view());
        let obj = synthesize_instance(&rgb, template, &series_uid, label, i);
        write_instance(obj, template.sop_class_uid(), out_dir, label, i)?;
        Ok(())
    })?;

    log::debug!("序列 {label}: 写出 {} 张切片", scan.len_z());
    Ok(SeriesReport {
        label: label.to_owned(),
        series_uid,
        slices: scan.len_z(),
    })
}

/// 把掩膜 + 背景体数据合成为带注释的实例序列.
///
/// 图例按该模态的区域统计渲染一次, 其后每张切片复用;
/// 掩膜与背景切片数不一致在写出任何实例之前即报错.
pub fn masked_series(
    mask: &AxialMask,
    scan: &AxialScan,
    scheme: LabelScheme,
    stats: &RegionStatistics,
    template: &DicomTemplate,
    out_dir: &Path,
    label: &str,
) -> Result<SeriesReport> {
    std::fs::create_dir_all(out_dir)?;
    let legend = LegendBitmap::render(stats, scan.slice_shape());
    let seq = MaskedSliceSeq::new(mask, scan, scheme, &legend)?;
    let series_uid = new_uid();

    for_each_slice(seq.total(), |i| {
        let rgb = seq.get(i);
        let obj = synthesize_instance(&rgb, template, &series_uid, label, i);
        write_instance(obj, template.sop_class_uid(), out_dir, label, i)?;
        Ok(())
    })?;

    log::debug!("掩膜序列 {label}: 写出 {} 张切片", seq.total());
    Ok(SeriesReport {
        label: label.to_owned(),
        series_uid,
        slices: seq.total(),
    })
}

//! 切片合成: 归一化背景 + 掩膜着色混合 + 图例色键叠加.
//!
//! 这是整条流水线的核心算法. 每张切片独立合成, 互相之间没有依赖,
//! 因此 [`MaskedSliceSeq`] 既是惰性迭代器, 也支持按切片号随机访问,
//! 以便上层做并行消费.

use ndarray::{Array3, ArrayView2};

use crate::canonical::{normalize_intensity, to_gray_u8};
use crate::config::LabelScheme;
use crate::consts::{luma, BLEND_BACKGROUND, BLEND_MASK, LEGEND_THRESHOLD};
use crate::data::{AxialMask, AxialScan, RgbSlice};
use crate::decode::decode_slice;
use crate::error::{Result, SynthesisError};
use crate::legend::LegendBitmap;

/// 合成一张带掩膜与图例的 RGB 切片.
///
/// 1. 背景切片按 **切片局部** 范围归一化到 `[0, 255]` 并复制为三通道;
/// 2. 解码后的掩膜彩色切片与背景按固定权重混合
///    (背景 [`BLEND_BACKGROUND`] 占主导);
/// 3. 图例按二值阈值色键叠加: 图例灰度严格大于 [`LEGEND_THRESHOLD`]
///    的像素 **逐像素精确** 覆盖混合结果, 其余保持混合结果.
///
/// 掩膜/背景/图例三者形状必须一致, 否则 panic;
/// 上层入口 [`MaskedSliceSeq::new`] 已在构造时报告形状错误.
pub fn composite_slice(
    mask: ArrayView2<'_, u8>,
    background: ArrayView2<'_, f32>,
    scheme: &LabelScheme,
    legend: &LegendBitmap,
) -> RgbSlice {
    assert_eq!(mask.dim(), background.dim(), "掩膜与背景切片形状不一致");
    assert_eq!(legend.shape(), background.dim(), "图例与切片形状不一致");

    let (h, w) = background.dim();

    // 归一化背景 (切片局部范围) 并量化.
    let mut bg = background.to_owned();
    let (mut min, mut max) = (f32::INFINITY, f32::NEG_INFINITY);
    for &v in bg.iter() {
        min = min.min(v);
        max = max.max(v);
    }
    normalize_intensity(bg.view_mut(), min, max);
    let gray = to_gray_u8(bg.view());

    let colored = decode_slice(mask, scheme);

    let mut out = Array3::zeros((h, w, 3));
    for i in 0..h {
        for j in 0..w {
            let legend_px = legend.pixel(i, j);
            let keyed = luma(legend_px[0], legend_px[1], legend_px[2]) > LEGEND_THRESHOLD;
            for c in 0..3 {
                out[(i, j, c)] = if keyed {
                    legend_px[c]
                } else {
                    let blended = BLEND_MASK * colored[(i, j, c)] as f32
                        + BLEND_BACKGROUND * gray[(i, j)] as f32;
                    blended.round() as u8
                };
            }
        }
    }
    RgbSlice::new(out)
}

/// 有限、可重启的掩膜切片惰性序列, 按切片号索引.
///
/// 构造时即校验掩膜与背景切片数一致; 不一致是致命前置条件错误,
/// 必须发生在写出任何实例之前.
#[derive(Debug)]
pub struct MaskedSliceSeq<'a> {
    mask: &'a AxialMask,
    scan: &'a AxialScan,
    scheme: LabelScheme,
    legend: &'a LegendBitmap,
    next: usize,
}

impl<'a> MaskedSliceSeq<'a> {
    /// 创建序列. 掩膜与背景切片数不一致时返回
    /// [`SynthesisError::SliceCountMismatch`].
    pub fn new(
        mask: &'a AxialMask,
        scan: &'a AxialScan,
        scheme: LabelScheme,
        legend: &'a LegendBitmap,
    ) -> Result<Self> {
        if mask.len_z() != scan.len_z() {
            return Err(SynthesisError::SliceCountMismatch {
                mask: mask.len_z(),
                background: scan.len_z(),
            });
        }
        Ok(Self {
            mask,
            scan,
            scheme,
            legend,
            next: 0,
        })
    }

    /// 序列总长度 (切片数). 与迭代进度无关.
    #[inline]
    pub fn total(&self) -> usize {
        self.scan.len_z()
    }

    /// 合成第 `z_index` 张切片. 随机访问, 不影响迭代进度.
    ///
    /// 当 `z_index` 越界时 panic.
    #[inline]
    pub fn get(&self, z_index: usize) -> RgbSlice {
        composite_slice(
            self.mask.slice_at(z_index),
            self.scan.slice_at(z_index),
            &self.scheme,
            self.legend,
        )
    }
}

impl Iterator for MaskedSliceSeq<'_> {
    type Item = RgbSlice;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.total() {
            return None;
        }
        let slice = self.get(self.next);
        self.next += 1;
        Some(slice)
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        let rest = self.total() - self.next;
        (rest, Some(rest))
    }
}

impl ExactSizeIterator for MaskedSliceSeq<'_> {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::{RegionStatistics, StatsKind};
    use ndarray::Array3;

    fn sample_legend(shape: crate::Idx2d) -> LegendBitmap {
        let stats = RegionStatistics {
            modality: "t1ce".into(),
            edema: 10.0,
            enhancing: 5.0,
            non_enhancing: 2.5,
            unit: "cm3".into(),
            kind: StatsKind::Volumetric,
        };
        LegendBitmap::render(&stats, shape)
    }

    fn sample_volumes(z: usize, h: usize, w: usize) -> (AxialMask, AxialScan) {
        let scheme = LabelScheme::msnet();
        let mask = Array3::from_shape_fn((z, h, w), |(_, i, j)| {
            if i == j {
                scheme.enhancing
            } else {
                0
            }
        });
        let scan = Array3::from_shape_fn((z, h, w), |(k, i, j)| (k + i + j) as f32);
        (AxialMask::from_array(mask), AxialScan::from_array(scan))
    }

    #[test]
    fn test_legend_fully_occludes_keyed_pixels() {
        let (mask, scan) = sample_volumes(1, 64, 64);
        let legend = sample_legend((64, 64));
        let out = composite_slice(
            mask.slice_at(0),
            scan.slice_at(0),
            &LabelScheme::msnet(),
            &legend,
        );

        let mut keyed = 0usize;
        for i in 0..64 {
            for j in 0..64 {
                let px = legend.pixel(i, j);
                if luma(px[0], px[1], px[2]) > LEGEND_THRESHOLD {
                    keyed += 1;
                    for c in 0..3 {
                        assert_eq!(out.data()[(i, j, c)], px[c], "图例像素 ({i}, {j}) 被混入");
                    }
                }
            }
        }
        // 图例确实有内容, 该性质不是空断言.
        assert!(keyed > 0);
    }

    #[test]
    fn test_blend_weights_applied_outside_legend() {
        let legend = sample_legend((64, 64));
        // 探针点位于图例空白区, 输出完全由混合决定.
        assert_eq!(legend.pixel(30, 30), [0, 0, 0]);
        assert_eq!(legend.pixel(32, 40), [0, 0, 0]);

        let scheme = LabelScheme::msnet();
        let mut mask = Array3::zeros((1, 64, 64));
        mask[(0, 30, 30)] = scheme.enhancing;
        let scan = Array3::zeros((1, 64, 64));
        let (mask, scan) = (AxialMask::from_array(mask), AxialScan::from_array(scan));

        let out = composite_slice(mask.slice_at(0), scan.slice_at(0), &scheme, &legend);
        // 背景为零且未命中掩膜: 输出为零.
        assert_eq!(out.data()[(32, 40, 0)], 0);
        // 命中处 = round(0.3 * 255) ≈ 76..77, 通道 0 (增强区着红).
        let v = out.data()[(30, 30, 0)];
        assert!((76..=77).contains(&v), "混合值 {v} 不在预期范围");
        assert_eq!(out.data()[(30, 30, 1)], 0);
        assert_eq!(out.data()[(30, 30, 2)], 0);
    }

    #[test]
    fn test_seq_len_and_restartable_access() {
        let (mask, scan) = sample_volumes(3, 16, 16);
        let legend = sample_legend((16, 16));
        let seq = MaskedSliceSeq::new(&mask, &scan, LabelScheme::msnet(), &legend).unwrap();
        assert_eq!(seq.total(), 3);
        assert_eq!(seq.len(), 3);

        let direct: Vec<_> = (0..3).map(|i| seq.get(i)).collect();
        // 随机访问不影响迭代进度; 迭代结果与随机访问一致.
        let iterated: Vec<_> = seq.collect();
        assert_eq!(direct, iterated);
    }

    #[test]
    fn test_slice_count_mismatch_is_fatal_before_any_output() {
        let (mask, _) = sample_volumes(3, 8, 8);
        let (_, scan) = sample_volumes(2, 8, 8);
        let legend = sample_legend((8, 8));
        let err = MaskedSliceSeq::new(&mask, &scan, LabelScheme::msnet(), &legend).unwrap_err();
        assert!(matches!(
            err,
            SynthesisError::SliceCountMismatch {
                mask: 3,
                background: 2
            }
        ));
    }
}

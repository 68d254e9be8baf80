//! 复合分割掩膜解码: 整数标签 -> 三通道二值指示数组.
//!
//! 通道顺序即着色约定: 通道 0 增强区 (红), 通道 1 全肿瘤区 (绿),
//! 通道 2 核心区 (蓝). 合成器按该约定直接把解码结果当作彩色切片.

use ndarray::{Array3, Array4, ArrayView2, Axis};

use crate::config::LabelScheme;
use crate::consts::rgb::{CHANNEL_CORE, CHANNEL_ENHANCING, CHANNEL_WHOLE, MASK_SET};
use crate::data::AxialMask;

/// 将一张掩膜切片解码为 (H, W, 3) 的二值指示数组.
///
/// 对每个通道做与方案标签值的 **精确整数相等** 测试, 命中置
/// [`MASK_SET`], 否则为 0. 不属于方案三个标签的体素在所有通道都是 0.
pub fn decode_slice(mask: ArrayView2<'_, u8>, scheme: &LabelScheme) -> Array3<u8> {
    let (h, w) = mask.dim();
    let mut out = Array3::zeros((h, w, 3));
    for ((i, j), &label) in mask.indexed_iter() {
        if label == scheme.enhancing {
            out[(i, j, CHANNEL_ENHANCING)] = MASK_SET;
        }
        if label == scheme.whole {
            out[(i, j, CHANNEL_WHOLE)] = MASK_SET;
        }
        if label == scheme.core {
            out[(i, j, CHANNEL_CORE)] = MASK_SET;
        }
    }
    out
}

/// 将整个掩膜体数据解码为 (z, H, W, 3) 指示数组. 主要用于验证和测试;
/// 正常合成路径按切片惰性解码.
pub fn decode_volume(mask: &AxialMask, scheme: &LabelScheme) -> Array4<u8> {
    let (z, h, w) = mask.shape();
    let mut out = Array4::zeros((z, h, w, 3));
    for (i, slice) in mask.slice_iter().enumerate() {
        out.index_axis_mut(Axis(0), i)
            .assign(&decode_slice(slice, scheme));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canonical::canonicalize_mask;
    use crate::data::MaskVolume;
    use ndarray::{Array2, Array3};

    fn count_set(arr: &Array4<u8>, channel: usize) -> usize {
        arr.index_axis(Axis(3), channel)
            .iter()
            .filter(|v| **v == MASK_SET)
            .count()
    }

    #[test]
    fn test_decode_slice_channel_order() {
        let scheme = LabelScheme::msnet();
        let mut mask = Array2::zeros((2, 2));
        mask[(0, 0)] = scheme.enhancing;
        mask[(0, 1)] = scheme.whole;
        mask[(1, 0)] = scheme.core;
        // (1,1) 留作背景.

        let decoded = decode_slice(mask.view(), &scheme);
        assert_eq!(decoded[(0, 0, 0)], MASK_SET);
        assert_eq!(decoded[(0, 1, 1)], MASK_SET);
        assert_eq!(decoded[(1, 0, 2)], MASK_SET);
        // 背景体素在所有通道均为 0.
        assert_eq!(decoded[(1, 1, 0)], 0);
        assert_eq!(decoded[(1, 1, 1)], 0);
        assert_eq!(decoded[(1, 1, 2)], 0);
    }

    #[test]
    fn test_decode_unknown_labels_silent() {
        let scheme = LabelScheme::nnunet();
        let mut mask = Array2::zeros((3, 3));
        mask[(0, 0)] = 7;
        mask[(2, 2)] = 200;
        let decoded = decode_slice(mask.view(), &scheme);
        assert!(decoded.iter().all(|v| *v == 0));
    }

    #[test]
    fn test_decode_channels_never_overlap_for_injective_scheme() {
        let scheme = LabelScheme::msnet();
        assert!(scheme.is_injective());
        let mask = Array2::from_shape_fn((8, 8), |(i, j)| ((i * 8 + j) % 6) as u8);
        let decoded = decode_slice(mask.view(), &scheme);
        for i in 0..8 {
            for j in 0..8 {
                let set = (0..3).filter(|c| decoded[(i, j, *c)] == MASK_SET).count();
                assert!(set <= 1, "体素 ({i}, {j}) 在 {set} 个通道同时命中");
            }
        }
    }

    #[test]
    fn test_decode_total_count_matches_labelled_voxels() {
        let scheme = LabelScheme::msnet();
        let mask_arr = Array3::from_shape_fn((4, 8, 8), |(z, i, j)| ((z + i * 3 + j) % 7) as u8);
        let labelled = mask_arr
            .iter()
            .filter(|v| {
                [scheme.enhancing, scheme.whole, scheme.core].contains(*v)
            })
            .count();

        let mask = AxialMask::from_array(mask_arr);
        let decoded = decode_volume(&mask, &scheme);
        let total: usize = (0..3).map(|c| count_set(&decoded, c)).sum();
        assert_eq!(total, labelled);
    }

    #[test]
    fn test_padded_mask_end_to_end_counts() {
        // 64³ 掩膜, 10 个体素标为增强区, 填充 + 解码后通道 0 恰有 10 个命中.
        let scheme = LabelScheme::msnet();
        let mut raw = Array3::<u8>::zeros((64, 64, 64));
        for k in 0..10 {
            raw[(5 + k, 6, 7)] = scheme.enhancing;
        }

        let mask = canonicalize_mask(MaskVolume::fake(raw)).unwrap();
        assert_eq!(mask.shape(), (256, 256, 256));
        let decoded = decode_volume(&mask, &scheme);
        assert_eq!(count_set(&decoded, 0), 10);
        assert_eq!(count_set(&decoded, 1), 0);
        assert_eq!(count_set(&decoded, 2), 0);
    }
}

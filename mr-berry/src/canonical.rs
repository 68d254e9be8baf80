//! 体数据规范化: 重定向到轴位、零填充到立方体、强度归一化.
//!
//! 输出体数据按 (z, H, W) 访问, 每轴长度均为 [`CUBE_EXTENT`],
//! 切片沿轴 0 提取即为轴位断层.

use ndarray::{s, Array2, Array3, ArrayView3, ArrayViewMut2, Axis};

use crate::consts::{is_positive_intensity, CUBE_EXTENT, GRAY_MAX};
use crate::data::{AxialMask, AxialScan, MaskVolume, MrVolume, VolumeMeta};
use crate::error::{Result, SynthesisError};

/// 规范化选项.
#[derive(Copy, Clone, Debug, Default)]
pub struct CanonicalOptions {
    /// 在重定向之前按体素物理分辨率做最近邻重采样.
    ///
    /// 仅对未配准的模态 (如弥散) 有意义. 实验性路径, 默认关闭.
    pub resample_by_spacing: bool,
}

/// 将文件原始轴序 (W, H, z) 的数组重定向为轴位 (z, H, W) 轴序.
///
/// 等价于在原始轴序上做首末轴间的 90° 旋转, 再翻转其余两轴:
/// `out[z, h, w] = raw[W-1-w, H-1-h, Z-1-z]`.
fn reorient_axial<T: Clone + Default>(arr: Array3<T>) -> Array3<T> {
    let mut arr = arr;
    arr.swap_axes(0, 2);
    arr.invert_axis(Axis(0));
    arr.invert_axis(Axis(1));
    arr.invert_axis(Axis(2));
    arr.as_standard_layout().to_owned()
}

/// 将数组对称零填充到每轴 [`CUBE_EXTENT`].
///
/// 每轴左侧补 `floor((256-dim)/2)`, 右侧补余量, 保证输出严格为立方体.
/// 任一轴超过上限返回 [`SynthesisError::Oversize`].
fn pad_cube<T: Clone + Default>(arr: Array3<T>) -> Result<Array3<T>> {
    let shape = arr.dim();
    let (d0, d1, d2) = shape;
    if d0 > CUBE_EXTENT || d1 > CUBE_EXTENT || d2 > CUBE_EXTENT {
        return Err(SynthesisError::Oversize {
            shape,
            limit: CUBE_EXTENT,
        });
    }

    let (o0, o1, o2) = (
        (CUBE_EXTENT - d0) / 2,
        (CUBE_EXTENT - d1) / 2,
        (CUBE_EXTENT - d2) / 2,
    );
    let mut out = Array3::from_elem((CUBE_EXTENT, CUBE_EXTENT, CUBE_EXTENT), T::default());
    out.slice_mut(s![o0..o0 + d0, o1..o1 + d1, o2..o2 + d2])
        .assign(&arr);
    Ok(out)
}

/// 按体素物理分辨率做最近邻重采样. `factors` 为各轴毫米分辨率,
/// 输出轴长 = 输入轴长 × 对应因子 (四舍五入, 至少为 1).
fn resample_by_spacing(arr: ArrayView3<'_, f32>, factors: [f64; 3]) -> Array3<f32> {
    let (d0, d1, d2) = arr.dim();
    let out_len = |d: usize, f: f64| ((d as f64 * f).round() as usize).max(1);
    let (n0, n1, n2) = (
        out_len(d0, factors[0]),
        out_len(d1, factors[1]),
        out_len(d2, factors[2]),
    );

    let src = |i: usize, f: f64, d: usize| ((i as f64 / f) as usize).min(d - 1);
    Array3::from_shape_fn((n0, n1, n2), |(i, j, k)| {
        arr[(
            src(i, factors[0], d0),
            src(j, factors[1], d1),
            src(k, factors[2], d2),
        )]
    })
}

/// 将背景体数据规范化为轴位立方体.
pub fn canonicalize_scan(vol: MrVolume, opts: &CanonicalOptions) -> Result<AxialScan> {
    let data = if opts.resample_by_spacing {
        let factors = vol.pix_dim();
        let mut resampled = resample_by_spacing(vol.data(), factors);
        // 重采样后的体数据方向与配准系不符, 翻转第一轴对齐.
        resampled.invert_axis(Axis(0));
        resampled.as_standard_layout().to_owned()
    } else {
        vol.into_data()
    };

    let data = pad_cube(reorient_axial(data))?;
    Ok(AxialScan::from_array(data))
}

/// 将复合分割掩膜规范化为轴位立方体. 掩膜永远不做重采样,
/// 它与配准后的背景在体素上一一对应.
pub fn canonicalize_mask(vol: MaskVolume) -> Result<AxialMask> {
    let data = pad_cube(reorient_axial(vol.into_data()))?;
    Ok(AxialMask::from_array(data))
}

/// 将切片中严格正的强度值归一化到 `[0, 255]`:
/// `v > 0` 映射为 `255 * (v - min) / max`, 非正值保持原样,
/// 避免除法污染背景/零体素.
///
/// `min`/`max` 由调用方给出: 普通序列用整卷范围, 掩膜合成用切片局部范围.
pub fn normalize_intensity(mut arr: ArrayViewMut2<'_, f32>, min: f32, max: f32) {
    if max <= 0.0 {
        return;
    }
    arr.mapv_inplace(|v| {
        if is_positive_intensity(v) {
            GRAY_MAX * (v - min) / max
        } else {
            v
        }
    });
}

/// 将归一化后的浮点切片量化为 8-bit 灰度, 越界值截断.
pub fn to_gray_u8(arr: ndarray::ArrayView2<'_, f32>) -> Array2<u8> {
    arr.mapv(|v| v.clamp(0.0, GRAY_MAX).round() as u8)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array2, Array3};

    #[test]
    fn test_reorient_axial_mapping() {
        // raw 轴序 (W, H, Z) = (2, 3, 4).
        let raw = Array3::from_shape_fn((2, 3, 4), |(w, h, z)| (w * 100 + h * 10 + z) as f32);
        let out = reorient_axial(raw.clone());
        assert_eq!(out.dim(), (4, 3, 2));
        for ((z, h, w), &v) in out.indexed_iter() {
            assert_eq!(v, raw[(1 - w, 2 - h, 3 - z)]);
        }
    }

    #[test]
    fn test_pad_cube_exact_extent() {
        for dim in [(64usize, 64usize, 64usize), (65, 100, 37), (256, 1, 255)] {
            let arr = Array3::<f32>::from_elem(dim, 1.0);
            let padded = pad_cube(arr).unwrap();
            assert_eq!(padded.dim(), (256, 256, 256));
            // 内容总量不变, 其余为零.
            let ones = padded.iter().filter(|v| **v == 1.0).count();
            assert_eq!(ones, dim.0 * dim.1 * dim.2);
        }
    }

    #[test]
    fn test_pad_cube_offsets_floor_left() {
        let mut arr = Array3::<u8>::zeros((65, 64, 64));
        arr[(0, 0, 0)] = 9;
        let padded = pad_cube(arr).unwrap();
        // (256-65)/2 = 95 (向下取整), (256-64)/2 = 96.
        assert_eq!(padded[(95, 96, 96)], 9);
    }

    #[test]
    fn test_pad_cube_oversize_is_fatal() {
        let arr = Array3::<f32>::zeros((257, 10, 10));
        assert!(matches!(
            pad_cube(arr),
            Err(SynthesisError::Oversize { .. })
        ));
    }

    #[test]
    fn test_canonicalize_scan_cube_invariant() {
        // 经由 from_array 模拟已加载体数据的路径在 series 测试中覆盖;
        // 这里直接验证核心组合: 任意合法形状 -> 256 立方体.
        let raw = Array3::from_shape_fn((31, 40, 7), |(w, h, z)| (w + h + z) as f32);
        let out = pad_cube(reorient_axial(raw)).unwrap();
        assert_eq!(out.dim(), (256, 256, 256));
    }

    #[test]
    fn test_normalize_positive_range() {
        let mut arr = Array2::from_shape_vec((1, 4), vec![0.0, 2.0, 5.0, 10.0]).unwrap();
        normalize_intensity(arr.view_mut(), 0.0, 10.0);
        assert_eq!(arr[(0, 0)], 0.0);
        assert_eq!(arr[(0, 3)], 255.0);
        assert_eq!(arr[(0, 1)], 51.0);
    }

    #[test]
    fn test_normalize_leaves_non_positive_untouched() {
        let mut arr = Array2::from_shape_vec((1, 3), vec![-7.0, 0.0, 4.0]).unwrap();
        normalize_intensity(arr.view_mut(), -7.0, 4.0);
        assert_eq!(arr[(0, 0)], -7.0);
        assert_eq!(arr[(0, 1)], 0.0);
        assert!(arr[(0, 2)] > 0.0);
    }

    #[test]
    fn test_normalize_all_zero_is_noop() {
        let mut arr = Array2::<f32>::zeros((2, 2));
        normalize_intensity(arr.view_mut(), 0.0, 0.0);
        assert!(arr.iter().all(|v| *v == 0.0));
    }

    #[test]
    fn test_normalize_idempotent_on_normalized() {
        let mut arr = Array2::from_shape_vec((1, 3), vec![0.0, 4.0, 8.0]).unwrap();
        normalize_intensity(arr.view_mut(), 0.0, 8.0);
        let first = arr.clone();
        normalize_intensity(arr.view_mut(), 0.0, 255.0);
        assert_eq!(arr, first);
    }

    #[test]
    fn test_to_gray_clamps() {
        let arr = Array2::from_shape_vec((1, 3), vec![-3.0, 127.6, 300.0]).unwrap();
        let gray = to_gray_u8(arr.view());
        assert_eq!(gray[(0, 0)], 0);
        assert_eq!(gray[(0, 1)], 128);
        assert_eq!(gray[(0, 2)], 255);
    }

    #[test]
    fn test_resample_identity_factors() {
        let arr = Array3::from_shape_fn((3, 4, 5), |(a, b, c)| (a * 20 + b * 5 + c) as f32);
        let out = resample_by_spacing(arr.view(), [1.0, 1.0, 1.0]);
        assert_eq!(out, arr);
    }

    #[test]
    fn test_resample_doubling() {
        let arr = Array3::from_shape_fn((2, 2, 2), |(a, b, c)| (a * 4 + b * 2 + c) as f32);
        let out = resample_by_spacing(arr.view(), [2.0, 1.0, 1.0]);
        assert_eq!(out.dim(), (4, 2, 2));
        assert_eq!(out[(0, 1, 1)], arr[(0, 1, 1)]);
        assert_eq!(out[(3, 1, 1)], arr[(1, 1, 1)]);
    }
}

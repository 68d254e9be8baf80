//! nii 体数据基础结构.
//!
//! [`MrVolume`] 与 [`MaskVolume`] 按 nifti 文件的原始轴序 (W, H, z) 保存数据;
//! 规范化 (见 [`crate::canonical`]) 之后得到按 (z, H, W) 轴序访问的
//! [`AxialScan`] / [`AxialMask`], 切片沿轴 0 (轴位) 提取.

use std::path::Path;

use itertools::{Itertools, MinMaxResult};
use ndarray::{Array3, ArrayView2, ArrayView3, Axis, Ix3};
use nifti::{IntoNdArray, NiftiHeader, NiftiObject, ReaderOptions};

use crate::error::{Result, SynthesisError};
use crate::{Idx2d, Idx3d};

pub mod slice;

pub use slice::{ImgWriteRgb, RgbSlice};

/// `NiftiHeader` 是栈上大对象, 移动该对象的开销很可观.
/// 因此我们将其分配到堆上.
type BoxedHeader = Box<NiftiHeader>;

/// nii 格式体数据 header 的共用属性.
pub trait VolumeMeta {
    /// 获取 header 部分.
    fn header(&self) -> &NiftiHeader;

    /// 获取原始数据形状, 按 nifti 文件轴序 (W, H, z).
    #[inline]
    fn raw_shape(&self) -> Idx3d {
        let [_, w, h, z, ..] = self.header().dim;
        (w as usize, h as usize, z as usize)
    }

    /// 获取体素分辨率, 以毫米为单位, 按 (W, H, z) 轴序.
    #[inline]
    fn pix_dim(&self) -> [f64; 3] {
        let [_, w, h, z, ..] = self.header().pixdim;
        [w as f64, h as f64, z as f64]
    }
}

/// 把 4D 数组裁剪为第一个 3D 帧, 其余秩原样返回.
fn first_frame<T>(data: ndarray::ArrayD<T>) -> ndarray::ArrayD<T> {
    if data.ndim() == 4 {
        data.index_axis_move(Axis(3), 0)
    } else {
        data
    }
}

/// 把动态维数组固定为 3 维, 秩不符时报 [`SynthesisError::BadRank`].
fn into_rank3<T>(data: ndarray::ArrayD<T>) -> Result<Array3<T>> {
    let rank = data.ndim();
    data.into_dimensionality::<Ix3>()
        .map_err(|_| SynthesisError::BadRank(rank))
}

/// 为 `fake` 构造函数拼一个形状一致的默认 header.
fn fake_header((w, h, z): Idx3d) -> BoxedHeader {
    let mut header = Box::<NiftiHeader>::default();
    header.dim = [3, w as u16, h as u16, z as u16, 1, 1, 1, 1];
    header.pixdim = [1.0; 8];
    header.intent_name[..4].copy_from_slice(b"fake");
    header
}

/// nii 格式 3D MRI 背景体数据, 包括 header 和强度数组. 强度以 `f32` 保存.
///
/// 数据保持文件原始轴序 (W, H, z), 尚未规范化.
#[derive(Debug, Clone)]
pub struct MrVolume {
    header: BoxedHeader,
    data: Array3<f32>,
}

impl VolumeMeta for MrVolume {
    #[inline]
    fn header(&self) -> &NiftiHeader {
        &self.header
    }
}

impl MrVolume {
    /// 打开 nii 文件格式的 3D/4D MRI 体数据. 如果打开成功, 则返回 `Ok(Self)`,
    /// 否则返回 `Err`. 4D 输入只取第一帧.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(SynthesisError::MissingInput(path.to_owned()));
        }
        let obj = ReaderOptions::new().read_file(path)?;
        let header = Box::new(obj.header().clone());

        let data = into_rank3(first_frame(obj.into_volume().into_ndarray::<f32>()?))?;
        Ok(Self { header, data })
    }

    /// 从裸强度数组直接创建实体, header 取默认值并打上 `fake` 标记.
    ///
    /// # 注意
    ///
    /// 该方法可能会创建元信息不一致的实体, 仅用于实验和测试.
    pub fn fake(data: Array3<f32>) -> Self {
        Self {
            header: fake_header(data.dim()),
            data,
        }
    }

    /// 获取数据形状 (文件原始轴序).
    #[inline]
    pub fn dim(&self) -> Idx3d {
        self.data.dim()
    }

    /// 获得数据的一份不可变 shallow copy.
    #[inline]
    pub fn data(&self) -> ArrayView3<'_, f32> {
        self.data.view()
    }

    /// 消耗自身, 取出底层数组.
    #[inline]
    pub fn into_data(self) -> Array3<f32> {
        self.data
    }
}

/// nii 格式 3D 复合分割掩膜, 体素为整数标签. 标签值以 `u8` 保存.
///
/// 数据保持文件原始轴序 (W, H, z), 尚未规范化.
#[derive(Debug, Clone)]
pub struct MaskVolume {
    header: BoxedHeader,
    data: Array3<u8>,
}

impl VolumeMeta for MaskVolume {
    #[inline]
    fn header(&self) -> &NiftiHeader {
        &self.header
    }
}

impl MaskVolume {
    /// 打开 nii 文件格式的复合分割掩膜.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(SynthesisError::MissingInput(path.to_owned()));
        }
        let obj = ReaderOptions::new().read_file(path)?;
        let header = Box::new(obj.header().clone());

        let data = into_rank3(first_frame(obj.into_volume().into_ndarray::<u8>()?))?;
        Ok(Self { header, data })
    }

    /// 从裸标签数组直接创建实体, header 取默认值并打上 `fake` 标记.
    ///
    /// # 注意
    ///
    /// 该方法可能会创建元信息不一致的实体, 仅用于实验和测试.
    pub fn fake(data: Array3<u8>) -> Self {
        Self {
            header: fake_header(data.dim()),
            data,
        }
    }

    /// 获取数据形状 (文件原始轴序).
    #[inline]
    pub fn dim(&self) -> Idx3d {
        self.data.dim()
    }

    /// 获得数据的一份不可变 shallow copy.
    #[inline]
    pub fn data(&self) -> ArrayView3<'_, u8> {
        self.data.view()
    }

    /// 消耗自身, 取出底层数组.
    #[inline]
    pub fn into_data(self) -> Array3<u8> {
        self.data
    }
}

/// 规范化后的轴位背景体数据, 按 (z, H, W) 访问, 每轴长度均为立方体上限.
#[derive(Debug, Clone)]
pub struct AxialScan {
    data: Array3<f32>,
}

/// 规范化后的轴位掩膜体数据, 按 (z, H, W) 访问.
#[derive(Debug, Clone)]
pub struct AxialMask {
    data: Array3<u8>,
}

macro_rules! impl_axial_common {
    ($name: ty, $elem: ty) => {
        impl $name {
            /// 从裸数组直接创建. 正常入口是 [`crate::canonical`] 的规范化;
            /// 该方法用于测试或内存中已有数据的调用方.
            #[inline]
            pub fn from_array(data: Array3<$elem>) -> Self {
                Self { data }
            }

            /// 获取数据形状 (z, H, W).
            #[inline]
            pub fn shape(&self) -> Idx3d {
                self.data.dim()
            }

            /// 获取水平切片个数.
            #[inline]
            pub fn len_z(&self) -> usize {
                self.shape().0
            }

            /// 获取水平切片形状 (H, W).
            #[inline]
            pub fn slice_shape(&self) -> Idx2d {
                let (_, h, w) = self.shape();
                (h, w)
            }

            /// 获取 z 空间的第 `z_index` 层切片视图.
            ///
            /// 当 `z_index` 越界时 panic.
            #[inline]
            pub fn slice_at(&self, z_index: usize) -> ArrayView2<'_, $elem> {
                self.data.index_axis(Axis(0), z_index)
            }

            /// 获取能按升序迭代水平切片的迭代器.
            #[inline]
            pub fn slice_iter(&self) -> impl ExactSizeIterator<Item = ArrayView2<'_, $elem>> {
                self.data.axis_iter(Axis(0))
            }

            /// 获得数据的一份不可变 shallow copy.
            #[inline]
            pub fn data(&self) -> ArrayView3<'_, $elem> {
                self.data.view()
            }
        }
    };
}

impl_axial_common!(AxialScan, f32);
impl_axial_common!(AxialMask, u8);

impl AxialScan {
    /// 求整个体数据的强度范围 (min, max).
    ///
    /// 数据为空时 panic. NaN 体素按全序比较参与排序, 调用方保证输入有效.
    pub fn intensity_range(&self) -> (f32, f32) {
        match self.data.iter().minmax_by(|a, b| a.total_cmp(b)) {
            MinMaxResult::NoElements => panic!("体数据为空, 强度范围无定义"),
            MinMaxResult::OneElement(&v) => (v, v),
            MinMaxResult::MinMax(&min, &max) => (min, max),
        }
    }
}

impl AxialMask {
    /// 获取掩膜中值为 `label` 的体素个数.
    #[inline]
    pub fn count(&self, label: u8) -> usize {
        self.data.iter().filter(|p| **p == label).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array3;

    #[test]
    fn test_axial_scan_accessors() {
        let arr = Array3::from_shape_fn((4, 3, 2), |(z, h, w)| (z * 100 + h * 10 + w) as f32);
        let scan = AxialScan::from_array(arr);
        assert_eq!(scan.shape(), (4, 3, 2));
        assert_eq!(scan.len_z(), 4);
        assert_eq!(scan.slice_shape(), (3, 2));
        assert_eq!(scan.slice_at(2)[(1, 1)], 211.0);
        assert_eq!(scan.slice_iter().len(), 4);
    }

    #[test]
    fn test_intensity_range() {
        let mut arr = Array3::zeros((2, 2, 2));
        arr[(0, 0, 0)] = -3.0;
        arr[(1, 1, 1)] = 7.5;
        let scan = AxialScan::from_array(arr);
        assert_eq!(scan.intensity_range(), (-3.0, 7.5));
    }

    #[test]
    fn test_mask_count() {
        let mut arr = Array3::zeros((2, 2, 2));
        arr[(0, 1, 0)] = 4;
        arr[(1, 0, 1)] = 4;
        arr[(1, 1, 1)] = 2;
        let mask = AxialMask::from_array(arr);
        assert_eq!(mask.count(4), 2);
        assert_eq!(mask.count(2), 1);
        assert_eq!(mask.count(1), 0);
    }

    #[test]
    fn test_missing_file_is_fatal() {
        let err = MrVolume::open("/definitely/not/there.nii.gz").unwrap_err();
        assert!(matches!(
            err,
            crate::error::SynthesisError::MissingInput(_)
        ));
    }
}

//! 合成后 RGB 切片与其持久化预览.

use std::path::Path;

use image::ImageResult;
use ndarray::{Array3, ArrayView3};

use crate::Idx2d;

/// 一张合成完毕的 RGB 切片, 按 (H, W, 3) 存储, 每通道 8 bit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RgbSlice {
    data: Array3<u8>,
}

impl RgbSlice {
    /// 直接初始化. `data` 的第三轴长度必须为 3, 否则 panic.
    #[inline]
    pub fn new(data: Array3<u8>) -> Self {
        assert_eq!(data.dim().2, 3, "RGB 切片第三轴长度必须为 3");
        Self { data }
    }

    /// 获取切片形状 (H, W).
    #[inline]
    pub fn shape(&self) -> Idx2d {
        let (h, w, _) = self.data.dim();
        (h, w)
    }

    /// 获得底层数据的一份不可变 shallow copy.
    #[inline]
    pub fn data(&self) -> ArrayView3<'_, u8> {
        self.data.view()
    }

    /// 按行优先序取出 RGB 交织裸字节, 可直接作为 DICOM 像素数据.
    pub fn to_bytes(&self) -> Vec<u8> {
        if self.data.is_standard_layout() {
            self.data.iter().copied().collect()
        } else {
            self.data.as_standard_layout().iter().copied().collect()
        }
    }
}

/// 表明一个 RGB 图像对象可以按普通光栅图格式持久化存储.
///
/// 该路径仅用于人工快速预览; 正式输出走 DICOM 实例合成.
pub trait ImgWriteRgb {
    /// 将图片按原样保存到 `path` 路径, 格式由扩展名决定.
    fn save_rgb<P: AsRef<Path>>(&self, path: P) -> ImageResult<()>;
}

impl ImgWriteRgb for RgbSlice {
    fn save_rgb<P: AsRef<Path>>(&self, path: P) -> ImageResult<()> {
        let (height, width) = self.shape();
        let mut buf = image::RgbImage::new(width as u32, height as u32);
        for ((h, w, c), &v) in self.data.indexed_iter() {
            buf.get_pixel_mut(w as u32, h as u32).0[c] = v;
        }
        buf.save(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array3;

    #[test]
    fn test_to_bytes_row_major_interleaved() {
        let mut arr = Array3::zeros((1, 2, 3));
        // 像素 (0,0) = (1,2,3), 像素 (0,1) = (4,5,6).
        for c in 0..3 {
            arr[(0, 0, c)] = (c + 1) as u8;
            arr[(0, 1, c)] = (c + 4) as u8;
        }
        let slice = RgbSlice::new(arr);
        assert_eq!(slice.to_bytes(), vec![1, 2, 3, 4, 5, 6]);
    }

    #[test]
    #[should_panic]
    fn test_reject_non_rgb_third_axis() {
        let _ = RgbSlice::new(Array3::zeros((2, 2, 4)));
    }

    #[test]
    fn test_save_rgb_png_preview() {
        let dir = std::env::temp_dir().join("mr-berry-slice-test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("preview.png");

        let slice = RgbSlice::new(Array3::from_shape_fn((8, 8, 3), |(i, j, c)| {
            (i * 16 + j * 2 + c) as u8
        }));
        slice.save_rgb(&path).unwrap();
        assert!(path.is_file());

        let reopened = image::open(&path).unwrap().to_rgb8();
        assert_eq!(reopened.dimensions(), (8, 8));
        assert_eq!(reopened.get_pixel(1, 0).0, [2, 3, 4]);
    }
}

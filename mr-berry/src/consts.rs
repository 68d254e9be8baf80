//! 通用常量.

/// 规范化后立方体体积的每轴长度.
pub const CUBE_EXTENT: usize = 256;

/// 规范化后灰度上限. 归一化把严格正值映射到 `[0, GRAY_MAX]`.
pub const GRAY_MAX: f32 = 255.0;

/// 混合时背景切片的权重. 背景占主导, 掩膜着色只作轻微染色.
pub const BLEND_BACKGROUND: f32 = 0.7;

/// 混合时掩膜彩色切片的权重.
pub const BLEND_MASK: f32 = 1.0 - BLEND_BACKGROUND;

/// 图例色键合成的灰度阈值. 灰度严格大于该值的图例像素视为内容,
/// 会完整覆盖其下的混合像素.
pub const LEGEND_THRESHOLD: f32 = 10.0;

/// RGB 通道颜色与掩膜通道编码.
pub mod rgb {
    /// 三通道像素.
    pub type Rgb = [u8; 3];

    /// 掩膜指示通道中 "命中" 的像素值.
    pub const MASK_SET: u8 = 255;

    /// 增强肿瘤区 (enhancing tumor) 对应的解码通道.
    pub const CHANNEL_ENHANCING: usize = 0;

    /// 全肿瘤区 (whole tumor, 对应水肿显示) 对应的解码通道.
    pub const CHANNEL_WHOLE: usize = 1;

    /// 肿瘤核心区 (tumor core, 对应非增强显示) 对应的解码通道.
    pub const CHANNEL_CORE: usize = 2;

    /// 图例文字颜色.
    pub const WHITE: Rgb = [255, 255, 255];

    /// 水肿色块.
    pub const GREEN: Rgb = [0, 255, 0];

    /// 增强区色块.
    pub const RED: Rgb = [255, 0, 0];

    /// 非增强区色块.
    pub const BLUE: Rgb = [0, 0, 255];
}

/// 统计显示约定.
pub mod stats {
    /// 弥散模态的强度单位.
    pub const UNIT_DIFFUSION: &str = "1e-3 mm²/s";

    /// 灌注模态的强度单位.
    pub const UNIT_PERFUSION: &str = "ml/100ml";

    /// 体积量水肿区的固定显示不确定度后缀.
    pub const UNCERTAINTY_EDEMA: &str = "+/-6.3";

    /// 体积量增强区的固定显示不确定度后缀.
    pub const UNCERTAINTY_ENHANCING: &str = "+/-13.2";

    /// 体积量非增强区的固定显示不确定度后缀.
    pub const UNCERTAINTY_NON_ENHANCING: &str = "+/-2.7";
}

/// 图例免责声明第一行.
pub const DISCLAIMER_LINE_1: &str = "FOR RESEARCH ONLY;";

/// 图例免责声明第二行.
pub const DISCLAIMER_LINE_2: &str = "REFER TO OFFICIAL REPORT FOR DETAILS";

/// 图例标题.
pub const LEGEND_HEADER: &str = "Legend";

/// 像素是否是严格正的有效强度?
#[inline]
pub fn is_positive_intensity(v: f32) -> bool {
    v > 0.0
}

/// 求 RGB 像素的灰度值 (ITU-R BT.601 亮度权重).
#[inline]
pub fn luma(r: u8, g: u8, b: u8) -> f32 {
    0.299 * r as f32 + 0.587 * g as f32 + 0.114 * b as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blend_weights_sum_to_one() {
        assert!((BLEND_BACKGROUND + BLEND_MASK - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_luma_extremes() {
        assert_eq!(luma(0, 0, 0), 0.0);
        assert!((luma(255, 255, 255) - 255.0).abs() < 0.1);
        // 纯蓝色块也必须超过图例阈值.
        assert!(luma(0, 0, 255) > LEGEND_THRESHOLD);
    }
}

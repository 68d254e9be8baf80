//! 注释图例位图: 免责声明 + 色块图例 + 统计文字.
//!
//! 每个 (模态, 统计) 对只渲染一次, 之后对该模态所有切片复用.
//! 所有版面位置都按切片高宽的分数表达, 图例随切片几何等比缩放.
//! 文字用内嵌 5×7 点阵字体绘制, 不依赖外部字体文件.

use ndarray::{Array3, ArrayView3};

use crate::consts::rgb::{Rgb, BLUE, GREEN, RED, WHITE};
use crate::consts::{DISCLAIMER_LINE_1, DISCLAIMER_LINE_2, LEGEND_HEADER};
use crate::stats::RegionStatistics;
use crate::Idx2d;

/// 字符单元宽 (5 列点阵 + 1 列间距).
const CHAR_W: usize = 6;

/// 字符单元高 (7 行点阵 + 2 行间距).
const CHAR_H: usize = 9;

/// 内嵌 5×7 点阵字体, ASCII 32..=126 共 95 个字形.
/// 每个字形 7 行, 每行低 5 位是像素 (最高位在左).
#[rustfmt::skip]
const FONT_5X7: [[u8; 7]; 95] = [
    [0x00,0x00,0x00,0x00,0x00,0x00,0x00], // 32 ' '
    [0x04,0x04,0x04,0x04,0x04,0x00,0x04], // 33 '!'
    [0x0A,0x0A,0x0A,0x00,0x00,0x00,0x00], // 34 '"'
    [0x0A,0x0A,0x1F,0x0A,0x1F,0x0A,0x0A], // 35 '#'
    [0x04,0x0F,0x14,0x0E,0x05,0x1E,0x04], // 36 '$'
    [0x18,0x19,0x02,0x04,0x08,0x13,0x03], // 37 '%'
    [0x0C,0x12,0x14,0x08,0x15,0x12,0x0D], // 38 '&'
    [0x04,0x04,0x08,0x00,0x00,0x00,0x00], // 39 '''
    [0x02,0x04,0x08,0x08,0x08,0x04,0x02], // 40 '('
    [0x08,0x04,0x02,0x02,0x02,0x04,0x08], // 41 ')'
    [0x00,0x04,0x15,0x0E,0x15,0x04,0x00], // 42 '*'
    [0x00,0x04,0x04,0x1F,0x04,0x04,0x00], // 43 '+'
    [0x00,0x00,0x00,0x00,0x00,0x04,0x08], // 44 ','
    [0x00,0x00,0x00,0x1F,0x00,0x00,0x00], // 45 '-'
    [0x00,0x00,0x00,0x00,0x00,0x00,0x04], // 46 '.'
    [0x00,0x01,0x02,0x04,0x08,0x10,0x00], // 47 '/'
    [0x0E,0x11,0x13,0x15,0x19,0x11,0x0E], // 48 '0'
    [0x04,0x0C,0x04,0x04,0x04,0x04,0x0E], // 49 '1'
    [0x0E,0x11,0x01,0x02,0x04,0x08,0x1F], // 50 '2'
    [0x1F,0x02,0x04,0x02,0x01,0x11,0x0E], // 51 '3'
    [0x02,0x06,0x0A,0x12,0x1F,0x02,0x02], // 52 '4'
    [0x1F,0x10,0x1E,0x01,0x01,0x11,0x0E], // 53 '5'
    [0x06,0x08,0x10,0x1E,0x11,0x11,0x0E], // 54 '6'
    [0x1F,0x01,0x02,0x04,0x08,0x08,0x08], // 55 '7'
    [0x0E,0x11,0x11,0x0E,0x11,0x11,0x0E], // 56 '8'
    [0x0E,0x11,0x11,0x0F,0x01,0x02,0x0C], // 57 '9'
    [0x00,0x00,0x04,0x00,0x00,0x04,0x00], // 58 ':'
    [0x00,0x00,0x04,0x00,0x00,0x04,0x08], // 59 ';'
    [0x02,0x04,0x08,0x10,0x08,0x04,0x02], // 60 '<'
    [0x00,0x00,0x1F,0x00,0x1F,0x00,0x00], // 61 '='
    [0x08,0x04,0x02,0x01,0x02,0x04,0x08], // 62 '>'
    [0x0E,0x11,0x01,0x02,0x04,0x00,0x04], // 63 '?'
    [0x0E,0x11,0x17,0x15,0x17,0x10,0x0E], // 64 '@'
    [0x0E,0x11,0x11,0x1F,0x11,0x11,0x11], // 65 'A'
    [0x1E,0x11,0x11,0x1E,0x11,0x11,0x1E], // 66 'B'
    [0x0E,0x11,0x10,0x10,0x10,0x11,0x0E], // 67 'C'
    [0x1C,0x12,0x11,0x11,0x11,0x12,0x1C], // 68 'D'
    [0x1F,0x10,0x10,0x1E,0x10,0x10,0x1F], // 69 'E'
    [0x1F,0x10,0x10,0x1E,0x10,0x10,0x10], // 70 'F'
    [0x0E,0x11,0x10,0x17,0x11,0x11,0x0F], // 71 'G'
    [0x11,0x11,0x11,0x1F,0x11,0x11,0x11], // 72 'H'
    [0x0E,0x04,0x04,0x04,0x04,0x04,0x0E], // 73 'I'
    [0x07,0x02,0x02,0x02,0x02,0x12,0x0C], // 74 'J'
    [0x11,0x12,0x14,0x18,0x14,0x12,0x11], // 75 'K'
    [0x10,0x10,0x10,0x10,0x10,0x10,0x1F], // 76 'L'
    [0x11,0x1B,0x15,0x15,0x11,0x11,0x11], // 77 'M'
    [0x11,0x11,0x19,0x15,0x13,0x11,0x11], // 78 'N'
    [0x0E,0x11,0x11,0x11,0x11,0x11,0x0E], // 79 'O'
    [0x1E,0x11,0x11,0x1E,0x10,0x10,0x10], // 80 'P'
    [0x0E,0x11,0x11,0x11,0x15,0x12,0x0D], // 81 'Q'
    [0x1E,0x11,0x11,0x1E,0x14,0x12,0x11], // 82 'R'
    [0x0F,0x10,0x10,0x0E,0x01,0x01,0x1E], // 83 'S'
    [0x1F,0x04,0x04,0x04,0x04,0x04,0x04], // 84 'T'
    [0x11,0x11,0x11,0x11,0x11,0x11,0x0E], // 85 'U'
    [0x11,0x11,0x11,0x11,0x11,0x0A,0x04], // 86 'V'
    [0x11,0x11,0x11,0x15,0x15,0x1B,0x11], // 87 'W'
    [0x11,0x11,0x0A,0x04,0x0A,0x11,0x11], // 88 'X'
    [0x11,0x11,0x0A,0x04,0x04,0x04,0x04], // 89 'Y'
    [0x1F,0x01,0x02,0x04,0x08,0x10,0x1F], // 90 'Z'
    [0x0E,0x08,0x08,0x08,0x08,0x08,0x0E], // 91 '['
    [0x00,0x10,0x08,0x04,0x02,0x01,0x00], // 92 '\'
    [0x0E,0x02,0x02,0x02,0x02,0x02,0x0E], // 93 ']'
    [0x04,0x0A,0x11,0x00,0x00,0x00,0x00], // 94 '^'
    [0x00,0x00,0x00,0x00,0x00,0x00,0x1F], // 95 '_'
    [0x08,0x04,0x02,0x00,0x00,0x00,0x00], // 96 '`'
    [0x00,0x00,0x0E,0x01,0x0F,0x11,0x0F], // 97 'a'
    [0x10,0x10,0x16,0x19,0x11,0x11,0x1E], // 98 'b'
    [0x00,0x00,0x0E,0x10,0x10,0x11,0x0E], // 99 'c'
    [0x01,0x01,0x0D,0x13,0x11,0x11,0x0F], // 100 'd'
    [0x00,0x00,0x0E,0x11,0x1F,0x10,0x0E], // 101 'e'
    [0x06,0x09,0x08,0x1C,0x08,0x08,0x08], // 102 'f'
    [0x00,0x00,0x0F,0x11,0x0F,0x01,0x0E], // 103 'g'
    [0x10,0x10,0x16,0x19,0x11,0x11,0x11], // 104 'h'
    [0x04,0x00,0x0C,0x04,0x04,0x04,0x0E], // 105 'i'
    [0x02,0x00,0x06,0x02,0x02,0x12,0x0C], // 106 'j'
    [0x10,0x10,0x12,0x14,0x18,0x14,0x12], // 107 'k'
    [0x0C,0x04,0x04,0x04,0x04,0x04,0x0E], // 108 'l'
    [0x00,0x00,0x1A,0x15,0x15,0x11,0x11], // 109 'm'
    [0x00,0x00,0x16,0x19,0x11,0x11,0x11], // 110 'n'
    [0x00,0x00,0x0E,0x11,0x11,0x11,0x0E], // 111 'o'
    [0x00,0x00,0x1E,0x11,0x1E,0x10,0x10], // 112 'p'
    [0x00,0x00,0x0D,0x13,0x0F,0x01,0x01], // 113 'q'
    [0x00,0x00,0x16,0x19,0x10,0x10,0x10], // 114 'r'
    [0x00,0x00,0x0E,0x10,0x0E,0x01,0x1E], // 115 's'
    [0x08,0x08,0x1C,0x08,0x08,0x09,0x06], // 116 't'
    [0x00,0x00,0x11,0x11,0x11,0x13,0x0D], // 117 'u'
    [0x00,0x00,0x11,0x11,0x11,0x0A,0x04], // 118 'v'
    [0x00,0x00,0x11,0x11,0x15,0x15,0x0A], // 119 'w'
    [0x00,0x00,0x11,0x0A,0x04,0x0A,0x11], // 120 'x'
    [0x00,0x00,0x11,0x11,0x0F,0x01,0x0E], // 121 'y'
    [0x00,0x00,0x1F,0x02,0x04,0x08,0x1F], // 122 'z'
    [0x02,0x04,0x04,0x08,0x04,0x04,0x02], // 123 '{'
    [0x04,0x04,0x04,0x04,0x04,0x04,0x04], // 124 '|'
    [0x08,0x04,0x04,0x02,0x04,0x04,0x08], // 125 '}'
    [0x00,0x00,0x08,0x15,0x02,0x00,0x00], // 126 '~'
];

/// 固定尺寸的注释位图, 渲染一次后不可变.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LegendBitmap {
    data: Array3<u8>,
}

impl LegendBitmap {
    /// 为一个模态的区域统计渲染图例. `slice_shape` 为目标切片的 (H, W).
    ///
    /// 输入相同则输出逐位相同.
    pub fn render(stats: &RegionStatistics, slice_shape: Idx2d) -> Self {
        let (h, w) = slice_shape;
        let mut data = Array3::zeros((h, w, 3));

        // 免责声明.
        draw_text(&mut data, (w / 20, h / 10), DISCLAIMER_LINE_1, WHITE);
        draw_text(&mut data, (w / 20, h * 14 / 100), DISCLAIMER_LINE_2, WHITE);

        // 图例标题与色块. 色块行区间与统计行文字纵向对齐.
        draw_text(&mut data, (w / 30, h * 825 / 1000), LEGEND_HEADER, WHITE);
        fill_rect(&mut data, w / 30..w * 3 / 30, h * 85 / 100..h * 875 / 1000, GREEN);
        fill_rect(&mut data, w / 30..w * 3 / 30, h * 89 / 100..h * 915 / 1000, RED);
        fill_rect(&mut data, w / 30..w * 3 / 30, h * 93 / 100..h * 955 / 1000, BLUE);

        // 统计行.
        let text_x = w * 35 / 300;
        draw_text(&mut data, (text_x, h * 875 / 1000), &stats.edema_line(), WHITE);
        draw_text(&mut data, (text_x, h * 915 / 1000), &stats.enhancing_line(), WHITE);
        draw_text(
            &mut data,
            (text_x, h * 955 / 1000),
            &stats.non_enhancing_line(),
            WHITE,
        );
        draw_text(&mut data, (text_x, h * 995 / 1000), "Enhancing", WHITE);

        Self { data }
    }

    /// 获取位图形状 (H, W).
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

    /// 获取 (h, w) 处的 RGB 像素.
    #[inline]
    pub fn pixel(&self, h: usize, w: usize) -> Rgb {
        [self.data[(h, w, 0)], self.data[(h, w, 1)], self.data[(h, w, 2)]]
    }
}

/// 写入单个像素. 越界直接忽略.
#[inline]
fn set_pixel(data: &mut Array3<u8>, h: usize, w: usize, color: Rgb) {
    let (height, width, _) = data.dim();
    if h < height && w < width {
        for (c, &v) in color.iter().enumerate() {
            data[(h, w, c)] = v;
        }
    }
}

/// 填充实心矩形, 列区间 × 行区间.
fn fill_rect(
    data: &mut Array3<u8>,
    cols: std::ops::Range<usize>,
    rows: std::ops::Range<usize>,
    color: Rgb,
) {
    for h in rows {
        for w in cols.clone() {
            set_pixel(data, h, w, color);
        }
    }
}

/// 绘制单个字符, `(x, y)` 为字符基线 (左下角), 与版面分数坐标对齐.
fn draw_char(data: &mut Array3<u8>, x: usize, y: usize, ch: char, color: Rgb) {
    let code = ch as u32;
    if !(32..=126).contains(&code) {
        return;
    }
    let glyph = &FONT_5X7[(code - 32) as usize];
    let top = y.saturating_sub(CHAR_H);
    for (row, &bits) in glyph.iter().enumerate() {
        for col in 0..5usize {
            if bits & (0x10 >> col) != 0 {
                set_pixel(data, top + row, x + col, color);
            }
        }
    }
}

/// 绘制一行文字, `(x, y)` 为首字符基线.
fn draw_text(data: &mut Array3<u8>, (x, y): Idx2d, text: &str, color: Rgb) {
    for (i, ch) in text.chars().enumerate() {
        draw_char(data, x + i * CHAR_W, y, ch, color);
    }
}

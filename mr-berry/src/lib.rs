#![warn(missing_docs)] // <= 合适时移除它.

//! 核心库. 把体数据格式的脑部 MRI 与肿瘤分割掩膜合成为可供影像科审阅的
//! DICOM 注释切片序列.
//!
//! 流水线各环节: 体数据规范化 (轴位重定向 + 立方体填充 + 强度归一化)
//! -> 复合掩膜解码 -> 区域统计 -> 图例渲染 -> 切片合成 (混合 + 色键叠加)
//! -> DICOM 实例合成. 配准、颅骨剥离、模型推理等外部协作步骤
//! **不在** 本 crate 内, 只消费它们落盘的结果.
//!
//! # 注意
//!
//! 1. 标签方案 ([`config::LabelScheme`]) 必须由调用方按分割模型代际
//!   显式选择. 已知两代模型对同一亚区使用不同整数标签.
//! 2. 在非期望情况下 (下标越界等编程错误), 程序会直接 panic,
//!   而不会导致内存错误. As what Rust promises.
//!
//! # 功能清单
//!
//! ### 体数据规范化 ✅
//!
//! 重定向到轴位、对称零填充到 256³、正值强度归一化.
//! 实现位于 `src/canonical.rs`.
//!
//! ### 复合掩膜解码 ✅
//!
//! 整数标签按方案精确相等测试, 解码为三通道二值指示数组.
//! 实现位于 `src/decode.rs`.
//!
//! ### 区域统计 ✅
//!
//! 强度类模态计算区域平均强度, 其余模态透传体积量;
//! 聚合记录一次性落盘. 实现位于 `src/stats.rs`.
//!
//! ### 图例渲染 ✅
//!
//! 内嵌点阵字体, 版面按切片高宽分数定位. 实现位于 `src/legend.rs`.
//!
//! ### 切片合成 ✅
//!
//! 归一化 + 定权混合 + 二值阈值色键叠加; 惰性可重启切片序列.
//! 实现位于 `src/composite.rs`.
//!
//! ### DICOM 实例合成 ✅
//!
//! 模板按值克隆, 覆写几何/光度/身份字段, 重建文件元信息.
//! 实现位于 `src/dicom`.
//!
//! ### 序列装配 ✅
//!
//! 普通序列与掩膜序列; `rayon` feature 下按切片并行.
//! 实现位于 `src/series.rs`.

/// 二维索引, 同时也可一定程度上用作非负整数向量.
pub type Idx2d = (usize, usize);

/// 三维索引, 同时也可一定程度上用作非负整数向量.
pub type Idx3d = (usize, usize, usize);

/// nii 体数据基础数据结构.
pub mod data;

pub use data::{AxialMask, AxialScan, ImgWriteRgb, MaskVolume, MrVolume, RgbSlice, VolumeMeta};

pub mod canonical;
pub mod composite;
pub mod config;
pub mod consts;
pub mod decode;
pub mod dicom;
pub mod error;
pub mod legend;
pub mod prelude;
pub mod series;
pub mod stats;

//! DICOM 输出实例合成.
//!
//! 每个实例从同一个模板克隆描述性元数据, 覆写几何/光度/身份字段,
//! 再挂接一张合成切片的像素数据. 模板只读, 绝不回写.

use std::path::{Path, PathBuf};

use dicom::core::{DataElement, PrimitiveValue, VR};
use dicom::object::{open_file, FileMetaTableBuilder, InMemDicomObject};
use dicom_dictionary_std::tags;

use crate::data::RgbSlice;
use crate::error::{Result, SynthesisError};

/// 输出实例统一使用显式 VR 小端传输语法.
const EXPLICIT_VR_LE: &str = "1.2.840.10008.1.2.1";

/// 生成一个全新的 DICOM UID, 取 UUID 派生的 `2.25.{十进制 128 位}` 形式.
pub fn new_uid() -> String {
    format!("2.25.{}", uuid::Uuid::new_v4().as_u128())
}

/// 作为元数据来源的模板实例. 打开后只读.
#[derive(Debug, Clone)]
pub struct DicomTemplate {
    inner: InMemDicomObject,
    sop_class_uid: String,
}

impl DicomTemplate {
    /// 从文件打开模板实例.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(SynthesisError::MissingInput(path.to_owned()));
        }
        let obj = open_file(path)?;
        let sop_class_uid = obj
            .meta()
            .media_storage_sop_class_uid
            .trim_end_matches('\0')
            .trim()
            .to_owned();
        Ok(Self {
            inner: obj.into_inner(),
            sop_class_uid,
        })
    }

    /// 由内存对象直接构造模板. 用于测试或上游已解析好的场景.
    #[inline]
    pub fn from_parts(inner: InMemDicomObject, sop_class_uid: String) -> Self {
        Self {
            inner,
            sop_class_uid,
        }
    }

    /// 模板的 SOP Class UID, 输出实例的文件元信息沿用它.
    #[inline]
    pub fn sop_class_uid(&self) -> &str {
        &self.sop_class_uid
    }

    /// 模板的检查号 (Accession Number), 用于输出目录分组.
    pub fn accession_number(&self) -> Option<String> {
        let value = self
            .inner
            .element(tags::ACCESSION_NUMBER)
            .ok()?
            .to_str()
            .ok()?
            .trim()
            .to_owned();
        (!value.is_empty()).then_some(value)
    }
}

/// 覆写几何/光度/身份字段并挂接像素数据, 产出一个新实例.
///
/// 模板字段 **按值** 全量复制, 新实例与模板之间没有任何共享;
/// 除覆写字段外的模板元数据原样继承.
pub fn synthesize_instance(
    slice: &RgbSlice,
    template: &DicomTemplate,
    series_uid: &str,
    description: &str,
    slice_idx: usize,
) -> InMemDicomObject {
    let (rows, columns) = slice.shape();
    let mut obj = template.inner.clone();

    // 身份字段: 序列共享, 实例独立.
    obj.put(DataElement::new(
        tags::SERIES_INSTANCE_UID,
        VR::UI,
        PrimitiveValue::from(series_uid),
    ));
    obj.put(DataElement::new(
        tags::SERIES_DESCRIPTION,
        VR::LO,
        PrimitiveValue::from(description.to_uppercase()),
    ));
    obj.put(DataElement::new(
        tags::SOP_INSTANCE_UID,
        VR::UI,
        PrimitiveValue::from(new_uid()),
    ));

    // 输出为二次生成的衍生图像.
    obj.put(DataElement::new(
        tags::IMAGE_TYPE,
        VR::CS,
        PrimitiveValue::from("DERIVED\\SECONDARY"),
    ));

    // 几何: 行列来自切片形状, 方向固定为轴位.
    obj.put(DataElement::new(
        tags::ROWS,
        VR::US,
        PrimitiveValue::from(rows as u16),
    ));
    obj.put(DataElement::new(
        tags::COLUMNS,
        VR::US,
        PrimitiveValue::from(columns as u16),
    ));
    obj.put(DataElement::new(
        tags::IMAGE_ORIENTATION_PATIENT,
        VR::DS,
        PrimitiveValue::from("1\\0\\0\\0\\1\\0"),
    ));
    obj.put(DataElement::new(
        tags::IMAGE_POSITION_PATIENT,
        VR::DS,
        PrimitiveValue::from(format!("0\\0\\{slice_idx}")),
    ));
    obj.put(DataElement::new(
        tags::INSTANCE_NUMBER,
        VR::IS,
        PrimitiveValue::from((slice_idx + 1).to_string()),
    ));

    // 光度: 8-bit 三通道真彩, 位深固定, 不继承模板.
    obj.put(DataElement::new(
        tags::PHOTOMETRIC_INTERPRETATION,
        VR::CS,
        PrimitiveValue::from("RGB"),
    ));
    obj.put(DataElement::new(
        tags::SAMPLES_PER_PIXEL,
        VR::US,
        PrimitiveValue::from(3_u16),
    ));
    obj.put(DataElement::new(
        tags::BITS_ALLOCATED,
        VR::US,
        PrimitiveValue::from(8_u16),
    ));
    obj.put(DataElement::new(
        tags::BITS_STORED,
        VR::US,
        PrimitiveValue::from(8_u16),
    ));
    obj.put(DataElement::new(
        tags::HIGH_BIT,
        VR::US,
        PrimitiveValue::from(7_u16),
    ));
    obj.put(DataElement::new(
        tags::PIXEL_REPRESENTATION,
        VR::US,
        PrimitiveValue::from(0_u16),
    ));
    obj.put(DataElement::new(
        tags::PLANAR_CONFIGURATION,
        VR::US,
        PrimitiveValue::from(0_u16),
    ));

    // 显示窗: 与归一化强度范围匹配的中灰窗.
    obj.put(DataElement::new(
        tags::WINDOW_CENTER,
        VR::DS,
        PrimitiveValue::from("128"),
    ));
    obj.put(DataElement::new(
        tags::WINDOW_WIDTH,
        VR::DS,
        PrimitiveValue::from("256"),
    ));

    // 模板可能携带的过期像素描述字段.
    for tag in [
        tags::NUMBER_OF_FRAMES,
        tags::PIXEL_ASPECT_RATIO,
        tags::SMALLEST_IMAGE_PIXEL_VALUE,
        tags::LARGEST_IMAGE_PIXEL_VALUE,
    ] {
        obj.remove_element(tag);
    }

    obj.put(DataElement::new(
        tags::PIXEL_DATA,
        VR::OB,
        PrimitiveValue::from(slice.to_bytes()),
    ));

    obj
}

/// 以 `{label}_{1 起切片号}.dcm` 命名写出实例, 文件元信息重建为
/// 显式 VR 小端. 返回写出的文件路径.
pub fn write_instance(
    obj: InMemDicomObject,
    sop_class_uid: &str,
    out_dir: &Path,
    label: &str,
    slice_idx: usize,
) -> Result<PathBuf> {
    let sop_instance_uid = obj
        .element(tags::SOP_INSTANCE_UID)
        .ok()
        .and_then(|e| e.to_str().ok().map(|s| s.trim().to_owned()))
        .ok_or_else(|| {
            SynthesisError::DicomMeta("instance is missing its sop instance uid".to_owned())
        })?;

    let meta = FileMetaTableBuilder::new()
        .transfer_syntax(EXPLICIT_VR_LE)
        .media_storage_sop_class_uid(sop_class_uid)
        .media_storage_sop_instance_uid(sop_instance_uid);

    let file_obj = obj
        .with_meta(meta)
        .map_err(|e| SynthesisError::DicomMeta(e.to_string()))?;

    let path = out_dir.join(format!("{}_{}.dcm", label, slice_idx + 1));
    file_obj.write_to_file(&path)?;
    Ok(path)
}

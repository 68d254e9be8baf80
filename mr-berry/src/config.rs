//! 运行配置: 标签方案与模态名称表.
//!
//! 两者都是 **显式传入** 的值对象: 不同代分割模型对同一肿瘤亚区使用
//! 不同的整数标签, 调用方必须按模型版本显式选择方案, 程序不做推断.

use std::collections::BTreeMap;
use std::path::Path;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// 复合分割掩膜的标签方案: 肿瘤亚区 -> 整数标签.
///
/// 已知的两代方案对同一亚区给出了 **不同** 的整数值,
/// 因此该结构绝不能退化为全局常量.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct LabelScheme {
    /// 增强肿瘤区标签值.
    pub enhancing: u8,

    /// 全肿瘤区标签值.
    pub whole: u8,

    /// 肿瘤核心区标签值.
    pub core: u8,
}

impl LabelScheme {
    /// MSNet 代模型的标签方案.
    #[inline]
    pub const fn msnet() -> Self {
        Self {
            enhancing: 4,
            whole: 2,
            core: 1,
        }
    }

    /// nnU-Net 代模型的标签方案.
    #[inline]
    pub const fn nnunet() -> Self {
        Self {
            enhancing: 1,
            whole: 2,
            core: 3,
        }
    }

    /// 三个标签值是否两两不同?
    ///
    /// 非单射方案会使解码通道重叠, 调用方应拒绝这样的输入.
    #[inline]
    pub fn is_injective(&self) -> bool {
        self.enhancing != self.whole && self.whole != self.core && self.enhancing != self.core
    }
}

/// 模态名称表: 规范模态名 -> 该模态已知的序列描述别名集合.
///
/// 启动时加载一次, 之后按引用传递, 不再修改.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModalityTable {
    aliases: BTreeMap<String, Vec<String>>,
}

/// 内置默认模态名称表.
static DEFAULT_MODALITIES: Lazy<ModalityTable> = Lazy::new(|| {
    let mut aliases = BTreeMap::new();
    let mut put = |name: &str, list: &[&str]| {
        aliases.insert(
            name.to_owned(),
            list.iter().map(|s| (*s).to_owned()).collect(),
        );
    };

    put(
        "t1ce",
        &[
            "SAG_MPR",
            "AX_3D_MPR",
            "AX_MPR_FBH",
            "SAG_3D_MPR",
            "SAG_CS_MPRAGE",
            "T1_3D_POST",
            "T1CE",
            "CS_MPRAGE",
            "SAG_3D_MPR_1MMiso_gw",
            "SAG_MPR_ISO",
            "AX_3D_MPR_ISO",
            "AX_3D_MPR_ISO_FBH",
        ],
    );
    put("t1", &["AX_T1_PRE", "AX_T1", "T1", "SAG MPR PRE"]);
    put(
        "t2",
        &[
            "AX_T2",
            "SAG_T2_SPACE",
            "3D_T2_SPACE",
            "BRAIN_MAPPING_T2_SPACE",
            "SAG_3D_T2",
            "Head_AX_PD_T2",
            "T2",
        ],
    );
    put(
        "flair",
        &[
            "SAG_3D_FLAIR",
            "CS_3D_FLAIR_SPACE",
            "BRAIN_MAPPING_FLAIR_SPACE",
            "SAG_FLAIR_SPACE",
            "3D_FLAIR_SPACE",
            "SAG_SPACE_FLAIR",
            "SAG_3D_FLAIR_SPACE",
            "SPACE_FLAIR",
            "SAG_SPACE_FLAIR_256_FOV",
            "SPACE_3D_FLAIR",
            "SAG_FLAIR_SPACE_(if_no_SPACE_then_SAG_FLAIR)",
            "AX_FLAIR",
            "FLAIR",
            "FL",
            "SAG_3D_FLAIR_CS4",
        ],
    );
    put(
        "diffusion",
        &[
            "Diffusion_1e-3mm_s",
            "AX_DIFFUSION",
            "AX_DIFFUSION_SMS",
            "BRAIN_MAPPING_meso",
            "BRAIN_MAPPING_2mmiso_meso_RMR",
            "MB_AX_DIFFUSION",
            "DIFF_MESO_RMR",
            "AX_DIFFUSION_MB2",
            "MB2_DIFFUSION_TRACE",
            "DTI",
            "AX_DTI",
            "DTI_2.8MM_30DIR.BVAL_0,1500",
            "AX_DIFFUSION_ADC",
            "AX_DIFFUSION-P_ADC",
            "AX_DIFFUSION_SMS_ADC",
            "BRAIN_MAPPING_meso_ADC",
            "BRAIN_MAPPING_2mmiso_meso_RMR_ADC",
            "Ax_DIFFUSION",
            "MB2_DIFFUSION",
        ],
    );
    put("perfusion", &["MR_Perfusion"]);

    ModalityTable { aliases }
});

impl ModalityTable {
    /// 获取内置默认表的引用.
    #[inline]
    pub fn builtin() -> &'static ModalityTable {
        &DEFAULT_MODALITIES
    }

    /// 从 JSON 文件加载覆盖表. 文件格式为
    /// `{"模态名": ["序列描述别名", ...], ...}`.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        let table: ModalityTable = serde_json::from_str(&text)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        Ok(table)
    }

    /// 若 `path` 存在则加载覆盖表, 否则回退到内置默认表.
    pub fn from_json_file_or_builtin<P: AsRef<Path>>(path: P) -> Result<ModalityTable> {
        if path.as_ref().is_file() {
            Self::from_json_file(path)
        } else {
            Ok(Self::builtin().clone())
        }
    }

    /// 该表是否认识模态 `name`?
    #[inline]
    pub fn is_known(&self, name: &str) -> bool {
        self.aliases.contains_key(name)
    }

    /// 按序列描述查找规范模态名. 大小写不敏感的精确别名匹配.
    pub fn classify(&self, series_description: &str) -> Option<&str> {
        let desc = series_description.trim();
        self.aliases.iter().find_map(|(name, list)| {
            list.iter()
                .any(|alias| alias.eq_ignore_ascii_case(desc))
                .then_some(name.as_str())
        })
    }

    /// 迭代所有规范模态名.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.aliases.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schemes_disagree_on_purpose() {
        let msnet = LabelScheme::msnet();
        let nnunet = LabelScheme::nnunet();
        assert!(msnet.is_injective());
        assert!(nnunet.is_injective());
        // 同名亚区在两代方案中整数不同, 这正是方案必须显式传入的原因.
        assert_ne!(msnet.enhancing, nnunet.enhancing);
        assert_ne!(msnet.core, nnunet.core);
        assert_eq!(msnet.whole, nnunet.whole);
    }

    #[test]
    fn test_non_injective_scheme_detected() {
        let bad = LabelScheme {
            enhancing: 2,
            whole: 2,
            core: 1,
        };
        assert!(!bad.is_injective());
    }

    #[test]
    fn test_builtin_table_classify() {
        let table = ModalityTable::builtin();
        assert!(table.is_known("t1ce"));
        assert!(table.is_known("perfusion"));
        assert_eq!(table.classify("CS_MPRAGE"), Some("t1ce"));
        assert_eq!(table.classify("ax_flair"), Some("flair"));
        assert_eq!(table.classify("MR_Perfusion"), Some("perfusion"));
        assert_eq!(table.classify("SOMETHING_ELSE"), None);
    }

    #[test]
    fn test_table_json_round_trip() {
        let json = r#"{"t1ce": ["T1CE"], "flair": ["FLAIR", "FL"]}"#;
        let table: ModalityTable = serde_json::from_str(json).unwrap();
        assert!(table.is_known("flair"));
        assert!(!table.is_known("perfusion"));
        assert_eq!(table.classify("fl"), Some("flair"));
    }
}

//! 🍇欢迎光临🍓
//!
//! 涵盖了本 crate 一系列常用的功能.

pub use crate::{Idx2d, Idx3d};

pub use crate::canonical::{canonicalize_mask, canonicalize_scan, CanonicalOptions};
pub use crate::composite::{composite_slice, MaskedSliceSeq};
pub use crate::config::{LabelScheme, ModalityTable};
pub use crate::data::{AxialMask, AxialScan, ImgWriteRgb, MaskVolume, MrVolume, RgbSlice, VolumeMeta};
pub use crate::decode::decode_slice;
pub use crate::dicom::DicomTemplate;
pub use crate::error::{Result, SynthesisError};
pub use crate::legend::LegendBitmap;
pub use crate::series::{masked_series, plain_series, SeriesReport};
pub use crate::stats::{
    mean_intensity_stats, RegionStatistics, StatsAggregate, StatsKind, TumorVolumeRecord,
};

pub use crate::consts::CUBE_EXTENT;

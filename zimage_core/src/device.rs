use std::fmt::Display;

use anyhow::Result;
use candle_core::{utils, DType, Device};
use tracing::info;

/// Pick the best device available at runtime: CUDA, then Metal, then CPU.
pub fn select_device() -> Result<Device> {
    if utils::cuda_is_available() {
        let device = Device::new_cuda(0)?;
        info!("using cuda device 0");
        Ok(device)
    } else if utils::metal_is_available() {
        let device = Device::new_metal(0)?;
        info!("using metal device 0");
        Ok(device)
    } else {
        info!("no accelerator available, running on cpu");
        Ok(Device::Cpu)
    }
}

/// DType for the model.
///
/// Note: `Auto` resolves from the selected device, reduced precision on an
/// accelerator and full precision on CPU.
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
pub enum ModelDType {
    #[default]
    Auto,
    F16,
    F32,
}

impl Display for ModelDType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Auto => write!(f, "auto"),
            Self::F16 => write!(f, "f16"),
            Self::F32 => write!(f, "f32"),
        }
    }
}

impl ModelDType {
    pub fn resolve(&self, device: &Device) -> DType {
        let dtype = match self {
            Self::Auto => {
                if matches!(device, Device::Cpu) {
                    DType::F32
                } else {
                    DType::F16
                }
            }
            Self::F16 => DType::F16,
            Self::F32 => DType::F32,
        };
        info!("dtype selected is {dtype:?}.");
        dtype
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auto_dtype_is_full_precision_on_cpu() {
        assert_eq!(ModelDType::Auto.resolve(&Device::Cpu), DType::F32);
    }

    #[test]
    fn explicit_dtypes_ignore_the_device() {
        assert_eq!(ModelDType::F16.resolve(&Device::Cpu), DType::F16);
        assert_eq!(ModelDType::F32.resolve(&Device::Cpu), DType::F32);
    }
}

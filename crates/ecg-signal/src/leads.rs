//! 肢体导联推导
//!
//! 8通道记录只包含 I、II 和 V1–V6，按 Einthoven 和 Goldberger 关系补全
//! III、aVR、aVL、aVF，得到12导联。

use ecg_core::{LeadMap, RecordError};
use tracing::debug;

/// 导联推导器
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LeadDeriver {
    augment: bool,
}

impl LeadDeriver {
    /// 仅当原始通道数恰好为8时推导
    pub const DERIVATION_CHANNEL_COUNT: usize = 8;

    pub fn new(augment: bool) -> Self {
        Self { augment }
    }

    pub fn is_enabled(&self) -> bool {
        self.augment
    }

    /// 补全缺失的肢体导联
    ///
    /// 未启用或通道数不为8时原样返回。
    pub fn derive(&self, mut leads: LeadMap, raw_channel_count: usize) -> Result<LeadMap, RecordError> {
        if !self.augment || raw_channel_count != Self::DERIVATION_CHANNEL_COUNT {
            return Ok(leads);
        }

        let (i, ii) = match (leads.get("I"), leads.get("II")) {
            (Some(i), Some(ii)) => (i.to_vec(), ii.to_vec()),
            _ => {
                return Err(RecordError::unexpected(
                    "cannot derive limb leads: lead I or II is missing",
                ))
            }
        };

        let derived = [
            ("III", combine(&i, &ii, |i, ii| ii - i)),
            ("aVR", combine(&i, &ii, |i, ii| -0.5 * (i + ii))),
            ("aVL", combine(&i, &ii, |i, ii| i - 0.5 * ii)),
            ("aVF", combine(&i, &ii, |i, ii| ii - 0.5 * i)),
        ];
        for (name, samples) in derived {
            leads.insert(name, samples)?;
        }

        debug!("已推导肢体导联，导联数: {}", leads.len());
        Ok(leads)
    }
}

fn combine<F>(i: &[f64], ii: &[f64], f: F) -> Vec<f64>
where
    F: Fn(f64, f64) -> f64,
{
    i.iter().zip(ii).map(|(&a, &b)| f(a, b)).collect()
}

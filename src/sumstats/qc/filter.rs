//! Keep/reject decision and the per-run counters.

use serde::{Deserialize, Serialize};

use crate::sumstats::record::VariantRecord;

use super::{
    resolve::{resolve_emac, resolve_hwe, EmacResult, HweResult},
    QcParams,
};

/// Outcome of the QC filter for one record.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FilterVerdict {
    pub emac: EmacResult,
    pub hwe: HweResult,
    pub keep: bool,
}

impl FilterVerdict {
    /// Combine the two results.
    ///
    /// A missing value is a reject; there is no pass-by-default.
    pub fn new(emac: EmacResult, hwe: HweResult) -> Self {
        let keep = emac.value.is_some() && emac.pass && hwe.value.is_some() && hwe.pass;
        Self { emac, hwe, keep }
    }
}

/// Resolve EMAC and HWE for `record` and decide whether to keep it.
pub fn decide(record: &VariantRecord, params: &QcParams) -> FilterVerdict {
    FilterVerdict::new(resolve_emac(record, params), resolve_hwe(record, params))
}

/// Counters accumulated over a run.
///
/// `rejected_emac`, `rejected_hwe` and `kept` are mutually exclusive and sum
/// to `total`; EMAC is checked first when attributing a rejection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunCounters {
    pub total: usize,
    pub rejected_emac: usize,
    pub rejected_hwe: usize,
    pub kept: usize,
}

impl RunCounters {
    /// Account for one verdict.
    pub fn record(mut self, verdict: &FilterVerdict) -> Self {
        self.total += 1;
        if verdict.keep {
            self.kept += 1;
        } else if !(verdict.emac.value.is_some() && verdict.emac.pass) {
            self.rejected_emac += 1;
        } else {
            self.rejected_hwe += 1;
        }
        self
    }

    /// Sum of two counters, e.g., from two chunks of the input.
    pub fn merge(self, other: RunCounters) -> Self {
        Self {
            total: self.total + other.total,
            rejected_emac: self.rejected_emac + other.rejected_emac,
            rejected_hwe: self.rejected_hwe + other.rejected_hwe,
            kept: self.kept + other.kept,
        }
    }
}

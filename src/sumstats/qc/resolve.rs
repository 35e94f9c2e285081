//! Resolution of EMAC and HWE p-value through prioritized source chains.
//!
//! Each chain is an ordered list of rules; the first rule that produces a value
//! wins.  Rules never fail, a parse or domain problem just means "try the
//! next one".

use crate::sumstats::{hwe::hwe_midp, record::VariantRecord};

use super::QcParams;

/// Pooled genotype count key sets in the annotation, tried in order.
pub const POOLED_COUNT_KEYS: &[[&str; 3]] = &[
    ["N_HOMREF", "N_HET", "N_HOMALT"],
    ["OBS_HOM1", "OBS_HET", "OBS_HOM2"],
    ["hom_ref", "het", "hom_alt"],
];
/// Genotype count keys for the controls stratum.
pub const CONTROLS_COUNT_KEYS: [&str; 3] = ["N_HOMREF_CTRL", "N_HET_CTRL", "N_HOMALT_CTRL"];
/// Genotype count keys for the cases stratum.
pub const CASES_COUNT_KEYS: [&str; 3] = ["N_HOMREF_CASE", "N_HET_CASE", "N_HOMALT_CASE"];

/// Sources for the effective minor allele count, in priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display, strum::EnumIter)]
pub enum EmacRule {
    /// `EMAC` annotation.
    #[strum(serialize = "info:EMAC")]
    InfoEmac,
    /// `MAC` annotation, only if enabled.
    #[strum(serialize = "info:MAC")]
    InfoMac,
    /// `2 * N * min(AAF, 1 - AAF)`.
    #[strum(serialize = "N*MAF")]
    SampleSizeFreq,
}

impl EmacRule {
    pub const CHAIN: [EmacRule; 3] = [
        EmacRule::InfoEmac,
        EmacRule::InfoMac,
        EmacRule::SampleSizeFreq,
    ];

    /// Try to obtain the EMAC from this source.
    pub fn apply(&self, record: &VariantRecord, params: &QcParams) -> Option<f64> {
        match self {
            EmacRule::InfoEmac => record.info.get_f64("EMAC"),
            EmacRule::InfoMac => {
                if params.use_mac_from_info {
                    record.info.get_f64("MAC")
                } else {
                    None
                }
            }
            EmacRule::SampleSizeFreq => {
                let n = record.sample_size.filter(|n| *n >= 0.0)?;
                let aaf = record.allele_freq.filter(|f| (0.0..=1.0).contains(f))?;
                Some(2.0 * n * aaf.min(1.0 - aaf))
            }
        }
    }
}

/// Sources for the HWE p-value, in priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display, strum::EnumIter)]
pub enum HweRule {
    /// `HWE` annotation.
    #[strum(serialize = "info:HWE")]
    InfoHwe,
    /// Exact test on the controls stratum, only if enabled.
    #[strum(serialize = "exact:controls")]
    ControlsCounts,
    /// Exact test on pooled counts.
    #[strum(serialize = "exact:pooled")]
    PooledCounts,
}

impl HweRule {
    pub const CHAIN: [HweRule; 3] = [
        HweRule::InfoHwe,
        HweRule::ControlsCounts,
        HweRule::PooledCounts,
    ];

    /// Try to obtain the HWE p-value from this source.
    pub fn apply(&self, record: &VariantRecord, params: &QcParams) -> Option<f64> {
        match self {
            HweRule::InfoHwe => record
                .info
                .get_f64("HWE")
                .filter(|p| (0.0..=1.0).contains(p)),
            HweRule::ControlsCounts => {
                if !params.use_controls {
                    return None;
                }
                let counts = record
                    .counts_controls
                    .or_else(|| record.info.get_genotype_counts(&CONTROLS_COUNT_KEYS))?;
                hwe_midp(counts.hom_ref, counts.het, counts.hom_alt)
            }
            HweRule::PooledCounts => {
                let from_info = POOLED_COUNT_KEYS
                    .iter()
                    .find_map(|keys| record.info.get_genotype_counts(keys));
                let from_strata = || {
                    let cases = record
                        .counts_cases
                        .or_else(|| record.info.get_genotype_counts(&CASES_COUNT_KEYS));
                    let controls = record
                        .counts_controls
                        .or_else(|| record.info.get_genotype_counts(&CONTROLS_COUNT_KEYS));
                    match (cases, controls) {
                        (Some(cases), Some(controls)) => cases.checked_add(&controls),
                        (cases, controls) => cases.or(controls),
                    }
                };
                let counts = from_info.or_else(from_strata)?;
                hwe_midp(counts.hom_ref, counts.het, counts.hom_alt)
            }
        }
    }
}

/// Resolved EMAC and whether it passes the threshold.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EmacResult {
    pub value: Option<f64>,
    pub source: Option<EmacRule>,
    pub pass: bool,
}

/// Resolved HWE p-value and whether it passes the threshold.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HweResult {
    pub value: Option<f64>,
    pub source: Option<HweRule>,
    pub pass: bool,
}

/// Run the EMAC chain for `record`.
pub fn resolve_emac(record: &VariantRecord, params: &QcParams) -> EmacResult {
    let found = EmacRule::CHAIN
        .iter()
        .find_map(|rule| rule.apply(record, params).map(|value| (*rule, value)));
    EmacResult {
        value: found.map(|(_, value)| value),
        source: found.map(|(rule, _)| rule),
        pass: found.map_or(false, |(_, value)| value >= params.emac_min),
    }
}

/// Run the HWE chain for `record`.
pub fn resolve_hwe(record: &VariantRecord, params: &QcParams) -> HweResult {
    let found = HweRule::CHAIN
        .iter()
        .find_map(|rule| rule.apply(record, params).map(|value| (*rule, value)));
    HweResult {
        value: found.map(|(_, value)| value),
        source: found.map(|(rule, _)| rule),
        pass: found.map_or(false, |(_, value)| value >= params.hwe_minp),
    }
}

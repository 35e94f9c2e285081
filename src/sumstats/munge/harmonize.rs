//! Harmonization of effect sizes into `(BETA, SE)` and derivation of `Z`.

use crate::sumstats::record::VariantRecord;

use super::MungeParams;

/// Two-sided 95% normal critical value times two, i.e., the width of a 95%
/// confidence interval in standard errors.
pub const CI95_WIDTH_IN_SE: f64 = 3.91992;

/// Sources for `(BETA, SE)`, in priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display, strum::EnumIter)]
pub enum EffectRule {
    /// `BETA` and `SE` annotations.
    #[strum(serialize = "info:BETA+SE")]
    BetaSe,
    /// `LOGOR` and `SE` annotations.
    #[strum(serialize = "info:LOGOR+SE")]
    LogOrSe,
    /// `OR` with its 95% confidence interval.
    #[strum(serialize = "info:OR+CI95")]
    OddsRatioCi,
    /// Effect column of a linear model, with `SE` annotation if any.
    #[strum(serialize = "column:Effect")]
    LinearEffect,
}

/// Effect estimate on the common scale.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct HarmonizedEffect {
    pub beta: Option<f64>,
    /// Never negative when present.
    pub se: Option<f64>,
    /// Derived from `beta / se`.
    pub z: Option<f64>,
    pub source: Option<EffectRule>,
}

impl EffectRule {
    pub const CHAIN: [EffectRule; 4] = [
        EffectRule::BetaSe,
        EffectRule::LogOrSe,
        EffectRule::OddsRatioCi,
        EffectRule::LinearEffect,
    ];

    /// Try to obtain `(BETA, SE)` from this source.
    ///
    /// `SE` may only be absent for the linear effect column.
    pub fn apply(
        &self,
        record: &VariantRecord,
        params: &MungeParams,
    ) -> Option<(f64, Option<f64>)> {
        let se = || record.info.get_f64("SE").filter(|se| *se >= 0.0);
        match self {
            EffectRule::BetaSe => Some((record.info.get_f64("BETA")?, Some(se()?))),
            EffectRule::LogOrSe => Some((record.info.get_f64("LOGOR")?, Some(se()?))),
            EffectRule::OddsRatioCi => {
                let positive = |key: &str| record.info.get_f64(key).filter(|x| *x > 0.0);
                let odds_ratio = positive("OR")?;
                let lower = positive("CI95L")?;
                let upper = positive("CI95U")?;
                if upper < lower {
                    return None;
                }
                Some((
                    odds_ratio.ln(),
                    Some((upper.ln() - lower.ln()) / CI95_WIDTH_IN_SE),
                ))
            }
            EffectRule::LinearEffect => {
                if params.logistic {
                    None
                } else {
                    Some((record.effect?, se()))
                }
            }
        }
    }
}

/// `Z = BETA / SE`; absent if either is missing or `SE` is zero.
pub fn z_score(beta: Option<f64>, se: Option<f64>) -> Option<f64> {
    let se = se.filter(|se| *se != 0.0)?;
    Some(beta? / se).filter(|z| z.is_finite())
}

/// Run the effect chain for `record` and derive `Z`.
pub fn harmonize(record: &VariantRecord, params: &MungeParams) -> HarmonizedEffect {
    match EffectRule::CHAIN
        .iter()
        .find_map(|rule| rule.apply(record, params).map(|found| (*rule, found)))
    {
        Some((rule, (beta, se))) => HarmonizedEffect {
            beta: Some(beta),
            se,
            z: z_score(Some(beta), se),
            source: Some(rule),
        },
        None => HarmonizedEffect::default(),
    }
}

//! Representation of one summary-statistics row and the column configuration.

use crate::{
    common::{parse_count, parse_f64},
    err::ArgError,
};

use super::info::AnnotationMap;

/// Column names to read from the input header.
#[derive(Debug, Clone, clap::Args)]
pub struct ColumnNames {
    /// Variant identifier column.
    #[arg(long, default_value = "ID")]
    pub id_col: String,
    /// Effect allele column.
    #[arg(long, default_value = "A1")]
    pub a1_col: String,
    /// Other allele column.
    #[arg(long, default_value = "A2")]
    pub a2_col: String,
    /// Sample size (or effective N) column.
    #[arg(long, default_value = "N")]
    pub n_col: String,
    /// Alternate/effect allele frequency column.
    #[arg(long, default_value = "A1FREQ")]
    pub aaf_col: String,
    /// P-value column.
    #[arg(long, default_value = "P")]
    pub p_col: String,
    /// Effect column (OR or BETA depending on the model).
    #[arg(long, default_value = "Effect")]
    pub effect_col: String,
    /// Annotation column with `key=value;...` pairs.
    #[arg(long, default_value = "INFO")]
    pub info_col: String,
    /// Genotype count columns for cases, as `HOMREF,HET,HOMALT`.
    #[arg(long, value_delimiter = ',')]
    pub geno_cols_cases: Vec<String>,
    /// Genotype count columns for controls, as `HOMREF,HET,HOMALT`.
    #[arg(long, value_delimiter = ',')]
    pub geno_cols_controls: Vec<String>,
}

impl Default for ColumnNames {
    fn default() -> Self {
        Self {
            id_col: "ID".into(),
            a1_col: "A1".into(),
            a2_col: "A2".into(),
            n_col: "N".into(),
            aaf_col: "A1FREQ".into(),
            p_col: "P".into(),
            effect_col: "Effect".into(),
            info_col: "INFO".into(),
            geno_cols_cases: Vec::new(),
            geno_cols_controls: Vec::new(),
        }
    }
}

impl ColumnNames {
    /// Check that genotype count columns come in triples, if given at all.
    pub fn validate(&self) -> Result<(), ArgError> {
        for (label, cols) in [
            ("cases", &self.geno_cols_cases),
            ("controls", &self.geno_cols_controls),
        ] {
            if !cols.is_empty() && cols.len() != 3 {
                return Err(ArgError::InvalidGenoCols(label, cols.len()));
            }
        }
        Ok(())
    }
}

/// Positions of the configured columns in one input header.
///
/// Columns missing from the header are `None` and read as absent values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnIndex {
    pub id: Option<usize>,
    pub a1: Option<usize>,
    pub a2: Option<usize>,
    pub n: Option<usize>,
    pub aaf: Option<usize>,
    pub p: Option<usize>,
    pub effect: Option<usize>,
    pub info: Option<usize>,
    pub geno_cases: Option<[usize; 3]>,
    pub geno_controls: Option<[usize; 3]>,
}

impl ColumnIndex {
    /// Resolve `names` against the header.
    pub fn from_header(header: &csv::StringRecord, names: &ColumnNames) -> Self {
        let find = |name: &str| {
            header
                .iter()
                .position(|col| col.trim_end_matches('\r') == name)
        };
        let find_triple = |cols: &[String]| -> Option<[usize; 3]> {
            match cols {
                [a, b, c] => Some([find(a)?, find(b)?, find(c)?]),
                _ => None,
            }
        };

        let result = Self {
            id: find(&names.id_col),
            a1: find(&names.a1_col),
            a2: find(&names.a2_col),
            n: find(&names.n_col),
            aaf: find(&names.aaf_col),
            p: find(&names.p_col),
            effect: find(&names.effect_col),
            info: find(&names.info_col),
            geno_cases: find_triple(&names.geno_cols_cases),
            geno_controls: find_triple(&names.geno_cols_controls),
        };

        for (name, idx) in [(&names.id_col, result.id), (&names.info_col, result.info)] {
            if idx.is_none() {
                tracing::warn!("column {:?} not found in header, treating as absent", name);
            }
        }

        result
    }
}

/// Homozygote-reference, heterozygote, and homozygote-alternate counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GenotypeCounts {
    pub hom_ref: u64,
    pub het: u64,
    pub hom_alt: u64,
}

impl GenotypeCounts {
    /// Element-wise sum, `None` on overflow.
    pub fn checked_add(&self, other: &GenotypeCounts) -> Option<GenotypeCounts> {
        Some(GenotypeCounts {
            hom_ref: self.hom_ref.checked_add(other.hom_ref)?,
            het: self.het.checked_add(other.het)?,
            hom_alt: self.hom_alt.checked_add(other.hom_alt)?,
        })
    }
}

/// One GWAS result row.
///
/// Every attribute is optional; an absent value is never conflated with zero.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VariantRecord {
    pub id: Option<String>,
    pub effect_allele: Option<String>,
    pub other_allele: Option<String>,
    pub sample_size: Option<f64>,
    pub allele_freq: Option<f64>,
    pub p_value: Option<f64>,
    pub effect: Option<f64>,
    pub counts_cases: Option<GenotypeCounts>,
    pub counts_controls: Option<GenotypeCounts>,
    pub info: AnnotationMap,
}

impl VariantRecord {
    /// Build the record from the fields of one input row.
    pub fn from_fields(fields: &csv::StringRecord, idx: &ColumnIndex) -> Self {
        let text = |i: Option<usize>| {
            i.and_then(|i| fields.get(i))
                .map(|s| s.trim_end_matches('\r'))
                .filter(|s| !s.trim().is_empty())
        };
        let number = |i: Option<usize>| text(i).and_then(parse_f64);
        let counts = |cols: Option<[usize; 3]>| {
            let [a, b, c] = cols?;
            Some(GenotypeCounts {
                hom_ref: text(Some(a)).and_then(parse_count)?,
                het: text(Some(b)).and_then(parse_count)?,
                hom_alt: text(Some(c)).and_then(parse_count)?,
            })
        };

        Self {
            id: text(idx.id).map(str::to_string),
            effect_allele: text(idx.a1).map(str::to_string),
            other_allele: text(idx.a2).map(str::to_string),
            sample_size: number(idx.n),
            allele_freq: number(idx.aaf),
            p_value: number(idx.p),
            effect: number(idx.effect),
            counts_cases: counts(idx.geno_cases),
            counts_controls: counts(idx.geno_controls),
            info: text(idx.info).map(AnnotationMap::parse).unwrap_or_default(),
        }
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::{ColumnIndex, ColumnNames, GenotypeCounts, VariantRecord};

    fn header() -> csv::StringRecord {
        csv::StringRecord::from(vec![
            "ID", "A1", "A2", "N", "A1FREQ", "P", "Effect", "INFO", "CA_RR", "CA_RA", "CA_AA",
        ])
    }

    #[test]
    fn column_index_from_header() {
        let names = ColumnNames {
            geno_cols_cases: vec!["CA_RR".into(), "CA_RA".into(), "CA_AA".into()],
            geno_cols_controls: vec!["CO_RR".into(), "CO_RA".into(), "CO_AA".into()],
            ..Default::default()
        };

        let idx = ColumnIndex::from_header(&header(), &names);

        assert_eq!(
            idx,
            ColumnIndex {
                id: Some(0),
                a1: Some(1),
                a2: Some(2),
                n: Some(3),
                aaf: Some(4),
                p: Some(5),
                effect: Some(6),
                info: Some(7),
                geno_cases: Some([8, 9, 10]),
                geno_controls: None,
            }
        );
    }

    #[test]
    fn validate_geno_cols() {
        assert!(ColumnNames::default().validate().is_ok());
        let names = ColumnNames {
            geno_cols_cases: vec!["A".into(), "B".into()],
            ..Default::default()
        };
        assert_eq!(
            names.validate(),
            Err(crate::err::ArgError::InvalidGenoCols("cases", 2))
        );
    }

    #[test]
    fn record_from_fields() {
        let names = ColumnNames {
            geno_cols_cases: vec!["CA_RR".into(), "CA_RA".into(), "CA_AA".into()],
            ..Default::default()
        };
        let idx = ColumnIndex::from_header(&header(), &names);
        let fields = csv::StringRecord::from(vec![
            "rs1", "A", "G", "10000", "0.01", "1e-3", "1.2", "EMAC=200;HWE=0.3", "90", "10", "0",
        ]);

        let record = VariantRecord::from_fields(&fields, &idx);

        assert_eq!(record.id.as_deref(), Some("rs1"));
        assert_eq!(record.effect_allele.as_deref(), Some("A"));
        assert_eq!(record.other_allele.as_deref(), Some("G"));
        assert_eq!(record.sample_size, Some(10000.0));
        assert_eq!(record.allele_freq, Some(0.01));
        assert_eq!(record.p_value, Some(1e-3));
        assert_eq!(record.effect, Some(1.2));
        assert_eq!(
            record.counts_cases,
            Some(GenotypeCounts {
                hom_ref: 90,
                het: 10,
                hom_alt: 0
            })
        );
        assert_eq!(record.counts_controls, None);
        assert_eq!(record.info.get_f64("EMAC"), Some(200.0));
    }

    #[test]
    fn carriage_return_is_not_part_of_values() {
        let header = csv::StringRecord::from(vec!["ID", "P", "A2\r"]);
        let idx = ColumnIndex::from_header(&header, &ColumnNames::default());
        assert_eq!(idx.a2, Some(2));

        let fields = csv::StringRecord::from(vec!["rs1", "0.5", "G\r"]);
        let record = VariantRecord::from_fields(&fields, &idx);

        assert_eq!(record.other_allele.as_deref(), Some("G"));
        assert_eq!(record.p_value, Some(0.5));
    }

    #[test]
    fn record_missing_and_short() {
        let idx = ColumnIndex::from_header(&header(), &ColumnNames::default());
        let fields = csv::StringRecord::from(vec!["rs2", "A", "", "NA", "x"]);

        let record = VariantRecord::from_fields(&fields, &idx);

        assert_eq!(record.id.as_deref(), Some("rs2"));
        assert_eq!(record.other_allele, None);
        assert_eq!(record.sample_size, None);
        assert_eq!(record.allele_freq, None);
        assert_eq!(record.p_value, None);
        assert!(record.info.is_empty());
    }
}

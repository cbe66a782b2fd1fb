//! Named training feature sets.

/// A registered set of training features.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeatureSet {
    pub name: &'static str,
    pub training: &'static [&'static str],
}

pub const SOMATIC_SNV: FeatureSet = FeatureSet {
    name: "somatic.snv",
    training: &[
        "QSS_NT",
        "N_FDP_RATE",
        "T_FDP_RATE",
        "N_SDP_RATE",
        "T_SDP_RATE",
        "N_DP_RATE",
        "TIER1_ALT_RATE",
        "MQ",
        "n_mapq0",
        "strandBias",
        "ReadPosRankSum",
        "altmap",
        "altpos",
    ],
};

pub const SOMATIC_INDEL: FeatureSet = FeatureSet {
    name: "somatic.indel",
    training: &[
        "QSI_NT",
        "ABS_T_RR",
        "IHP",
        "RC",
        "RU_LEN",
        "IC",
        "N_DP_RATE",
        "TIER1_ALLELE_RATE",
        "MQ",
        "T_BCN",
        "N_BCN",
        "strandBias",
    ],
};

pub const FEATURE_SETS: &[FeatureSet] = &[SOMATIC_SNV, SOMATIC_INDEL];

impl FeatureSet {
    pub fn find(name: &str) -> Option<&'static FeatureSet> {
        FEATURE_SETS.iter().find(|s| s.name == name)
    }

    pub fn names() -> impl Iterator<Item = &'static str> {
        FEATURE_SETS.iter().map(|s| s.name)
    }
}

/// Training features for `--features`: a registered set name, else a comma-separated list.
pub fn resolve_features(arg: &str) -> Vec<String> {
    match FeatureSet::find(arg) {
        Some(set) => set.training.iter().map(|f| f.to_string()).collect(),
        None => arg
            .split(',')
            .map(str::trim)
            .filter(|f| !f.is_empty())
            .map(str::to_string)
            .collect(),
    }
}

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// A report section. Declaration order is the canonical report order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Section {
    #[serde(rename = "Company Info")]
    CompanyInfo,
    #[serde(rename = "Financials")]
    Financials,
    #[serde(rename = "Balance Sheet")]
    BalanceSheet,
    #[serde(rename = "Cash Flow")]
    CashFlow,
    #[serde(rename = "Analyst Recommendations")]
    AnalystRecommendations,
    #[serde(rename = "Sectoral Analysis")]
    SectoralAnalysis,
}

impl Section {
    pub const ALL: [Section; 6] = [
        Section::CompanyInfo,
        Section::Financials,
        Section::BalanceSheet,
        Section::CashFlow,
        Section::AnalystRecommendations,
        Section::SectoralAnalysis,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Section::CompanyInfo => "Company Info",
            Section::Financials => "Financials",
            Section::BalanceSheet => "Balance Sheet",
            Section::CashFlow => "Cash Flow",
            Section::AnalystRecommendations => "Analyst Recommendations",
            Section::SectoralAnalysis => "Sectoral Analysis",
        }
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownSectionError {
    pub input: String,
}

impl fmt::Display for UnknownSectionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let labels: Vec<&str> = Section::ALL.iter().map(|s| s.label()).collect();
        write!(
            f,
            "unknown report section {:?} (expected one of: {})",
            self.input,
            labels.join(", ")
        )
    }
}

impl std::error::Error for UnknownSectionError {}

impl FromStr for Section {
    type Err = UnknownSectionError;

    /// Accepts the label in any case, or a kebab/snake-case slug of it.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .chars()
            .map(|c| match c {
                '-' | '_' => ' ',
                c => c.to_ascii_lowercase(),
            })
            .collect();
        let normalized = normalized.split_whitespace().collect::<Vec<_>>().join(" ");

        Section::ALL
            .into_iter()
            .find(|section| section.label().to_ascii_lowercase() == normalized)
            .ok_or_else(|| UnknownSectionError {
                input: s.to_string(),
            })
    }
}

/// The caller's chosen sections. Iteration always yields canonical order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SectionSelection {
    sections: BTreeSet<Section>,
}

impl SectionSelection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn all() -> Self {
        Section::ALL.into_iter().collect()
    }

    pub fn insert(&mut self, section: Section) -> bool {
        self.sections.insert(section)
    }

    pub fn contains(&self, section: Section) -> bool {
        self.sections.contains(&section)
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    pub fn len(&self) -> usize {
        self.sections.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = Section> + '_ {
        self.sections.iter().copied()
    }

    /// Parses user-supplied names, failing on the first unknown one.
    pub fn parse<I, S>(names: I) -> Result<Self, UnknownSectionError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        names
            .into_iter()
            .map(|name| name.as_ref().parse::<Section>())
            .collect()
    }
}

impl FromIterator<Section> for SectionSelection {
    fn from_iter<T: IntoIterator<Item = Section>>(iter: T) -> Self {
        Self {
            sections: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_labels_and_slugs() {
        assert_eq!("Balance Sheet".parse::<Section>().unwrap(), Section::BalanceSheet);
        assert_eq!("balance-sheet".parse::<Section>().unwrap(), Section::BalanceSheet);
        assert_eq!(
            " analyst_recommendations ".parse::<Section>().unwrap(),
            Section::AnalystRecommendations
        );
        assert_eq!("CASH FLOW".parse::<Section>().unwrap(), Section::CashFlow);
    }

    #[test]
    fn rejects_unknown_names() {
        let err = "Income Statement".parse::<Section>().unwrap_err();
        assert_eq!(err.input, "Income Statement");
        assert!(err.to_string().contains("Company Info"));
    }

    #[test]
    fn selection_iterates_in_canonical_order() {
        let selection =
            SectionSelection::parse(["Sectoral Analysis", "Financials", "Company Info"]).unwrap();
        let order: Vec<_> = selection.iter().collect();
        assert_eq!(
            order,
            vec![Section::CompanyInfo, Section::Financials, Section::SectoralAnalysis]
        );
    }

    #[test]
    fn selection_collapses_duplicates() {
        let selection = SectionSelection::parse(["cash-flow", "Cash Flow"]).unwrap();
        assert_eq!(selection.len(), 1);
        assert!(selection.contains(Section::CashFlow));
    }

    #[test]
    fn all_covers_every_section() {
        let all = SectionSelection::all();
        assert_eq!(all.iter().collect::<Vec<_>>(), Section::ALL.to_vec());
    }

    #[test]
    fn serializes_as_label() {
        let v = serde_json::to_value(Section::AnalystRecommendations).unwrap();
        assert_eq!(v, serde_json::json!("Analyst Recommendations"));
    }
}

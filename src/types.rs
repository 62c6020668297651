//src/types.rs

use std::fmt;

/// Taxonomic level of a clade.
///
/// Only the six standard ranks are ever written out; `Kingdom`, `Strain`
/// and `Unclassified` exist so reshapers can say what they saw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Rank {
    Kingdom,
    Phylum,
    Class,
    Order,
    Family,
    Genus,
    Species,
    Strain,
    Unclassified,
}

impl Rank {
    /// The ranks that get one output table each, in output order.
    pub const STANDARD: [Rank; 6] = [
        Rank::Species,
        Rank::Genus,
        Rank::Family,
        Rank::Order,
        Rank::Class,
        Rank::Phylum,
    ];

    /// Lower-case name used in output file names (`{sample}_{rank}.csv`).
    pub fn name(&self) -> &'static str {
        match self {
            Rank::Kingdom => "kingdom",
            Rank::Phylum => "phylum",
            Rank::Class => "class",
            Rank::Order => "order",
            Rank::Family => "family",
            Rank::Genus => "genus",
            Rank::Species => "species",
            Rank::Strain => "strain",
            Rank::Unclassified => "unclassified",
        }
    }

    /// Single-letter code used in `x__Name` clade tokens.
    pub fn letter(&self) -> char {
        match self {
            Rank::Kingdom => 'k',
            Rank::Phylum => 'p',
            Rank::Class => 'c',
            Rank::Order => 'o',
            Rank::Family => 'f',
            Rank::Genus => 'g',
            Rank::Species => 's',
            Rank::Strain => 't',
            Rank::Unclassified => 'u',
        }
    }

    /// Token prefix, e.g. `s__` for species.
    pub fn token_prefix(&self) -> String {
        format!("{}__", self.letter())
    }

    /// `d` (domain) is folded into `Kingdom`.
    pub fn from_letter(letter: char) -> Option<Rank> {
        match letter {
            'k' | 'd' => Some(Rank::Kingdom),
            'p' => Some(Rank::Phylum),
            'c' => Some(Rank::Class),
            'o' => Some(Rank::Order),
            'f' => Some(Rank::Family),
            'g' => Some(Rank::Genus),
            's' => Some(Rank::Species),
            't' => Some(Rank::Strain),
            'u' => Some(Rank::Unclassified),
            _ => None,
        }
    }
}

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The tool a record came from. Written verbatim into the `classifier` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Classifier {
    MetaPhlAn,
    KrakenBracken,
    XTree,
}

impl Classifier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Classifier::MetaPhlAn => "metaphlan",
            Classifier::KrakenBracken => "kraken_bracken",
            Classifier::XTree => "xtree",
        }
    }
}

impl fmt::Display for Classifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A numeric taxon identifier, or the explicit "could not resolve" case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TaxId {
    Known(u64),
    #[default]
    Unresolved,
}

impl TaxId {
    /// Lenient parse: anything that is not an unsigned integer is `Unresolved`.
    pub fn parse(field: &str) -> TaxId {
        field
            .trim()
            .parse::<u64>()
            .map(TaxId::Known)
            .unwrap_or(TaxId::Unresolved)
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, TaxId::Known(_))
    }
}

impl fmt::Display for TaxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaxId::Known(id) => write!(f, "{}", id),
            TaxId::Unresolved => f.write_str("NaN"),
        }
    }
}

/// One row of the unified schema, before the rank column is dropped on output.
///
/// `abundances` holds one value per sample. `NaN` marks a missing value
/// (only XTree input can produce those).
#[derive(Debug, Clone, PartialEq)]
pub struct UnifiedRecord {
    pub rank: Rank,
    pub classifier: Classifier,
    pub clade: String,
    pub tax_id: TaxId,
    pub abundances: Vec<f64>,
}

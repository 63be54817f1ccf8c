use serde::{Deserialize, Serialize};

/// Lowest and highest value on the rating scale
pub const MIN_RATING: u8 = 1;
pub const MAX_RATING: u8 = 5;

/// A concrete value on the 1..=5 scale.
///
/// The field is private: [`Score::new`] is the only way in, so every
/// `Rating::Rated` in a matrix is on the scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Score(u8);

impl Score {
    pub fn new(value: u8) -> Option<Self> {
        (MIN_RATING..=MAX_RATING)
            .contains(&value)
            .then_some(Score(value))
    }

    pub fn get(self) -> u8 {
        self.0
    }
}

/// A single matrix cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Rating {
    /// No opinion was ever recorded
    #[default]
    Unrated,
    /// Withheld on purpose so it can be predicted
    Pending,
    Rated(Score),
}

impl Rating {
    /// Build a concrete rating, `None` when the value is off the scale
    pub fn rated(value: u8) -> Option<Self> {
        Score::new(value).map(Rating::Rated)
    }

    /// Decode a corpus token: 0 is unrated, 1..=5 is concrete
    pub fn from_raw(value: i64) -> Option<Self> {
        match value {
            0 => Some(Rating::Unrated),
            _ => u8::try_from(value).ok().and_then(Rating::rated),
        }
    }

    pub fn is_concrete(&self) -> bool {
        matches!(self, Rating::Rated(_))
    }

    /// The concrete value, if any
    pub fn score(&self) -> Option<u8> {
        match self {
            Rating::Rated(score) => Some(score.get()),
            Rating::Unrated | Rating::Pending => None,
        }
    }

    /// Numeric value for arithmetic; sentinels have none
    pub fn value(&self) -> Option<f64> {
        self.score().map(f64::from)
    }
}

/// Which axis of the corpus plays the role of "entity"
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Orientation {
    /// Entities are users, dimensions are items
    UserBased,
    /// Entities are items, dimensions are users
    ItemBased,
}

impl Orientation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Orientation::UserBased => "user_based",
            Orientation::ItemBased => "item_based",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SimilarityKind {
    Cosine,
    Pearson,
    PearsonCaseModified,
    PearsonPolarized,
}

impl SimilarityKind {
    pub const ALL: [SimilarityKind; 4] = [
        SimilarityKind::Cosine,
        SimilarityKind::Pearson,
        SimilarityKind::PearsonCaseModified,
        SimilarityKind::PearsonPolarized,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SimilarityKind::Cosine => "cosine",
            SimilarityKind::Pearson => "pearson",
            SimilarityKind::PearsonCaseModified => "pearson_case_modified",
            SimilarityKind::PearsonPolarized => "pearson_polarized",
        }
    }
}

/// Position of a target in the entity-major matrix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Cell {
    pub entity: usize,
    pub item: usize,
}

impl Cell {
    pub fn new(entity: usize, item: usize) -> Self {
        Self { entity, item }
    }

    /// Same cell in the transposed matrix
    pub fn transposed(self) -> Self {
        Self {
            entity: self.item,
            item: self.entity,
        }
    }
}

/// A cell to predict, with the external ids used in result files
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeldOutCell {
    pub cell: Cell,
    /// 1-based user id as it appears in the input
    pub user_id: u32,
    /// 1-based item id as it appears in the input
    pub item_id: u32,
    /// Ground truth, when known
    pub actual: Option<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    pub entity: usize,
    pub score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub cell: Cell,
    pub user_id: u32,
    pub item_id: u32,
    /// Final rating on the 1..=5 scale
    pub rating: u8,
    /// Aggregated value before rounding
    pub raw: f64,
    /// Ground truth carried over from the held-out cell
    pub actual: Option<u8>,
    pub neighbors_used: usize,
    pub fell_back: bool,
}

/// Per-variant result of an evaluation run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VariantReport {
    pub similarity: SimilarityKind,
    pub orientation: Orientation,
    pub predicted: usize,
    pub rejected: usize,
    pub fallbacks: usize,
    pub rmse: f64,
    pub mae: f64,
    pub duration_ms: u64,
}

/// Summary persisted at the end of a compare run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: uuid::Uuid,
    pub started_at: chrono::DateTime<chrono::Utc>,
    pub completed_at: chrono::DateTime<chrono::Utc>,
    pub ratings_path: String,
    pub neighbor_count: usize,
    pub variants: Vec<VariantReport>,
}

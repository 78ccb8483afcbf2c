//! Configuration types for the cleaning pipeline.
//!
//! Every threshold the imputers use lives in an explicit configuration struct
//! with documented defaults. Imputers receive their config by value, so a
//! call never depends on module-level state.

use crate::error::CleaningError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Thresholds that drive the categorical fill decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CategoricalImputationConfig {
    /// Columns missing strictly more than this ratio go straight to the
    /// fallback label.
    /// Default: 0.20
    pub high_missing_threshold: f64,

    /// Columns missing at most this ratio use `mode_threshold_low_missing`.
    /// Default: 0.05
    pub low_missing_threshold: f64,

    /// Minimum share of the mode when missingness is low.
    /// Default: 0.50
    pub mode_threshold_low_missing: f64,

    /// Minimum share of the mode when missingness is moderate.
    /// Default: 0.60
    pub mode_threshold_high_missing: f64,

    /// Minimum lead of the mode over the runner-up.
    /// Default: 0.20
    pub mode_margin_threshold: f64,

    /// Label written into cells that cannot be trusted to the mode.
    /// Default: "Unknown"
    pub fallback_label: String,
}

impl Default for CategoricalImputationConfig {
    fn default() -> Self {
        Self {
            high_missing_threshold: 0.20,
            low_missing_threshold: 0.05,
            mode_threshold_low_missing: 0.50,
            mode_threshold_high_missing: 0.60,
            mode_margin_threshold: 0.20,
            fallback_label: "Unknown".to_string(),
        }
    }
}

impl CategoricalImputationConfig {
    /// Validate ranges and ordering of the thresholds.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        check_ratio("categorical.high_missing_threshold", self.high_missing_threshold)?;
        check_ratio("categorical.low_missing_threshold", self.low_missing_threshold)?;
        check_ratio(
            "categorical.mode_threshold_low_missing",
            self.mode_threshold_low_missing,
        )?;
        check_ratio(
            "categorical.mode_threshold_high_missing",
            self.mode_threshold_high_missing,
        )?;
        check_ratio("categorical.mode_margin_threshold", self.mode_margin_threshold)?;
        check_ordered(
            "categorical.low_missing_threshold",
            self.low_missing_threshold,
            "categorical.high_missing_threshold",
            self.high_missing_threshold,
        )?;

        if self.fallback_label.trim().is_empty() {
            return Err(ConfigValidationError::EmptyFallbackLabel);
        }

        Ok(())
    }
}

/// Thresholds and switches for numeric imputation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NumericImputationConfig {
    /// At or below this ratio the column median is used.
    /// Default: 0.05
    pub low_missing_threshold: f64,

    /// At or below this ratio neighbor imputation is used; above it the
    /// column counts as highly incomplete.
    /// Default: 0.20
    pub high_missing_threshold: f64,

    /// Number of donor rows averaged by neighbor imputation.
    /// Default: 5
    pub neighbor_count: usize,

    /// Whether highly incomplete columns get a `<column>_missing` indicator.
    /// Default: true
    pub add_missing_indicator: bool,

    /// Whether highly incomplete columns are filled by neighbor imputation
    /// instead of the median.
    /// Default: false
    pub use_neighbor_imputation_for_high_missing: bool,
}

impl Default for NumericImputationConfig {
    fn default() -> Self {
        Self {
            low_missing_threshold: 0.05,
            high_missing_threshold: 0.20,
            neighbor_count: 5,
            add_missing_indicator: true,
            use_neighbor_imputation_for_high_missing: false,
        }
    }
}

impl NumericImputationConfig {
    /// Validate ranges and ordering of the thresholds.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        check_ratio("numeric.low_missing_threshold", self.low_missing_threshold)?;
        check_ratio("numeric.high_missing_threshold", self.high_missing_threshold)?;
        check_ordered(
            "numeric.low_missing_threshold",
            self.low_missing_threshold,
            "numeric.high_missing_threshold",
            self.high_missing_threshold,
        )?;

        if self.neighbor_count == 0 {
            return Err(ConfigValidationError::InvalidNeighborCount(
                self.neighbor_count,
            ));
        }

        Ok(())
    }
}

/// Target type for a column coercion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetType {
    /// 64-bit signed integer (nullable)
    Int,
    /// 64-bit float
    Float,
    /// UTF-8 text
    Text,
}

impl TargetType {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Int => "int",
            Self::Float => "float",
            Self::Text => "text",
        }
    }
}

/// Options for the cleaning stages that run before imputation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CleaningConfig {
    /// Row identifier kept out of every cleaning and imputation step and
    /// written back as the first column.
    /// Default: Some("employee_number")
    pub id_column: Option<String>,

    /// Whether to remove exact duplicate rows (keeping the first).
    /// Default: true
    pub remove_duplicates: bool,

    /// Whether to drop constant and near-unique columns.
    /// Default: true
    pub prune_columns: bool,

    /// Columns whose distinct-value ratio exceeds this are dropped.
    /// Default: 0.95
    pub cardinality_threshold: f64,

    /// Per-column literal replacements applied to text columns.
    pub text_replacements: BTreeMap<String, BTreeMap<String, String>>,

    /// Per-column target types.
    pub type_coercions: BTreeMap<String, TargetType>,

    /// Per-column integer code to label mappings.
    pub ordinal_mappings: BTreeMap<String, BTreeMap<i64, String>>,

    /// Text columns never handed to the categorical imputer (case-insensitive).
    /// Default: ["attrition"]
    pub categorical_exclude: Vec<String>,
}

impl Default for CleaningConfig {
    fn default() -> Self {
        Self {
            id_column: Some("employee_number".to_string()),
            remove_duplicates: true,
            prune_columns: true,
            cardinality_threshold: 0.95,
            text_replacements: default_text_replacements(),
            type_coercions: default_type_coercions(),
            ordinal_mappings: default_ordinal_mappings(),
            categorical_exclude: vec!["attrition".to_string()],
        }
    }
}

impl CleaningConfig {
    /// Leaves every column and row in place; for inputs that were already
    /// prepared upstream and only need imputation.
    pub fn passthrough() -> Self {
        Self {
            id_column: None,
            remove_duplicates: false,
            prune_columns: false,
            cardinality_threshold: 1.0,
            text_replacements: BTreeMap::new(),
            type_coercions: BTreeMap::new(),
            ordinal_mappings: BTreeMap::new(),
            categorical_exclude: Vec::new(),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        check_ratio("cleaning.cardinality_threshold", self.cardinality_threshold)
    }

    /// Whether `column` is excluded from categorical imputation.
    pub fn is_categorical_excluded(&self, column: &str) -> bool {
        self.categorical_exclude
            .iter()
            .any(|c| c.eq_ignore_ascii_case(column))
    }
}

fn default_text_replacements() -> BTreeMap<String, BTreeMap<String, String>> {
    let mut replacements = BTreeMap::new();
    replacements.insert(
        "marital_status".to_string(),
        BTreeMap::from([("Marreid".to_string(), "Married".to_string())]),
    );
    replacements.insert(
        "business_travel".to_string(),
        BTreeMap::from([
            ("Travel_Rarely".to_string(), "Rarely".to_string()),
            ("Travel_Frequently".to_string(), "Frequently".to_string()),
            ("Non-Travel".to_string(), "Non".to_string()),
        ]),
    );
    replacements
}

fn default_type_coercions() -> BTreeMap<String, TargetType> {
    BTreeMap::from([
        ("age".to_string(), TargetType::Int),
        ("daily_rate".to_string(), TargetType::Float),
        ("hourly_rate".to_string(), TargetType::Float),
        ("training_times_last_year".to_string(), TargetType::Int),
        ("years_with_curr_manager".to_string(), TargetType::Int),
    ])
}

fn labels(pairs: &[(i64, &str)]) -> BTreeMap<i64, String> {
    pairs
        .iter()
        .map(|(code, label)| (*code, label.to_string()))
        .collect()
}

fn default_ordinal_mappings() -> BTreeMap<String, BTreeMap<i64, String>> {
    let satisfaction = labels(&[
        (1, "Not Satisfied at all"),
        (2, "Dissatisfied"),
        (3, "Satisfied"),
        (4, "Delighted"),
    ]);

    let mut mappings: BTreeMap<String, BTreeMap<i64, String>> = [
        "environment_satisfaction",
        "job_involvement",
        "job_satisfaction",
        "performance_rating",
        "relationship_satisfaction",
        "work_life_balance",
    ]
    .iter()
    .map(|col| (col.to_string(), satisfaction.clone()))
    .collect();

    mappings.insert(
        "education".to_string(),
        labels(&[
            (1, "No Formal Education"),
            (2, "Basic Education"),
            (3, "Associate Degree"),
            (4, "Bachelor Degree"),
            (5, "Postgraduate"),
        ]),
    );
    mappings.insert(
        "job_level".to_string(),
        labels(&[
            (1, "Entry Level"),
            (2, "Junior"),
            (3, "Senior"),
            (4, "Manager"),
            (5, "Executive"),
        ]),
    );
    mappings.insert(
        "stock_option_level".to_string(),
        labels(&[
            (0, "Unvested"),
            (1, "Basic"),
            (2, "Intermediate"),
            (3, "Executive"),
        ]),
    );

    mappings
}

/// Configuration for the whole cleaning pipeline.
///
/// Use [`PipelineConfig::builder()`] to override individual fields.
///
/// # Example
///
/// ```rust,ignore
/// use hr_cleaning::config::PipelineConfig;
///
/// let config = PipelineConfig::builder()
///     .neighbor_count(7)
///     .fallback_label("Not Reported")
///     .build()?;
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub categorical: CategoricalImputationConfig,
    pub numeric: NumericImputationConfig,
    pub cleaning: CleaningConfig,
}

impl PipelineConfig {
    /// Create a new configuration builder.
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder::default()
    }

    /// Validate the configuration and return errors if invalid.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        self.categorical.validate()?;
        self.numeric.validate()?;
        self.cleaning.validate()
    }

    /// Load and validate a configuration from a JSON file. Missing fields
    /// take their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> crate::error::Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config: PipelineConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }
}

/// Errors that can occur during configuration validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("Invalid threshold for '{field}': {value} (must be between 0.0 and 1.0)")]
    InvalidThreshold { field: String, value: f64 },

    #[error("'{low_field}' ({low}) must not exceed '{high_field}' ({high})")]
    InvertedThresholds {
        low_field: String,
        low: f64,
        high_field: String,
        high: f64,
    },

    #[error("Invalid neighbor count: {0} (must be at least 1)")]
    InvalidNeighborCount(usize),

    #[error("Fallback label must not be empty")]
    EmptyFallbackLabel,
}

impl From<ConfigValidationError> for CleaningError {
    fn from(err: ConfigValidationError) -> Self {
        CleaningError::InvalidConfig(err.to_string())
    }
}

fn check_ratio(field: &str, value: f64) -> Result<(), ConfigValidationError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigValidationError::InvalidThreshold {
            field: field.to_string(),
            value,
        })
    }
}

fn check_ordered(
    low_field: &str,
    low: f64,
    high_field: &str,
    high: f64,
) -> Result<(), ConfigValidationError> {
    if low <= high {
        Ok(())
    } else {
        Err(ConfigValidationError::InvertedThresholds {
            low_field: low_field.to_string(),
            low,
            high_field: high_field.to_string(),
            high,
        })
    }
}

/// Builder for [`PipelineConfig`] with fluent API.
#[derive(Debug, Default)]
pub struct PipelineConfigBuilder {
    base: Option<PipelineConfig>,
    categorical_high_missing_threshold: Option<f64>,
    categorical_low_missing_threshold: Option<f64>,
    mode_threshold_low_missing: Option<f64>,
    mode_threshold_high_missing: Option<f64>,
    mode_margin_threshold: Option<f64>,
    fallback_label: Option<String>,
    numeric_low_missing_threshold: Option<f64>,
    numeric_high_missing_threshold: Option<f64>,
    neighbor_count: Option<usize>,
    add_missing_indicator: Option<bool>,
    use_neighbor_imputation_for_high_missing: Option<bool>,
    id_column: Option<Option<String>>,
    remove_duplicates: Option<bool>,
    prune_columns: Option<bool>,
    cardinality_threshold: Option<f64>,
    categorical_exclude: Option<Vec<String>>,
    cleaning: Option<CleaningConfig>,
}

impl PipelineConfigBuilder {
    /// Start from an existing configuration (e.g. one loaded from JSON)
    /// instead of the defaults.
    pub fn base(mut self, config: PipelineConfig) -> Self {
        self.base = Some(config);
        self
    }

    pub fn categorical_high_missing_threshold(mut self, threshold: f64) -> Self {
        self.categorical_high_missing_threshold = Some(threshold);
        self
    }

    pub fn categorical_low_missing_threshold(mut self, threshold: f64) -> Self {
        self.categorical_low_missing_threshold = Some(threshold);
        self
    }

    pub fn mode_threshold_low_missing(mut self, threshold: f64) -> Self {
        self.mode_threshold_low_missing = Some(threshold);
        self
    }

    pub fn mode_threshold_high_missing(mut self, threshold: f64) -> Self {
        self.mode_threshold_high_missing = Some(threshold);
        self
    }

    pub fn mode_margin_threshold(mut self, threshold: f64) -> Self {
        self.mode_margin_threshold = Some(threshold);
        self
    }

    /// Set the label used when the mode is not trustworthy.
    pub fn fallback_label(mut self, label: impl Into<String>) -> Self {
        self.fallback_label = Some(label.into());
        self
    }

    pub fn numeric_low_missing_threshold(mut self, threshold: f64) -> Self {
        self.numeric_low_missing_threshold = Some(threshold);
        self
    }

    pub fn numeric_high_missing_threshold(mut self, threshold: f64) -> Self {
        self.numeric_high_missing_threshold = Some(threshold);
        self
    }

    /// Set the number of donor rows for neighbor imputation.
    pub fn neighbor_count(mut self, k: usize) -> Self {
        self.neighbor_count = Some(k);
        self
    }

    pub fn add_missing_indicator(mut self, add: bool) -> Self {
        self.add_missing_indicator = Some(add);
        self
    }

    pub fn use_neighbor_imputation_for_high_missing(mut self, enable: bool) -> Self {
        self.use_neighbor_imputation_for_high_missing = Some(enable);
        self
    }

    /// Set (or clear, with `None`) the row identifier column.
    pub fn id_column(mut self, column: Option<String>) -> Self {
        self.id_column = Some(column);
        self
    }

    pub fn remove_duplicates(mut self, remove: bool) -> Self {
        self.remove_duplicates = Some(remove);
        self
    }

    pub fn prune_columns(mut self, prune: bool) -> Self {
        self.prune_columns = Some(prune);
        self
    }

    pub fn cardinality_threshold(mut self, threshold: f64) -> Self {
        self.cardinality_threshold = Some(threshold);
        self
    }

    /// Replace the list of text columns kept out of categorical imputation.
    pub fn categorical_exclude(mut self, columns: Vec<String>) -> Self {
        self.categorical_exclude = Some(columns);
        self
    }

    /// Replace the whole cleaning section. Individual cleaning setters
    /// still apply on top of it.
    pub fn cleaning(mut self, cleaning: CleaningConfig) -> Self {
        self.cleaning = Some(cleaning);
        self
    }

    /// Build the configuration.
    ///
    /// Returns a validated `PipelineConfig` or an error if validation fails.
    pub fn build(self) -> Result<PipelineConfig, ConfigValidationError> {
        let mut config = self.base.unwrap_or_default();

        if let Some(cleaning) = self.cleaning {
            config.cleaning = cleaning;
        }

        let categorical = &mut config.categorical;
        if let Some(v) = self.categorical_high_missing_threshold {
            categorical.high_missing_threshold = v;
        }
        if let Some(v) = self.categorical_low_missing_threshold {
            categorical.low_missing_threshold = v;
        }
        if let Some(v) = self.mode_threshold_low_missing {
            categorical.mode_threshold_low_missing = v;
        }
        if let Some(v) = self.mode_threshold_high_missing {
            categorical.mode_threshold_high_missing = v;
        }
        if let Some(v) = self.mode_margin_threshold {
            categorical.mode_margin_threshold = v;
        }
        if let Some(v) = self.fallback_label {
            categorical.fallback_label = v;
        }

        let numeric = &mut config.numeric;
        if let Some(v) = self.numeric_low_missing_threshold {
            numeric.low_missing_threshold = v;
        }
        if let Some(v) = self.numeric_high_missing_threshold {
            numeric.high_missing_threshold = v;
        }
        if let Some(v) = self.neighbor_count {
            numeric.neighbor_count = v;
        }
        if let Some(v) = self.add_missing_indicator {
            numeric.add_missing_indicator = v;
        }
        if let Some(v) = self.use_neighbor_imputation_for_high_missing {
            numeric.use_neighbor_imputation_for_high_missing = v;
        }

        let cleaning = &mut config.cleaning;
        if let Some(v) = self.id_column {
            cleaning.id_column = v;
        }
        if let Some(v) = self.remove_duplicates {
            cleaning.remove_duplicates = v;
        }
        if let Some(v) = self.prune_columns {
            cleaning.prune_columns = v;
        }
        if let Some(v) = self.cardinality_threshold {
            cleaning.cardinality_threshold = v;
        }
        if let Some(v) = self.categorical_exclude {
            cleaning.categorical_exclude = v;
        }

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_default_categorical_config() {
        let config = CategoricalImputationConfig::default();
        assert_eq!(config.high_missing_threshold, 0.20);
        assert_eq!(config.low_missing_threshold, 0.05);
        assert_eq!(config.mode_threshold_low_missing, 0.50);
        assert_eq!(config.mode_threshold_high_missing, 0.60);
        assert_eq!(config.mode_margin_threshold, 0.20);
        assert_eq!(config.fallback_label, "Unknown");
    }

    #[test]
    fn test_default_numeric_config() {
        let config = NumericImputationConfig::default();
        assert_eq!(config.low_missing_threshold, 0.05);
        assert_eq!(config.high_missing_threshold, 0.20);
        assert_eq!(config.neighbor_count, 5);
        assert!(config.add_missing_indicator);
        assert!(!config.use_neighbor_imputation_for_high_missing);
    }

    #[test]
    fn test_default_cleaning_config() {
        let config = CleaningConfig::default();
        assert_eq!(config.id_column.as_deref(), Some("employee_number"));
        assert_eq!(config.type_coercions.get("age"), Some(&TargetType::Int));
        assert_eq!(
            config.ordinal_mappings["job_level"].get(&4).map(String::as_str),
            Some("Manager")
        );
        assert_eq!(config.ordinal_mappings.len(), 9);
        assert!(config.is_categorical_excluded("Attrition"));
        assert!(!config.is_categorical_excluded("department"));
    }

    #[test]
    fn test_builder_defaults() {
        let config = PipelineConfig::builder().build().unwrap();
        assert_eq!(config, PipelineConfig::default());
    }

    #[test]
    fn test_builder_custom_values() {
        let config = PipelineConfig::builder()
            .neighbor_count(3)
            .fallback_label("Not Reported")
            .use_neighbor_imputation_for_high_missing(true)
            .id_column(None)
            .build()
            .unwrap();

        assert_eq!(config.numeric.neighbor_count, 3);
        assert_eq!(config.categorical.fallback_label, "Not Reported");
        assert!(config.numeric.use_neighbor_imputation_for_high_missing);
        assert_eq!(config.cleaning.id_column, None);
    }

    #[test]
    fn test_builder_applies_overrides_on_top_of_base() {
        let base = PipelineConfig::builder().neighbor_count(9).build().unwrap();
        let config = PipelineConfig::builder()
            .base(base)
            .add_missing_indicator(false)
            .build()
            .unwrap();

        assert_eq!(config.numeric.neighbor_count, 9);
        assert!(!config.numeric.add_missing_indicator);
    }

    #[test]
    fn test_validation_invalid_threshold() {
        let result = PipelineConfig::builder()
            .categorical_high_missing_threshold(1.5)
            .build();

        assert!(matches!(
            result.unwrap_err(),
            ConfigValidationError::InvalidThreshold { .. }
        ));
    }

    #[test]
    fn test_validation_inverted_thresholds() {
        let result = PipelineConfig::builder()
            .numeric_low_missing_threshold(0.3)
            .numeric_high_missing_threshold(0.1)
            .build();

        assert!(matches!(
            result.unwrap_err(),
            ConfigValidationError::InvertedThresholds { .. }
        ));
    }

    #[test]
    fn test_validation_zero_neighbors() {
        let result = PipelineConfig::builder().neighbor_count(0).build();
        assert!(matches!(
            result.unwrap_err(),
            ConfigValidationError::InvalidNeighborCount(0)
        ));
    }

    #[test]
    fn test_validation_empty_fallback_label() {
        let result = PipelineConfig::builder().fallback_label("  ").build();
        assert!(matches!(
            result.unwrap_err(),
            ConfigValidationError::EmptyFallbackLabel
        ));
    }

    #[test]
    fn test_config_from_partial_json() {
        let json = r#"{
            "categorical": { "fallback_label": "Missing" },
            "numeric": { "neighbor_count": 3, "add_missing_indicator": false },
            "cleaning": {
                "id_column": null,
                "type_coercions": { "age": "int" },
                "ordinal_mappings": { "education": { "1": "Primary" } }
            }
        }"#;

        let config: PipelineConfig = serde_json::from_str(json).unwrap();

        assert_eq!(config.categorical.fallback_label, "Missing");
        assert_eq!(config.categorical.high_missing_threshold, 0.20);
        assert_eq!(config.numeric.neighbor_count, 3);
        assert!(!config.numeric.add_missing_indicator);
        assert_eq!(config.cleaning.id_column, None);
        assert_eq!(config.cleaning.type_coercions.len(), 1);
        assert_eq!(
            config.cleaning.ordinal_mappings["education"][&1],
            "Primary".to_string()
        );
        assert!(config.cleaning.remove_duplicates);
        assert!(config.cleaning.prune_columns);
    }

    #[test]
    fn test_config_round_trips_through_json() {
        let config = PipelineConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let restored: PipelineConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config, restored);
    }

    #[test]
    fn test_from_json_file_rejects_invalid_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{ "numeric": { "neighbor_count": 0 } }"#).unwrap();

        let err = PipelineConfig::from_json_file(&path).unwrap_err();
        assert_eq!(err.error_code(), "INVALID_CONFIG");
    }
}

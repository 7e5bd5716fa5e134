//! Heuristic base-model, suitability and preset classification.
//!
//! Keyword rules are plain data evaluated top to bottom, first match wins.
//! The keyword lists are hand-tuned and deliberately approximate.

use super::extractor::keys;
use super::header::HeaderMetadata;
use super::types::{BaseModel, BaseModelSource, Confidence, Presets, Suitability};

/// A substring rule over a lowercased string.
#[derive(Debug, Clone, Copy)]
pub struct KeywordRule {
    /// Matches when any of these is contained
    pub any_of: &'static [&'static str],
    /// ...and none of these is
    pub none_of: &'static [&'static str],
    pub result: BaseModel,
}

impl KeywordRule {
    /// Whether the rule fires for an already lowercased string.
    pub fn matches(&self, text_lower: &str) -> bool {
        self.any_of.iter().any(|k| text_lower.contains(k))
            && !self.none_of.iter().any(|k| text_lower.contains(k))
    }
}

/// Rules applied to a lowercased file name.
pub const FILENAME_RULES: &[KeywordRule] = &[
    KeywordRule {
        any_of: &["flux", "flux.1", "flux1"],
        none_of: &[],
        result: BaseModel::Flux,
    },
    KeywordRule {
        any_of: &["pony", "illustrious"],
        none_of: &[],
        result: BaseModel::Pony,
    },
    KeywordRule {
        any_of: &["sdxl", "juggernautxl", "xlbase", "refiner"],
        none_of: &["1.5"],
        result: BaseModel::Sdxl,
    },
];

/// Base model assumed when no file-name rule matches.
pub const FILENAME_DEFAULT: BaseModel = BaseModel::Sd15;

/// Rules applied to lowercased metadata fields.
pub const METADATA_RULES: &[KeywordRule] = &[
    KeywordRule {
        any_of: &["xl"],
        none_of: &[],
        result: BaseModel::Sdxl,
    },
    KeywordRule {
        any_of: &["v2"],
        none_of: &[],
        result: BaseModel::Sd20,
    },
    KeywordRule {
        any_of: &["v1", "sd_v1"],
        none_of: &[],
        result: BaseModel::Sd15,
    },
];

/// Metadata fields consulted for the base model, in order.
const METADATA_FIELDS: &[&str] = &[keys::BASE_MODEL_VERSION, keys::MODEL_NAME];

const PHOTO_KEYWORDS: &[&str] = &[
    "real",
    "photoreal",
    "realistic",
    "juggernaut",
    "rev",
    "analog",
    "photograph",
];

const DRAWING_KEYWORDS: &[&str] = &[
    "anime",
    "comic",
    "toon",
    "manga",
    "cartoon",
    "pony",
    "illustrious",
];

/// First rule in `rules` matching `text_lower`.
pub fn first_match(rules: &[KeywordRule], text_lower: &str) -> Option<BaseModel> {
    rules
        .iter()
        .find(|rule| rule.matches(text_lower))
        .map(|rule| rule.result)
}

/// A base-model tag with its provenance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BaseModelGuess {
    pub base_model: BaseModel,
    pub source: BaseModelSource,
    pub confidence: Confidence,
}

/// Guess the base model from a file name alone.
pub fn base_model_from_filename(file_name: &str) -> BaseModelGuess {
    let name_lower = file_name.to_lowercase();
    match first_match(FILENAME_RULES, &name_lower) {
        Some(base_model) => BaseModelGuess {
            base_model,
            source: BaseModelSource::Filename,
            confidence: Confidence::Medium,
        },
        None => BaseModelGuess {
            base_model: FILENAME_DEFAULT,
            source: BaseModelSource::Filename,
            confidence: Confidence::Low,
        },
    }
}

/// Read the base model from training metadata.
///
/// Tries the base-model-version field, then the model-name field. Returns
/// `None` when neither is present or conclusive.
pub fn base_model_from_metadata(metadata: &HeaderMetadata) -> Option<BaseModel> {
    METADATA_FIELDS.iter().find_map(|key| {
        metadata
            .get_text(key)
            .and_then(|value| first_match(METADATA_RULES, &value.to_lowercase()))
    })
}

/// Infer the base model. Metadata, when conclusive, overrides the file name.
pub fn infer_base_model(file_name: &str, metadata: Option<&HeaderMetadata>) -> BaseModelGuess {
    let from_name = base_model_from_filename(file_name);
    match metadata.and_then(base_model_from_metadata) {
        Some(base_model) => BaseModelGuess {
            base_model,
            source: BaseModelSource::Metadata,
            confidence: Confidence::High,
        },
        None => from_name,
    }
}

/// Decide photo/drawing suitability of a checkpoint.
pub fn suitability(file_name: &str, base_model: BaseModel) -> Suitability {
    let name_lower = file_name.to_lowercase();
    let mut result = Suitability {
        photo: PHOTO_KEYWORDS.iter().any(|k| name_lower.contains(k)),
        drawing: DRAWING_KEYWORDS.iter().any(|k| name_lower.contains(k)),
    };

    match base_model {
        BaseModel::Pony => {
            result.drawing = true;
            result.photo = false;
        }
        // Flux checkpoints handle both styles.
        BaseModel::Flux => {
            result.drawing = true;
            result.photo = true;
        }
        _ => {}
    }

    result
}

/// One row of the preset table.
#[derive(Debug, Clone, Copy)]
pub struct PresetRow {
    pub base_model: BaseModel,
    /// `None` matches either value of the drawing flag
    pub drawing: Option<bool>,
    pub sampler: &'static str,
    pub steps: u32,
    pub steps_range: &'static str,
    pub cfg: f32,
    pub cfg_range: &'static str,
}

impl PresetRow {
    fn matches(&self, base_model: BaseModel, drawing: bool) -> bool {
        self.base_model == base_model && self.drawing.map_or(true, |d| d == drawing)
    }

    fn to_presets(self) -> Presets {
        Presets {
            sampler: self.sampler.to_string(),
            steps: self.steps,
            steps_range: self.steps_range.to_string(),
            cfg: self.cfg,
            cfg_range: self.cfg_range.to_string(),
        }
    }
}

/// Starter presets keyed by (base model, drawing).
pub const PRESET_TABLE: &[PresetRow] = &[
    PresetRow {
        base_model: BaseModel::Sd15,
        drawing: Some(true),
        sampler: "DPM++ SDE Karras",
        steps: 22,
        steps_range: "18–26",
        cfg: 7.0,
        cfg_range: "6.5–8.5",
    },
    PresetRow {
        base_model: BaseModel::Sdxl,
        drawing: Some(false),
        sampler: "DPM++ 2M SDE Karras",
        steps: 36,
        steps_range: "30–45",
        cfg: 4.0,
        cfg_range: "3.5–5.0",
    },
    PresetRow {
        base_model: BaseModel::Sdxl,
        drawing: Some(true),
        sampler: "DPM++ 2M SDE Karras",
        steps: 42,
        steps_range: "35–55",
        cfg: 5.0,
        cfg_range: "4.5–6.0",
    },
    PresetRow {
        base_model: BaseModel::Pony,
        drawing: None,
        sampler: "DPM++ SDE Karras",
        steps: 22,
        steps_range: "18–26",
        cfg: 7.5,
        cfg_range: "6.5–9.0",
    },
    PresetRow {
        base_model: BaseModel::Flux,
        drawing: None,
        sampler: "DPM++ 2M SDE Karras",
        steps: 30,
        steps_range: "24–40",
        cfg: 5.0,
        cfg_range: "4.0–6.0",
    },
];

/// SD 1.5 realistic defaults, used when no table row matches.
pub const DEFAULT_PRESET: PresetRow = PresetRow {
    base_model: BaseModel::Sd15,
    drawing: Some(false),
    sampler: "DPM++ 2M Karras",
    steps: 24,
    steps_range: "20–30",
    cfg: 5.5,
    cfg_range: "5.0–7.0",
};

/// Look up starter presets for a checkpoint.
pub fn presets_for(base_model: BaseModel, drawing: bool) -> Presets {
    PRESET_TABLE
        .iter()
        .find(|row| row.matches(base_model, drawing))
        .copied()
        .unwrap_or(DEFAULT_PRESET)
        .to_presets()
}

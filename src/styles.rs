// src/styles.rs
use crate::errors::HeadshotError;
use crate::models::StylePreset;
use log::info;
use std::path::Path;

pub const APP_NAME: &str = "PersonaAI";

/// Quick refinements offered next to the edit box.
pub const EDIT_SUGGESTIONS: [&str; 4] = [
    "Warm sunlight",
    "Black & white",
    "Blue tones",
    "Minimalist background",
];

/// Ordered, read-only list of headshot styles.
#[derive(Debug, Clone)]
pub struct StyleCatalog {
    presets: Vec<StylePreset>,
}

impl StyleCatalog {
    pub fn new(presets: Vec<StylePreset>) -> Result<Self, HeadshotError> {
        if presets.is_empty() {
            return Err(HeadshotError::Config(
                "Style catalog must contain at least one preset".to_string(),
            ));
        }

        for (index, preset) in presets.iter().enumerate() {
            if preset.id.trim().is_empty() || preset.prompt_text.trim().is_empty() {
                return Err(HeadshotError::Config(format!(
                    "Style preset #{} needs an id and a prompt",
                    index
                )));
            }
            if presets[..index].iter().any(|p| p.id == preset.id) {
                return Err(HeadshotError::Config(format!(
                    "Duplicate style preset id: {}",
                    preset.id
                )));
            }
        }

        Ok(Self { presets })
    }

    pub fn builtin() -> Self {
        Self {
            presets: builtin_presets(),
        }
    }

    /// Loads a JSON array of presets.
    pub fn from_file(path: &Path) -> Result<Self, HeadshotError> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            HeadshotError::Config(format!("Cannot read {}: {}", path.display(), e))
        })?;
        let presets: Vec<StylePreset> = serde_json::from_str(&raw).map_err(|e| {
            HeadshotError::Config(format!("Invalid style catalog {}: {}", path.display(), e))
        })?;

        let catalog = Self::new(presets)?;
        info!(
            "Loaded {} style presets from {}",
            catalog.presets.len(),
            path.display()
        );
        Ok(catalog)
    }

    pub fn presets(&self) -> &[StylePreset] {
        &self.presets
    }

    pub fn get(&self, id: &str) -> Option<&StylePreset> {
        self.presets.iter().find(|preset| preset.id == id)
    }
}

fn preset(id: &str, label: &str, description: &str, prompt: &str, preview: &str) -> StylePreset {
    StylePreset {
        id: id.to_string(),
        label: label.to_string(),
        description: description.to_string(),
        prompt_text: prompt.to_string(),
        preview_url: format!(
            "https://images.unsplash.com/{}?auto=format&fit=crop&q=80&w=200&h=200",
            preview
        ),
    }
}

fn builtin_presets() -> Vec<StylePreset> {
    vec![
        preset(
            "corporate-grey",
            "Corporate Grey",
            "Clean, professional grey studio backdrop.",
            "Transform this person into a professional corporate headshot. They should be wearing high-quality professional attire like a suit or a blazer. The background should be a solid, slightly textured neutral grey studio backdrop with professional lighting.",
            "photo-1560250097-0b93528c311a",
        ),
        preset(
            "modern-tech",
            "Modern Tech Office",
            "Bright, airy startup environment.",
            "Transform this person into a professional headshot suitable for a tech company. They should be wearing smart-casual professional attire. The background should be a modern, bright office with soft out-of-focus plants and clean architecture.",
            "photo-1497366216548-37526070297c",
        ),
        preset(
            "outdoor-natural",
            "Outdoor Natural",
            "Warm, organic lighting in a park setting.",
            "Transform this person into a high-end professional headshot with natural light. They should be wearing stylish but professional clothing. The background should be a beautiful, softly blurred outdoor park or botanical garden during golden hour.",
            "photo-1544005313-94ddf0286df2",
        ),
        preset(
            "executive-dark",
            "Executive Dark",
            "Moody, sophisticated boardroom style.",
            "Transform this person into a premium executive headshot. They should be wearing a dark, elegant suit or dress. The background should be a sophisticated, dimly lit executive office or boardroom with soft rim lighting.",
            "photo-1507003211169-0a1dd7228f2d",
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_catalog_ships_four_presets_in_order() {
        let catalog = StyleCatalog::builtin();
        let ids: Vec<&str> = catalog.presets().iter().map(|p| p.id.as_str()).collect();
        assert_eq!(
            ids,
            ["corporate-grey", "modern-tech", "outdoor-natural", "executive-dark"]
        );
        assert!(StyleCatalog::new(catalog.presets().to_vec()).is_ok());
    }

    #[test]
    fn lookup_by_id() {
        let catalog = StyleCatalog::builtin();
        assert_eq!(catalog.get("executive-dark").unwrap().label, "Executive Dark");
        assert!(catalog.get("cartoon").is_none());
    }

    #[test]
    fn rejects_empty_and_duplicate_catalogs() {
        assert!(StyleCatalog::new(Vec::new()).is_err());

        let grey = StyleCatalog::builtin().presets()[0].clone();
        let err = StyleCatalog::new(vec![grey.clone(), grey]).unwrap_err();
        assert!(err.to_string().contains("Duplicate style preset id"));
    }

    #[test]
    fn loads_catalog_from_json_file() {
        let path = std::env::temp_dir().join(format!("styles-{}.json", uuid::Uuid::new_v4()));
        std::fs::write(
            &path,
            r#"[{"id":"film-noir","label":"Film Noir","description":"Old Hollywood.","prompt":"Black and white noir portrait.","preview_url":"https://example.com/noir.jpg"}]"#,
        )
        .unwrap();

        let catalog = StyleCatalog::from_file(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(catalog.presets().len(), 1);
        assert_eq!(catalog.get("film-noir").unwrap().prompt_text, "Black and white noir portrait.");
    }
}

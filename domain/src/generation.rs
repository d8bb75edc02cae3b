use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
#[cfg(feature = "docs")]
use utoipa::ToSchema;

use crate::credits::{CreditAmount, CreditPricing};
use crate::error::{DomainError, DomainResult};

/// Pose directions used for multi-pose sets, in the order they are requested.
pub const POSE_DIRECTIONS: [&str; 5] = [
    "front view, standing naturally, arms relaxed",
    "three-quarter view, mid-stride walking pose",
    "side profile, one hand on hip",
    "back view, looking over the shoulder",
    "seated pose, legs crossed, full garment visible",
];

#[cfg_attr(feature = "docs", derive(ToSchema))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationKind {
    MainImage,
    MultiPose,
}

impl GenerationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::MainImage => "main_image",
            Self::MultiPose => "multi_pose",
        }
    }

    pub fn cost(self, pricing: &CreditPricing) -> CreditAmount {
        match self {
            Self::MainImage => pricing.main_image_cost,
            Self::MultiPose => pricing.multi_pose_cost,
        }
    }
}

impl FromStr for GenerationKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "main_image" => Ok(Self::MainImage),
            "multi_pose" => Ok(Self::MultiPose),
            other => Err(DomainError::InvalidGenerationKind(other.to_string())),
        }
    }
}

impl fmt::Display for GenerationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    pub scene_id: String,
    pub reference_image_url: String,
    pub prompt_hint: Option<String>,
}

impl GenerationRequest {
    pub fn new(
        scene_id: impl Into<String>,
        reference_image_url: impl Into<String>,
        prompt_hint: Option<String>,
    ) -> DomainResult<Self> {
        let scene_id = scene_id.into();
        let reference_image_url = reference_image_url.into();

        if scene_id.trim().is_empty() {
            return Err(DomainError::InvalidGenerationRequest(
                "scene id cannot be empty".to_string(),
            ));
        }
        if reference_image_url.trim().is_empty() {
            return Err(DomainError::InvalidGenerationRequest(
                "reference image url cannot be empty".to_string(),
            ));
        }

        Ok(Self {
            scene_id,
            reference_image_url,
            prompt_hint: prompt_hint.filter(|hint| !hint.trim().is_empty()),
        })
    }

    pub fn main_prompt(&self) -> String {
        self.prompt_with(None)
    }

    /// One prompt per pose, capped at the number of known pose directions.
    pub fn pose_prompts(&self, count: usize) -> Vec<String> {
        POSE_DIRECTIONS
            .iter()
            .take(count)
            .map(|pose| self.prompt_with(Some(pose)))
            .collect()
    }

    fn prompt_with(&self, pose: Option<&str>) -> String {
        let mut prompt = format!(
            "Photorealistic e-commerce photo of a model wearing the garment from the reference image, scene: {}",
            self.scene_id
        );
        if let Some(pose) = pose {
            prompt.push_str(", pose: ");
            prompt.push_str(pose);
        }
        if let Some(hint) = &self.prompt_hint {
            prompt.push_str(". ");
            prompt.push_str(hint.trim());
        }
        prompt
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedImage {
    pub url: String,
    pub pose: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn costs_follow_pricing() {
        let pricing = CreditPricing::default();
        assert_eq!(GenerationKind::MainImage.cost(&pricing).get(), 1);
        assert_eq!(GenerationKind::MultiPose.cost(&pricing).get(), 5);
    }

    #[test]
    fn kind_round_trips_through_storage_names() {
        for kind in [GenerationKind::MainImage, GenerationKind::MultiPose] {
            assert_eq!(kind.as_str().parse::<GenerationKind>().ok(), Some(kind));
        }
        assert!("poses".parse::<GenerationKind>().is_err());
    }

    #[test]
    fn request_requires_scene_and_reference() {
        assert!(GenerationRequest::new("", "https://cdn/x.png", None).is_err());
        assert!(GenerationRequest::new("studio", "  ", None).is_err());
    }

    #[test]
    fn pose_prompts_are_capped_and_distinct() {
        let request = GenerationRequest::new("street", "https://cdn/x.png", Some("soft light".into()))
            .unwrap();

        let prompts = request.pose_prompts(3);
        assert_eq!(prompts.len(), 3);
        assert!(prompts.iter().all(|p| p.contains("street") && p.ends_with("soft light")));
        assert_ne!(prompts[0], prompts[1]);

        assert_eq!(request.pose_prompts(50).len(), POSE_DIRECTIONS.len());
    }

    #[test]
    fn blank_hint_is_dropped() {
        let request = GenerationRequest::new("beach", "https://cdn/x.png", Some("   ".into())).unwrap();
        assert_eq!(request.prompt_hint, None);
        assert!(!request.main_prompt().contains("pose"));
    }
}

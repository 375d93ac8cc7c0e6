use serde::{Deserialize, Serialize};

use crate::error::FieldError;

#[derive(Debug, Clone, Copy, Serialize)]
pub struct DetectionModel {
    pub name: &'static str,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub description: &'static str,
}

pub const DETECTION_MODELS: [DetectionModel; 6] = [
    DetectionModel {
        name: "YOLOv5s",
        kind: "yolo",
        description: "Small model, fast inference",
    },
    DetectionModel {
        name: "YOLOv5m",
        kind: "yolo",
        description: "Medium model, balanced performance",
    },
    DetectionModel {
        name: "YOLOv5l",
        kind: "yolo",
        description: "Large model, high accuracy",
    },
    DetectionModel {
        name: "YOLOv5x",
        kind: "yolo",
        description: "Extra-large model, highest accuracy",
    },
    DetectionModel {
        name: "DETR",
        kind: "huggingface",
        description: "Facebook DETR model with ResNet-50 backbone",
    },
    DetectionModel {
        name: "YOLOS",
        kind: "huggingface",
        description: "Vision Transformer based object detection",
    },
];

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectRequest {
    #[serde(default)]
    pub image_url: String,
    #[serde(default)]
    pub model: String,
}

impl DetectRequest {
    pub fn validate(&self) -> Result<(), Vec<FieldError>> {
        let mut errors = Vec::new();
        if self.image_url.trim().is_empty() {
            errors.push(FieldError::new("imageUrl", "is required"));
        }
        if self.model.trim().is_empty() {
            errors.push(FieldError::new("model", "is required"));
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

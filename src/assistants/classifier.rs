//! Image classifier stub.
//!
//! No model is loaded. Labels are chosen from a fixed set by hashing the image
//! bytes, so the same upload always gets the same answer.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

const LABELS: &[&str] = &[
    "cat", "dog", "bird", "car", "bicycle", "airplane", "boat", "tree", "flower", "mountain",
    "beach", "building", "person", "food", "ball", "stadium",
];

const TOP_K: usize = 3;

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ClassifyError {
    #[error("Image is empty")]
    Empty,

    #[error("Unsupported image format")]
    UnsupportedFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    Png,
    Jpeg,
    Gif,
    Webp,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelScore {
    pub label: String,
    pub confidence: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub format: ImageFormat,
    pub size_bytes: usize,
    pub predictions: Vec<LabelScore>,
}

/// Identify the image container from its magic bytes
pub fn detect_format(bytes: &[u8]) -> Option<ImageFormat> {
    if bytes.starts_with(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]) {
        Some(ImageFormat::Png)
    } else if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
        Some(ImageFormat::Jpeg)
    } else if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
        Some(ImageFormat::Gif)
    } else if bytes.len() >= 12 && &bytes[..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
        Some(ImageFormat::Webp)
    } else {
        None
    }
}

pub fn classify(bytes: &[u8]) -> Result<Classification, ClassifyError> {
    if bytes.is_empty() {
        return Err(ClassifyError::Empty);
    }
    let format = detect_format(bytes).ok_or(ClassifyError::UnsupportedFormat)?;

    let digest = Sha256::digest(bytes);

    // Walk the digest picking distinct labels
    let mut labels: Vec<&str> = Vec::with_capacity(TOP_K);
    for byte in digest.iter() {
        let label = LABELS[*byte as usize % LABELS.len()];
        if !labels.contains(&label) {
            labels.push(label);
        }
        if labels.len() == TOP_K {
            break;
        }
    }

    // Top score in [0.5, 0.9], the rest split what remains
    let top = 0.5 + 0.4 * (digest[31] as f64 / 255.0);
    let second = (1.0 - top) * 0.6;
    let third = (1.0 - top - second) * 0.5;

    let predictions = labels
        .into_iter()
        .zip([top, second, third])
        .map(|(label, confidence)| LabelScore {
            label: label.to_string(),
            confidence,
        })
        .collect();

    Ok(Classification {
        format,
        size_bytes: bytes.len(),
        predictions,
    })
}

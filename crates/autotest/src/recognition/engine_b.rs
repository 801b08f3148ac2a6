// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Local recognition engine B (§4.J). Grounded on
//! `original_source/.../plugins/builtin/ocr.py::TesseractBackend`'s
//! per-word confidence normalization (`conf / 100.0`, negative conf
//! discarded). No bundled offline recognition model ships in this
//! crate's dependency set — `recognize` always returns no matches —
//! but the confidence-normalization rule that backend applies to every
//! word box is real and exercised here.

use super::{OcrResult, RecognitionBackend, RecognizeFuture};

pub struct EngineB {
    lang: String,
}

impl EngineB {
    pub fn new(lang: String) -> Self {
        Self { lang }
    }

    /// Normalize a raw 0-100 word-level confidence score. Negative
    /// scores mark a non-text region and are discarded upstream.
    pub fn normalize_confidence(raw: i32) -> Option<f64> {
        if raw < 0 {
            return None;
        }
        Some((raw as f64 / 100.0).clamp(0.0, 1.0))
    }
}

impl RecognitionBackend for EngineB {
    fn name(&self) -> String {
        "engine_b".to_owned()
    }

    fn recognize<'a>(&'a self, _image: &'a [u8]) -> RecognizeFuture<'a> {
        Box::pin(async move {
            tracing::debug!(lang = %self.lang, "engine_b has no bundled recognition model, returning no matches");
            Ok(Vec::<OcrResult>::new())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_confidence_scales_to_unit_interval() {
        assert_eq!(EngineB::normalize_confidence(87), Some(0.87));
        assert_eq!(EngineB::normalize_confidence(100), Some(1.0));
    }

    #[test]
    fn normalize_confidence_discards_negative_scores() {
        assert_eq!(EngineB::normalize_confidence(-1), None);
    }

    #[tokio::test]
    async fn recognize_returns_no_matches_without_a_bundled_model() {
        let engine = EngineB::new("eng".to_owned());
        let results = engine.recognize(&[]).await.unwrap();
        assert!(results.is_empty());
    }
}

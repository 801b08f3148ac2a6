// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Data types for a discovered device and the UI/shell results it
//! returns (§3).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceState {
    Online,
    Offline,
    Unauthorized,
    Connecting,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceInfo {
    pub serial: String,
    pub state: DeviceState,
    pub model: Option<String>,
    pub abi: Option<String>,
    pub brand: Option<String>,
    pub density: Option<u32>,
    pub sdk: Option<u32>,
    pub screen_width: Option<u32>,
    pub screen_height: Option<u32>,
    pub rooted: bool,
    pub a11y_enabled: bool,
}

impl DeviceInfo {
    /// Identity is the serial alone.
    pub fn new(serial: impl Into<String>, state: DeviceState) -> Self {
        Self {
            serial: serial.into(),
            state,
            model: None,
            abi: None,
            brand: None,
            density: None,
            sdk: None,
            screen_width: None,
            screen_height: None,
            rooted: false,
            a11y_enabled: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub left: f64,
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
}

impl Rect {
    pub fn from_points(xs: &[f64], ys: &[f64]) -> Self {
        let left = xs.iter().copied().fold(f64::INFINITY, f64::min);
        let right = xs.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let top = ys.iter().copied().fold(f64::INFINITY, f64::min);
        let bottom = ys.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        Self { left, top, right, bottom }
    }

    pub fn width(&self) -> f64 {
        self.right - self.left
    }

    pub fn height(&self) -> f64 {
        self.bottom - self.top
    }

    pub fn center_x(&self) -> f64 {
        self.left + self.width() / 2.0
    }

    pub fn center_y(&self) -> f64 {
        self.top + self.height() / 2.0
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UiElement {
    pub bounds: Rect,
    pub text: Option<String>,
    pub resource_id: Option<String>,
    pub class_name: Option<String>,
    pub clickable: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShellResult {
    pub exit_code: i32,
    pub output: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rect_from_points_reshapes_polygon() {
        let rect = Rect::from_points(&[10.0, 50.0, 10.0, 50.0], &[20.0, 20.0, 80.0, 80.0]);
        assert_eq!(rect, Rect { left: 10.0, top: 20.0, right: 50.0, bottom: 80.0 });
        assert_eq!(rect.center_x(), 30.0);
        assert_eq!(rect.center_y(), 50.0);
    }
}

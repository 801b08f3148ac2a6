// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Stable, numerically banded error kinds shared by every component
//! boundary.

use std::fmt;

/// A stable error kind, banded by subsystem so exit codes and logs stay
/// consistent no matter which layer raised the error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    Connection,
    Authentication,
    Timeout,
    DeviceOffline,
    RootRequired,
    AccessibilityRequired,
    AppNotInstalled,
    AppCrashed,
    InstallFailed,
    ElementNotFound,
    ElementNotVisible,
    ElementNotClickable,
    PerfSession,
    Plugin,
}

impl ErrorCode {
    /// The numeric band this code lives in, preserved from the
    /// originating implementation for diagnostic stability.
    pub fn band(self) -> u32 {
        match self {
            Self::Connection => 1000,
            Self::Authentication => 1001,
            Self::Timeout => 1002,
            Self::DeviceOffline => 2000,
            Self::RootRequired => 2001,
            Self::AccessibilityRequired => 2002,
            Self::AppNotInstalled => 3000,
            Self::AppCrashed => 3001,
            Self::InstallFailed => 3002,
            Self::ElementNotFound => 4000,
            Self::ElementNotVisible => 4001,
            Self::ElementNotClickable => 4002,
            Self::PerfSession => 5000,
            Self::Plugin => 7000,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Connection => "connection",
            Self::Authentication => "authentication",
            Self::Timeout => "timeout",
            Self::DeviceOffline => "device_offline",
            Self::RootRequired => "root_required",
            Self::AccessibilityRequired => "accessibility_required",
            Self::AppNotInstalled => "app_not_installed",
            Self::AppCrashed => "app_crashed",
            Self::InstallFailed => "install_failed",
            Self::ElementNotFound => "element_not_found",
            Self::ElementNotVisible => "element_not_visible",
            Self::ElementNotClickable => "element_not_clickable",
            Self::PerfSession => "perf_session",
            Self::Plugin => "plugin",
        }
    }

    /// Process exit code a CLI invocation should use when this is the
    /// first fatal error encountered.
    pub fn exit_code(self) -> i32 {
        (self.band() / 1000) as i32
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.band(), self.as_str())
    }
}

/// A typed error carrying an [`ErrorCode`] plus the underlying cause,
/// for boundaries where a caller needs to branch on the band (the
/// runner converting a transport error to a test result, the CLI
/// choosing an exit code).
#[derive(Debug)]
pub struct AutotestError {
    pub code: ErrorCode,
    pub source: anyhow::Error,
}

impl AutotestError {
    pub fn new(code: ErrorCode, source: impl Into<anyhow::Error>) -> Self {
        Self { code, source: source.into() }
    }
}

impl fmt::Display for AutotestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.source)
    }
}

impl std::error::Error for AutotestError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source.source()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn band_matches_documented_ranges() {
        assert_eq!(ErrorCode::Connection.band(), 1000);
        assert_eq!(ErrorCode::DeviceOffline.band(), 2000);
        assert_eq!(ErrorCode::AppNotInstalled.band(), 3000);
        assert_eq!(ErrorCode::ElementNotFound.band(), 4000);
        assert_eq!(ErrorCode::PerfSession.band(), 5000);
        assert_eq!(ErrorCode::Plugin.band(), 7000);
    }

    #[test]
    fn exit_code_derives_from_band() {
        assert_eq!(ErrorCode::Timeout.exit_code(), 1);
        assert_eq!(ErrorCode::ElementNotClickable.exit_code(), 4);
    }

    #[test]
    fn display_includes_band_and_name() {
        let rendered = ErrorCode::RootRequired.to_string();
        assert!(rendered.contains("2001"));
        assert!(rendered.contains("root_required"));
    }
}

//! Calibration session state.
//!
//! Turns cursor positions into a manual capture area (screen space) and
//! input/confirm points (client space), persisting each through the
//! configuration store as soon as it is complete.

use anyhow::{anyhow, Result};
use tracing::info;

use crate::automation::config::ConfigStore;
use crate::capture::rect::{ClientPoint, PixelRect};
use crate::capture::region::MIN_MANUAL_SIZE;

/// What a calibration hotkey records.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CalibrationStep {
    /// First corner of the manual capture area
    AreaTopLeft,
    /// Opposite corner; completes and saves the manual area
    AreaBottomRight,
    /// Where the answer is typed
    InputPoint,
    /// Where the answer is submitted
    ConfirmPoint,
}

impl CalibrationStep {
    pub fn description(&self) -> &'static str {
        match self {
            Self::AreaTopLeft => "Captcha area - TOP-LEFT corner",
            Self::AreaBottomRight => "Captcha area - BOTTOM-RIGHT corner",
            Self::InputPoint => "Answer input box",
            Self::ConfirmPoint => "Confirm button",
        }
    }
}

/// The target window's client area in screen coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ClientFrame {
    pub origin: (i32, i32),
    pub size: (u32, u32),
}

impl ClientFrame {
    /// Client point under a screen position, or `None` outside the client area.
    pub fn to_client(&self, screen: (i32, i32)) -> Option<ClientPoint> {
        let x = screen.0 - self.origin.0;
        let y = screen.1 - self.origin.1;
        let inside = x >= 0 && y >= 0 && x < self.size.0 as i32 && y < self.size.1 as i32;
        inside.then_some(ClientPoint::new(x, y))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CalibrationOutcome {
    CornerRecorded((i32, i32)),
    ManualAreaSaved(PixelRect),
    InputPointSaved(ClientPoint),
    ConfirmPointSaved(ClientPoint),
}

#[derive(Debug, Default)]
pub struct CalibrationSession {
    pending_top_left: Option<(i32, i32)>,
}

impl CalibrationSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `cursor` (screen coordinates) for `step`.
    pub fn record(
        &mut self,
        step: CalibrationStep,
        cursor: (i32, i32),
        frame: Option<ClientFrame>,
        store: &ConfigStore,
    ) -> Result<CalibrationOutcome> {
        match step {
            CalibrationStep::AreaTopLeft => {
                self.pending_top_left = Some(cursor);
                info!("Top-left corner recorded at ({}, {})", cursor.0, cursor.1);
                Ok(CalibrationOutcome::CornerRecorded(cursor))
            }
            CalibrationStep::AreaBottomRight => {
                let top_left = self
                    .pending_top_left
                    .ok_or_else(|| anyhow!("Record the top-left corner first"))?;
                let rect = PixelRect::from_corners(top_left, cursor);
                if rect.width <= MIN_MANUAL_SIZE || rect.height <= MIN_MANUAL_SIZE {
                    return Err(anyhow!(
                        "Captcha area {}x{} is too small (must exceed {}x{})",
                        rect.width,
                        rect.height,
                        MIN_MANUAL_SIZE,
                        MIN_MANUAL_SIZE
                    ));
                }
                store.set_manual_area(rect)?;
                self.pending_top_left = None;
                info!(
                    "Captcha area saved: ({}, {}) {}x{}",
                    rect.x, rect.y, rect.width, rect.height
                );
                Ok(CalibrationOutcome::ManualAreaSaved(rect))
            }
            CalibrationStep::InputPoint | CalibrationStep::ConfirmPoint => {
                let frame = frame.ok_or_else(|| anyhow!("Target window not found"))?;
                let point = frame.to_client(cursor).ok_or_else(|| {
                    anyhow!("Cursor is outside the target window's client area")
                })?;
                if point.is_origin() {
                    return Err(anyhow!("The client origin is reserved for unset points"));
                }

                if step == CalibrationStep::InputPoint {
                    store.set_input_point(point)?;
                    info!("{} saved at client ({}, {})", step.description(), point.x, point.y);
                    Ok(CalibrationOutcome::InputPointSaved(point))
                } else {
                    store.set_confirm_point(point)?;
                    info!("{} saved at client ({}, {})", step.description(), point.x, point.y);
                    Ok(CalibrationOutcome::ConfirmPointSaved(point))
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::automation::config::load_config;
    use tempfile::tempdir;

    const FRAME: ClientFrame = ClientFrame {
        origin: (100, 50),
        size: (800, 600),
    };

    #[test]
    fn test_area_from_two_corners() {
        let dir = tempdir().unwrap();
        let store = ConfigStore::open(dir.path().join("config.json"));
        let mut session = CalibrationSession::new();

        session.record(CalibrationStep::AreaTopLeft, (500, 300), None, &store).unwrap();
        let outcome = session
            .record(CalibrationStep::AreaBottomRight, (700, 360), None, &store)
            .unwrap();

        let expected = PixelRect::new(500, 300, 200, 60);
        assert_eq!(outcome, CalibrationOutcome::ManualAreaSaved(expected));
        let saved = load_config(&dir.path().join("config.json"));
        assert!(saved.capture.manual_area.enabled);
        assert_eq!(saved.capture.manual_area.rect, expected);
    }

    #[test]
    fn test_bottom_right_needs_top_left() {
        let dir = tempdir().unwrap();
        let store = ConfigStore::open(dir.path().join("config.json"));
        let mut session = CalibrationSession::new();

        assert!(session
            .record(CalibrationStep::AreaBottomRight, (700, 360), None, &store)
            .is_err());
    }

    #[test]
    fn test_tiny_area_rejected() {
        let dir = tempdir().unwrap();
        let store = ConfigStore::open(dir.path().join("config.json"));
        let mut session = CalibrationSession::new();

        session.record(CalibrationStep::AreaTopLeft, (500, 300), None, &store).unwrap();
        assert!(session
            .record(CalibrationStep::AreaBottomRight, (505, 400), None, &store)
            .is_err());
        assert!(!store.snapshot().capture.manual_area.enabled);
    }

    #[test]
    fn test_points_converted_to_client_space() {
        let dir = tempdir().unwrap();
        let store = ConfigStore::open(dir.path().join("config.json"));
        let mut session = CalibrationSession::new();

        let outcome = session
            .record(CalibrationStep::InputPoint, (420, 450), Some(FRAME), &store)
            .unwrap();
        assert_eq!(outcome, CalibrationOutcome::InputPointSaved(ClientPoint::new(320, 400)));

        session
            .record(CalibrationStep::ConfirmPoint, (520, 510), Some(FRAME), &store)
            .unwrap();
        assert_eq!(store.snapshot().confirm_point, ClientPoint::new(420, 460));
    }

    #[test]
    fn test_point_outside_client_rejected() {
        let dir = tempdir().unwrap();
        let store = ConfigStore::open(dir.path().join("config.json"));
        let mut session = CalibrationSession::new();

        assert!(session
            .record(CalibrationStep::InputPoint, (50, 50), Some(FRAME), &store)
            .is_err());
        assert!(session
            .record(CalibrationStep::InputPoint, (100, 50), Some(FRAME), &store)
            .is_err());
        assert!(session
            .record(CalibrationStep::InputPoint, (420, 450), None, &store)
            .is_err());
    }
}

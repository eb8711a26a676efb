//! Position and stacking maintenance of mounted controls.

use serde::Serialize;
use tracing::debug;

use crate::error::SurfaceError;
use crate::geometry::{Point, Rect};
use crate::registry::{AttachmentId, AttachmentRecord, AttachmentRegistry};
use crate::surface::Surface;
use crate::toolbar::{ToolbarAction, ToolbarState};

/// Side of the collapsed trigger.
pub const TRIGGER_SIZE: f64 = 36.0;
/// Inset of the trigger from the anchor's bottom-right corner.
pub const TRIGGER_INSET: f64 = 8.0;
/// Side of an expanded action button.
pub const ACTION_SIZE: f64 = 40.0;
/// Gap between the trigger top and the first action button.
pub const FIRST_ACTION_OFFSET: f64 = 65.0;
/// Vertical distance between consecutive action buttons.
pub const ACTION_SPACING: f64 = 50.0;

/// Stacking properties re-applied on every tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StackingStyle {
    pub z_index: u64,
    pub isolation: &'static str,
    pub transform: &'static str,
    pub position: &'static str,
}

/// Keeps controls above anything the host renders.
pub const ALWAYS_ON_TOP: StackingStyle = StackingStyle {
    z_index: 999_999_999,
    isolation: "isolate",
    transform: "translateZ(0)",
    position: "fixed",
};

impl StackingStyle {
    /// Inline CSS declarations in application order.
    pub fn declarations(&self) -> [(&'static str, String); 4] {
        [
            ("position", self.position.to_string()),
            ("z-index", self.z_index.to_string()),
            ("isolation", self.isolation.to_string()),
            ("transform", self.transform.to_string()),
        ]
    }
}

/// A positioned action button.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ActionButton {
    pub action: ToolbarAction,
    pub rect: Rect,
}

/// Screen placement of a control.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ControlLayout {
    pub trigger: Rect,
    /// Empty unless the menu is expanded.
    pub actions: Vec<ActionButton>,
}

impl ControlLayout {
    /// Place a control for an anchor.
    pub fn compute(anchor: Rect, expanded: bool) -> Self {
        let trigger = Rect::new(
            (anchor.right() - TRIGGER_INSET - TRIGGER_SIZE).max(0.0),
            (anchor.bottom() - TRIGGER_INSET - TRIGGER_SIZE).max(0.0),
            TRIGGER_SIZE,
            TRIGGER_SIZE,
        );

        let actions = if expanded {
            let center_x = trigger.center().x;
            ToolbarAction::ALL
                .iter()
                .enumerate()
                .map(|(i, &action)| {
                    let y = trigger.y - (FIRST_ACTION_OFFSET + ACTION_SPACING * i as f64);
                    ActionButton {
                        action,
                        rect: Rect::new(
                            (center_x - ACTION_SIZE / 2.0).max(0.0),
                            y.max(0.0),
                            ACTION_SIZE,
                            ACTION_SIZE,
                        ),
                    }
                })
                .collect()
        } else {
            Vec::new()
        };

        Self { trigger, actions }
    }

    /// Whether a point falls on the trigger or any action button.
    pub fn contains(&self, point: Point) -> bool {
        self.trigger.contains(point) || self.actions.iter().any(|a| a.rect.contains(point))
    }

    /// Area covered by the control and its expansion.
    pub fn bounds(&self) -> Rect {
        self.actions
            .iter()
            .fold(self.trigger, |acc, a| acc.union(&a.rect))
    }
}

/// Everything a surface needs to draw a control.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ControlView {
    pub layout: ControlLayout,
    pub state: ToolbarState,
    pub style: StackingStyle,
}

/// Recomputes positions and re-asserts stacking.
#[derive(Debug, Clone)]
pub struct PositionMaintainer {
    style: StackingStyle,
}

impl Default for PositionMaintainer {
    fn default() -> Self {
        Self {
            style: ALWAYS_ON_TOP,
        }
    }
}

impl PositionMaintainer {
    pub fn new(style: StackingStyle) -> Self {
        Self { style }
    }

    /// Refresh every control. Returns attachments whose anchor could not be
    /// measured; the caller hands them to the registry.
    pub async fn refresh(
        &self,
        surface: &dyn Surface,
        registry: &mut AttachmentRegistry,
    ) -> Vec<AttachmentId> {
        let mut stale = Vec::new();
        for record in registry.iter_mut() {
            match self.place(surface, record).await {
                Ok(true) => {}
                Ok(false) => stale.push(record.id),
                Err(e) => debug!(attachment = %record.id, error = %e, "Could not refresh control"),
            }
        }
        stale
    }

    /// Measure the anchor and render the control. `Ok(false)` means detached.
    pub async fn place(
        &self,
        surface: &dyn Surface,
        record: &mut AttachmentRecord,
    ) -> Result<bool, SurfaceError> {
        let rect = match surface.bounding_rect(record.anchor).await {
            Ok(Some(rect)) => rect,
            Ok(None) | Err(SurfaceError::Detached(_)) => return Ok(false),
            Err(e) => return Err(e),
        };

        let layout = ControlLayout::compute(rect, record.state.is_expanded());
        let view = ControlView {
            layout: layout.clone(),
            state: record.state.clone(),
            style: self.style,
        };
        surface.render_control(record.control, &view).await?;

        record.last_rect = Some(rect);
        record.layout = Some(layout);
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trigger_sits_inside_bottom_right_corner() {
        let layout = ControlLayout::compute(Rect::new(100.0, 400.0, 600.0, 100.0), false);
        assert_eq!(layout.trigger, Rect::new(656.0, 456.0, 36.0, 36.0));
        assert!(layout.actions.is_empty());
    }

    #[test]
    fn test_actions_column_above_trigger() {
        let layout = ControlLayout::compute(Rect::new(100.0, 400.0, 600.0, 100.0), true);
        let ys: Vec<f64> = layout.actions.iter().map(|a| a.rect.y).collect();
        assert_eq!(ys, vec![456.0 - 65.0, 456.0 - 115.0, 456.0 - 165.0]);
        for button in &layout.actions {
            assert_eq!(button.rect.center().x, layout.trigger.center().x);
            assert_eq!(button.rect.width, ACTION_SIZE);
        }
        assert_eq!(layout.actions[0].action, ToolbarAction::Enhance);
        assert_eq!(layout.actions[2].action, ToolbarAction::Settings);
    }

    #[test]
    fn test_actions_clamped_to_viewport_origin() {
        let layout = ControlLayout::compute(Rect::new(0.0, 0.0, 100.0, 80.0), true);
        assert!(layout.actions.iter().all(|a| a.rect.y >= 0.0));
        assert_eq!(layout.actions[2].rect.y, 0.0);
    }

    #[test]
    fn test_contains_and_bounds() {
        let layout = ControlLayout::compute(Rect::new(100.0, 400.0, 600.0, 100.0), true);
        assert!(layout.contains(layout.trigger.center()));
        assert!(layout.contains(layout.actions[1].rect.center()));
        assert!(!layout.contains(Point::new(10.0, 10.0)));
        let bounds = layout.bounds();
        assert!(bounds.contains(layout.actions[2].rect.center()));
        assert!(bounds.contains(layout.trigger.center()));
    }

    #[test]
    fn test_stacking_declarations() {
        let decl = ALWAYS_ON_TOP.declarations();
        assert!(decl.contains(&("z-index", "999999999".to_string())));
        assert!(decl.contains(&("isolation", "isolate".to_string())));
        assert!(decl.contains(&("transform", "translateZ(0)".to_string())));
        assert!(decl.contains(&("position", "fixed".to_string())));
    }
}

//! Signature placement and the on-screen → native coordinate transform
//!
//! The placement screen renders a PDF page at a fixed display width and lets
//! the user drag a signature box over it. The provider expects the field in
//! the page's native coordinate space (scale 1), as integers.
//!
//! Both coordinate systems are assumed to measure from the top-left corner.
//! The provider's convention has not been verified; if it turns out to be
//! bottom-left, the Y axis must be flipped here and nowhere else.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Minimum usable width and height of a signature field, in native units.
pub const MIN_FIELD_SIZE: u32 = 10;

/// Display width the placement screen renders pages at.
pub const DEFAULT_DISPLAY_WIDTH: f64 = 800.0;

/// Default on-screen box offered by the placement screen.
pub const DEFAULT_SCREEN_BOX: ScreenBox = ScreenBox {
    x: 200.0,
    y: 150.0,
    width: 200.0,
    height: 60.0,
};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PlacementError {
    #[error("Page metrics are not loaded yet")]
    NotReady,

    #[error("{field} must be an integer, got {value}")]
    NotInteger { field: &'static str, value: f64 },

    #[error("{field} must be non-negative, got {value}")]
    Negative { field: &'static str, value: f64 },

    #[error("{field} must be at least {MIN_FIELD_SIZE}, got {value}")]
    TooSmall { field: &'static str, value: f64 },

    #[error("{field} is out of range: {value}")]
    OutOfRange { field: &'static str, value: f64 },
}

/// Native page size at scale 1
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageMetrics {
    pub width: f64,
    pub height: f64,
}

/// A box in on-screen (rendered) pixels
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScreenBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl ScreenBox {
    /// Clamp the box so it lies fully inside a `container_width` ×
    /// `container_height` area. A box larger than the container is shrunk to
    /// fit first.
    pub fn clamped_to(&self, container_width: f64, container_height: f64) -> ScreenBox {
        let width = self.width.clamp(0.0, container_width.max(0.0));
        let height = self.height.clamp(0.0, container_height.max(0.0));
        ScreenBox {
            x: self.x.min(container_width - width).max(0.0),
            y: self.y.min(container_height - height).max(0.0),
            width,
            height,
        }
    }
}

/// A validated signature field in native page coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Placement {
    /// 0-based page index
    pub page: u32,
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Placement {
    /// Validation gate for placements coming off the wire.
    ///
    /// Every value must be a whole number, position values non-negative and
    /// the size at least [`MIN_FIELD_SIZE`] on both axes.
    pub fn from_raw(
        page: f64,
        x: f64,
        y: f64,
        width: f64,
        height: f64,
    ) -> Result<Self, PlacementError> {
        let page = non_negative_integer("page_number", page)?;
        let x = non_negative_integer("signature_x_orig", x)?;
        let y = non_negative_integer("signature_y_orig", y)?;
        let width = non_negative_integer("signature_w_orig", width)?;
        let height = non_negative_integer("signature_h_orig", height)?;

        if width < MIN_FIELD_SIZE {
            return Err(PlacementError::TooSmall {
                field: "signature_w_orig",
                value: width as f64,
            });
        }
        if height < MIN_FIELD_SIZE {
            return Err(PlacementError::TooSmall {
                field: "signature_h_orig",
                value: height as f64,
            });
        }

        Ok(Self {
            page,
            x,
            y,
            width,
            height,
        })
    }

    /// Right edge (`x + width`)
    pub fn right(&self) -> u64 {
        self.x as u64 + self.width as u64
    }

    /// Bottom edge (`y + height`), measured from the top
    pub fn bottom(&self) -> u64 {
        self.y as u64 + self.height as u64
    }
}

fn non_negative_integer(field: &'static str, value: f64) -> Result<u32, PlacementError> {
    if !value.is_finite() || value.fract() != 0.0 {
        return Err(PlacementError::NotInteger { field, value });
    }
    if value < 0.0 {
        return Err(PlacementError::Negative { field, value });
    }
    if value > u32::MAX as f64 {
        return Err(PlacementError::OutOfRange { field, value });
    }
    Ok(value as u32)
}

/// Convert a box dragged on the rendered page into a native placement.
///
/// `metrics` is `None` while the page size is still being measured; the
/// transform refuses to guess and returns [`PlacementError::NotReady`].
pub fn screen_to_native(
    page: u32,
    screen: ScreenBox,
    display_width: f64,
    metrics: Option<PageMetrics>,
) -> Result<Placement, PlacementError> {
    let metrics = metrics.ok_or(PlacementError::NotReady)?;
    if !is_positive(display_width) || !is_positive(metrics.width) || !is_positive(metrics.height)
    {
        return Err(PlacementError::NotReady);
    }

    let scale = display_width / metrics.width;
    let container_height = metrics.height * scale;
    let screen = screen.clamped_to(display_width, container_height);

    // Integer page bounds the rounded box has to stay inside.
    let page_width = metrics.width.floor();
    let page_height = metrics.height.floor();

    let width = (screen.width / scale).round().min(page_width);
    let height = (screen.height / scale).round().min(page_height);
    let x = (screen.x / scale).round().min(page_width - width).max(0.0);
    let y = (screen.y / scale).round().min(page_height - height).max(0.0);

    Placement::from_raw(page as f64, x, y, width, height)
}

fn is_positive(value: f64) -> bool {
    value.is_finite() && value > 0.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn letter() -> PageMetrics {
        PageMetrics {
            width: 612.0,
            height: 792.0,
        }
    }

    fn drag_box() -> ScreenBox {
        ScreenBox {
            x: 100.0,
            y: 100.0,
            width: 200.0,
            height: 60.0,
        }
    }

    #[test]
    fn page_rendered_at_double_size_halves_coordinates() {
        // 400pt page rendered 800px wide: scale factor 2
        let metrics = PageMetrics {
            width: 400.0,
            height: 600.0,
        };
        let placement = screen_to_native(0, drag_box(), 800.0, Some(metrics)).unwrap();

        assert_eq!(
            placement,
            Placement {
                page: 0,
                x: 50,
                y: 50,
                width: 100,
                height: 30,
            }
        );
    }

    #[test]
    fn page_rendered_at_half_size_doubles_coordinates() {
        // 1600pt page rendered 800px wide: scale factor 0.5
        let metrics = PageMetrics {
            width: 1600.0,
            height: 2000.0,
        };
        let placement = screen_to_native(1, drag_box(), 800.0, Some(metrics)).unwrap();

        assert_eq!(
            placement,
            Placement {
                page: 1,
                x: 200,
                y: 200,
                width: 400,
                height: 120,
            }
        );
    }

    #[test]
    fn missing_metrics_is_not_ready() {
        let result = screen_to_native(0, DEFAULT_SCREEN_BOX, DEFAULT_DISPLAY_WIDTH, None);
        assert_eq!(result, Err(PlacementError::NotReady));
    }

    #[test]
    fn zero_width_metrics_is_not_ready() {
        let metrics = PageMetrics {
            width: 0.0,
            height: 792.0,
        };
        let result = screen_to_native(0, DEFAULT_SCREEN_BOX, DEFAULT_DISPLAY_WIDTH, Some(metrics));
        assert_eq!(result, Err(PlacementError::NotReady));
    }

    #[test]
    fn box_dragged_past_the_edge_is_pulled_back() {
        let screen = ScreenBox {
            x: 790.0,
            y: -40.0,
            width: 200.0,
            height: 60.0,
        };
        let clamped = screen.clamped_to(800.0, 1000.0);
        assert_eq!(clamped.x, 600.0);
        assert_eq!(clamped.y, 0.0);
    }

    #[test]
    fn from_raw_rejects_fractional_values() {
        let err = Placement::from_raw(0.0, 10.5, 10.0, 100.0, 30.0).unwrap_err();
        assert_eq!(
            err,
            PlacementError::NotInteger {
                field: "signature_x_orig",
                value: 10.5
            }
        );
    }

    #[test]
    fn from_raw_rejects_negative_page() {
        let err = Placement::from_raw(-1.0, 0.0, 0.0, 100.0, 30.0).unwrap_err();
        assert!(matches!(err, PlacementError::Negative { field: "page_number", .. }));
    }

    #[test]
    fn from_raw_rejects_small_fields() {
        assert!(matches!(
            Placement::from_raw(0.0, 0.0, 0.0, 9.0, 30.0),
            Err(PlacementError::TooSmall { field: "signature_w_orig", .. })
        ));
        assert!(matches!(
            Placement::from_raw(0.0, 0.0, 0.0, 30.0, 9.0),
            Err(PlacementError::TooSmall { field: "signature_h_orig", .. })
        ));
        assert!(Placement::from_raw(0.0, 0.0, 0.0, 10.0, 10.0).is_ok());
    }

    #[test]
    fn tiny_rendered_box_is_rejected_after_transform() {
        // 800px wide rendering of a 400pt page: 4px on screen is 2pt native
        let result = screen_to_native(
            0,
            ScreenBox {
                x: 0.0,
                y: 0.0,
                width: 4.0,
                height: 60.0,
            },
            800.0,
            Some(PageMetrics {
                width: 400.0,
                height: 600.0,
            }),
        );
        assert!(matches!(result, Err(PlacementError::TooSmall { .. })));
    }

    fn page_metrics() -> impl Strategy<Value = PageMetrics> {
        prop_oneof![
            Just(letter()),
            Just(PageMetrics {
                width: 595.0,
                height: 842.0
            }),
            (200.0f64..3000.0, 200.0f64..3000.0)
                .prop_map(|(width, height)| PageMetrics { width, height }),
        ]
    }

    fn whole_page_metrics() -> impl Strategy<Value = PageMetrics> {
        (200u32..3000, 200u32..3000).prop_map(|(width, height)| PageMetrics {
            width: width as f64,
            height: height as f64,
        })
    }

    proptest! {
        /// Property: the native box never starts at a negative offset and never
        /// leaves the page
        #[test]
        fn native_box_stays_on_page(
            metrics in page_metrics(),
            display_width in 300.0f64..1600.0,
            x in -500.0f64..2000.0,
            y in -500.0f64..4000.0,
            width in 40.0f64..300.0,
            height in 40.0f64..200.0,
        ) {
            let screen = ScreenBox { x, y, width, height };
            if let Ok(placement) = screen_to_native(0, screen, display_width, Some(metrics)) {
                prop_assert!(placement.right() as f64 <= metrics.width);
                prop_assert!(placement.bottom() as f64 <= metrics.height);
                prop_assert!(placement.width >= MIN_FIELD_SIZE);
                prop_assert!(placement.height >= MIN_FIELD_SIZE);
            }
        }

        /// Property: scaling the native box back by the display scale lands
        /// within one native unit of the clamped on-screen box
        #[test]
        fn native_box_round_trips_within_one_unit(
            metrics in whole_page_metrics(),
            display_width in 300.0f64..1600.0,
            fx in 0.0f64..1.0,
            fy in 0.0f64..1.0,
            width in 40.0f64..250.0,
            height in 40.0f64..150.0,
        ) {
            let scale = display_width / metrics.width;
            let container_height = metrics.height * scale;
            prop_assume!(width < display_width && height < container_height);
            prop_assume!(width / scale >= 10.0 && height / scale >= 10.0);

            let screen = ScreenBox {
                x: fx * (display_width - width),
                y: fy * (container_height - height),
                width,
                height,
            };
            let placement = screen_to_native(3, screen, display_width, Some(metrics)).unwrap();

            prop_assert_eq!(placement.page, 3);
            prop_assert!((placement.x as f64 * scale - screen.x).abs() / scale <= 1.0);
            prop_assert!((placement.y as f64 * scale - screen.y).abs() / scale <= 1.0);
            prop_assert!((placement.width as f64 * scale - screen.width).abs() / scale <= 1.0);
            prop_assert!((placement.height as f64 * scale - screen.height).abs() / scale <= 1.0);
        }

        /// Property: integers within range always pass the validation gate
        #[test]
        fn whole_numbers_pass_validation(
            page in 0u32..500,
            x in 0u32..5000,
            y in 0u32..5000,
            width in MIN_FIELD_SIZE..1000,
            height in MIN_FIELD_SIZE..1000,
        ) {
            let placement = Placement::from_raw(
                page as f64, x as f64, y as f64, width as f64, height as f64,
            );
            prop_assert_eq!(placement, Ok(Placement { page, x, y, width, height }));
        }

        /// Property: fractional coordinates never pass the validation gate
        #[test]
        fn fractional_values_fail_validation(
            whole in 0u32..5000,
            frac in 0.01f64..0.99,
        ) {
            let value = whole as f64 + frac;
            prop_assert!(Placement::from_raw(0.0, value, 0.0, 20.0, 20.0).is_err());
            prop_assert!(Placement::from_raw(0.0, 0.0, 0.0, 20.0, value + 20.0).is_err());
        }
    }
}

use serde::{Deserialize, Serialize};

/// Axis-aligned box in image pixel coordinates, `(x1, y1)` top-left and `(x2, y2)` bottom-right.
///
/// The corner ordering is whatever the model produced; nothing here swaps corners.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

impl BoundingBox {
    pub fn new(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// Build from a YOLO-style center/size box.
    pub fn from_center(cx: f32, cy: f32, w: f32, h: f32) -> Self {
        Self::new(cx - w / 2.0, cy - h / 2.0, cx + w / 2.0, cy + h / 2.0)
    }

    pub fn width(&self) -> f32 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> f32 {
        self.y2 - self.y1
    }

    pub fn area(&self) -> f32 {
        self.width().max(0.0) * self.height().max(0.0)
    }

    /// Intersection over union with `other`. Degenerate boxes give `0.0`.
    pub fn iou(&self, other: &BoundingBox) -> f32 {
        let w = (self.x2.min(other.x2) - self.x1.max(other.x1)).max(0.0);
        let h = (self.y2.min(other.y2) - self.y1.max(other.y1)).max(0.0);
        let inter = w * h;
        let union = self.area() + other.area() - inter;

        if union <= 0.0 {
            0.0
        } else {
            inter / union
        }
    }

    pub fn transform(&mut self, transform: impl Fn(f32, f32) -> (f32, f32)) {
        (self.x1, self.y1) = transform(self.x1, self.y1);
        (self.x2, self.y2) = transform(self.x2, self.y2);
    }

    /// Clamp every coordinate into `[0, width] x [0, height]`.
    pub fn clip(&mut self, width: f32, height: f32) {
        self.transform(|x, y| (x.clamp(0.0, width), y.clamp(0.0, height)));
    }
}

/// A detection as decoded from the model output tensor, before any label lookup.
#[derive(Debug, Clone, PartialEq)]
pub struct RawDetection {
    pub class_id: usize,
    pub confidence: f32,
    pub bbox: BoundingBox,
}

/// A labeled detection as reported to callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub label: String,
    /// Rounded to three decimals.
    pub confidence: f64,
    pub bbox: BoundingBox,
}

impl Detection {
    pub fn new(label: &str, confidence: f32, bbox: BoundingBox) -> Self {
        Self {
            label: label.to_string(),
            confidence: round_confidence(confidence),
            bbox,
        }
    }
}

/// Round half to even on the exact value; `f32 * 1000` is exact in `f64`.
pub(crate) fn round_confidence(confidence: f32) -> f64 {
    (f64::from(confidence) * 1000.0).round_ties_even() / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn confidence_is_rounded_to_three_decimals() {
        assert_eq!(round_confidence(0.87654), 0.877);
        assert_eq!(round_confidence(0.9), 0.9);
        assert_eq!(round_confidence(0.5004), 0.5);
    }

    #[test]
    fn confidence_ties_round_to_even() {
        assert_eq!(round_confidence(0.5625), 0.562);
        assert_eq!(round_confidence(0.6875), 0.688);
        assert_eq!(round_confidence(0.8125), 0.812);
        assert_eq!(round_confidence(0.9375), 0.938);
    }

    #[test]
    fn iou_of_identical_boxes_is_one() {
        let b = BoundingBox::new(10.0, 10.0, 20.0, 20.0);
        assert!((b.iou(&b) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn iou_of_disjoint_boxes_is_zero() {
        let a = BoundingBox::new(0.0, 0.0, 10.0, 10.0);
        let b = BoundingBox::new(20.0, 20.0, 30.0, 30.0);
        assert_eq!(a.iou(&b), 0.0);
    }

    #[test]
    fn iou_of_half_overlap() {
        let a = BoundingBox::new(0.0, 0.0, 10.0, 10.0);
        let b = BoundingBox::new(5.0, 0.0, 15.0, 10.0);
        // 50 / 150
        assert!((a.iou(&b) - 1.0 / 3.0).abs() < 1e-6);
    }

    #[test]
    fn from_center_and_clip() {
        let mut b = BoundingBox::from_center(5.0, 5.0, 20.0, 4.0);
        assert_eq!(b, BoundingBox::new(-5.0, 3.0, 15.0, 7.0));

        b.clip(12.0, 12.0);
        assert_eq!(b, BoundingBox::new(0.0, 3.0, 12.0, 7.0));
    }

    #[test]
    fn detection_serializes_with_flat_bbox() {
        let det = Detection::new("knife", 0.9, BoundingBox::new(1.0, 2.0, 3.0, 4.0));
        let json = serde_json::to_value(&det).unwrap();

        assert_eq!(
            json,
            serde_json::json!({
                "label": "knife",
                "confidence": 0.9,
                "bbox": {"x1": 1.0, "y1": 2.0, "x2": 3.0, "y2": 4.0}
            })
        );
    }
}

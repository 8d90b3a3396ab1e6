use crate::config::{ColorMode, PipelineConfig};
use crate::models::{Color, Detection, FilteredDetection};

/// How kept detections are colored on the overlay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorPolicy {
    Fixed(Color),
    RandomPerDetection,
}

impl Default for ColorPolicy {
    fn default() -> Self {
        Self::Fixed(Color::GREEN)
    }
}

impl ColorPolicy {
    pub fn from_config(config: &PipelineConfig) -> Self {
        match config.color_mode {
            ColorMode::Fixed => Self::Fixed(config.box_color),
            ColorMode::Random => Self::RandomPerDetection,
        }
    }

    fn pick(&self) -> Color {
        match self {
            Self::Fixed(color) => *color,
            Self::RandomPerDetection => Color::random(),
        }
    }
}

/// Keeps detections scoring strictly above `threshold`, in input order.
///
/// A NaN confidence never compares greater, so such detections are dropped.
pub fn filter_detections(
    detections: impl IntoIterator<Item = Detection>,
    threshold: f64,
    policy: ColorPolicy,
) -> Vec<FilteredDetection> {
    detections
        .into_iter()
        .filter(|d| d.confidence > threshold)
        .map(|detection| FilteredDetection {
            detection,
            color: policy.pick(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::rect_quad;
    use pretty_assertions::assert_eq;

    fn det(text: &str, confidence: f64) -> Detection {
        Detection::new(rect_quad(0.0, 0.0, 10.0, 10.0), text, confidence)
    }

    fn texts(kept: &[FilteredDetection]) -> Vec<&str> {
        kept.iter().map(|k| k.detection.text.as_str()).collect()
    }

    #[test]
    fn test_keeps_strictly_above_threshold_in_order() {
        let input = vec![
            det("a", 0.9),
            det("b", 0.5),
            det("c", 0.2),
            det("d", 0.51),
            det("e", 1.0),
        ];
        let kept = filter_detections(input, 0.5, ColorPolicy::default());
        assert_eq!(texts(&kept), vec!["a", "d", "e"]);
        assert!(kept.iter().all(|k| k.color == Color::GREEN));
    }

    #[test]
    fn test_nan_is_never_kept() {
        let kept = filter_detections(vec![det("nan", f64::NAN)], 0.0, ColorPolicy::default());
        assert!(kept.is_empty());
    }

    #[test]
    fn test_empty_input() {
        assert!(filter_detections(Vec::new(), 0.5, ColorPolicy::default()).is_empty());
    }

    #[test]
    fn test_threshold_bounds() {
        let input = vec![det("zero", 0.0), det("one", 1.0)];
        assert_eq!(
            texts(&filter_detections(input.clone(), 0.0, ColorPolicy::default())),
            vec!["one"]
        );
        assert!(filter_detections(input, 1.0, ColorPolicy::default()).is_empty());
    }

    #[test]
    fn test_idempotent() {
        let input = vec![det("a", 0.7), det("b", 0.1), det("c", 0.95)];
        let once = filter_detections(input, 0.6, ColorPolicy::default());
        let again = filter_detections(
            once.iter().map(|k| k.detection.clone()),
            0.6,
            ColorPolicy::default(),
        );
        assert_eq!(once, again);
    }

    #[test]
    fn test_fixed_policy_from_config() {
        let config = PipelineConfig {
            box_color: Color::new(255, 0, 0),
            ..PipelineConfig::default()
        };
        assert_eq!(
            ColorPolicy::from_config(&config),
            ColorPolicy::Fixed(Color::new(255, 0, 0))
        );

        let config = PipelineConfig {
            color_mode: ColorMode::Random,
            ..PipelineConfig::default()
        };
        assert_eq!(
            ColorPolicy::from_config(&config),
            ColorPolicy::RandomPerDetection
        );
    }
}

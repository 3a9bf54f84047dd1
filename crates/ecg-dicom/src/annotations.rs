//! 波形注释摘要

use crate::source::AnnotationItem;
use ecg_core::AnnotationSummary;
use serde_json::Value;

/// 注释序列缺失时的摘要内容
pub const NO_ANNOTATIONS: &str = "No summary annotations present";

/// 将注释序列整理为摘要
///
/// - 自由文本 → `Summary_L<i>`
/// - 概念名 + 数值 → `<概念名>`
/// - 概念名 + 采样位置 → 起搏脉冲记为 `PacemakerSpikes = "Ja"`，其余记录采样位置
pub fn summarize_annotations(items: Option<&[AnnotationItem]>) -> AnnotationSummary {
    let mut summary = AnnotationSummary::new();

    let items = match items {
        Some(items) => items,
        None => {
            summary.insert("Summary".to_string(), Value::from(NO_ANNOTATIONS));
            return summary;
        }
    };

    for (index, item) in items.iter().enumerate() {
        if let Some(text) = &item.unformatted_text {
            summary.insert(format!("Summary_L{}", index), Value::from(text.as_str()));
            continue;
        }

        let meaning = match &item.concept_meaning {
            Some(meaning) => meaning,
            None => continue,
        };

        if let Some(value) = item.numeric_value {
            summary.insert(meaning.clone(), Value::from(value));
        } else if let Some(positions) = &item.referenced_sample_positions {
            let first = positions.first().copied().unwrap_or(0);
            if meaning.contains("Pacemaker Spike") && first > 0 {
                summary.insert("PacemakerSpikes".to_string(), Value::from("Ja"));
            } else {
                summary.insert(meaning.clone(), Value::from(positions.clone()));
            }
        }
    }

    summary
}

#[cfg(test)]
mod tests {
    use super::*;

    fn concept(meaning: &str) -> AnnotationItem {
        AnnotationItem {
            concept_meaning: Some(meaning.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_absent_sequence() {
        let summary = summarize_annotations(None);
        assert_eq!(summary.len(), 1);
        assert_eq!(summary["Summary"], NO_ANNOTATIONS);
    }

    #[test]
    fn test_summary_entries() {
        let items = vec![
            AnnotationItem {
                unformatted_text: Some("Sinus rhythm".to_string()),
                ..Default::default()
            },
            AnnotationItem {
                numeric_value: Some(72.0),
                ..concept("Ventricular Heart Rate")
            },
            AnnotationItem {
                referenced_sample_positions: Some(vec![120]),
                ..concept("Pacemaker Spike")
            },
            AnnotationItem {
                referenced_sample_positions: Some(vec![3, 9]),
                ..concept("QRS onset")
            },
            AnnotationItem::default(),
        ];

        let summary = summarize_annotations(Some(items.as_slice()));

        assert_eq!(summary["Summary_L0"], "Sinus rhythm");
        assert_eq!(summary["Ventricular Heart Rate"], 72.0);
        assert_eq!(summary["PacemakerSpikes"], "Ja");
        assert_eq!(summary["QRS onset"], serde_json::json!([3, 9]));
        assert_eq!(summary.len(), 4);
    }

    #[test]
    fn test_pacemaker_spike_at_zero_is_kept_as_positions() {
        let items = vec![AnnotationItem {
            referenced_sample_positions: Some(vec![0]),
            ..concept("Pacemaker Spike")
        }];
        let summary = summarize_annotations(Some(items.as_slice()));
        assert!(!summary.contains_key("PacemakerSpikes"));
        assert_eq!(summary["Pacemaker Spike"], serde_json::json!([0]));
    }
}

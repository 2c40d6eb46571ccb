use serde::Serialize;

use crate::labels::LabelTable;
use crate::model::Classifier;

/// Candidates returned per request.
pub const PREDICT_K: usize = 3;

#[derive(Debug, Clone, Serialize)]
pub struct Prediction {
    pub label: String,
    pub confidence: f32,
}

#[derive(Debug, Serialize)]
pub struct PredictResponse {
    pub predictions: Vec<Prediction>,
}

/// Run the classifier and resolve its labels for display. The model's
/// ranking order is preserved exactly; resolution never reorders or drops a
/// candidate, and an unknown label passes through as the raw identifier.
pub fn predict_resolved<C: Classifier>(
    model: &C,
    labels: &LabelTable,
    text: &str,
    k: usize,
) -> anyhow::Result<Vec<Prediction>> {
    let ranked = model.predict(text, k)?;
    Ok(ranked
        .into_iter()
        .map(|p| Prediction {
            label: labels.resolve(&p.label).to_string(),
            confidence: p.confidence,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ModelPrediction;
    use crate::sheets::DataRecord;

    struct FixedClassifier(Vec<ModelPrediction>);

    impl Classifier for FixedClassifier {
        fn predict(&self, _text: &str, k: usize) -> anyhow::Result<Vec<ModelPrediction>> {
            Ok(self.0.iter().take(k).cloned().collect())
        }
    }

    fn table_with(rows: &[(&str, &str, &str)]) -> LabelTable {
        let data: Vec<DataRecord> = rows
            .iter()
            .map(|(code, provision, specialty)| DataRecord {
                code: Some(code.to_string()),
                provider_provision: provision.to_string(),
                provider_provision_specialty: specialty.to_string(),
                provision: None,
                provision_specialty: None,
            })
            .collect();
        LabelTable::build(&data, &[])
    }

    fn ranked(labels: &[(&str, f32)]) -> Vec<ModelPrediction> {
        labels
            .iter()
            .map(|(label, confidence)| ModelPrediction {
                label: label.to_string(),
                confidence: *confidence,
            })
            .collect()
    }

    #[test]
    fn preserves_model_ranking_order() {
        let table = table_with(&[
            ("1", "Primera", "A"),
            ("2", "Segunda", "B"),
            ("3", "Tercera", "C"),
        ]);
        let model = FixedClassifier(ranked(&[
            ("__label__2", 0.9),
            ("__label__1", 0.06),
            ("__label__3", 0.04),
        ]));

        let out = predict_resolved(&model, &table, "whatever", PREDICT_K).unwrap();
        let labels: Vec<&str> = out.iter().map(|p| p.label.as_str()).collect();
        assert_eq!(labels, ["segunda b", "primera a", "tercera c"]);
        assert_eq!(out[0].confidence, 0.9);
    }

    #[test]
    fn unknown_labels_pass_through_unchanged() {
        let table = table_with(&[("1", "Primera", "A")]);
        let model = FixedClassifier(ranked(&[
            ("__label__1", 0.7),
            ("__label__999", 0.3),
        ]));

        let out = predict_resolved(&model, &table, "whatever", PREDICT_K).unwrap();
        assert_eq!(out[0].label, "primera a");
        assert_eq!(out[1].label, "__label__999");
    }

    #[test]
    fn truncates_to_k() {
        let table = table_with(&[]);
        let model = FixedClassifier(ranked(&[
            ("__label__1", 0.5),
            ("__label__2", 0.3),
            ("__label__3", 0.15),
            ("__label__4", 0.05),
        ]));

        let out = predict_resolved(&model, &table, "whatever", PREDICT_K).unwrap();
        assert_eq!(out.len(), 3);
    }

    #[test]
    fn response_serializes_with_the_wire_field_names() {
        let response = PredictResponse {
            predictions: vec![Prediction {
                label: "cardiologia general consulta".to_string(),
                confidence: 0.75,
            }],
        };
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(
            value["predictions"][0]["label"],
            "cardiologia general consulta"
        );
        assert!(value["predictions"][0]["confidence"].is_number());
    }
}

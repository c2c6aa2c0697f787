use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use super::enums::{QuestionType, QueueStatus};
use super::patient::PatientInfo;

/// Answer payload for one question.
///
/// Untagged on the wire so clients keep sending plain JSON values:
/// `"2024-06-01"`, `true`, `["Asma"]` or `{"choices": ["Ya"], "note": "..."}`.
/// Objects keep every key in submission order and any other JSON value is
/// kept as is, so a stored answer reads back exactly as it was sent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnswerValue {
    Flag(bool),
    Text(String),
    Choices(Vec<String>),
    Structured(Map<String, Value>),
    Other(Value),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerItem {
    pub question_id: Uuid,
    pub answer: AnswerValue,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScreeningAnswer {
    pub id: Uuid,
    pub patient_info: PatientInfo,
    pub answers: Vec<AnswerItem>,
    pub created_at: DateTime<Utc>,
}

/// Administrative correction of a submitted answer set.
///
/// Only the answer list may change after submission; any other key in
/// the patch is rejected at deserialization.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AnswerCorrection {
    pub answers: Option<Vec<AnswerItem>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScreeningQuestion {
    pub id: Uuid,
    pub label: String,
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NewQuestion {
    pub label: String,
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    #[serde(default)]
    pub options: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct QuestionPatch {
    pub label: Option<String>,
    #[serde(rename = "type")]
    pub question_type: Option<QuestionType>,
    pub options: Option<Vec<String>>,
}

impl QuestionPatch {
    pub fn is_empty(&self) -> bool {
        self.label.is_none() && self.question_type.is_none() && self.options.is_none()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueEntry {
    pub id: Uuid,
    pub patient_info: PatientInfo,
    pub screening_answer_id: Uuid,
    pub status: QueueStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Body of a queue status change. The status stays a raw string so an
/// unknown value is reported as an invalid status rather than a malformed
/// request.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StatusUpdate {
    pub status: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn answer_values_keep_plain_json_shapes() {
        let raw = r#"[
            {"question_id": "00000000-0000-0000-0000-000000000001", "answer": "2024-06-01"},
            {"question_id": "00000000-0000-0000-0000-000000000002", "answer": true},
            {"question_id": "00000000-0000-0000-0000-000000000003", "answer": ["Asma", "Diabetes"]},
            {"question_id": "00000000-0000-0000-0000-000000000004", "answer": {"choices": ["Ya"], "note": "Paracetamol"}}
        ]"#;
        let items: Vec<AnswerItem> = serde_json::from_str(raw).unwrap();

        assert_eq!(items[0].answer, AnswerValue::Text("2024-06-01".into()));
        assert_eq!(items[1].answer, AnswerValue::Flag(true));
        assert_eq!(
            items[2].answer,
            AnswerValue::Choices(vec!["Asma".into(), "Diabetes".into()])
        );
        let AnswerValue::Structured(detail) = &items[3].answer else {
            panic!("expected an object answer, got {:?}", items[3].answer);
        };
        assert_eq!(detail["note"], "Paracetamol");

        let back = serde_json::to_value(&items[3]).unwrap();
        assert_eq!(back["answer"]["note"], "Paracetamol");
    }

    #[test]
    fn free_form_answers_keep_every_key_and_value() {
        let raw = r#"[{"question_id":"00000000-0000-0000-0000-000000000001","answer":{"choices":["Ya"],"text":"Paracetamol"}},{"question_id":"00000000-0000-0000-0000-000000000002","answer":{"selected":["Asma"],"detail":"x"}},{"question_id":"00000000-0000-0000-0000-000000000003","answer":3},{"question_id":"00000000-0000-0000-0000-000000000004","answer":[1,"dua",null]}]"#;
        let items: Vec<AnswerItem> = serde_json::from_str(raw).unwrap();

        assert!(matches!(items[0].answer, AnswerValue::Structured(_)));
        assert!(matches!(items[1].answer, AnswerValue::Structured(_)));
        assert_eq!(items[2].answer, AnswerValue::Other(Value::from(3)));
        assert!(matches!(items[3].answer, AnswerValue::Other(Value::Array(_))));

        assert_eq!(serde_json::to_string(&items).unwrap(), raw);
    }

    #[test]
    fn correction_rejects_unknown_fields() {
        let ok: AnswerCorrection = serde_json::from_str(r#"{"answers": []}"#).unwrap();
        assert_eq!(ok.answers.map(|a| a.len()), Some(0));

        let err = serde_json::from_str::<AnswerCorrection>(r#"{"patient_info": {}}"#);
        assert!(err.is_err());
    }

    #[test]
    fn question_patch_rejects_unknown_fields() {
        let patch: QuestionPatch = serde_json::from_str(r#"{"label": "Allergies?"}"#).unwrap();
        assert_eq!(patch.label.as_deref(), Some("Allergies?"));
        assert!(!patch.is_empty());

        assert!(serde_json::from_str::<QuestionPatch>(r#"{"position": 3}"#).is_err());
        assert!(QuestionPatch::default().is_empty());
    }

    #[test]
    fn snapshot_accepts_legacy_nik_key() {
        let info: PatientInfo =
            serde_json::from_str(r#"{"nik": "3201010101010001", "full_name": "Siti"}"#).unwrap();
        assert_eq!(info.national_id, "3201010101010001");
        assert_eq!(info.full_name, "Siti");
        assert_eq!(info.age, 0);
    }
}

use crate::db::DatabaseError;
use serde::{Deserialize, Serialize};

/// Macro to generate enum with as_str + std::str::FromStr pattern
macro_rules! str_enum {
    ($name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(#[serde(rename = $s)] $variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = DatabaseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok(Self::$variant)),+,
                    _ => Err(DatabaseError::InvalidEnum {
                        field: stringify!($name).into(),
                        value: s.into(),
                    }),
                }
            }
        }
    };
}

str_enum!(QueueStatus {
    ScreeningPending => "screening_pending",
    InProgress => "in_progress",
    Done => "done",
});

str_enum!(QuestionType {
    Date => "date",
    Text => "text",
    Select => "select",
    Checkbox => "checkbox",
    CheckboxTextarea => "checkbox_textarea",
});

str_enum!(AccountRole {
    Patient => "patient",
    Admin => "admin",
    Doctor => "doctor",
    Paramedic => "paramedic",
    Cashier => "cashier",
});

impl QueueStatus {
    /// Forward-only: pending → in_progress → done, plus pending → done
    /// for patients released straight after screening.
    pub fn can_advance_to(&self, next: QueueStatus) -> bool {
        matches!(
            (self, next),
            (QueueStatus::ScreeningPending, QueueStatus::InProgress)
                | (QueueStatus::ScreeningPending, QueueStatus::Done)
                | (QueueStatus::InProgress, QueueStatus::Done)
        )
    }

    /// The waiting line is served oldest-first; processed entries read newest-first.
    pub fn lists_oldest_first(&self) -> bool {
        matches!(self, QueueStatus::ScreeningPending)
    }
}

impl QuestionType {
    /// Types whose answers are picked from the question's option list.
    pub fn requires_options(&self) -> bool {
        matches!(
            self,
            QuestionType::Select | QuestionType::Checkbox | QuestionType::CheckboxTextarea
        )
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn queue_status_round_trips_through_str() {
        for status in [QueueStatus::ScreeningPending, QueueStatus::InProgress, QueueStatus::Done] {
            assert_eq!(QueueStatus::from_str(status.as_str()).unwrap(), status);
        }
    }

    #[test]
    fn unknown_queue_status_is_rejected() {
        let err = QueueStatus::from_str("waiting").unwrap_err();
        assert!(matches!(err, DatabaseError::InvalidEnum { ref value, .. } if value == "waiting"));
        assert!(QueueStatus::from_str("Done").is_err());
        assert!(QueueStatus::from_str("").is_err());
    }

    #[test]
    fn transitions_only_move_forward() {
        use QueueStatus::*;
        assert!(ScreeningPending.can_advance_to(InProgress));
        assert!(ScreeningPending.can_advance_to(Done));
        assert!(InProgress.can_advance_to(Done));

        assert!(!InProgress.can_advance_to(ScreeningPending));
        assert!(!Done.can_advance_to(InProgress));
        assert!(!Done.can_advance_to(ScreeningPending));
        assert!(!ScreeningPending.can_advance_to(ScreeningPending));
        assert!(!Done.can_advance_to(Done));
    }

    #[test]
    fn serde_uses_snake_case_wire_names() {
        let json = serde_json::to_string(&QueueStatus::ScreeningPending).unwrap();
        assert_eq!(json, "\"screening_pending\"");
        let parsed: QuestionType = serde_json::from_str("\"checkbox_textarea\"").unwrap();
        assert_eq!(parsed, QuestionType::CheckboxTextarea);
    }

    #[test]
    fn option_requirements_by_type() {
        assert!(QuestionType::Select.requires_options());
        assert!(QuestionType::CheckboxTextarea.requires_options());
        assert!(!QuestionType::Date.requires_options());
        assert!(!QuestionType::Text.requires_options());
    }
}

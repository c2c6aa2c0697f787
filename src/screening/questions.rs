//! Screening questionnaire catalog.

use rusqlite::{Connection, Transaction, TransactionBehavior};
use uuid::Uuid;

use crate::db::repository;
use crate::error::IntakeError;
use crate::models::enums::QuestionType;
use crate::models::{NewQuestion, QuestionPatch, ScreeningQuestion};

// ─── Default questionnaire ────────────────────────────────────────────────────

/// Pre-hike screening asked at the clinic desk.
const DEFAULT_QUESTIONS: &[(&str, QuestionType, &[&str])] = &[
    ("Tanggal Rencana Pendakian", QuestionType::Date, &[]),
    (
        "Jumlah Pendakian Sebelumnya (di atas 2.000 mdpl)",
        QuestionType::Text,
        &[],
    ),
    (
        "Apakah Anda memiliki riwayat penyakit berikut ini?",
        QuestionType::Checkbox,
        &[
            "Penyakit jantung",
            "Asma",
            "Hipertensi (tekanan darah tinggi)",
            "Hipotensi (tekanan darah rendah)",
            "Diabetes",
            "Masalah paru-paru lainnya",
            "Cedera sendi/lutut/pergelangan kaki",
            "Tidak ada dari yang disebutkan",
        ],
    ),
    (
        "Kapan terakhir kali Anda melakukan pemeriksaan kesehatan umum?",
        QuestionType::Select,
        &[
            "Kurang dari 6 bulan yang lalu",
            "6 bulan - 1 tahun yang lalu",
            "Lebih dari 1 tahun yang lalu",
            "Belum pernah melakukan",
        ],
    ),
    (
        "Apakah Anda memiliki masalah dengan:",
        QuestionType::Checkbox,
        &[
            "Pernapasan saat berolahraga berat",
            "Daya tahan tubuh saat melakukan aktivitas fisik",
            "Tidak ada masalah di atas",
        ],
    ),
    (
        "Apakah Anda sedang dalam pengobatan rutin atau menggunakan obat tertentu? Jika ya, sebutkan:",
        QuestionType::CheckboxTextarea,
        &["Ya", "Tidak"],
    ),
    (
        "Bagaimana Anda menilai kondisi fisik Anda saat ini untuk pendakian (misal: kekuatan otot, keseimbangan, stamina)?",
        QuestionType::Select,
        &["Sangat baik", "Baik", "Cukup", "Buruk"],
    ),
    (
        "Apakah Anda memiliki alergi (terhadap makanan, obat, atau lainnya)? jika Ya, sebutkan:",
        QuestionType::CheckboxTextarea,
        &["Ya", "Tidak"],
    ),
];

/// Load the default questionnaire into an empty catalog. Returns the number
/// of questions inserted, 0 when the catalog already had questions.
pub fn seed_default_questions(conn: &Connection) -> Result<usize, IntakeError> {
    let tx = Transaction::new_unchecked(conn, TransactionBehavior::Immediate)?;
    if repository::count_questions(&tx)? > 0 {
        return Ok(0);
    }

    for (label, question_type, options) in DEFAULT_QUESTIONS {
        let question = ScreeningQuestion {
            id: Uuid::new_v4(),
            label: label.to_string(),
            question_type: *question_type,
            options: options.iter().map(|o| o.to_string()).collect(),
        };
        repository::insert_question(&tx, &question)?;
    }
    tx.commit()?;

    tracing::info!(count = DEFAULT_QUESTIONS.len(), "Seeded default screening questions");
    Ok(DEFAULT_QUESTIONS.len())
}

// ─── Catalog operations ───────────────────────────────────────────────────────

pub fn list(conn: &Connection) -> Result<Vec<ScreeningQuestion>, IntakeError> {
    Ok(repository::list_questions(conn)?)
}

pub fn find(conn: &Connection, id: &Uuid) -> Result<ScreeningQuestion, IntakeError> {
    repository::get_question(conn, id)?.ok_or_else(|| IntakeError::not_found("screening question", id))
}

pub fn create(conn: &Connection, input: NewQuestion) -> Result<ScreeningQuestion, IntakeError> {
    let question = ScreeningQuestion {
        id: Uuid::new_v4(),
        label: input.label.trim().to_string(),
        question_type: input.question_type,
        options: input.options,
    };
    validate(&question)?;
    repository::insert_question(conn, &question)?;
    tracing::info!(question_id = %question.id, kind = %question.question_type, "Screening question added");
    Ok(question)
}

/// Apply the fields present in `patch` and re-validate the merged question.
pub fn update(conn: &Connection, id: &Uuid, patch: QuestionPatch) -> Result<ScreeningQuestion, IntakeError> {
    if patch.is_empty() {
        return Err(IntakeError::Validation("update contains no changes".into()));
    }

    let mut question = find(conn, id)?;
    if let Some(label) = patch.label {
        question.label = label.trim().to_string();
    }
    if let Some(question_type) = patch.question_type {
        question.question_type = question_type;
        // Switching to a free-form type drops options the caller did not restate.
        if !question_type.requires_options() && patch.options.is_none() {
            question.options.clear();
        }
    }
    if let Some(options) = patch.options {
        question.options = options;
    }
    validate(&question)?;

    if !repository::update_question(conn, &question)? {
        return Err(IntakeError::not_found("screening question", id));
    }
    Ok(question)
}

fn validate(question: &ScreeningQuestion) -> Result<(), IntakeError> {
    if question.label.is_empty() {
        return Err(IntakeError::Validation("question label is required".into()));
    }
    if question.question_type.requires_options() {
        if question.options.is_empty() {
            return Err(IntakeError::Validation(format!(
                "{} questions need at least one option",
                question.question_type
            )));
        }
        if question.options.iter().any(|o| o.trim().is_empty()) {
            return Err(IntakeError::Validation("options must not be blank".into()));
        }
    } else if !question.options.is_empty() {
        return Err(IntakeError::Validation(format!(
            "{} questions take no options",
            question.question_type
        )));
    }
    Ok(())
}

//! Candidate Store: the fixed, read-only table of candidates consulted by the matching step.
//!
//! The store is built once at startup and handed out by shared reference only.
//! There is no way to add, remove or edit a record after construction.

use serde::Serialize;

use crate::models::CandidateRecord;

/// Immutable, ordered collection of candidate records.
#[derive(Debug, Clone, Serialize)]
#[serde(transparent)]
pub struct CandidateStore {
    records: Vec<CandidateRecord>,
}

impl CandidateStore {
    pub fn new(records: Vec<CandidateRecord>) -> Self {
        Self { records }
    }

    /// The six built-in candidates.
    pub fn builtin() -> Self {
        Self::new(vec![
            CandidateRecord::new(
                "c-101",
                "Ivan Georgiev",
                "ivan.georgiev@example.com",
                "Frontend Developer",
                3,
                3000,
                &["React", "TypeScript", "CSS"],
            ),
            CandidateRecord::new(
                "c-202",
                "Maria Petrova",
                "maria.petrova@example.com",
                "Backend Developer",
                4,
                3500,
                &["Node.js", "PostgreSQL", "Docker"],
            ),
            CandidateRecord::new(
                "c-303",
                "Nikolay Dimitrov",
                "nikolay.dimitrov@example.com",
                "DevOps Engineer",
                6,
                4500,
                &["Kubernetes", "Terraform", "AWS"],
            ),
            CandidateRecord::new(
                "c-404",
                "Elena Stoyanova",
                "elena.stoyanova@example.com",
                "Data Scientist",
                5,
                4200,
                &["Python", "Pandas", "TensorFlow"],
            ),
            CandidateRecord::new(
                "c-505",
                "Georgi Ivanov",
                "georgi.ivanov@example.com",
                "Full Stack Developer",
                2,
                2800,
                &["Node.js", "React", "MongoDB"],
            ),
            CandidateRecord::new(
                "c-606",
                "Desislava Koleva",
                "desislava.koleva@example.com",
                "QA Engineer",
                3,
                2500,
                &["Selenium", "Cypress", "JavaScript"],
            ),
        ])
    }

    pub fn records(&self) -> &[CandidateRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Pretty JSON rendering used as the matching step's attachment.
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self.records)
    }
}

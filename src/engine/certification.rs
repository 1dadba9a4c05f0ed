use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::models::domain::CertificateLevel;

static CERTIFICATE_NUMBER_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^CERT-\d{8}-[0-9A-F]{8}$").expect("CERTIFICATE_NUMBER_REGEX is a valid regex pattern")
});

/// Score bands: 90+ platinum, 80+ gold, 70+ silver, anything else bronze.
pub fn level_for_score(score: i16) -> CertificateLevel {
    match score {
        s if s >= 90 => CertificateLevel::Platinum,
        s if s >= 80 => CertificateLevel::Gold,
        s if s >= 70 => CertificateLevel::Silver,
        _ => CertificateLevel::Bronze,
    }
}

/// `CERT-YYYYMMDD-XXXXXXXX`, suffix taken from a random uuid.
pub fn certificate_number(issued_at: DateTime<Utc>, entropy: Uuid) -> String {
    let suffix: String = entropy.simple().to_string()[..8].to_uppercase();
    format!("CERT-{}-{}", issued_at.format("%Y%m%d"), suffix)
}

pub fn is_well_formed_number(candidate: &str) -> bool {
    CERTIFICATE_NUMBER_REGEX.is_match(candidate)
}

pub fn integrity_hash(
    certificate_number: &str,
    user_id: &str,
    course_id: &str,
    exam_score: i16,
    issued_at: DateTime<Utc>,
) -> String {
    let mut hasher = Sha256::new();
    hasher.update(certificate_number.as_bytes());
    hasher.update(b"|");
    hasher.update(user_id.as_bytes());
    hasher.update(b"|");
    hasher.update(course_id.as_bytes());
    hasher.update(b"|");
    hasher.update(exam_score.to_string().as_bytes());
    hasher.update(b"|");
    hasher.update(issued_at.timestamp_millis().to_string().as_bytes());
    format!("{:x}", hasher.finalize())
}

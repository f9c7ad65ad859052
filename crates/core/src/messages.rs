//! Outbound message copy.
//!
//! Every user-facing string the engine sends is built here so the
//! privacy rules are enforceable in one place. The hard rule: copy
//! addressed to a caregiver names the patient by first name only and
//! never mentions the medication name or dosage.

use crate::dose::DoseStatus;

// ---------------------------------------------------------------------------
// Device reminder tiers
// ---------------------------------------------------------------------------

/// Which reminder a device push trigger represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReminderKind {
    Initial,
    Retry1,
    Retry2,
}

impl ReminderKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ReminderKind::Initial => "initial",
            ReminderKind::Retry1 => "retry_1",
            ReminderKind::Retry2 => "retry_2",
        }
    }
}

/// Title line for a device reminder push.
pub fn reminder_title(kind: ReminderKind) -> &'static str {
    match kind {
        ReminderKind::Initial => "Medication reminder",
        ReminderKind::Retry1 => "Medication reminder",
        ReminderKind::Retry2 => "Missed medication",
    }
}

/// Body line for a device reminder push. The patient sees their own
/// medication details, unlike caregiver copy.
pub fn reminder_body(kind: ReminderKind, med_name: &str, dosage: &str) -> String {
    match kind {
        ReminderKind::Initial => format!("Time to take {med_name} ({dosage})."),
        ReminderKind::Retry1 => {
            format!("Please take your medication: {med_name} ({dosage}).")
        }
        ReminderKind::Retry2 => format!(
            "You still haven't confirmed {med_name} ({dosage}). Please take it now or mark it skipped."
        ),
    }
}

// ---------------------------------------------------------------------------
// Patient confirmation SMS
// ---------------------------------------------------------------------------

/// Text asking the patient to confirm a critical dose by SMS reply.
pub fn confirmation_sms(med_name: &str, dosage: &str) -> String {
    format!(
        "Hi, it's time for your {med_name} ({dosage}). \
         Reply TAKEN once you've taken it, or SKIP if you're skipping this dose."
    )
}

// ---------------------------------------------------------------------------
// Caregiver escalation copy (privacy-minimized)
// ---------------------------------------------------------------------------

/// Caregiver SMS body. No medication details.
pub fn caregiver_sms(patient_first_name: &str) -> String {
    format!(
        "{patient_first_name} hasn't confirmed a scheduled medication reminder. \
         You may want to check in with them."
    )
}

/// Caregiver email subject line.
pub fn caregiver_email_subject(patient_first_name: &str) -> String {
    format!("Unconfirmed medication reminder for {patient_first_name}")
}

/// Caregiver email body. No medication details.
pub fn caregiver_email_body(patient_first_name: &str) -> String {
    format!(
        "Hello,\n\n\
         {patient_first_name} has a scheduled medication reminder that has not been \
         confirmed for over an hour. You may want to check in with them.\n\n\
         This is an automated message; replies are not monitored."
    )
}

/// Script read aloud on a caregiver voice call. No medication details.
pub fn caregiver_call_script(patient_first_name: &str) -> String {
    format!(
        "Hello. This is an automated call from the medication reminder service. \
         {patient_first_name} has not confirmed a scheduled medication reminder. \
         Please check in with them. Goodbye."
    )
}

// ---------------------------------------------------------------------------
// Inbound webhook replies
// ---------------------------------------------------------------------------

/// Acknowledgment after a reply successfully resolved a dose.
pub fn reply_ack(status: DoseStatus) -> String {
    match status {
        DoseStatus::Taken => "Got it, marked as taken. Nice work!".to_string(),
        DoseStatus::Skipped => "Okay, marked as skipped.".to_string(),
        other => format!("Recorded as {}.", other.as_str()),
    }
}

/// Reply when the body parsed but no pending dose matched.
pub const REPLY_NOTHING_PENDING: &str =
    "Thanks! We couldn't find a pending medication reminder for this number right now.";

/// Prompt when the body is not in the accepted vocabulary.
pub const REPLY_PROMPT: &str =
    "Sorry, I didn't understand that. Reply TAKEN if you took your medication, or SKIP to skip it.";

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reminder_tiers_escalate_in_tone() {
        let first = reminder_body(ReminderKind::Retry1, "Metformin", "500mg");
        let second = reminder_body(ReminderKind::Retry2, "Metformin", "500mg");
        assert!(first.contains("Please take"));
        assert!(second.contains("still haven't confirmed"));
    }

    #[test]
    fn patient_copy_includes_medication_details() {
        let body = confirmation_sms("Metformin", "500mg");
        assert!(body.contains("Metformin"));
        assert!(body.contains("500mg"));
        assert!(body.contains("TAKEN"));
        assert!(body.contains("SKIP"));
    }

    #[test]
    fn caregiver_copy_names_patient_but_stays_generic() {
        // Caregiver builders only accept a first name, so medication
        // details cannot leak. Check the copy says who and stays vague
        // about what.
        let all = [
            caregiver_sms("Ada"),
            caregiver_email_subject("Ada"),
            caregiver_email_body("Ada"),
            caregiver_call_script("Ada"),
        ];
        for text in &all {
            assert!(text.contains("Ada"));
            assert!(
                text.contains("medication reminder"),
                "unexpected caregiver copy: {text}"
            );
        }
    }

    #[test]
    fn reply_ack_names_the_recorded_status() {
        assert!(reply_ack(DoseStatus::Taken).contains("taken"));
        assert!(reply_ack(DoseStatus::Skipped).contains("skipped"));
    }

    #[test]
    fn prompt_lists_the_accepted_vocabulary() {
        assert!(REPLY_PROMPT.contains("TAKEN"));
        assert!(REPLY_PROMPT.contains("SKIP"));
    }

    #[test]
    fn reminder_kind_wire_names() {
        assert_eq!(ReminderKind::Initial.as_str(), "initial");
        assert_eq!(ReminderKind::Retry1.as_str(), "retry_1");
        assert_eq!(ReminderKind::Retry2.as_str(), "retry_2");
    }
}

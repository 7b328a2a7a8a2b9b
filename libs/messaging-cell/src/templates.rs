//! SMS templates and inbound keyword parsing.
//!
//! Wording here is deliberately plain and free of medical detail. Every
//! template takes exactly the variables the triggering event guarantees.

use chrono::{DateTime, Utc};

use shared_utils::time::{format_hold_window, format_slot_time};

const SMS_TAG: &str = "Clinic";

/// First contact for a newly opened slot.
pub fn initial_offer(
    slot_time: DateTime<Utc>,
    location: &str,
    provider_name: &str,
    hold_minutes: i64,
) -> String {
    format!(
        "{}: An earlier appointment with {} opened {} at {}. \
         Reply YES to claim or NO to skip. This offer expires in {}.",
        SMS_TAG,
        provider_name,
        format_slot_time(slot_time),
        location,
        format_hold_window(hold_minutes)
    )
}

/// Confirmation for the patient whose claim won the slot.
pub fn win_confirmation(slot_time: DateTime<Utc>, location: &str, provider_name: &str) -> String {
    format!(
        "{}: Confirmed. You're scheduled with {} {} at {}. \
         Reply STOP to opt out of future messages.",
        SMS_TAG,
        provider_name,
        format_slot_time(slot_time),
        location
    )
}

/// Reply for a claim that arrived after the slot was taken or the hold lapsed.
pub fn too_late_notice() -> String {
    format!(
        "{}: Thanks - this slot is no longer available. \
         We'll keep you on the list for the next opening.",
        SMS_TAG
    )
}

/// Acknowledgment for a declined offer.
pub fn decline_ack() -> String {
    format!("{}: No problem - we'll keep you on the list for future openings.", SMS_TAG)
}

/// Notice for a pending offer canceled because someone else claimed the slot.
pub fn slot_filled_notice() -> String {
    format!(
        "{}: The slot you were offered has been filled. \
         We'll notify you of the next opening.",
        SMS_TAG
    )
}

/// Confirmation after a STOP keyword.
pub fn opt_out_confirmation() -> String {
    format!("You'll no longer receive earlier-slot messages from {}.", SMS_TAG)
}

/// Reply to a HELP keyword.
pub fn help_text() -> String {
    format!("HELP: {} scheduling. Reply YES to claim slots; NO to skip.", SMS_TAG)
}

/// Fallback for anything we could not map to a keyword.
pub fn unrecognized_guidance() -> String {
    format!(
        "{}: Please reply YES or NO to appointment offers. \
         Reply HELP for info or STOP to opt out.",
        SMS_TAG
    )
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InboundAction {
    Accept,
    Decline,
    OptOut,
    Help,
    Unrecognized,
}

const ACCEPT_KEYWORDS: &[&str] = &["YES", "Y", "YEAH", "YEP", "OK", "OKAY", "SURE", "ACCEPT"];
const DECLINE_KEYWORDS: &[&str] = &["NO", "N", "NOPE", "NAH", "SKIP", "PASS", "DECLINE"];
const OPT_OUT_KEYWORDS: &[&str] = &["STOP", "UNSUBSCRIBE", "CANCEL", "END", "QUIT", "REMOVE"];
const HELP_KEYWORDS: &[&str] = &["HELP", "INFO"];

/// Map an inbound SMS body to a normalized action.
///
/// Matching is case-insensitive on whole words, so "No thanks" declines but
/// "NOTHING" does not. Categories are checked in precedence order: accept,
/// decline, opt-out, help.
pub fn parse_inbound(body: &str) -> InboundAction {
    let trimmed = body.trim();
    if trimmed == "?" {
        return InboundAction::Help;
    }

    let upper = trimmed.to_uppercase();
    let words: Vec<&str> = upper
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect();

    let contains_any = |keywords: &[&str]| words.iter().any(|w| keywords.contains(w));

    if contains_any(ACCEPT_KEYWORDS) {
        InboundAction::Accept
    } else if contains_any(DECLINE_KEYWORDS) {
        InboundAction::Decline
    } else if contains_any(OPT_OUT_KEYWORDS) {
        InboundAction::OptOut
    } else if contains_any(HELP_KEYWORDS) || upper.contains('?') {
        InboundAction::Help
    } else {
        InboundAction::Unrecognized
    }
}

//! Reply policy: maps (polarity, transaction status) to a canned reply.
//!
//! Neutral shares the negative branch. When no recent transaction is found the
//! reply asks the user which product they bought, and the persisted transaction
//! flag is forced to `true`: the record tracks the conversational state (purchase
//! being clarified), not the raw signal.

use crate::pipeline::types::{Polarity, ReplyDecision};

pub const PURCHASED_POSITIVE: &str = "Thank you for recently purchasing with us and I am glad to hear you had a positive experience with our product!";

pub const PURCHASED_NEGATIVE: &str = "Thank you for recently purchasing with us and I am sorry to hear your experience wasn't the greatest with our product.";

pub const NO_TRANSACTION_POSITIVE: &str = "Seems like there is no recent transaction tied with your account, what is the product you purchased which you had a positive experience with?";

pub const NO_TRANSACTION_NEGATIVE: &str = "Seems like there is no recent transaction tied with your account, what is the product you purchased which you had a negative experience with?";

/// Decide the reply for a classified message.
pub fn decide(polarity: Polarity, recently_completed: bool) -> ReplyDecision {
    let positive = polarity == Polarity::Positive;
    let reply_text = match (positive, recently_completed) {
        (true, true) => PURCHASED_POSITIVE,
        (false, true) => PURCHASED_NEGATIVE,
        (true, false) => NO_TRANSACTION_POSITIVE,
        (false, false) => NO_TRANSACTION_NEGATIVE,
    };

    ReplyDecision {
        reply_text,
        // Every branch ends with a purchase on record or under clarification.
        transaction_status: true,
    }
}

use chrono::{DateTime, Datelike, Duration, Utc};
use rand::rngs::ThreadRng;
use rand::Rng;

use crate::api::{Isbn, MemberId, TransactionId};

/// Random draws tried against one millisecond tail before moving to the next
const ATTEMPTS_PER_TICK: usize = 32;
/// Every tail of the millisecond clock is visited at most once
const TICKS: i64 = 10_000;

/// Last four digits of the millisecond clock
fn millis_tail(now: DateTime<Utc>) -> i64 {
    now.timestamp_millis().rem_euclid(10_000)
}

/// Builds an isbn in the `ISBN-YY-TTTT-RRR` shape
pub fn generate_isbn(now: DateTime<Utc>, rng: &mut impl Rng) -> Isbn {
    format!(
        "ISBN-{:02}-{:04}-{:03}",
        now.year().rem_euclid(100),
        millis_tail(now),
        rng.gen_range(0..1000)
    )
}

/// Builds a member id in the `MEMTTTTRRR` shape
pub fn generate_member_id(now: DateTime<Utc>, rng: &mut impl Rng) -> MemberId {
    format!("MEM{:04}{:03}", millis_tail(now), rng.gen_range(0..1000))
}

/// Draws identifiers from `generate` until one is not `taken`.
/// When the tail of `now` looks full the following milliseconds are tried,
/// None once every tail has been exhausted.
pub fn unique_identifier(
    now: DateTime<Utc>,
    taken: impl Fn(&str) -> bool,
    generate: impl Fn(DateTime<Utc>, &mut ThreadRng) -> String,
) -> Option<String> {
    let mut rng = rand::thread_rng();
    (0..TICKS)
        .flat_map(|tick| std::iter::repeat(now + Duration::milliseconds(tick)).take(ATTEMPTS_PER_TICK))
        .map(|instant| generate(instant, &mut rng))
        .find(|candidate| !taken(candidate))
}

pub fn generate_transaction_id() -> TransactionId {
    uuid::Uuid::new_v4().to_string()
}

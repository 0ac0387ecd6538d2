use crate::models::VoteLimit;

// Smallest cap Auto ever hands out, so tiny polls still let people pick a few games.
const AUTO_MINIMUM: u32 = 3;

// Maximum number of votes one user may hold in a poll, or `None` when uncapped.
//
// `Auto` grows with the candidate list as `max(3, ceil(log2(n)))`.
pub fn effective_limit(limit: VoteLimit, candidate_count: usize) -> Option<u32> {
    match limit {
        VoteLimit::Fixed(n) => Some(n),
        VoteLimit::Unlimited => None,
        VoteLimit::Auto => {
            if candidate_count == 0 {
                return Some(AUTO_MINIMUM);
            }
            Some(AUTO_MINIMUM.max(ceil_log2(candidate_count)))
        }
    }
}

fn ceil_log2(n: usize) -> u32 {
    if n <= 1 {
        0
    } else {
        usize::BITS - (n - 1).leading_zeros()
    }
}

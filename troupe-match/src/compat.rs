use troupe_core::dates::DateRange;
use troupe_core::interest::Interest;

/// A candidate group being grown, before any side effect has happened.
#[derive(Debug)]
pub struct Candidate<'a> {
    pub members: Vec<&'a Interest>,
    /// Common departure window: the intersection of every member's range.
    pub window: DateRange,
    /// Sum of member party sizes.
    pub seats: i32,
}

/// Whether `candidate` can join a cluster whose members are `members` with
/// common window `window`, without exceeding `max_seats`. Returns the
/// narrowed window on success.
///
/// Rules: the common window must keep at least one day, budgets must overlap
/// pairwise where specified (an unspecified bound is unbounded), and seats
/// must fit.
pub fn admit<'a>(
    members: &[&'a Interest],
    window: &DateRange,
    seats: i32,
    max_seats: i32,
    candidate: &'a Interest,
) -> Option<DateRange> {
    if seats + candidate.num_people > max_seats {
        return None;
    }
    let narrowed = window.intersect(&candidate.travel_window())?;
    let candidate_budget = candidate.budget_window();
    if !members
        .iter()
        .all(|m| m.budget_window().overlaps(&candidate_budget))
    {
        return None;
    }
    Some(narrowed)
}

/// Partition a pool of open interests into candidate groups.
///
/// The pool must be ordered by `created_at` ascending. Clustering is a
/// deterministic greedy pass: the earliest unmatched interest seeds a
/// candidate and absorbs every later compatible interest in creation order.
/// Candidates below `min_seats` are discarded and their members stay
/// available to later seeds, which keeps re-runs stable and idempotent.
pub fn partition(pool: &[Interest], min_seats: i32, max_seats: i32) -> Vec<Candidate<'_>> {
    let mut used = vec![false; pool.len()];
    let mut candidates = Vec::new();

    for seed_idx in 0..pool.len() {
        if used[seed_idx] {
            continue;
        }
        let seed = &pool[seed_idx];
        if seed.num_people > max_seats {
            // A party that alone exceeds capacity can never be placed.
            continue;
        }

        let mut members: Vec<&Interest> = vec![seed];
        let mut member_idxs = vec![seed_idx];
        let mut window = seed.travel_window();
        let mut seats = seed.num_people;

        for cand_idx in (seed_idx + 1)..pool.len() {
            if used[cand_idx] {
                continue;
            }
            let candidate = &pool[cand_idx];
            if let Some(narrowed) = admit(&members, &window, seats, max_seats, candidate) {
                window = narrowed;
                seats += candidate.num_people;
                members.push(candidate);
                member_idxs.push(cand_idx);
            }
        }

        if seats >= min_seats {
            for idx in member_idxs {
                used[idx] = true;
            }
            candidates.push(Candidate {
                members,
                window,
                seats,
            });
        }
    }

    candidates
}

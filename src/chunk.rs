//! Chunk policy and deterministic chunk planning.
//!
//! The planner is pure: `(total duration, policy)` in, an ordered, contiguous
//! partition of `[0, total)` out. No I/O, no provider knowledge. Identical
//! inputs always produce identical plans, which is what makes plan-level test
//! vectors and cross-provider contract comparisons possible.

use crate::{Error, Result};

/// Constraints governing how a duration is partitioned into chunks.
///
/// The invariant `min_seconds <= target_seconds <= max_seconds` is enforced at
/// construction time, never at planning time: once a `ChunkPolicy` exists it
/// is known to be internally consistent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkPolicy {
    target_seconds: u32,
    min_seconds: u32,
    max_seconds: u32,
    allow_single_chunk_fallback: bool,
}

impl ChunkPolicy {
    /// Validate and construct a policy.
    pub fn new(
        target_seconds: u32,
        min_seconds: u32,
        max_seconds: u32,
        allow_single_chunk_fallback: bool,
    ) -> Result<Self> {
        if target_seconds == 0 {
            return Err(Error::policy_violation(
                "target_seconds",
                "target_seconds must be greater than zero.",
                "zero-length chunks create invalid ranges",
                "set target_seconds to a positive number of seconds",
            ));
        }
        if min_seconds > target_seconds {
            return Err(Error::policy_violation(
                "min_seconds",
                format!(
                    "min_seconds ({min_seconds}) exceeds target_seconds ({target_seconds})."
                ),
                "the policy requires min_seconds <= target_seconds <= max_seconds",
                "lower min_seconds or raise target_seconds",
            ));
        }
        if target_seconds > max_seconds {
            return Err(Error::policy_violation(
                "max_seconds",
                format!(
                    "target_seconds ({target_seconds}) exceeds max_seconds ({max_seconds})."
                ),
                "the policy requires min_seconds <= target_seconds <= max_seconds",
                "raise max_seconds or lower target_seconds",
            ));
        }

        Ok(Self {
            target_seconds,
            min_seconds,
            max_seconds,
            allow_single_chunk_fallback,
        })
    }

    pub fn target_seconds(&self) -> u32 {
        self.target_seconds
    }

    pub fn min_seconds(&self) -> u32 {
        self.min_seconds
    }

    pub fn max_seconds(&self) -> u32 {
        self.max_seconds
    }

    pub fn allow_single_chunk_fallback(&self) -> bool {
        self.allow_single_chunk_fallback
    }

    /// Lower `max_seconds` to an adapter-declared chunk limit.
    ///
    /// Adapter limits take precedence over a larger user-configured maximum; a
    /// smaller user-configured maximum is respected as-is. `target_seconds`
    /// and `min_seconds` are pulled down as needed so the policy invariant
    /// survives the clamp.
    pub fn clamped_to(&self, max_chunk_seconds: u32) -> Self {
        if max_chunk_seconds >= self.max_seconds {
            return *self;
        }

        let max_seconds = max_chunk_seconds;
        let target_seconds = self.target_seconds.min(max_seconds);
        let min_seconds = self.min_seconds.min(target_seconds);
        Self {
            target_seconds,
            min_seconds,
            max_seconds,
            allow_single_chunk_fallback: self.allow_single_chunk_fallback,
        }
    }
}

/// A contiguous time-bounded slice of the input audio, `[start, end)` in
/// integer seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioChunk {
    /// 0-based position in the plan's sequence order.
    pub index: usize,
    pub start_seconds: u32,
    pub end_seconds: u32,
}

impl AudioChunk {
    pub fn duration_seconds(&self) -> u32 {
        self.end_seconds - self.start_seconds
    }
}

/// An ordered partition of a duration into chunks.
///
/// Invariants (upheld by [`plan`]):
/// - chunks are contiguous and non-overlapping: `chunks[i].end_seconds ==
///   chunks[i + 1].start_seconds`
/// - the last chunk ends exactly at `total_seconds`
/// - chunk durations sum to `total_seconds`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioChunkPlan {
    pub total_seconds: u32,
    pub policy: ChunkPolicy,
    pub chunks: Vec<AudioChunk>,
}

impl AudioChunkPlan {
    fn single(total_seconds: u32, policy: &ChunkPolicy) -> Self {
        Self {
            total_seconds,
            policy: *policy,
            chunks: vec![AudioChunk {
                index: 0,
                start_seconds: 0,
                end_seconds: total_seconds,
            }],
        }
    }
}

/// Partition `total_seconds` into chunks under `policy`.
///
/// The chunk count is fixed at `ceil(total / target)` and the duration is
/// distributed as evenly as possible: every chunk gets `total / n` seconds
/// and the first `total % n` chunks get one extra second. Near-equal sizes
/// keep provider-facing chunk durations predictable instead of producing
/// target-sized chunks plus one short tail.
///
/// A single chunk spanning `[0, total)` is returned when the whole input fits
/// under `max_seconds` and either fits under `target_seconds` outright or the
/// even split would under-run `min_seconds` while the fallback is enabled.
pub fn plan(total_seconds: u32, policy: &ChunkPolicy) -> Result<AudioChunkPlan> {
    if total_seconds == 0 {
        return Err(Error::invalid_input(
            "total_seconds must be greater than zero.",
            "an empty duration cannot be partitioned into chunks",
            "provide audio with a duration of at least one second",
        ));
    }

    if total_seconds <= policy.max_seconds() && total_seconds <= policy.target_seconds() {
        return Ok(AudioChunkPlan::single(total_seconds, policy));
    }

    let count = total_seconds.div_ceil(policy.target_seconds());
    let base = total_seconds / count;
    let extra = total_seconds % count;

    // `base` is the shortest duration the even split produces. The longest is
    // `base + 1`, which cannot exceed `max_seconds`: `count >= total / target`
    // implies `base <= target <= max`, and a remainder only exists when
    // `base < target`.
    if base < policy.min_seconds() {
        if policy.allow_single_chunk_fallback() && total_seconds <= policy.max_seconds() {
            return Ok(AudioChunkPlan::single(total_seconds, policy));
        }
        return Err(Error::policy_violation(
            "min_seconds",
            format!(
                "cannot split {total_seconds}s into {count} chunks without producing a \
                 {base}s chunk below the {}s minimum.",
                policy.min_seconds()
            ),
            "an even split cannot satisfy min_seconds for every chunk",
            "enable allow_single_chunk_fallback, lower min_seconds, or adjust target_seconds",
        ));
    }

    let mut chunks = Vec::with_capacity(count as usize);
    let mut start_seconds = 0u32;
    for index in 0..count {
        let duration = if index < extra { base + 1 } else { base };
        let end_seconds = start_seconds + duration;
        chunks.push(AudioChunk {
            index: index as usize,
            start_seconds,
            end_seconds,
        });
        start_seconds = end_seconds;
    }

    Ok(AudioChunkPlan {
        total_seconds,
        policy: *policy,
        chunks,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy(target: u32, min: u32, max: u32, fallback: bool) -> ChunkPolicy {
        ChunkPolicy::new(target, min, max, fallback).expect("valid test policy")
    }

    fn assert_plan_invariants(plan: &AudioChunkPlan) {
        assert!(!plan.chunks.is_empty());
        assert_eq!(plan.chunks[0].start_seconds, 0);
        for pair in plan.chunks.windows(2) {
            assert_eq!(pair[0].end_seconds, pair[1].start_seconds);
            assert_eq!(pair[0].index + 1, pair[1].index);
        }
        let last = plan.chunks.last().expect("non-empty plan");
        assert_eq!(last.end_seconds, plan.total_seconds);
        let sum: u32 = plan.chunks.iter().map(AudioChunk::duration_seconds).sum();
        assert_eq!(sum, plan.total_seconds);
    }

    #[test]
    fn policy_construction_rejects_inverted_bounds() {
        let err = ChunkPolicy::new(30, 40, 60, false).unwrap_err();
        assert!(matches!(
            err,
            Error::PolicyViolation {
                constraint: "min_seconds",
                ..
            }
        ));

        let err = ChunkPolicy::new(50, 10, 40, false).unwrap_err();
        assert!(matches!(
            err,
            Error::PolicyViolation {
                constraint: "max_seconds",
                ..
            }
        ));

        let err = ChunkPolicy::new(0, 0, 10, false).unwrap_err();
        assert!(matches!(
            err,
            Error::PolicyViolation {
                constraint: "target_seconds",
                ..
            }
        ));
    }

    #[test]
    fn zero_duration_is_invalid_input() {
        let err = plan(0, &policy(30, 10, 40, true)).unwrap_err();
        assert!(matches!(err, Error::InvalidInput { .. }));
    }

    #[test]
    fn duration_at_or_below_target_yields_exactly_one_chunk() {
        let p = policy(30, 10, 40, false);
        for total in [1, 29, 30] {
            let plan = plan(total, &p).expect("plan");
            assert_eq!(plan.chunks.len(), 1);
            assert_eq!(plan.chunks[0].start_seconds, 0);
            assert_eq!(plan.chunks[0].end_seconds, total);
            assert_plan_invariants(&plan);
        }
    }

    #[test]
    fn short_input_falls_back_to_single_chunk_within_max() {
        // total=20 with target=30: below target and within max, one chunk.
        let plan = plan(20, &policy(30, 10, 40, true)).expect("plan");
        assert_eq!(
            plan.chunks,
            vec![AudioChunk {
                index: 0,
                start_seconds: 0,
                end_seconds: 20,
            }]
        );
    }

    #[test]
    fn near_equal_split_honors_bounds_and_covers_total() {
        // total=95 with target=30 splits into ceil(95/30)=4 near-equal chunks.
        let p = policy(30, 10, 40, false);
        let plan = plan(95, &p).expect("plan");
        assert_plan_invariants(&plan);
        assert_eq!(plan.chunks.len(), 4);
        for chunk in &plan.chunks {
            assert!(chunk.duration_seconds() >= p.min_seconds());
            assert!(chunk.duration_seconds() <= p.max_seconds());
        }
        // Near-equal: durations differ by at most one second.
        let durations: Vec<u32> = plan.chunks.iter().map(AudioChunk::duration_seconds).collect();
        let min = durations.iter().min().expect("durations");
        let max = durations.iter().max().expect("durations");
        assert!(max - min <= 1, "expected near-equal durations, got {durations:?}");
    }

    #[test]
    fn exact_multiple_of_target_splits_evenly() {
        let plan = plan(60, &policy(30, 10, 40, false)).expect("plan");
        assert_eq!(
            plan.chunks,
            vec![
                AudioChunk {
                    index: 0,
                    start_seconds: 0,
                    end_seconds: 30,
                },
                AudioChunk {
                    index: 1,
                    start_seconds: 30,
                    end_seconds: 60,
                },
            ]
        );
    }

    #[test]
    fn unsatisfiable_min_without_fallback_is_a_policy_violation() {
        // 19s just below min*2: an even split yields a 9s chunk under the 10s
        // minimum, and the fallback is disabled.
        let err = plan(19, &policy(10, 10, 40, false)).unwrap_err();
        assert!(matches!(
            err,
            Error::PolicyViolation {
                constraint: "min_seconds",
                ..
            }
        ));
    }

    #[test]
    fn unsatisfiable_min_with_fallback_yields_single_chunk() {
        let plan = plan(19, &policy(10, 10, 40, true)).expect("plan");
        assert_eq!(plan.chunks.len(), 1);
        assert_eq!(plan.chunks[0].end_seconds, 19);
    }

    #[test]
    fn fallback_cannot_exceed_max_seconds() {
        // Even split of 41s at target=max=40 under-runs min=25, and a single
        // 41s chunk would exceed the 40s maximum, so no valid plan exists.
        let err = plan(41, &policy(40, 25, 40, true)).unwrap_err();
        assert!(matches!(
            err,
            Error::PolicyViolation {
                constraint: "min_seconds",
                ..
            }
        ));
    }

    #[test]
    fn planning_is_deterministic() {
        let p = policy(30, 10, 40, false);
        let first = plan(95, &p).expect("plan");
        let second = plan(95, &p).expect("plan");
        assert_eq!(first, second);
    }

    #[test]
    fn bounds_hold_across_a_sweep_of_valid_inputs() {
        let p = policy(30, 10, 40, false);
        for total in 31..=400 {
            match plan(total, &p) {
                Ok(plan) => {
                    assert_plan_invariants(&plan);
                    for chunk in &plan.chunks {
                        assert!(chunk.duration_seconds() <= p.max_seconds());
                        assert!(chunk.duration_seconds() >= p.min_seconds());
                    }
                }
                Err(Error::PolicyViolation { .. }) => {}
                Err(other) => panic!("unexpected error for total={total}: {other}"),
            }
        }
    }

    #[test]
    fn clamping_respects_the_smaller_bound() {
        let p = policy(30, 10, 60, false);
        // Adapter limit below the configured maximum wins.
        let clamped = p.clamped_to(40);
        assert_eq!(clamped.max_seconds(), 40);
        assert_eq!(clamped.target_seconds(), 30);
        // A smaller user-configured maximum is respected as-is.
        let untouched = p.clamped_to(120);
        assert_eq!(untouched, p);
    }

    #[test]
    fn clamping_below_target_preserves_the_policy_invariant() {
        let p = policy(30, 20, 60, false);
        let clamped = p.clamped_to(15);
        assert_eq!(clamped.max_seconds(), 15);
        assert_eq!(clamped.target_seconds(), 15);
        assert_eq!(clamped.min_seconds(), 15);
    }
}

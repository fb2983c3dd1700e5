use crate::util::non_empty_lines;
use itertools::{Itertools, MinMaxResult};
use std::collections::VecDeque;
use thiserror::Error;
use tracing::{debug, info, trace};

pub const DEFAULT_PREAMBLE_LEN: usize = 25;

#[derive(Debug, Error, Eq, PartialEq)]
pub enum Error {
    #[error("invalid number on line {line_no}: '{text}'")]
    InvalidNumber { line_no: usize, text: String },
    #[error("preamble length {preamble_len} exceeds the {len} numbers given")]
    PreambleTooLong { preamble_len: usize, len: usize },
    #[error("every number is a sum of two numbers in its preamble")]
    NoMismatch,
    #[error("no contiguous range sums to {0}")]
    NoWeakness(i64),
}

pub fn parse_numbers(input: &str) -> Result<Vec<i64>, Error> {
    non_empty_lines(input)
        .enumerate()
        .map(|(idx, line)| {
            let line = line.trim();
            line.parse::<i64>().map_err(|_| Error::InvalidNumber {
                line_no: idx + 1,
                text: line.to_owned(),
            })
        })
        .collect()
}

/// Whether two numbers at distinct positions in `window` sum to `n`.
pub fn check_number<'a>(n: i64, window: impl IntoIterator<Item = &'a i64>) -> bool {
    let window = window.into_iter().copied().collect::<Vec<_>>();

    let min = match window.iter().min() {
        Some(min) => *min,
        None => return false,
    };

    // anything bigger than this can't pair with even the smallest member
    let max_valid = i128::from(n) - i128::from(min);
    let candidates = window
        .into_iter()
        .filter(|x| i128::from(*x) <= max_valid)
        .collect::<Vec<_>>();
    trace!(n, candidates = candidates.len(), "pruned window");

    candidates
        .into_iter()
        .tuple_combinations()
        .any(|(x, y): (i64, i64)| x.checked_add(y) == Some(n))
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Mismatch {
    /// position in the full sequence
    pub index: usize,
    pub value: i64,
}

/// First number that isn't the sum of two of the `preamble_len` numbers
/// right before it.
pub fn find_mismatch(nums: &[i64], preamble_len: usize) -> Result<Mismatch, Error> {
    if preamble_len > nums.len() {
        return Err(Error::PreambleTooLong {
            preamble_len,
            len: nums.len(),
        });
    }

    let (preamble_slice, rest) = nums.split_at(preamble_len);
    let mut window = preamble_slice.iter().copied().collect::<VecDeque<_>>();

    for (idx, num) in rest.iter().copied().enumerate() {
        if !check_number(num, &window) {
            let mismatch = Mismatch {
                index: preamble_len + idx,
                value: num,
            };
            debug!(?mismatch, "found mismatch");
            return Ok(mismatch);
        }

        // remove oldest window entry, add new num
        window.pop_front();
        window.push_back(num);
    }

    Err(Error::NoMismatch)
}

/// Scan for the first contiguous run of at least two numbers summing to
/// `mismatch` and return its `min + max`.
pub fn find_weakness(nums: &[i64], mismatch: i64) -> Result<i64, Error> {
    for start in 0..nums.len() {
        let mut range_sum: i64 = 0;

        for end in start..nums.len() {
            // give up on this start once the sum leaves the i64 range
            range_sum = match range_sum.checked_add(nums[end]) {
                Some(sum) => sum,
                None => break,
            };

            if range_sum == mismatch && end > start {
                debug!(start, end, "found weakness range");

                // both ends of `min + max` lie inside the range, whose sum
                // fits, so the addition can't overflow either
                return match nums[start..=end].iter().minmax() {
                    MinMaxResult::MinMax(min, max) => Ok(min + max),
                    _ => unreachable!("weakness range holds at least two numbers"),
                };
            }

            if range_sum > mismatch {
                break;
            }
        }
    }

    Err(Error::NoWeakness(mismatch))
}

#[derive(Debug, Eq, PartialEq)]
pub struct Day9Answer {
    pub mismatch: i64,
    pub weakness: i64,
}

pub fn solve(input: &str, preamble_len: usize) -> Result<Day9Answer, Error> {
    let nums = time!("parse numbers", parse_numbers(input)?);
    info!(numbers = nums.len(), preamble_len, "parsed number sequence");

    let mismatch = time!("find mismatch", find_mismatch(&nums, preamble_len)?);
    info!(index = mismatch.index, value = mismatch.value, "mismatch");

    let weakness = time!("find weakness", find_weakness(&nums, mismatch.value)?);

    Ok(Day9Answer {
        mismatch: mismatch.value,
        weakness,
    })
}

//! Longest increasing subsequence
//!
//! Used by the keyed diff to find the largest set of matched children that
//! can stay where they are. Entries equal to `0` mark children with no old
//! counterpart and never take part in the subsequence.

/// Positions of one longest strictly increasing subsequence of `seq`,
/// ignoring zeros. Positions are returned in ascending order.
///
/// Runs in O(m log m): `tails[k]` holds the position of the smallest value
/// that ends an increasing run of length `k + 1`, and each position keeps a
/// back-pointer to the element before it in its run.
pub fn longest_increasing_subsequence(seq: &[usize]) -> Vec<usize> {
    let mut predecessors: Vec<Option<usize>> = vec![None; seq.len()];
    let mut tails: Vec<usize> = Vec::new();

    for (i, &value) in seq.iter().enumerate() {
        if value == 0 {
            continue;
        }

        let pos = tails.partition_point(|&t| seq[t] < value);
        if pos > 0 {
            predecessors[i] = Some(tails[pos - 1]);
        }
        if pos == tails.len() {
            tails.push(i);
        } else {
            tails[pos] = i;
        }
    }

    let mut result = vec![0; tails.len()];
    let mut cursor = tails.last().copied();
    for slot in result.iter_mut().rev() {
        match cursor {
            Some(i) => {
                *slot = i;
                cursor = predecessors[i];
            }
            None => break,
        }
    }
    result
}

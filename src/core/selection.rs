//! Selection resolution: which suggestion indices to execute.
//!
//! Precedence is explicit index set, then run-all, then a single index
//! (default 0). Every check happens here so nothing is spawned when the
//! selection is invalid.

/// Selection syntax or range problems, all detected before execution.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SelectionError
{
    #[error("invalid index list '{input}': {reason}")]
    Syntax { input: String, reason: String },

    #[error("index {index} is out of range (only {len} candidates)")]
    OutOfRange { index: usize, len: usize },
}

/// Raw user intent, before precedence is applied
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionRequest
{
    /// `--indexes`, e.g. "0,2-4"
    pub indexes: Option<String>,
    /// `--all`
    pub all: bool,
    /// `--index`
    pub index: Option<usize>,
}

/// Resolved mode after precedence
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection
{
    Explicit(IndexRanges),
    All,
    Single(usize),
}

/// Inclusive index ranges, sorted and merged. Ranges are never expanded
/// until they have been checked against a bound, so `0-18446744073709551615`
/// costs the same as `0-1`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexRanges
{
    ranges: Vec<(usize, usize)>,
}

impl IndexRanges
{
    fn from_ranges(mut ranges: Vec<(usize, usize)>) -> Self
    {
        ranges.sort_unstable();
        let mut merged: Vec<(usize, usize)> = Vec::with_capacity(ranges.len());
        for (lo, hi) in ranges
        {
            match merged.last_mut()
            {
                Some(last) if lo <= last.1.saturating_add(1) => last.1 = last.1.max(hi),
                _ => merged.push((lo, hi)),
            }
        }
        Self { ranges: merged }
    }

    pub fn contains(
        &self,
        index: usize,
    ) -> bool
    {
        self.ranges
            .binary_search_by(|&(lo, hi)| {
                if hi < index
                {
                    std::cmp::Ordering::Less
                }
                else if lo > index
                {
                    std::cmp::Ordering::Greater
                }
                else
                {
                    std::cmp::Ordering::Equal
                }
            })
            .is_ok()
    }

    /// Smallest selected index that is `>= len`, if any
    pub fn first_at_or_above(
        &self,
        len: usize,
    ) -> Option<usize>
    {
        self.ranges
            .iter()
            .find(|&&(_, hi)| hi >= len)
            .map(|&(lo, _)| lo.max(len))
    }

    /// Ascending indices. Only call once the upper bound is known to be small.
    pub fn iter(&self) -> impl Iterator<Item = usize> + '_
    {
        self.ranges
            .iter()
            .flat_map(|&(lo, hi)| lo..=hi)
    }
}

impl FromIterator<usize> for IndexRanges
{
    fn from_iter<I: IntoIterator<Item = usize>>(iter: I) -> Self
    {
        Self::from_ranges(
            iter.into_iter()
                .map(|i| (i, i))
                .collect(),
        )
    }
}

impl SelectionRequest
{
    /// Apply precedence and parse the index list if there is one
    pub fn into_selection(self) -> Result<Selection, SelectionError>
    {
        if let Some(raw) = self.indexes
        {
            return parse_indexes(&raw).map(Selection::Explicit);
        }
        if self.all
        {
            return Ok(Selection::All);
        }
        Ok(Selection::Single(
            self.index
                .unwrap_or(0),
        ))
    }
}

/// Parse `"0,2-4,7"` into sorted, merged ranges.
///
/// Tokens are non-negative integers or inclusive `a-b` ranges with `a <= b`.
/// Surrounding whitespace around tokens is tolerated; anything else is a
/// syntax error.
pub fn parse_indexes(input: &str) -> Result<IndexRanges, SelectionError>
{
    let err = |reason: String| SelectionError::Syntax {
        input: input.to_string(),
        reason,
    };

    if input
        .trim()
        .is_empty()
    {
        return Err(err("empty index list".to_string()));
    }

    let mut out = Vec::new();

    for raw in input.split(',')
    {
        let token = raw.trim();
        if token.is_empty()
        {
            return Err(err("empty token".to_string()));
        }

        match token.split_once('-')
        {
            None =>
            {
                let i = parse_number(token).map_err(err)?;
                out.push((i, i));
            }
            Some((lo, hi)) =>
            {
                let (lo, hi) = (lo.trim(), hi.trim());
                if lo.is_empty()
                {
                    return Err(err(format!("negative or malformed index '{token}'")));
                }
                let start = parse_number(lo).map_err(err)?;
                let end = parse_number(hi).map_err(err)?;
                if start > end
                {
                    return Err(err(format!("inverted range '{token}'")));
                }
                out.push((start, end));
            }
        }
    }

    Ok(IndexRanges::from_ranges(out))
}

fn parse_number(s: &str) -> Result<usize, String>
{
    if s.is_empty()
        || !s
            .chars()
            .all(|c| c.is_ascii_digit())
    {
        return Err(format!("'{s}' is not a non-negative integer"));
    }
    s.parse::<usize>()
        .map_err(|e| format!("'{s}': {e}"))
}

/// Resolve a selection against `len` candidates.
///
/// Returns ascending, deduplicated indices. Any index `>= len` is an error;
/// `All` over zero candidates is simply empty.
pub fn resolve(
    len: usize,
    selection: &Selection,
) -> Result<Vec<usize>, SelectionError>
{
    match selection
    {
        Selection::Explicit(ranges) => match ranges.first_at_or_above(len)
        {
            Some(bad) => Err(SelectionError::OutOfRange { index: bad, len }),
            None => Ok(ranges
                .iter()
                .collect()),
        },
        Selection::All => Ok((0..len).collect()),
        Selection::Single(i) if *i >= len => Err(SelectionError::OutOfRange { index: *i, len }),
        Selection::Single(i) => Ok(vec![*i]),
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn parses_mixed_tokens()
    {
        let expand = |s: &str| {
            parse_indexes(s)
                .unwrap()
                .iter()
                .collect::<Vec<_>>()
        };
        assert_eq!(expand("0,2-4,7"), vec![0, 2, 3, 4, 7]);
        assert_eq!(expand(" 3 , 1-1 ,3"), vec![1, 3]);
        assert_eq!(expand("4-6,2-5"), vec![2, 3, 4, 5, 6]);
    }

    #[test]
    fn rejects_bad_tokens()
    {
        for bad in ["", "a", "1,,2", "-1", "4-2", "1-", "1-2-3", "2.5", "+3"]
        {
            assert!(parse_indexes(bad).is_err(), "expected error for {bad:?}");
        }
    }

    #[test]
    fn explicit_beats_all_beats_single()
    {
        let req = SelectionRequest {
            indexes: Some("1".into()),
            all: true,
            index: Some(3),
        };
        assert_eq!(req.into_selection().unwrap(), Selection::Explicit([1].into_iter().collect()));

        let req = SelectionRequest { indexes: None, all: true, index: Some(3) };
        assert_eq!(req.into_selection().unwrap(), Selection::All);

        let req = SelectionRequest::default();
        assert_eq!(req.into_selection().unwrap(), Selection::Single(0));
    }

    #[test]
    fn index_equal_to_len_is_out_of_range()
    {
        assert_eq!(
            resolve(3, &Selection::Single(3)),
            Err(SelectionError::OutOfRange { index: 3, len: 3 })
        );
        assert!(resolve(3, &Selection::Explicit([0, 5].into_iter().collect())).is_err());
    }

    #[test]
    fn all_over_empty_is_empty()
    {
        assert_eq!(resolve(0, &Selection::All).unwrap(), Vec::<usize>::new());
        assert!(resolve(0, &Selection::Single(0)).is_err());
    }

    #[test]
    fn huge_ranges_are_rejected_without_expanding()
    {
        let (tx, rx) = std::sync::mpsc::channel();
        std::thread::spawn(move || {
            let wide = parse_indexes("0-400000000").unwrap();
            let widest = parse_indexes("1,0-18446744073709551615").unwrap();
            tx.send((resolve(3, &Selection::Explicit(wide)), resolve(3, &Selection::Explicit(widest))))
                .unwrap();
        });

        let (wide, widest) = rx
            .recv_timeout(std::time::Duration::from_secs(5))
            .expect("resolution finished promptly");
        assert_eq!(wide, Err(SelectionError::OutOfRange { index: 3, len: 3 }));
        assert_eq!(widest, Err(SelectionError::OutOfRange { index: 3, len: 3 }));
    }

    #[test]
    fn membership_without_expansion()
    {
        let ranges = parse_indexes("2-4,10-18446744073709551615").unwrap();
        assert!(ranges.contains(3));
        assert!(!ranges.contains(5));
        assert!(ranges.contains(usize::MAX));
        assert_eq!(ranges.first_at_or_above(7), Some(10));
        assert_eq!(ranges.first_at_or_above(3), Some(3));
    }
}

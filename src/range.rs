//! Page range expressions such as `1-3,8,10-12`.
//!
//! Pages are 1-based in the expression and 0-based in the result. Duplicates
//! are dropped but first-occurrence order is kept, because reorder uses the
//! sequence itself as the new page order.

use std::collections::HashSet;
use std::ops::RangeInclusive;

use thiserror::Error;

/// Reasons a range expression is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RangeParseError {
    #[error("range empty")]
    Empty,

    #[error("invalid range: {0}")]
    InvalidToken(String),

    #[error("page must be >= 1")]
    PageBelowOne,

    #[error("range start greater than end: {0}")]
    StartAfterEnd(String),

    #[error("page out of range: {page} > {max_pages}")]
    OutOfRange { page: usize, max_pages: usize },
}

/// Parse a range expression into ordered, de-duplicated zero-based page indices.
///
/// When `max_pages` is given every page must be `<= max_pages`.
pub fn parse_page_range(
    expr: &str,
    max_pages: Option<usize>,
) -> Result<Vec<usize>, RangeParseError> {
    let mut seen = HashSet::new();
    let mut pages = Vec::new();

    for span in page_spans(expr, max_pages)? {
        for page in span {
            if seen.insert(page) {
                pages.push(page - 1);
            }
        }
    }
    Ok(pages)
}

/// The 1-based spans of `expr` in the order written, checked but not expanded.
///
/// Accepts exactly the expressions [`parse_page_range`] accepts, in time and
/// memory proportional to the expression rather than to the pages it names.
pub fn page_spans(
    expr: &str,
    max_pages: Option<usize>,
) -> Result<Vec<RangeInclusive<usize>>, RangeParseError> {
    let mut spans = Vec::new();

    for token in expr.split(',').map(str::trim).filter(|t| !t.is_empty()) {
        let (start, end) = parse_token(token)?;
        if start < 1 || end < 1 {
            return Err(RangeParseError::PageBelowOne);
        }
        if start > end {
            return Err(RangeParseError::StartAfterEnd(token.to_string()));
        }
        if let Some(max_pages) = max_pages
            && end > max_pages
        {
            // Report the first offending page, like a page-by-page walk would.
            let page = start.max(max_pages + 1);
            return Err(RangeParseError::OutOfRange { page, max_pages });
        }
        spans.push(start..=end);
    }

    if spans.is_empty() {
        return Err(RangeParseError::Empty);
    }
    Ok(spans)
}

// `N` or `N-M`, ASCII digits only.
fn parse_token(token: &str) -> Result<(usize, usize), RangeParseError> {
    let invalid = || RangeParseError::InvalidToken(token.to_string());
    let number = |s: &str| -> Result<usize, RangeParseError> {
        if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        // Digit strings too long for usize are out of any document's range anyway.
        s.parse().map_err(|_| invalid())
    };

    match token.split_once('-') {
        Some((start, end)) => Ok((number(start)?, number(end)?)),
        None => {
            let page = number(token)?;
            Ok((page, page))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simple_range() {
        assert_eq!(parse_page_range("1-3", None).unwrap(), vec![0, 1, 2]);
    }

    #[test]
    fn mixed_ranges() {
        assert_eq!(
            parse_page_range("1-3,8,10-12", Some(12)).unwrap(),
            vec![0, 1, 2, 7, 9, 10, 11]
        );
    }

    #[test]
    fn duplicates_keep_first_occurrence_order() {
        assert_eq!(parse_page_range("1,1,2", None).unwrap(), vec![0, 1]);
        assert_eq!(parse_page_range("3,1-4,2", None).unwrap(), vec![2, 0, 1, 3]);
    }

    #[test]
    fn whitespace_and_empty_tokens_are_skipped() {
        assert_eq!(parse_page_range(" 2 ,, 4-5 ,", None).unwrap(), vec![1, 3, 4]);
    }

    #[test]
    fn empty_expressions() {
        assert_eq!(parse_page_range("", None), Err(RangeParseError::Empty));
        assert_eq!(parse_page_range("   ", None), Err(RangeParseError::Empty));
        assert_eq!(parse_page_range(",, ,", None), Err(RangeParseError::Empty));
    }

    #[test]
    fn invalid_tokens() {
        assert_eq!(
            parse_page_range("a-b", None),
            Err(RangeParseError::InvalidToken("a-b".into()))
        );
        for bad in ["1-", "-3", "1-2-3", "+1", "1.5", "1 - 2x"] {
            assert!(
                matches!(parse_page_range(bad, None), Err(RangeParseError::InvalidToken(_))),
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    fn zero_page_rejected() {
        assert_eq!(parse_page_range("0", None), Err(RangeParseError::PageBelowOne));
        assert_eq!(parse_page_range("0-2", None), Err(RangeParseError::PageBelowOne));
    }

    #[test]
    fn reversed_range_rejected() {
        assert_eq!(
            parse_page_range("5-2", None),
            Err(RangeParseError::StartAfterEnd("5-2".into()))
        );
    }

    #[test]
    fn out_of_bounds() {
        assert_eq!(
            parse_page_range("1-3", Some(2)),
            Err(RangeParseError::OutOfRange { page: 3, max_pages: 2 })
        );
        assert_eq!(
            parse_page_range("7", Some(5)).unwrap_err().to_string(),
            "page out of range: 7 > 5"
        );
    }

    #[test]
    fn indices_stay_within_bounds_without_duplicates() {
        let max = 20;
        for expr in ["1-20", "20,1,5-9,5", "3,3,3", "10-20,1-10"] {
            let pages = parse_page_range(expr, Some(max)).unwrap();
            assert!(pages.iter().all(|&p| p < max), "{expr}");
            let unique: HashSet<_> = pages.iter().collect();
            assert_eq!(unique.len(), pages.len(), "{expr}");
        }
    }

    #[test]
    fn spans_are_checked_without_expanding() {
        let started = std::time::Instant::now();
        assert_eq!(
            page_spans("1-4000000000", None).unwrap(),
            vec![1..=4_000_000_000]
        );
        assert!(started.elapsed() < std::time::Duration::from_secs(1));

        assert_eq!(
            page_spans("3, 1-2 ,3", None).unwrap(),
            vec![3..=3, 1..=2, 3..=3]
        );
        assert_eq!(page_spans(" , ", None), Err(RangeParseError::Empty));
        assert_eq!(page_spans("0-4", None), Err(RangeParseError::PageBelowOne));
        assert_eq!(
            page_spans("1-4000000000", Some(10)),
            Err(RangeParseError::OutOfRange { page: 11, max_pages: 10 })
        );
    }
}

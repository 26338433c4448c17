//! REG_MULTI_SZ Encoding
//!
//! A multi-string value is a flat UTF-16 buffer:
//!
//! ```text
//! s1 NUL s2 NUL ... sN NUL NUL
//! ```
//!
//! The extra NUL marks the end of the list. An empty list is the two-unit
//! sentinel `NUL NUL`, never a zero-length buffer.

/// Flatten `strings` into a double-NUL-terminated buffer.
///
/// Strings containing NUL are not rejected; the store will read them as
/// separate entries.
pub fn build_multistring<S: AsRef<str>>(strings: &[S]) -> Vec<u16> {
    if strings.is_empty() {
        return vec![0, 0];
    }

    // One terminator per string plus the list terminator
    let total = strings
        .iter()
        .map(|s| s.as_ref().encode_utf16().count() + 1)
        .sum::<usize>()
        + 1;

    let mut buf = Vec::with_capacity(total);
    for s in strings {
        buf.extend(s.as_ref().encode_utf16());
        buf.push(0);
    }
    buf.push(0);
    buf
}

/// Split a multi-string buffer back into its entries.
///
/// Stops at the first empty entry (the double terminator) or at the end of
/// the data, whichever comes first, so buffers written without the final
/// terminator still decode.
pub fn split_multistring(units: &[u16]) -> Vec<String> {
    units
        .split(|&u| u == 0)
        .take_while(|entry| !entry.is_empty())
        .map(String::from_utf16_lossy)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_empty_list_is_two_terminators() {
        let empty: [&str; 0] = [];
        assert_eq!(build_multistring(&empty), vec![0, 0]);
        assert!(split_multistring(&[0, 0]).is_empty());
    }

    #[test]
    fn test_layout() {
        let buf = build_multistring(&["ab", "c"]);
        assert_eq!(buf, vec![0x61, 0x62, 0, 0x63, 0, 0]);
    }

    #[test]
    fn test_split_tolerates_missing_terminators() {
        let units: Vec<u16> = "one\0two".encode_utf16().collect();
        assert_eq!(split_multistring(&units), vec!["one", "two"]);
        assert!(split_multistring(&[]).is_empty());
    }

    #[test]
    fn test_split_ignores_data_after_list_end() {
        let units: Vec<u16> = "a\0\0stale\0".encode_utf16().collect();
        assert_eq!(split_multistring(&units), vec!["a"]);
    }

    proptest! {
        #[test]
        fn multistring_round_trip(
            strings in prop::collection::vec("[^\\x00]{1,24}", 0..12)
        ) {
            let buf = build_multistring(&strings);
            prop_assert_eq!(buf[buf.len() - 1], 0);
            prop_assert_eq!(buf[buf.len() - 2], 0);
            prop_assert_eq!(split_multistring(&buf), strings);
        }
    }
}

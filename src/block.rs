use memchr::{memchr, memchr_iter, memrchr};

/// Line-boundary decomposition of one raw window.
///
/// `prefix` runs from the window start through the first newline, `main`
/// holds the complete lines strictly between the first and last newline,
/// `suffix` is the unterminated tail after the last newline. `main_count`
/// is the number of complete lines inside `main`; the line ending at
/// `prefix` is not counted because it stays incomplete until stitched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Block {
    pub prefix: Vec<u8>,
    pub main: Vec<u8>,
    pub suffix: Vec<u8>,
    pub main_count: u64,
}

/// Splits a raw window into `prefix`/`main`/`suffix` spans.
///
/// `prefix + main + suffix` reconstructs the window exactly. A window with
/// no newline is all suffix; a window with exactly one newline has an empty
/// `main`.
pub fn decompose(window: &[u8]) -> Block {
    let Some(first) = memchr(b'\n', window) else {
        return Block {
            suffix: window.to_vec(),
            ..Block::default()
        };
    };

    // A first newline guarantees a last one.
    let last = memrchr(b'\n', window).unwrap_or(first);

    let prefix = window[..=first].to_vec();
    let (main, main_count) = if last > first {
        let main = window[first + 1..=last].to_vec();
        let count = memchr_iter(b'\n', &main).count() as u64;
        (main, count)
    } else {
        (Vec::new(), 0)
    };

    Block {
        prefix,
        main,
        suffix: window[last + 1..].to_vec(),
        main_count,
    }
}

/// Joins `one` (the window just read, earlier in file order) against the
/// block `two` retained from the previous step of the backward scan.
///
/// `one.suffix + two.prefix` completes the line straddling the window
/// boundary. The completed line becomes the open `prefix` of the result when
/// `one` brought no newline of its own, and one more finished `main` line
/// otherwise. The suffix is spent either way; the result's suffix is empty.
pub fn stitch(one: Block, two: &Block) -> Block {
    let Block {
        mut prefix,
        mut main,
        suffix,
        mut main_count,
    } = one;

    if !two.prefix.is_empty() {
        if prefix.is_empty() {
            prefix = suffix;
            prefix.extend_from_slice(&two.prefix);
        } else {
            main.extend_from_slice(&suffix);
            main.extend_from_slice(&two.prefix);
            main_count += 1;
        }
    }

    Block {
        prefix,
        main,
        suffix: Vec::new(),
        main_count,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn block(prefix: &str, main: &str, suffix: &str) -> Block {
        Block {
            prefix: prefix.as_bytes().to_vec(),
            main: main.as_bytes().to_vec(),
            suffix: suffix.as_bytes().to_vec(),
            main_count: if main.is_empty() { 0 } else { 1 },
        }
    }

    #[test]
    fn decompose_empty_window() {
        assert_eq!(decompose(b""), Block::default());
    }

    #[test]
    fn decompose_no_newline_is_all_suffix() {
        let b = decompose(b"123");
        assert_eq!(b, block("", "", "123"));
    }

    #[test]
    fn decompose_blank_line() {
        let b = decompose(b"\n");
        assert_eq!(b, block("\n", "", ""));
    }

    #[test]
    fn decompose_all_newlines() {
        let b = decompose(b"\n\n\n");
        assert_eq!(b.prefix, b"\n");
        assert_eq!(b.main, b"\n\n");
        assert!(b.suffix.is_empty());
        assert_eq!(b.main_count, 2);
    }

    #[test]
    fn decompose_all_newlines_with_remainder() {
        let b = decompose(b"\n\n\n123");
        assert_eq!(b.prefix, b"\n");
        assert_eq!(b.main, b"\n\n");
        assert_eq!(b.suffix, b"123");
        assert_eq!(b.main_count, 2);
    }

    #[test]
    fn decompose_single_line() {
        let b = decompose(b"123\n");
        assert_eq!(b, block("123\n", "", ""));
    }

    #[test]
    fn decompose_single_line_with_partial() {
        let b = decompose(b"123\n4");
        assert_eq!(b, block("123\n", "", "4"));
    }

    #[test]
    fn decompose_counts_main_lines() {
        let b = decompose(b"123\n456\n789\n012\nabc");
        assert_eq!(b.prefix, b"123\n");
        assert_eq!(b.main, b"456\n789\n012\n");
        assert_eq!(b.suffix, b"abc");
        assert_eq!(b.main_count, 3);
    }

    #[test]
    fn stitch_completes_straddling_line_into_main() {
        let stitched = stitch(block("a", "b", "c"), &block("d", "e", "f"));
        assert_eq!(stitched.prefix, b"a");
        assert_eq!(stitched.main, b"bcd");
        assert!(stitched.suffix.is_empty());
        assert_eq!(stitched.main_count, 2);
    }

    #[test]
    fn stitch_without_own_prefix_keeps_line_open() {
        let stitched = stitch(block("", "", "fo"), &block("g\n", "", ""));
        assert_eq!(stitched.prefix, b"fog\n");
        assert!(stitched.main.is_empty());
        assert_eq!(stitched.main_count, 0);
    }

    #[test]
    fn stitch_against_empty_drops_suffix() {
        let stitched = stitch(block("a", "", ""), &block("", "", "b"));
        assert_eq!(stitched.prefix, b"a");
        assert!(stitched.main.is_empty());
        assert!(stitched.suffix.is_empty());
        assert_eq!(stitched.main_count, 0);
    }

    #[test]
    fn stitch_two_empty_blocks() {
        let stitched = stitch(Block::default(), &Block::default());
        assert_eq!(stitched, Block::default());
    }

    #[test]
    fn stitch_two_bare_prefixes() {
        let stitched = stitch(block("a", "", ""), &block("b", "", ""));
        assert_eq!(stitched.prefix, b"a");
        assert_eq!(stitched.main, b"b");
        assert_eq!(stitched.main_count, 1);
    }

    proptest! {
        #[test]
        fn decompose_reassembles_window(window in proptest::collection::vec(any::<u8>(), 0..256)) {
            let b = decompose(&window);
            let mut rebuilt = b.prefix.clone();
            rebuilt.extend_from_slice(&b.main);
            rebuilt.extend_from_slice(&b.suffix);
            prop_assert_eq!(rebuilt, window);
        }

        #[test]
        fn decompose_counts_match_main(window in "[a-z\n]{0,64}") {
            let b = decompose(window.as_bytes());
            let newlines = b.main.iter().filter(|&&c| c == b'\n').count() as u64;
            prop_assert_eq!(b.main_count, newlines);
        }
    }
}

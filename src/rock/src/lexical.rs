// Copyright 2026 The Voxdag Authors.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
// http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

/// Returns the smallest key greater than every key starting with `prefix`.
///
/// An empty result means there is no such key (the prefix is empty or made of
/// `0xFF` only), callers treat it as an unbounded end.
pub fn lexical_next_boundary(prefix: &[u8]) -> Vec<u8> {
    let mut r = prefix.to_owned();
    while let Some(&last) = r.last() {
        if last != 0xFF {
            break;
        }
        r.pop();
    }
    if let Some(last) = r.last_mut() {
        *last += 0x1;
    }
    r
}

/// Returns the half-open range `[start, end)` covering all keys with the given
/// prefix. An empty `end` is unbounded.
pub fn prefix_range(prefix: &[u8]) -> (Vec<u8>, Vec<u8>) {
    (prefix.to_owned(), lexical_next_boundary(prefix))
}

/// Returns whether `key` falls in `[start, end)`, an empty `end` is unbounded.
#[inline]
pub fn in_range(start: &[u8], end: &[u8], key: &[u8]) -> bool {
    start <= key && (key < end || end.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn next_boundary_skips_trailing_max_bytes() {
        let cases: &[(&[u8], &[u8])] = &[
            (b"", b""),
            (b"\x04", b"\x05"),
            (b"\x04\xFF", b"\x05"),
            (b"\x04\x00\xFF\xFF", b"\x04\x01"),
            (b"\xFF\xFF", b""),
        ];
        for (input, expect) in cases {
            assert_eq!(&lexical_next_boundary(input), expect, "input {input:?}");
        }
    }

    #[test]
    fn prefix_range_covers_extensions() {
        let (start, end) = prefix_range(&[0x05, 0x00, 0x01]);
        assert!(in_range(&start, &end, &[0x05, 0x00, 0x01]));
        assert!(in_range(&start, &end, &[0x05, 0x00, 0x01, 0xFF, 0xFF]));
        assert!(!in_range(&start, &end, &[0x05, 0x00, 0x02]));
        assert!(!in_range(&start, &end, &[0x05, 0x00]));

        let (start, end) = prefix_range(&[0xFF]);
        assert!(end.is_empty());
        assert!(in_range(&start, &end, &[0xFF, 0xFF, 0xFF]));
    }
}

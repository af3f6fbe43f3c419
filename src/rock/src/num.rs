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

//! Big-endian number codecs. Big-endian is used everywhere a number becomes
//! part of a key, so that byte-wise comparison equals numeric comparison.
use paste::paste;

macro_rules! big_endian {
    ($num_type:ty) => {
        paste! {
            /// Decodes a value from a slice of exactly its encoded width,
            /// `None` is returned if the length does not match.
            pub fn [<decode_ $num_type>](bytes: &[u8]) -> Option<$num_type> {
                if bytes.len() != core::mem::size_of::<$num_type>() {
                    return None;
                }

                let mut buf = [0u8; core::mem::size_of::<$num_type>()];
                buf.copy_from_slice(bytes);
                Some($num_type::from_be_bytes(buf))
            }

            /// Reads a value from the head of `bytes`, returning the value and
            /// the number of bytes consumed.
            ///
            /// # Panics
            ///
            /// Panics if `bytes` is shorter than the encoded width.
            #[inline]
            pub fn [<read_ $num_type>](bytes: &[u8]) -> ($num_type, usize) {
                const SIZE: usize = core::mem::size_of::<$num_type>();
                let mut buf = [0u8; SIZE];
                buf.copy_from_slice(&bytes[..SIZE]);
                ($num_type::from_be_bytes(buf), SIZE)
            }
        }
    };
}

big_endian!(u16);
big_endian!(u32);
big_endian!(u64);
big_endian!(i32);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_requires_exact_width() {
        assert_eq!(decode_u16(&[0x01, 0x02]), Some(0x0102));
        assert_eq!(decode_u32(&[0, 0, 1]), None);
        assert_eq!(decode_u64(&[0; 9]), None);
        assert_eq!(decode_u64(&7u64.to_be_bytes()), Some(7));
    }

    #[test]
    fn read_consumes_head_only() {
        let bytes = [0x00, 0x00, 0x00, 0x2A, 0xFF, 0xFF];
        assert_eq!(read_u32(&bytes), (42, 4));
        assert_eq!(read_u16(&bytes[4..]), (0xFFFF, 2));
        assert_eq!(read_i32(&(-5i32).to_be_bytes()), (-5, 4));
    }

    #[test]
    #[should_panic]
    fn read_short_slice_panics() {
        read_u64(&[0, 1, 2]);
    }
}

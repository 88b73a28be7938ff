//! Span convention shared by the guest export and the host.
//!
//! A `convert` export hands its text back as a byte span inside linear
//! memory. Modules with multi-value returns give `(offset, len)` directly;
//! the Rust guest returns both halves packed into one `i64` as
//! `(offset << 32) | len`. A zero-length span means the input was rejected,
//! since a sound is never empty.

use crate::sound::write_sound;

/// Longest sound any `u32` produces: `"PlingPlangPlong"`.
pub const MAX_SOUND_LEN: usize = 15;

/// Byte range inside a module's linear memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub offset: u32,
    pub len: u32,
}

impl Span {
    pub fn new(offset: u32, len: u32) -> Self {
        Self { offset, len }
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// One past the last byte, or `None` if the span wraps the 32-bit space.
    pub fn end(&self) -> Option<u32> {
        self.offset.checked_add(self.len)
    }
}

pub fn pack_span(offset: u32, len: u32) -> u64 {
    (u64::from(offset) << 32) | u64::from(len)
}

pub fn unpack_span(packed: u64) -> Span {
    Span::new((packed >> 32) as u32, packed as u32)
}

/// Write the sound of `n` into `buf`, which starts at linear-memory address
/// `base`, and return the packed span of the written bytes.
///
/// Rejected input, or a buffer too small for the sound, yields the packed
/// empty span `(0, 0)`.
pub fn convert_into(n: u32, buf: &mut [u8], base: u32) -> u64 {
    match write_sound(n, buf) {
        Ok(len) => pack_span(base, len as u32),
        Err(_) => pack_span(0, 0),
    }
}

#[cfg(target_arch = "wasm32")]
mod export {
    use core::cell::UnsafeCell;

    use super::{convert_into, MAX_SOUND_LEN};

    struct OutputBuffer(UnsafeCell<[u8; MAX_SOUND_LEN]>);

    // wasm32 guests run on a single thread.
    unsafe impl Sync for OutputBuffer {}

    static OUTPUT: OutputBuffer = OutputBuffer(UnsafeCell::new([0; MAX_SOUND_LEN]));

    /// Write the sound of `n` into the module's output buffer and return its
    /// packed span. Every call overwrites the previous result.
    #[export_name = "convert"]
    pub extern "C" fn convert_into_memory(n: u32) -> u64 {
        // SAFETY: single-threaded guest, and the reference does not outlive
        // this call.
        let buf = unsafe { &mut *OUTPUT.0.get() };
        let base = buf.as_ptr() as u32;
        convert_into(n, buf, base)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sound::convert;

    const BASE: u32 = 1_048_576;

    fn guest_call(n: u32) -> (Span, [u8; MAX_SOUND_LEN]) {
        let mut buf = [0u8; MAX_SOUND_LEN];
        let span = unpack_span(convert_into(n, &mut buf, BASE));
        (span, buf)
    }

    fn decoded(span: Span, buf: &[u8]) -> &str {
        let start = (span.offset - BASE) as usize;
        std::str::from_utf8(&buf[start..start + span.len as usize]).unwrap()
    }

    #[test]
    fn convert_into_returns_span_at_buffer_base() {
        for n in [1, 105, 3125, 4_294_967_291, u32::MAX] {
            let (span, buf) = guest_call(n);
            assert_eq!(span.offset, BASE, "offset for {n}");
            assert_eq!(decoded(span, &buf), convert(n).unwrap(), "sound for {n}");
        }
    }

    #[test]
    fn convert_into_rejects_zero_with_empty_span() {
        let (span, buf) = guest_call(0);
        assert_eq!(span, Span::new(0, 0));
        assert!(span.is_empty());
        assert_eq!(buf, [0u8; MAX_SOUND_LEN]);
    }

    #[test]
    fn convert_into_rejects_short_buffer_with_empty_span() {
        let mut buf = [0u8; 4];
        assert_eq!(convert_into(105, &mut buf, BASE), pack_span(0, 0));
    }

    #[test]
    fn convert_into_overwrites_previous_result() {
        let mut buf = [0u8; MAX_SOUND_LEN];
        convert_into(105, &mut buf, BASE);
        let span = unpack_span(convert_into(52, &mut buf, BASE));
        assert_eq!(decoded(span, &buf), "52");
    }

    #[test]
    fn unpack_reverses_pack() {
        let span = unpack_span(pack_span(1_048_576, 15));
        assert_eq!(span, Span::new(1_048_576, 15));
        assert_eq!(span.end(), Some(1_048_591));
    }

    #[test]
    fn halves_do_not_bleed_into_each_other() {
        assert_eq!(pack_span(u32::MAX, 0), 0xFFFF_FFFF_0000_0000);
        assert_eq!(pack_span(0, u32::MAX), 0x0000_0000_FFFF_FFFF);
        assert!(unpack_span(pack_span(u32::MAX, 0)).is_empty());
    }

    #[test]
    fn end_detects_wraparound() {
        assert_eq!(Span::new(u32::MAX, 1).end(), None);
        assert_eq!(Span::new(u32::MAX, 0).end(), Some(u32::MAX));
    }

    #[test]
    fn max_sound_len_fits_every_sound() {
        let mut buf = [0u8; MAX_SOUND_LEN];
        assert_eq!(write_sound(105, &mut buf), Ok(MAX_SOUND_LEN));
        assert_eq!(convert(u32::MAX - 2).unwrap().len(), 10);
        assert!(write_sound(u32::MAX - 2, &mut buf).is_ok());
    }
}

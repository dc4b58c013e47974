//! Host boundary for the fluent-bit WASM filter plugin
//!
//! The plugin hands over the tag, the record timestamp and the record as
//! JSON bytes, and reads back either a NUL-terminated JSON record or a null
//! pointer meaning "drop".

use std::cell::RefCell;
use std::os::raw::c_char;
use std::slice;

use podfilter_logs::RecordFilter;
use podfilter_types::RecordMeta;

thread_local! {
    /// Last kept record handed to the host on this thread
    static OUTPUT: RefCell<Vec<u8>> = const { RefCell::new(Vec::new()) };
}

/// Filter one record received from the host.
///
/// Returns the kept record followed by a 0 byte, or `None` to drop it.
pub fn filter_host_record(tag: &[u8], time_sec: u32, time_nsec: u32, record: &[u8]) -> Option<Vec<u8>> {
    let meta = RecordMeta::new(String::from_utf8_lossy(tag).into_owned(), time_sec, time_nsec);
    RecordFilter::default()
        .filter_with_meta(&meta, record)
        .into_wire()
}

/// View a host buffer as bytes; null or zero-length buffers are empty
///
/// # Safety
///
/// A non-null `ptr` must point to `len` readable bytes that stay valid for `'a`.
unsafe fn host_bytes<'a>(ptr: *const c_char, len: u32) -> &'a [u8] {
    if ptr.is_null() || len == 0 {
        return &[];
    }
    // SAFETY: upheld by the caller
    unsafe { slice::from_raw_parts(ptr.cast::<u8>(), len as usize) }
}

/// Entry point called by the fluent-bit WASM filter plugin.
///
/// The returned pointer stays valid until the next call on the same thread.
///
/// # Safety
///
/// `tag` and `record` must each be null or point to `tag_len` / `record_len`
/// readable bytes for the duration of the call.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn pod_log_filter(
    tag: *const c_char,
    tag_len: u32,
    time_sec: u32,
    time_nsec: u32,
    record: *const c_char,
    record_len: u32,
) -> *const u8 {
    // SAFETY: forwarded from this function's contract
    let (tag, record) = unsafe { (host_bytes(tag, tag_len), host_bytes(record, record_len)) };

    let Some(kept) = filter_host_record(tag, time_sec, time_nsec, record) else {
        return std::ptr::null();
    };

    OUTPUT.with(|output| {
        let mut output = output.borrow_mut();
        *output = kept;
        output.as_ptr()
    })
}

//! FFI bindings for Epiflux
//!
//! C-compatible entry points so that the mobile and web shells can run the
//! pipeline in-process. Strings are null-terminated UTF-8. Every returned
//! string is heap-allocated and must be released with `epiflux_free_string`.

use std::cell::RefCell;
use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::ptr;

use chrono::{DateTime, Utc};

use crate::config::PipelineConfig;
use crate::error::ComputeError;
use crate::pipeline::{dashboard_from_json, DashboardProcessor};
use crate::rounds::{CognitiveRound, MotorRound};
use crate::time::parse_timestamp;

thread_local! {
    static LAST_ERROR: RefCell<Option<CString>> = const { RefCell::new(None) };
}

fn set_last_error(msg: &str) {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = CString::new(msg).ok();
    });
}

fn clear_last_error() {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = None;
    });
}

unsafe fn cstr_to_str<'a>(ptr: *const c_char) -> Option<&'a str> {
    if ptr.is_null() {
        return None;
    }
    CStr::from_ptr(ptr).to_str().ok()
}

fn string_to_cstr(s: &str) -> *mut c_char {
    match CString::new(s) {
        Ok(cstr) => cstr.into_raw(),
        Err(_) => ptr::null_mut(),
    }
}

/// Reference time from an optional C string; NULL means "now"
unsafe fn reference_time(now: *const c_char) -> Result<DateTime<Utc>, ComputeError> {
    if now.is_null() {
        return Ok(Utc::now());
    }
    match cstr_to_str(now) {
        Some(raw) => parse_timestamp(raw),
        None => Err(ComputeError::EncodingError(
            "Reference time is not valid UTF-8".to_string(),
        )),
    }
}

/// Map a pipeline result onto the C calling convention
fn finish(result: Result<String, ComputeError>) -> *mut c_char {
    match result {
        Ok(json) => string_to_cstr(&json),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

// ============================================================================
// Stateless API
// ============================================================================

/// Compute a dashboard snapshot from a backend row bundle.
///
/// # Safety
/// - `json` must be a valid null-terminated C string.
/// - `now` is either NULL (use the current time) or a timestamp C string.
/// - Returns a newly allocated string that must be freed with `epiflux_free_string`.
/// - Returns NULL on error; call `epiflux_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn epiflux_dashboard_from_json(
    json: *const c_char,
    now: *const c_char,
) -> *mut c_char {
    clear_last_error();

    let Some(json_str) = cstr_to_str(json) else {
        set_last_error("Invalid JSON string pointer");
        return ptr::null_mut();
    };

    finish(reference_time(now).and_then(|now| dashboard_from_json(json_str, now)))
}

// ============================================================================
// Configured API
// ============================================================================

/// Opaque handle to a configured processor
pub struct DashboardProcessorHandle {
    processor: DashboardProcessor,
}

/// Create a processor.
///
/// # Safety
/// - `config_json` is either NULL (default configuration) or a valid
///   null-terminated `PipelineConfig` JSON string.
/// - Must be freed with `epiflux_processor_free`.
/// - Returns NULL on error; call `epiflux_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn epiflux_processor_new(
    config_json: *const c_char,
) -> *mut DashboardProcessorHandle {
    clear_last_error();

    let processor = if config_json.is_null() {
        Ok(DashboardProcessor::new())
    } else {
        match cstr_to_str(config_json) {
            Some(raw) => PipelineConfig::from_json(raw).and_then(DashboardProcessor::with_config),
            None => Err(ComputeError::EncodingError(
                "Configuration is not valid UTF-8".to_string(),
            )),
        }
    };

    match processor {
        Ok(processor) => Box::into_raw(Box::new(DashboardProcessorHandle { processor })),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

/// Free a processor.
///
/// # Safety
/// - `processor` must be a pointer returned by `epiflux_processor_new`, or NULL.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn epiflux_processor_free(processor: *mut DashboardProcessorHandle) {
    if !processor.is_null() {
        drop(Box::from_raw(processor));
    }
}

/// Compute a dashboard snapshot with a configured processor.
///
/// # Safety
/// - `processor` must be a valid pointer returned by `epiflux_processor_new`.
/// - `json` must be a valid null-terminated C string.
/// - `now` is either NULL or a timestamp C string.
/// - Returns a newly allocated string that must be freed with `epiflux_free_string`.
/// - Returns NULL on error; call `epiflux_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn epiflux_processor_analyze(
    processor: *const DashboardProcessorHandle,
    json: *const c_char,
    now: *const c_char,
) -> *mut c_char {
    clear_last_error();

    if processor.is_null() {
        set_last_error("Null processor pointer");
        return ptr::null_mut();
    }
    let handle = &*processor;

    let Some(json_str) = cstr_to_str(json) else {
        set_last_error("Invalid JSON string pointer");
        return ptr::null_mut();
    };

    finish(reference_time(now).and_then(|now| {
        let snapshot = handle.processor.analyze_rows_json(json_str, now)?;
        handle.processor.to_json(&snapshot)
    }))
}

// ============================================================================
// Game Rounds
// ============================================================================

/// Summarise one round of the reaction/inhibition game into a cognitive session.
///
/// # Safety
/// - `json` must be a valid null-terminated `CognitiveRound` JSON string.
/// - `finished_at` is either NULL (use the current time) or a timestamp C string.
/// - Returns a newly allocated session JSON that must be freed with `epiflux_free_string`.
/// - Returns NULL on error; call `epiflux_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn epiflux_summarize_cognitive_round(
    json: *const c_char,
    id: i64,
    finished_at: *const c_char,
) -> *mut c_char {
    clear_last_error();

    let Some(json_str) = cstr_to_str(json) else {
        set_last_error("Invalid JSON string pointer");
        return ptr::null_mut();
    };

    finish(reference_time(finished_at).and_then(|finished_at| {
        let round: CognitiveRound = serde_json::from_str(json_str)?;
        let session = round.summarize(id, finished_at)?;
        Ok(serde_json::to_string(&session)?)
    }))
}

/// Summarise one round of the voice platformer into a motor session.
///
/// # Safety
/// - `json` must be a valid null-terminated `MotorRound` JSON string.
/// - `finished_at` is either NULL (use the current time) or a timestamp C string.
/// - Returns a newly allocated session JSON that must be freed with `epiflux_free_string`.
/// - Returns NULL on error; call `epiflux_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn epiflux_summarize_motor_round(
    json: *const c_char,
    id: i64,
    finished_at: *const c_char,
) -> *mut c_char {
    clear_last_error();

    let Some(json_str) = cstr_to_str(json) else {
        set_last_error("Invalid JSON string pointer");
        return ptr::null_mut();
    };

    finish(reference_time(finished_at).and_then(|finished_at| {
        let round: MotorRound = serde_json::from_str(json_str)?;
        let session = round.summarize(id, finished_at)?;
        Ok(serde_json::to_string(&session)?)
    }))
}

// ============================================================================
// Memory Management
// ============================================================================

/// Free a string returned by Epiflux functions.
///
/// # Safety
/// - `ptr` must be a pointer returned by an Epiflux function, or NULL.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn epiflux_free_string(ptr: *mut c_char) {
    if !ptr.is_null() {
        drop(CString::from_raw(ptr));
    }
}

// ============================================================================
// Error Handling
// ============================================================================

/// Get the last error message.
///
/// # Safety
/// - Returns a pointer to a thread-local error string, valid until the next
///   Epiflux call on this thread. Do NOT free it.
/// - Returns NULL if no error occurred.
#[no_mangle]
pub unsafe extern "C" fn epiflux_last_error() -> *const c_char {
    LAST_ERROR.with(|e| match &*e.borrow() {
        Some(cstr) => cstr.as_ptr(),
        None => ptr::null(),
    })
}

/// Get the library version.
///
/// # Safety
/// - Returns a pointer to a static string. Do NOT free.
#[no_mangle]
pub unsafe extern "C" fn epiflux_version() -> *const c_char {
    static VERSION: &[u8] = concat!(env!("CARGO_PKG_VERSION"), "\0").as_bytes();
    VERSION.as_ptr() as *const c_char
}

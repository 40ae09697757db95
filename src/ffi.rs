//! FFI bindings for ACWR Flux
//!
//! This module provides C-compatible functions for calling the workload engine
//! from other languages. All functions use C strings (null-terminated) and return
//! allocated memory that must be freed by the caller using `acwr_free_string`.

use std::cell::RefCell;
use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::ptr;

use chrono::{DateTime, Utc};

use crate::config::EngineConfig;
use crate::error::ComputeError;
use crate::pipeline::{team_report_json, workload_series_json};

// Thread-local storage for the last error message
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

/// Helper to convert C string to Rust string
unsafe fn cstr_to_string(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    CStr::from_ptr(ptr).to_str().ok().map(|s| s.to_string())
}

/// Helper to convert Rust string to C string (caller must free)
fn string_to_cstr(s: &str) -> *mut c_char {
    match CString::new(s) {
        Ok(cstr) => cstr.into_raw(),
        Err(_) => ptr::null_mut(),
    }
}

/// NULL means "now"; otherwise an RFC 3339 timestamp
unsafe fn evaluation_time(ptr: *const c_char) -> Result<DateTime<Utc>, ComputeError> {
    match cstr_to_string(ptr) {
        None => Ok(Utc::now()),
        Some(s) => DateTime::parse_from_rfc3339(s.trim())
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| ComputeError::DateParseError(format!("evaluation time {s:?}: {e}"))),
    }
}

fn finish(result: Result<String, ComputeError>) -> *mut c_char {
    match result {
        Ok(json) => string_to_cstr(&json),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

/// Compute the workload series for one athlete and return it as a JSON array.
///
/// # Safety
/// - `records_json` and `timezone` must be valid null-terminated C strings.
/// - `evaluation_time` may be NULL (use the current time) or an RFC 3339 C string.
/// - Returns a newly allocated string that must be freed with `acwr_free_string`.
/// - Returns NULL on error; call `acwr_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn acwr_series_json(
    records_json: *const c_char,
    evaluation_time_rfc3339: *const c_char,
    timezone: *const c_char,
) -> *mut c_char {
    clear_last_error();

    let json_str = match cstr_to_string(records_json) {
        Some(s) => s,
        None => {
            set_last_error("Invalid records JSON string pointer");
            return ptr::null_mut();
        }
    };

    let tz_str = match cstr_to_string(timezone) {
        Some(s) => s,
        None => {
            set_last_error("Invalid timezone string pointer");
            return ptr::null_mut();
        }
    };

    let now = match evaluation_time(evaluation_time_rfc3339) {
        Ok(now) => now,
        Err(e) => {
            set_last_error(&e.to_string());
            return ptr::null_mut();
        }
    };

    finish(workload_series_json(&json_str, now, &tz_str))
}

/// Build the team risk report and return it as JSON.
///
/// # Safety
/// - `records_json` must be a valid null-terminated C string.
/// - `roster_json` may be NULL or a JSON array of athlete ids.
/// - `evaluation_time` may be NULL (use the current time) or an RFC 3339 C string.
/// - `config_json` may be NULL (defaults) or an engine configuration JSON object.
/// - Returns a newly allocated string that must be freed with `acwr_free_string`.
/// - Returns NULL on error; call `acwr_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn acwr_team_report_json(
    records_json: *const c_char,
    roster_json: *const c_char,
    evaluation_time_rfc3339: *const c_char,
    config_json: *const c_char,
) -> *mut c_char {
    clear_last_error();

    let json_str = match cstr_to_string(records_json) {
        Some(s) => s,
        None => {
            set_last_error("Invalid records JSON string pointer");
            return ptr::null_mut();
        }
    };

    let roster: Vec<String> = match cstr_to_string(roster_json) {
        None => Vec::new(),
        Some(s) => match serde_json::from_str(&s) {
            Ok(roster) => roster,
            Err(e) => {
                set_last_error(&ComputeError::from(e).to_string());
                return ptr::null_mut();
            }
        },
    };

    let config = match cstr_to_string(config_json) {
        None => EngineConfig::default(),
        Some(s) => match EngineConfig::from_json(&s) {
            Ok(config) => config,
            Err(e) => {
                set_last_error(&e.to_string());
                return ptr::null_mut();
            }
        },
    };

    let now = match evaluation_time(evaluation_time_rfc3339) {
        Ok(now) => now,
        Err(e) => {
            set_last_error(&e.to_string());
            return ptr::null_mut();
        }
    };

    finish(team_report_json(&json_str, &roster, now, &config))
}

/// Free a string returned by ACWR Flux functions.
///
/// # Safety
/// - `ptr` must be a valid pointer returned by an ACWR Flux function, or NULL.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn acwr_free_string(ptr: *mut c_char) {
    if !ptr.is_null() {
        drop(CString::from_raw(ptr));
    }
}

/// Get the last error message.
///
/// # Safety
/// - Returns a pointer to a thread-local error string.
/// - The returned pointer is valid until the next ACWR Flux call on this thread.
/// - Do NOT free the returned pointer.
/// - Returns NULL if no error occurred.
#[no_mangle]
pub unsafe extern "C" fn acwr_last_error() -> *const c_char {
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
pub unsafe extern "C" fn acwr_version() -> *const c_char {
    static VERSION: &[u8] = concat!(env!("CARGO_PKG_VERSION"), "\0").as_bytes();
    VERSION.as_ptr() as *const c_char
}

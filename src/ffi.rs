//! FFI bindings for Trajecto
//!
//! This module provides C-compatible functions for calling Trajecto from other languages.
//! All functions use C strings (null-terminated) and return allocated memory that
//! must be freed by the caller using `trajecto_free_string`.

use std::cell::RefCell;
use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::ptr;
use std::slice;

use crate::config::PipelineConfig;
use crate::error::TrajectoryError;
use crate::frequency::FrequencyEstimator;
use crate::pipeline::TrajectoryProcessor;

// Thread-local storage for the last error message
thread_local! {
    static LAST_ERROR: RefCell<Option<CString>> = const { RefCell::new(None) };
}

/// Set the last error message
fn set_last_error(msg: &str) {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = CString::new(msg).ok();
    });
}

/// Clear the last error message
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

/// Parse an optional TOML configuration; NULL means defaults
unsafe fn config_from_cstr(config_toml: *const c_char) -> Result<PipelineConfig, TrajectoryError> {
    if config_toml.is_null() {
        return Ok(PipelineConfig::default());
    }
    match cstr_to_string(config_toml) {
        Some(toml) => PipelineConfig::from_toml_str(&toml),
        None => Err(TrajectoryError::ConfigError(
            "configuration is not valid UTF-8".to_string(),
        )),
    }
}

// ============================================================================
// Stateless API
// ============================================================================

/// Process JSON-encoded acceleration and position streams and return the report JSON.
///
/// `accel_json` is `{"timestamps": [...], "x": [...], "y": [...], "z": [...]}`,
/// `positions_json` is `[{"lat": .., "lon": ..}, ...]`, and `config_toml` is an
/// optional TOML pipeline configuration (NULL for defaults).
///
/// # Safety
/// - `accel_json` and `positions_json` must be valid null-terminated C strings.
/// - `config_toml` must be NULL or a valid null-terminated C string.
/// - Returns a newly allocated string that must be freed with `trajecto_free_string`.
/// - Returns NULL on error; call `trajecto_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn trajecto_process_json(
    accel_json: *const c_char,
    positions_json: *const c_char,
    config_toml: *const c_char,
) -> *mut c_char {
    clear_last_error();

    let accel_str = match cstr_to_string(accel_json) {
        Some(s) => s,
        None => {
            set_last_error("Invalid acceleration JSON string pointer");
            return ptr::null_mut();
        }
    };

    let positions_str = match cstr_to_string(positions_json) {
        Some(s) => s,
        None => {
            set_last_error("Invalid positions JSON string pointer");
            return ptr::null_mut();
        }
    };

    let result = config_from_cstr(config_toml)
        .and_then(TrajectoryProcessor::with_config)
        .and_then(|processor| processor.process_json(&accel_str, &positions_str));

    match result {
        Ok(report) => string_to_cstr(&report),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

/// Estimate the sampling rate (Hz) of `len` timestamps (seconds).
///
/// Fewer than two samples or zero elapsed time yields 0.0 ("unknown").
///
/// # Safety
/// - `timestamps` must point to `len` readable `f64` values, or be NULL when `len` is 0.
/// - Returns -1.0 on error; call `trajecto_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn trajecto_estimate_frequency(timestamps: *const f64, len: usize) -> f64 {
    clear_last_error();

    if len == 0 {
        return 0.0;
    }
    if timestamps.is_null() {
        set_last_error("Null timestamps pointer");
        return -1.0;
    }

    let timestamps = slice::from_raw_parts(timestamps, len);
    FrequencyEstimator::estimate_frequency(timestamps).frequency_hz
}

// ============================================================================
// Stateful Processor API
// ============================================================================

/// Opaque handle to a TrajectoryProcessor
pub struct TrajectoryProcessorHandle {
    processor: TrajectoryProcessor,
}

/// Create a new TrajectoryProcessor from an optional TOML configuration.
///
/// # Safety
/// - `config_toml` must be NULL (defaults) or a valid null-terminated C string.
/// - Returns a pointer to a newly allocated processor.
/// - Must be freed with `trajecto_processor_free`.
/// - Returns NULL on error; call `trajecto_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn trajecto_processor_new(
    config_toml: *const c_char,
) -> *mut TrajectoryProcessorHandle {
    clear_last_error();

    match config_from_cstr(config_toml).and_then(TrajectoryProcessor::with_config) {
        Ok(processor) => Box::into_raw(Box::new(TrajectoryProcessorHandle { processor })),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

/// Free a TrajectoryProcessor.
///
/// # Safety
/// - `processor` must be a valid pointer returned by `trajecto_processor_new`.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn trajecto_processor_free(processor: *mut TrajectoryProcessorHandle) {
    if !processor.is_null() {
        drop(Box::from_raw(processor));
    }
}

/// Process JSON-encoded streams with a processor and return the report JSON.
///
/// # Safety
/// - `processor` must be a valid pointer returned by `trajecto_processor_new`.
/// - `accel_json` and `positions_json` must be valid null-terminated C strings.
/// - Returns a newly allocated string that must be freed with `trajecto_free_string`.
/// - Returns NULL on error; call `trajecto_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn trajecto_processor_process_json(
    processor: *mut TrajectoryProcessorHandle,
    accel_json: *const c_char,
    positions_json: *const c_char,
) -> *mut c_char {
    clear_last_error();

    if processor.is_null() {
        set_last_error("Null processor pointer");
        return ptr::null_mut();
    }

    let handle = &*processor;

    let accel_str = match cstr_to_string(accel_json) {
        Some(s) => s,
        None => {
            set_last_error("Invalid acceleration JSON string pointer");
            return ptr::null_mut();
        }
    };

    let positions_str = match cstr_to_string(positions_json) {
        Some(s) => s,
        None => {
            set_last_error("Invalid positions JSON string pointer");
            return ptr::null_mut();
        }
    };

    match handle.processor.process_json(&accel_str, &positions_str) {
        Ok(report) => string_to_cstr(&report),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

// ============================================================================
// Memory Management
// ============================================================================

/// Free a string returned by Trajecto functions.
///
/// # Safety
/// - `ptr` must be a valid pointer returned by a Trajecto function, or NULL.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn trajecto_free_string(ptr: *mut c_char) {
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
/// - Returns a pointer to a thread-local error string.
/// - The returned pointer is valid until the next Trajecto function call on this thread.
/// - Do NOT free the returned pointer.
/// - Returns NULL if no error occurred.
#[no_mangle]
pub unsafe extern "C" fn trajecto_last_error() -> *const c_char {
    LAST_ERROR.with(|e| match &*e.borrow() {
        Some(cstr) => cstr.as_ptr(),
        None => ptr::null(),
    })
}

// ============================================================================
// Version Information
// ============================================================================

/// Get the Trajecto library version.
///
/// # Safety
/// - Returns a pointer to a static string. Do NOT free.
#[no_mangle]
pub unsafe extern "C" fn trajecto_version() -> *const c_char {
    static VERSION: &[u8] = concat!(env!("CARGO_PKG_VERSION"), "\0").as_bytes();
    VERSION.as_ptr() as *const c_char
}

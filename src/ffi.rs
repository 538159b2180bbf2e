//! FFI bindings for NeuroBridge Risk
//!
//! This module provides C-compatible functions for calling the engine from other languages.
//! All functions use C strings (null-terminated) and return allocated memory that
//! must be freed by the caller using `nb_free_string`.

use std::cell::RefCell;
use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::ptr;

use serde::Deserialize;

use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::fusion::{FusionInputs, RiskFusionEngine};
use crate::heatmap::HeatmapGazeAnalyzer;
use crate::pipeline::{screen_session_json, ScreeningProcessor};
use crate::trend::{analyze_trend, AttentionRecord};
use crate::types::{PixelBuffer, TrendSignal};

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

/// Hand a JSON result to the caller, recording the error on failure
fn json_result(result: Result<String, EngineError>) -> *mut c_char {
    match result {
        Ok(json) => string_to_cstr(&json),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

/// Trend input: bare attention metrics or screening records, full or minimal
#[derive(Deserialize)]
#[serde(untagged)]
enum TrendHistory {
    Attention(Vec<f64>),
    Records(Vec<AttentionRecord>),
}

fn trend_from_json(json: &str) -> Result<String, EngineError> {
    let signal: TrendSignal = match serde_json::from_str::<TrendHistory>(json)? {
        TrendHistory::Attention(values) => analyze_trend(&values),
        TrendHistory::Records(records) => analyze_trend(&records),
    };
    Ok(serde_json::to_string(&signal)?)
}

/// Parse an optional config; NULL means defaults
unsafe fn config_from_cstr(config_json: *const c_char) -> Result<EngineConfig, EngineError> {
    if config_json.is_null() {
        return Ok(EngineConfig::default());
    }
    let json = cstr_to_string(config_json)
        .ok_or_else(|| EngineError::ConfigError("config is not valid UTF-8".to_string()))?;
    EngineConfig::from_json(&json)
}

fn fuse_from_json(json: &str) -> Result<String, EngineError> {
    let inputs: FusionInputs = serde_json::from_str(json)?;
    let result = RiskFusionEngine::new().fuse_checked(&inputs)?;
    Ok(serde_json::to_string(&result)?)
}

// ============================================================================
// Stateless API
// ============================================================================

/// Analyze a raw RGB8 heatmap and return a vision assessment as JSON.
///
/// A buffer whose length does not match `width * height * 3` yields the
/// fallback assessment rather than an error.
///
/// # Safety
/// - `data` must point to `len` readable bytes.
/// - Returns a newly allocated string that must be freed with `nb_free_string`.
/// - Returns NULL on error; call `nb_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn nb_analyze_heatmap_rgb(
    data: *const u8,
    len: usize,
    width: u32,
    height: u32,
) -> *mut c_char {
    clear_last_error();

    if data.is_null() {
        set_last_error("Null pixel data pointer");
        return ptr::null_mut();
    }

    let bytes = std::slice::from_raw_parts(data, len).to_vec();
    let image = PixelBuffer::new(width, height, bytes);
    let assessment = HeatmapGazeAnalyzer::new().analyze(&image);

    json_result(serde_json::to_string(&assessment).map_err(EngineError::JsonError))
}

/// Fuse metrics given as JSON (`{"mode": "ensemble" | "legacy", ...}`).
///
/// # Safety
/// - `json` must be a valid null-terminated C string.
/// - Returns a newly allocated string that must be freed with `nb_free_string`.
/// - Returns NULL on error; call `nb_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn nb_fuse_json(json: *const c_char) -> *mut c_char {
    clear_last_error();

    let json_str = match cstr_to_string(json) {
        Some(s) => s,
        None => {
            set_last_error("Invalid JSON string pointer");
            return ptr::null_mut();
        }
    };

    json_result(fuse_from_json(&json_str))
}

/// Compute the attention trend of a history given as a JSON array of
/// attention metrics or screening records, oldest first.
///
/// # Safety
/// - `json` must be a valid null-terminated C string.
/// - Returns a newly allocated string that must be freed with `nb_free_string`.
/// - Returns NULL on error; call `nb_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn nb_analyze_trend_json(json: *const c_char) -> *mut c_char {
    clear_last_error();

    let json_str = match cstr_to_string(json) {
        Some(s) => s,
        None => {
            set_last_error("Invalid JSON string pointer");
            return ptr::null_mut();
        }
    };

    json_result(trend_from_json(&json_str))
}

/// Score one session without history and return the session report.
///
/// # Safety
/// - `json` must be a valid null-terminated C string.
/// - `config_json` may be NULL for the default configuration.
/// - Returns a newly allocated string that must be freed with `nb_free_string`.
/// - Returns NULL on error; call `nb_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn nb_screen_session_json(
    json: *const c_char,
    config_json: *const c_char,
) -> *mut c_char {
    clear_last_error();

    let json_str = match cstr_to_string(json) {
        Some(s) => s,
        None => {
            set_last_error("Invalid JSON string pointer");
            return ptr::null_mut();
        }
    };

    let config = match config_from_cstr(config_json) {
        Ok(config) => config,
        Err(e) => {
            set_last_error(&e.to_string());
            return ptr::null_mut();
        }
    };

    json_result(screen_session_json(json_str, &config))
}

// ============================================================================
// Stateful Processor API
// ============================================================================

/// Opaque handle to a ScreeningProcessor
pub struct ScreeningProcessorHandle {
    processor: ScreeningProcessor,
}

/// Create a processor for one patient.
///
/// # Safety
/// - `patient_id` must be a valid null-terminated C string.
/// - `config_json` may be NULL for the default configuration.
/// - Returns a pointer that must be freed with `nb_processor_free`.
/// - Returns NULL on error; call `nb_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn nb_processor_new(
    patient_id: *const c_char,
    config_json: *const c_char,
) -> *mut ScreeningProcessorHandle {
    clear_last_error();

    let patient = match cstr_to_string(patient_id) {
        Some(s) => s,
        None => {
            set_last_error("Invalid patient_id string pointer");
            return ptr::null_mut();
        }
    };

    let processor = match config_from_cstr(config_json)
        .and_then(|config| ScreeningProcessor::with_config(patient, config))
    {
        Ok(processor) => processor,
        Err(e) => {
            set_last_error(&e.to_string());
            return ptr::null_mut();
        }
    };

    let handle = Box::new(ScreeningProcessorHandle { processor });
    Box::into_raw(handle)
}

/// Free a processor.
///
/// # Safety
/// - `processor` must be a valid pointer returned by `nb_processor_new`.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn nb_processor_free(processor: *mut ScreeningProcessorHandle) {
    if !processor.is_null() {
        drop(Box::from_raw(processor));
    }
}

/// Record a session with a stateful processor and return the session report.
///
/// # Safety
/// - `processor` must be a valid pointer returned by `nb_processor_new`.
/// - `json` must be a valid null-terminated C string.
/// - Returns a newly allocated string that must be freed with `nb_free_string`.
/// - Returns NULL on error; call `nb_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn nb_processor_record(
    processor: *mut ScreeningProcessorHandle,
    json: *const c_char,
) -> *mut c_char {
    clear_last_error();

    if processor.is_null() {
        set_last_error("Null processor pointer");
        return ptr::null_mut();
    }

    let handle = &mut *processor;

    let json_str = match cstr_to_string(json) {
        Some(s) => s,
        None => {
            set_last_error("Invalid JSON string pointer");
            return ptr::null_mut();
        }
    };

    json_result(handle.processor.record_json(&json_str))
}

/// Current attention trend of the processor's history.
///
/// # Safety
/// - `processor` must be a valid pointer returned by `nb_processor_new`.
/// - Returns a newly allocated string that must be freed with `nb_free_string`.
/// - Returns NULL on error; call `nb_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn nb_processor_trend(processor: *mut ScreeningProcessorHandle) -> *mut c_char {
    clear_last_error();

    if processor.is_null() {
        set_last_error("Null processor pointer");
        return ptr::null_mut();
    }

    let handle = &*processor;
    json_result(serde_json::to_string(&handle.processor.trend()).map_err(EngineError::JsonError))
}

/// Save the processor's history to JSON.
///
/// # Safety
/// - `processor` must be a valid pointer returned by `nb_processor_new`.
/// - Returns a newly allocated string that must be freed with `nb_free_string`.
/// - Returns NULL on error; call `nb_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn nb_processor_save_history(
    processor: *mut ScreeningProcessorHandle,
) -> *mut c_char {
    clear_last_error();

    if processor.is_null() {
        set_last_error("Null processor pointer");
        return ptr::null_mut();
    }

    let handle = &*processor;
    json_result(handle.processor.save_history())
}

/// Load the processor's history from JSON.
///
/// # Safety
/// - `processor` must be a valid pointer returned by `nb_processor_new`.
/// - `json` must be a valid null-terminated C string.
/// - Returns 0 on success, non-zero on error.
/// - On error, call `nb_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn nb_processor_load_history(
    processor: *mut ScreeningProcessorHandle,
    json: *const c_char,
) -> i32 {
    clear_last_error();

    if processor.is_null() {
        set_last_error("Null processor pointer");
        return -1;
    }

    let handle = &mut *processor;

    let json_str = match cstr_to_string(json) {
        Some(s) => s,
        None => {
            set_last_error("Invalid JSON string pointer");
            return -1;
        }
    };

    match handle.processor.load_history(&json_str) {
        Ok(()) => 0,
        Err(e) => {
            set_last_error(&e.to_string());
            -1
        }
    }
}

// ============================================================================
// Memory Management
// ============================================================================

/// Free a string returned by engine functions.
///
/// # Safety
/// - `ptr` must be a valid pointer returned by an engine function, or NULL.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn nb_free_string(ptr: *mut c_char) {
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
/// - The returned pointer is valid until the next engine call on this thread.
/// - Do NOT free the returned pointer.
/// - Returns NULL if no error occurred.
#[no_mangle]
pub unsafe extern "C" fn nb_last_error() -> *const c_char {
    LAST_ERROR.with(|e| match &*e.borrow() {
        Some(cstr) => cstr.as_ptr(),
        None => ptr::null(),
    })
}

// ============================================================================
// Version Information
// ============================================================================

/// Get the engine library version.
///
/// # Safety
/// - Returns a pointer to a static string. Do NOT free.
#[no_mangle]
pub unsafe extern "C" fn nb_version() -> *const c_char {
    static VERSION: &[u8] = concat!(env!("CARGO_PKG_VERSION"), "\0").as_bytes();
    VERSION.as_ptr() as *const c_char
}

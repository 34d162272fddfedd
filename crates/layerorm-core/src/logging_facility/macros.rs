//! Canonical logging macros
//!
//! Boundary macros (`log_op_*`) are for registry operations. Work that is
//! skipped below the boundary (a rejected row, an uncoercible field) goes
//! through `log_diagnostic!` so it carries the same `component`/`event` keys.

/// Log the start of an operation
///
/// # Example
///
/// ```
/// # use layerorm_core::log_op_start;
/// log_op_start!("register");
/// log_op_start!("register", model = "user");
/// ```
#[macro_export]
macro_rules! log_op_start {
    ($op:expr $(, $($field:tt)*)?) => {
        tracing::info!(
            component = module_path!(),
            op = $op,
            event = $crate::layerorm_core_types::schema::EVENT_START,
            $($($field)*)?
        );
    };
}

/// Log the successful end of an operation
///
/// # Example
///
/// ```
/// # use layerorm_core::log_op_end;
/// log_op_end!("get_model", duration_ms = 3);
/// log_op_end!("get_model", duration_ms = 3, model = "user");
/// ```
#[macro_export]
macro_rules! log_op_end {
    ($op:expr, duration_ms = $duration:expr $(, $($field:tt)*)?) => {
        tracing::info!(
            component = module_path!(),
            op = $op,
            event = $crate::layerorm_core_types::schema::EVENT_END,
            duration_ms = $duration,
            $($($field)*)?
        );
    };
}

/// Log an operation error
///
/// The error is converted into an `ExError` so the kind and stable code are
/// always present on the event.
///
/// # Example
///
/// ```
/// # use layerorm_core::{log_op_error, errors::OrmError};
/// let err = OrmError::MethodNotFound { model: "user".into(), method: "login".into() };
/// log_op_error!("get_method", err, duration_ms = 1);
/// ```
#[macro_export]
macro_rules! log_op_error {
    ($op:expr, $err:expr, duration_ms = $duration:expr $(, $($field:tt)*)?) => {{
        let ex_err: $crate::errors::ExError = $err.into();
        tracing::error!(
            component = module_path!(),
            op = $op,
            event = $crate::layerorm_core_types::schema::EVENT_END_ERROR,
            duration_ms = $duration,
            err_kind = ?ex_err.kind(),
            err_code = ex_err.code(),
            $($($field)*)?
        );
    }};
}

/// Log a unit of work that was skipped instead of failing the call
///
/// # Example
///
/// ```
/// # use layerorm_core::log_diagnostic;
/// # use layerorm_core::layerorm_core_types::schema::EVENT_ROW_REJECTED;
/// log_diagnostic!(EVENT_ROW_REJECTED, model = "user", "empty row rejected");
/// ```
#[macro_export]
macro_rules! log_diagnostic {
    ($event:expr, $($field:tt)*) => {
        tracing::warn!(
            component = module_path!(),
            event = $event,
            $($field)*
        );
    };
}

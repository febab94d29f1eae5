//! ---
//! cea_section: "03-persistence-logging"
//! cea_subsection: "module"
//! cea_type: "source"
//! cea_scope: "code"
//! cea_description: "Context-carrying tracing macros."
//! cea_version: "v0.0.0-prealpha"
//! cea_owner: "tbd"
//! ---
/// Emit an informational log enriched with solver context.
#[macro_export]
macro_rules! cea_info {
    (context = $ctx:expr, $($arg:tt)+) => {{
        let ctx = &$ctx;
        tracing::event!(
            tracing::Level::INFO,
            network = ctx.network.unwrap_or(""),
            building = ctx.building.unwrap_or(""),
            time_step = ctx.time_step.unwrap_or_default(),
            element = ctx.element.unwrap_or(""),
            message = %format_args!($($arg)+)
        );
    }};
    ($($arg:tt)+) => {{
        let ctx = &$crate::LogContext::default();
        tracing::event!(
            tracing::Level::INFO,
            network = ctx.network.unwrap_or(""),
            building = ctx.building.unwrap_or(""),
            time_step = ctx.time_step.unwrap_or_default(),
            element = ctx.element.unwrap_or(""),
            message = %format_args!($($arg)+)
        );
    }};
}

/// Emit a debug log enriched with solver context.
#[macro_export]
macro_rules! cea_debug {
    (context = $ctx:expr, $($arg:tt)+) => {{
        let ctx = &$ctx;
        tracing::event!(
            tracing::Level::DEBUG,
            network = ctx.network.unwrap_or(""),
            building = ctx.building.unwrap_or(""),
            time_step = ctx.time_step.unwrap_or_default(),
            element = ctx.element.unwrap_or(""),
            message = %format_args!($($arg)+)
        );
    }};
    ($($arg:tt)+) => {{
        let ctx = &$crate::LogContext::default();
        tracing::event!(
            tracing::Level::DEBUG,
            network = ctx.network.unwrap_or(""),
            building = ctx.building.unwrap_or(""),
            time_step = ctx.time_step.unwrap_or_default(),
            element = ctx.element.unwrap_or(""),
            message = %format_args!($($arg)+)
        );
    }};
}

/// Emit a warning log enriched with solver context.
#[macro_export]
macro_rules! cea_warn {
    (context = $ctx:expr, $($arg:tt)+) => {{
        let ctx = &$ctx;
        tracing::event!(
            tracing::Level::WARN,
            network = ctx.network.unwrap_or(""),
            building = ctx.building.unwrap_or(""),
            time_step = ctx.time_step.unwrap_or_default(),
            element = ctx.element.unwrap_or(""),
            message = %format_args!($($arg)+)
        );
    }};
    ($($arg:tt)+) => {{
        let ctx = &$crate::LogContext::default();
        tracing::event!(
            tracing::Level::WARN,
            network = ctx.network.unwrap_or(""),
            building = ctx.building.unwrap_or(""),
            time_step = ctx.time_step.unwrap_or_default(),
            element = ctx.element.unwrap_or(""),
            message = %format_args!($($arg)+)
        );
    }};
}

/// Emit an error log enriched with solver context.
#[macro_export]
macro_rules! cea_error {
    (context = $ctx:expr, $($arg:tt)+) => {{
        let ctx = &$ctx;
        tracing::event!(
            tracing::Level::ERROR,
            network = ctx.network.unwrap_or(""),
            building = ctx.building.unwrap_or(""),
            time_step = ctx.time_step.unwrap_or_default(),
            element = ctx.element.unwrap_or(""),
            message = %format_args!($($arg)+)
        );
    }};
    ($($arg:tt)+) => {{
        let ctx = &$crate::LogContext::default();
        tracing::event!(
            tracing::Level::ERROR,
            network = ctx.network.unwrap_or(""),
            building = ctx.building.unwrap_or(""),
            time_step = ctx.time_step.unwrap_or_default(),
            element = ctx.element.unwrap_or(""),
            message = %format_args!($($arg)+)
        );
    }};
}
